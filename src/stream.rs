use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::debug;

use crate::batch::RecordBatch;
use crate::buffer::RefillBuffer;
use crate::config::StreamConfig;
use crate::error::{FailureKind, StreamError};
use crate::machine::{RecordKind, RecordMachine, Step};
use crate::source::{open_source, sniff_source};

/// Batching FASTA/FASTQ decoder over a byte source.
///
/// Each [`fill`](Self::fill) appends sequence bytes and record boundaries to a
/// caller-owned [`RecordBatch`] until the batch is full or input ends. A record
/// cut off by `max_chars` continues at the start of the next batch.
///
/// Failures are recorded on the stream rather than returned; check
/// [`has_failed`](Self::has_failed) once `fill` stops making progress, or use
/// [`try_fill`](Self::try_fill).
///
/// The stream owns its source, which is released by [`close`](Self::close) or
/// when the stream is dropped.
pub struct SeqStream<R> {
    input: RefillBuffer<R>,
    machine: RecordMachine,
    config: StreamConfig,
    error: Option<StreamError>,
}

impl SeqStream<Box<dyn Read + Send>> {
    /// Opens a plain or gzip-compressed file.
    pub fn open<P: AsRef<Path>>(path: P, config: StreamConfig) -> io::Result<Self> {
        Ok(Self::from_reader(open_source(path)?, config))
    }

    /// Wraps an already-open file, plain or gzip-compressed.
    pub fn from_file(file: File, config: StreamConfig) -> io::Result<Self> {
        Ok(Self::from_reader(sniff_source(file)?, config))
    }
}

impl<R: Read> SeqStream<R> {
    /// Creates a stream with the default configuration.
    pub fn new(reader: R) -> Self {
        Self::from_reader(reader, StreamConfig::default())
    }

    /// Creates a stream reading `reader` as is, without decompression.
    pub fn from_reader(reader: R, config: StreamConfig) -> Self {
        Self {
            input: RefillBuffer::with_capacity(config.buffer_capacity(), reader),
            machine: RecordMachine::new(),
            config,
            error: None,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Creates an empty batch sized by this stream's configuration.
    pub fn batch(&self) -> RecordBatch {
        self.config.batch()
    }

    /// Reads into `batch` until it is full or input ends.
    ///
    /// Returns `true` if any byte or record boundary was appended by this call.
    /// For a cleared batch, `false` means the stream is exhausted or failed.
    pub fn fill(&mut self, batch: &mut RecordBatch) -> bool {
        if self.input.is_closed() {
            return false;
        }
        let mark = batch.progress_mark();

        while !self.machine.is_finished() && !batch.is_full() {
            match self.machine.step(&mut self.input, batch) {
                Step::RecordClosed => {}
                Step::Suspended | Step::Finished => break,
                Step::Failed(error) => {
                    self.error = Some(error);
                    break;
                }
            }
        }

        batch.progress_mark() > mark
    }

    /// Like [`fill`](Self::fill), but returns a failure that happened during
    /// this call as an error. The error is handed out once; the status
    /// queries keep reporting it.
    pub fn try_fill(&mut self, batch: &mut RecordBatch) -> Result<bool, StreamError> {
        let failed_before = self.machine.failure().is_some();
        let produced = self.fill(batch);

        if !failed_before {
            if let Some(error) = self.error.take() {
                return Err(error);
            }
        }
        Ok(produced)
    }

    /// Releases the byte source. Calling it again has no effect.
    pub fn close(&mut self) {
        if !self.input.is_closed() {
            debug!(
                "closing stream after {} records (source exhausted: {})",
                self.machine.records_read(),
                self.input.is_at_eof()
            );
            self.input.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.input.is_closed()
    }

    /// True once input ended without failure.
    pub fn is_at_end(&self) -> bool {
        self.machine.is_at_end()
    }

    /// True if the byte source reported a read failure.
    pub fn has_error(&self) -> bool {
        self.machine.failure() == Some(FailureKind::Source)
    }

    /// True if a FASTQ quality string did not match its sequence length.
    pub fn is_quality_truncated(&self) -> bool {
        self.machine.failure() == Some(FailureKind::TruncatedQuality)
    }

    /// True if the stream stopped on a failure rather than at end of input.
    pub fn has_failed(&self) -> bool {
        self.has_error() || self.is_quality_truncated()
    }

    /// The recorded failure, unless already taken by [`try_fill`](Self::try_fill).
    pub fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    /// Number of records closed so far.
    pub fn records_read(&self) -> u64 {
        self.machine.records_read()
    }

    /// Format of the most recently started record.
    pub fn last_record_kind(&self) -> Option<RecordKind> {
        self.machine.last_kind()
    }
}
