use std::io::{self, Read};

use log::{debug, trace};

use crate::batch::RecordBatch;
use crate::buffer::{Delimiter, RefillBuffer};
use crate::error::{FailureKind, StreamError};

/// Format of a record, decided by its leading marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Header starts with `>`.
    Fasta,
    /// Header starts with `@`.
    Fastq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitRecordStart,
    HeaderName(RecordKind),
    HeaderComment(RecordKind),
    /// Also the state a record is suspended in when the batch runs out of room.
    SequenceBody { kind: RecordKind, seq_len: usize },
    PlusLine { seq_len: usize },
    QualityBody { expected: usize, found: usize },
    Eof,
    Failed(FailureKind),
}

/// What a single [`RecordMachine::step`] achieved.
#[derive(Debug)]
pub(crate) enum Step {
    /// A record boundary was pushed and the record is fully consumed.
    RecordClosed,
    /// The batch hit `max_chars` in the middle of a sequence body.
    Suspended,
    /// Nothing more to read: end of input, or the machine already failed.
    Finished,
    Failed(StreamError),
}

/// Reassembles FASTA/FASTQ records from a [`RefillBuffer`] into a [`RecordBatch`].
///
/// Header lines, `+` lines and quality strings are consumed but never stored;
/// only sequence bytes reach the batch. A record whose sequence does not fit
/// stays open in `SequenceBody` and the next step continues it in place.
#[derive(Debug)]
pub(crate) struct RecordMachine {
    state: State,
    records_read: u64,
    last_kind: Option<RecordKind>,
}

impl RecordMachine {
    pub fn new() -> Self {
        Self {
            state: State::AwaitRecordStart,
            records_read: 0,
            last_kind: None,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.state == State::Eof
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self.state {
            State::Failed(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Eof | State::Failed(_))
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn last_kind(&self) -> Option<RecordKind> {
        self.last_kind
    }

    /// Runs until one record is closed, the batch is out of room, or input ends.
    pub fn step<R: Read>(&mut self, input: &mut RefillBuffer<R>, batch: &mut RecordBatch) -> Step {
        loop {
            match self.state {
                State::AwaitRecordStart => match input.next_byte() {
                    Some(b'>') => self.start_record(RecordKind::Fasta),
                    Some(b'@') => self.start_record(RecordKind::Fastq),
                    Some(_) => {}
                    None => return self.end_of_input(input),
                },

                State::HeaderName(kind) => {
                    let scan = input.scan_until(Delimiter::Whitespace, None, usize::MAX);
                    self.state = match scan.terminator {
                        Some(b'\n') => {
                            input.next_byte();
                            State::SequenceBody { kind, seq_len: 0 }
                        }
                        Some(_) => State::HeaderComment(kind),
                        None => State::SequenceBody { kind, seq_len: 0 },
                    };
                }

                State::HeaderComment(kind) => {
                    input.skip_line();
                    self.state = State::SequenceBody { kind, seq_len: 0 };
                }

                State::SequenceBody { kind, seq_len } => {
                    if let Some(step) = self.read_sequence(input, batch, kind, seq_len) {
                        return step;
                    }
                }

                State::PlusLine { seq_len } => {
                    input.skip_line();
                    self.state = State::QualityBody {
                        expected: seq_len,
                        found: 0,
                    };
                }

                State::QualityBody { expected, found } => return self.read_quality(input, expected, found),

                State::Eof | State::Failed(_) => return Step::Finished,
            }
        }
    }

    fn start_record(&mut self, kind: RecordKind) {
        self.last_kind = Some(kind);
        self.state = State::HeaderName(kind);
    }

    /// Appends sequence lines to the batch. Returns `None` once the body ended
    /// with a `+` line and the quality string still has to be read.
    fn read_sequence<R: Read>(
        &mut self,
        input: &mut RefillBuffer<R>,
        batch: &mut RecordBatch,
        kind: RecordKind,
        mut seq_len: usize,
    ) -> Option<Step> {
        loop {
            if input.skip_line_end() {
                continue;
            }
            match input.peek() {
                None => {
                    if input.has_error() {
                        return Some(self.source_failure(input));
                    }
                    self.close_record(batch, kind, seq_len);
                    self.state = State::Eof;
                    return Some(Step::RecordClosed);
                }
                Some(b'>' | b'@') => {
                    self.close_record(batch, kind, seq_len);
                    self.state = State::AwaitRecordStart;
                    return Some(Step::RecordClosed);
                }
                Some(b'+') => {
                    input.next_byte();
                    self.close_record(batch, kind, seq_len);
                    self.state = State::PlusLine { seq_len };
                    return None;
                }
                Some(_) => {
                    let room = batch.remaining_chars();
                    if room == 0 {
                        trace!("batch full after {seq_len} sequence bytes, suspending record");
                        self.state = State::SequenceBody { kind, seq_len };
                        return Some(Step::Suspended);
                    }
                    let scan = input.scan_until(Delimiter::LineEnd, Some(batch.seq_mut()), room);
                    seq_len += scan.len;
                }
            }
        }
    }

    /// Counts quality bytes up to the sequence length; the line holding the
    /// last of them must end right there. An empty sequence takes an empty
    /// quality line.
    fn read_quality<R: Read>(
        &mut self,
        input: &mut RefillBuffer<R>,
        expected: usize,
        mut found: usize,
    ) -> Step {
        while found < expected {
            if input.skip_line_end() {
                continue;
            }
            match input.peek() {
                None if input.has_error() => return self.source_failure(input),
                None => return self.fail(StreamError::TruncatedQuality { expected, found }),
                Some(_) => {
                    found += input
                        .scan_until(Delimiter::LineEnd, None, expected - found)
                        .len;
                }
            }
        }

        let rest = input.scan_until(Delimiter::LineEnd, None, usize::MAX);
        if input.has_error() {
            return self.source_failure(input);
        }
        if rest.len > 0 {
            return self.fail(StreamError::TruncatedQuality {
                expected,
                found: found + rest.len,
            });
        }
        if rest.terminator.is_some() {
            input.next_byte();
        }

        self.state = State::AwaitRecordStart;
        Step::RecordClosed
    }

    fn close_record(&mut self, batch: &mut RecordBatch, kind: RecordKind, seq_len: usize) {
        batch.close_record();
        self.records_read += 1;
        trace!("closed {kind:?} record #{} ({seq_len} bytes)", self.records_read);
    }

    fn end_of_input<R: Read>(&mut self, input: &mut RefillBuffer<R>) -> Step {
        if input.has_error() {
            return self.source_failure(input);
        }
        debug!("end of input after {} records", self.records_read);
        self.state = State::Eof;
        Step::Finished
    }

    fn source_failure<R: Read>(&mut self, input: &mut RefillBuffer<R>) -> Step {
        let error = input
            .take_error()
            .unwrap_or_else(|| io::Error::other("byte source failed"));
        self.fail(StreamError::Io(error))
    }

    fn fail(&mut self, error: StreamError) -> Step {
        debug!("stream failed: {error}");
        self.state = State::Failed(error.kind());
        Step::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn machine_for(data: &[u8], capacity: usize) -> (RecordMachine, RefillBuffer<Cursor<Vec<u8>>>) {
        (
            RecordMachine::new(),
            RefillBuffer::with_capacity(capacity, Cursor::new(data.to_vec())),
        )
    }

    #[test]
    fn test_fasta_records() {
        let (mut machine, mut input) = machine_for(b">seq1 desc\nACGT\nTG\n>seq2\nCA\n", 4);
        let mut batch = RecordBatch::new(64, 8);

        assert!(matches!(machine.step(&mut input, &mut batch), Step::RecordClosed));
        assert_eq!(machine.last_kind(), Some(RecordKind::Fasta));
        assert!(matches!(machine.step(&mut input, &mut batch), Step::RecordClosed));
        assert!(machine.is_at_end());
        assert!(matches!(machine.step(&mut input, &mut batch), Step::Finished));

        assert_eq!(batch.seq(), b"ACGTTGCA");
        assert_eq!(batch.record_ends(), &[6, 8]);
        assert_eq!(machine.records_read(), 2);
    }

    #[test]
    fn test_fastq_record_with_at_in_quality() {
        let data = b"@r1\nACGT\n+r1\n@III\n@r2\nGG\n+\n@@\n";
        let (mut machine, mut input) = machine_for(data, 3);
        let mut batch = RecordBatch::new(64, 8);

        assert!(matches!(machine.step(&mut input, &mut batch), Step::RecordClosed));
        assert_eq!(machine.last_kind(), Some(RecordKind::Fastq));
        assert!(matches!(machine.step(&mut input, &mut batch), Step::RecordClosed));
        assert!(matches!(machine.step(&mut input, &mut batch), Step::Finished));

        assert_eq!(batch.seq(), b"ACGTGG");
        assert_eq!(batch.record_ends(), &[4, 6]);
    }

    #[test]
    fn test_suspend_mid_line_and_resume() {
        let (mut machine, mut input) = machine_for(b">a\nACGTACGT\n>b\nTT\n", 16);
        let mut batch = RecordBatch::new(5, 8);

        assert!(matches!(machine.step(&mut input, &mut batch), Step::Suspended));
        assert_eq!(batch.seq(), b"ACGTA");
        assert!(batch.record_ends().is_empty());

        batch.clear();
        assert!(matches!(machine.step(&mut input, &mut batch), Step::RecordClosed));
        assert_eq!(batch.seq(), b"CGT");
        assert_eq!(batch.record_ends(), &[3]);
    }

    #[test]
    fn test_full_batch_still_closes_finished_record() {
        let (mut machine, mut input) = machine_for(b">a\nACGT\n\n>b\nTT\n", 16);
        let mut batch = RecordBatch::new(4, 8);

        assert!(matches!(machine.step(&mut input, &mut batch), Step::RecordClosed));
        assert_eq!(batch.seq(), b"ACGT");
        assert_eq!(batch.record_ends(), &[4]);
    }

    #[test]
    fn test_empty_sequences() {
        let (mut machine, mut input) = machine_for(b">a\n>b\nAC\n>c", 2);
        let mut batch = RecordBatch::new(64, 8);

        while let Step::RecordClosed = machine.step(&mut input, &mut batch) {}

        assert_eq!(batch.seq(), b"AC");
        assert_eq!(batch.record_ends(), &[0, 2, 2]);
    }

    #[test]
    fn test_empty_fastq_record() {
        let (mut machine, mut input) = machine_for(b"@a\n\n+\n\n@b\nAC\n+\nII\n", 4);
        let mut batch = RecordBatch::new(64, 8);

        while let Step::RecordClosed = machine.step(&mut input, &mut batch) {}

        assert!(machine.is_at_end());
        assert_eq!(batch.record_ends(), &[0, 2]);
    }

    #[test]
    fn test_empty_sequence_with_quality_fails() {
        let (mut machine, mut input) = machine_for(b"@a\n\n+\n@I\n@b\nAC\n+\nII\n", 4);
        let mut batch = RecordBatch::new(64, 8);

        assert!(matches!(
            machine.step(&mut input, &mut batch),
            Step::Failed(StreamError::TruncatedQuality { expected: 0, found: 2 })
        ));
        assert_eq!(batch.record_ends(), &[0]);
        assert_eq!(machine.failure(), Some(FailureKind::TruncatedQuality));
        assert!(matches!(machine.step(&mut input, &mut batch), Step::Finished));
    }

    #[test]
    fn test_full_batch_closes_on_crlf_like_lf() {
        for data in [&b">a\nACGT\n>b\nGG\n"[..], &b">a\r\nACGT\r\n>b\r\nGG\r\n"[..]] {
            for capacity in 1..8 {
                let (mut machine, mut input) = machine_for(data, capacity);
                let mut batch = RecordBatch::new(4, 8);

                assert!(matches!(machine.step(&mut input, &mut batch), Step::RecordClosed));
                assert_eq!(batch.seq(), b"ACGT");
                assert_eq!(batch.record_ends(), &[4]);
            }
        }
    }

    #[test]
    fn test_missing_quality_fails() {
        let (mut machine, mut input) = machine_for(b"@a\nACGT\n+\n", 4);
        let mut batch = RecordBatch::new(64, 8);

        let step = machine.step(&mut input, &mut batch);
        assert!(matches!(
            step,
            Step::Failed(StreamError::TruncatedQuality { expected: 4, found: 0 })
        ));
        assert_eq!(machine.failure(), Some(FailureKind::TruncatedQuality));
        assert!(matches!(machine.step(&mut input, &mut batch), Step::Finished));
    }

    #[test]
    fn test_short_quality_fails() {
        let (mut machine, mut input) = machine_for(b"@a\nACGT\n+\nII\n", 4);
        let mut batch = RecordBatch::new(64, 8);

        assert!(matches!(
            machine.step(&mut input, &mut batch),
            Step::Failed(StreamError::TruncatedQuality { expected: 4, found: 2 })
        ));
    }

    #[test]
    fn test_long_quality_fails() {
        let (mut machine, mut input) = machine_for(b"@a\nACGT\n+\nIIIIII\n@b\nA\n+\nI\n", 4);
        let mut batch = RecordBatch::new(64, 8);

        assert!(matches!(
            machine.step(&mut input, &mut batch),
            Step::Failed(StreamError::TruncatedQuality { expected: 4, found: 6 })
        ));
    }

    #[test]
    fn test_multiline_quality() {
        let (mut machine, mut input) = machine_for(b"@a\nACG\nTA\n+\r\nIII\r\nII\r\n", 2);
        let mut batch = RecordBatch::new(64, 8);

        assert!(matches!(machine.step(&mut input, &mut batch), Step::RecordClosed));
        assert!(matches!(machine.step(&mut input, &mut batch), Step::Finished));
        assert_eq!(batch.seq(), b"ACGTA");
        assert!(machine.is_at_end());
    }

    #[test]
    fn test_leading_junk_is_skipped() {
        let (mut machine, mut input) = machine_for(b"\n\nnot a header\n>a\nAC\n", 4);
        let mut batch = RecordBatch::new(64, 8);

        assert!(matches!(machine.step(&mut input, &mut batch), Step::RecordClosed));
        assert_eq!(batch.seq(), b"AC");
    }

    #[test]
    fn test_empty_input() {
        let (mut machine, mut input) = machine_for(b"", 4);
        let mut batch = RecordBatch::new(64, 8);

        assert!(matches!(machine.step(&mut input, &mut batch), Step::Finished));
        assert!(machine.is_at_end());
        assert!(batch.is_empty());
    }
}
