use crate::config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_READS};

/// Reusable record buffer filled by [`SeqStream::fill`](crate::SeqStream::fill).
///
/// Holds the concatenated sequence bytes of every record read into it plus the
/// cumulative offset at which each record ends. Bytes after the last offset
/// belong to a record that is still open and continues in the next batch.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    seq: Vec<u8>,
    record_ends: Vec<usize>,
    max_chars: usize,
    max_reads: usize,
}

impl Default for RecordBatch {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE, DEFAULT_MAX_READS)
    }
}

impl PartialEq for RecordBatch {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq && self.record_ends == other.record_ends
    }
}

impl Eq for RecordBatch {}

impl RecordBatch {
    /// Creates an empty batch. Limits of zero are clamped to 1.
    pub fn new(max_chars: usize, max_reads: usize) -> Self {
        let max_chars = max_chars.max(1);
        let max_reads = max_reads.max(1);
        Self {
            seq: Vec::with_capacity(max_chars),
            record_ends: Vec::with_capacity(max_reads),
            max_chars,
            max_reads,
        }
    }

    /// Creates a batch holding already-known content.
    pub fn from_parts(
        seq: impl Into<Vec<u8>>,
        record_ends: Vec<usize>,
        max_chars: usize,
        max_reads: usize,
    ) -> Self {
        let mut batch = Self::new(max_chars, max_reads);
        batch.seq.extend_from_slice(&seq.into());
        batch.record_ends = record_ends;
        batch
    }

    /// Concatenated sequence bytes.
    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    /// Offsets into [`seq`](Self::seq) at which records end.
    pub fn record_ends(&self) -> &[usize] {
        &self.record_ends
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn max_reads(&self) -> usize {
        self.max_reads
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty() && self.record_ends.is_empty()
    }

    /// True once either limit is reached.
    pub fn is_full(&self) -> bool {
        self.seq.len() >= self.max_chars || self.record_ends.len() >= self.max_reads
    }

    pub fn remaining_chars(&self) -> usize {
        self.max_chars.saturating_sub(self.seq.len())
    }

    /// Empties the batch, keeping its allocations.
    pub fn clear(&mut self) {
        self.seq.clear();
        self.record_ends.clear();
    }

    /// Iterates over the record slices of this batch in order.
    pub fn fragments(&self) -> Fragments<'_> {
        Fragments {
            batch: self,
            next_end: 0,
            start: 0,
        }
    }

    pub(crate) fn seq_mut(&mut self) -> &mut Vec<u8> {
        &mut self.seq
    }

    pub(crate) fn close_record(&mut self) {
        self.record_ends.push(self.seq.len());
    }

    /// Combined size used to detect progress across a fill.
    pub(crate) fn progress_mark(&self) -> usize {
        self.seq.len() + self.record_ends.len()
    }
}

/// A piece of one record inside a [`RecordBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    pub bytes: &'a [u8],
    /// `false` for the trailing bytes of a record that continues in the next batch.
    pub closed: bool,
}

/// Iterator returned by [`RecordBatch::fragments`].
pub struct Fragments<'a> {
    batch: &'a RecordBatch,
    next_end: usize,
    start: usize,
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let seq = &self.batch.seq;
        if let Some(&end) = self.batch.record_ends.get(self.next_end) {
            let fragment = Fragment {
                bytes: &seq[self.start..end],
                closed: true,
            };
            self.next_end += 1;
            self.start = end;
            return Some(fragment);
        }

        if self.start < seq.len() {
            let fragment = Fragment {
                bytes: &seq[self.start..],
                closed: false,
            };
            self.start = seq.len();
            return Some(fragment);
        }

        None
    }
}
