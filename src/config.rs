use crate::batch::RecordBatch;

/// Default refill-buffer capacity and batch `max_chars`.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Default batch `max_reads`.
pub const DEFAULT_MAX_READS: usize = DEFAULT_BUFFER_SIZE / 100;

/// Construction parameters for a [`SeqStream`](crate::SeqStream).
///
/// Zero values are clamped to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    buffer_capacity: usize,
    max_chars: usize,
    max_reads: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_SIZE,
            max_chars: DEFAULT_BUFFER_SIZE,
            max_reads: DEFAULT_MAX_READS,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    pub fn with_max_reads(mut self, max_reads: usize) -> Self {
        self.max_reads = max_reads.max(1);
        self
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn max_reads(&self) -> usize {
        self.max_reads
    }

    /// Creates an empty batch bounded by this config's limits.
    pub fn batch(&self) -> RecordBatch {
        RecordBatch::new(self.max_chars, self.max_reads)
    }
}
