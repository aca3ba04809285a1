use std::io;
use thiserror::Error;

/// Errors recorded by a [`SeqStream`](crate::SeqStream).
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Truncated quality: expected {expected} quality bytes, found {found}")]
    TruncatedQuality { expected: usize, found: usize },
}

impl StreamError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StreamError::Io(_) => FailureKind::Source,
            StreamError::TruncatedQuality { .. } => FailureKind::TruncatedQuality,
        }
    }
}

/// What stopped a stream for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The byte source reported a read failure.
    Source,
    /// A FASTQ quality string ended before, or ran past, its sequence length.
    TruncatedQuality,
}
