//! Buffered streaming decoder for FASTA/FASTQ files that fills caller-owned,
//! size-bounded batches of sequence bytes and record boundaries.
//!
//! ```
//! use kseq_batch::{SeqStream, StreamConfig};
//!
//! let data = b">seq1\nACGT\nAC\n>seq2\nGG\n";
//! let mut stream = SeqStream::from_reader(&data[..], StreamConfig::default());
//! let mut batch = stream.batch();
//!
//! while stream.fill(&mut batch) {
//!     assert_eq!(batch.seq(), b"ACGTACGG");
//!     assert_eq!(batch.record_ends(), &[6, 8]);
//!     batch.clear();
//! }
//! assert!(!stream.has_failed());
//! ```

mod batch;
mod buffer;
mod config;
mod error;
mod machine;
mod source;
mod stream;

#[cfg(test)]
mod test_util;

pub use batch::{Fragment, Fragments, RecordBatch};
pub use config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_READS, StreamConfig};
pub use error::{FailureKind, StreamError};
pub use machine::RecordKind;
pub use source::{open_source, sniff_source};
pub use stream::SeqStream;
