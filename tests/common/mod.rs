use std::io::Read;

use kseq_batch::{RecordBatch, SeqStream};

/// Drains `stream` batch by batch and stitches the fragments back into
/// whole records. Checks the batch limits on every fill.
pub fn reassemble<R: Read>(
    stream: &mut SeqStream<R>,
    max_chars: usize,
    max_reads: usize,
) -> Vec<Vec<u8>> {
    let mut batch = RecordBatch::new(max_chars, max_reads);
    let mut records = vec![Vec::new()];

    while stream.fill(&mut batch) {
        assert!(batch.seq().len() <= max_chars.max(1));
        assert!(batch.record_ends().len() <= max_reads.max(1));
        assert!(batch.record_ends().windows(2).all(|w| w[0] <= w[1]));
        assert!(batch.record_ends().iter().all(|&end| end <= batch.seq().len()));

        for fragment in batch.fragments() {
            records.last_mut().unwrap().extend_from_slice(fragment.bytes);
            if fragment.closed {
                records.push(Vec::new());
            }
        }
        batch.clear();
    }

    let open = records.pop().unwrap();
    assert!(open.is_empty(), "record left open after the last fill");
    records
}
