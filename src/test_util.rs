use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;

/// Hands out at most `step` bytes per read.
pub struct Trickle {
    data: Vec<u8>,
    pos: usize,
    step: usize,
}

impl Trickle {
    pub fn new(data: Vec<u8>, step: usize) -> Self {
        Self { data, pos: 0, step }
    }
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Yields its data, then fails every read.
pub struct FailingReader {
    data: Vec<u8>,
    pos: usize,
    failed_reads: Rc<Cell<usize>>,
}

impl FailingReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            failed_reads: Rc::new(Cell::new(0)),
        }
    }

    /// Counter of reads that returned an error, shared with the reader.
    pub fn failed_reads(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.failed_reads)
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.data.len() {
            self.failed_reads.set(self.failed_reads.get() + 1);
            return Err(io::Error::other("device unplugged"));
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
