use std::io::{self, BufRead, BufReader, ErrorKind, Read};

use memchr::memchr2;

/// Byte classes [`RefillBuffer::scan_until`] can stop at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delimiter {
    /// `' '`, `\t`, `\n`, `\v`, `\f`, `\r`.
    Whitespace,
    /// `\n`; a `\r` directly before it is dropped.
    LineEnd,
}

/// Result of one [`RefillBuffer::scan_until`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Scan {
    /// Bytes copied (or skipped, without a sink).
    pub len: usize,
    /// The delimiter that stopped the scan. It is left unconsumed.
    pub terminator: Option<u8>,
    pub hit_limit: bool,
}

enum Outcome {
    Continue,
    Delimited(u8),
    CarriageReturnAtEnd,
}

/// Fixed-capacity window over a byte source with lookahead.
///
/// The window is refilled only once it is exhausted. End of input and read
/// failures are latched: after either, no further reads are attempted.
pub(crate) struct RefillBuffer<R> {
    reader: Option<BufReader<R>>,
    /// A `\r` taken off the end of a window that turned out not to start a
    /// `\r\n`. It is the next byte of input.
    pending_cr: bool,
    at_eof: bool,
    error: Option<io::Error>,
    errored: bool,
}

#[inline]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

impl<R> RefillBuffer<R> {
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Drops the source. Further reads report end of input.
    pub fn close(&mut self) {
        self.reader = None;
    }
}

impl<R: Read> RefillBuffer<R> {
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            reader: Some(BufReader::with_capacity(capacity.max(1), reader)),
            pending_cr: false,
            at_eof: false,
            error: None,
            errored: false,
        }
    }

    pub fn is_at_eof(&self) -> bool {
        self.at_eof
    }

    pub fn has_error(&self) -> bool {
        self.errored
    }

    /// Hands out the recorded read failure once; `has_error` stays set.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Makes sure the window holds at least one byte. Returns `false` at end
    /// of input, after a failure or once closed.
    fn fill(&mut self) -> bool {
        if self.at_eof || self.errored {
            return false;
        }
        let Some(reader) = self.reader.as_mut() else {
            return false;
        };

        loop {
            match reader.fill_buf() {
                Ok(buf) if buf.is_empty() => {
                    self.at_eof = true;
                    return false;
                }
                Ok(_) => return true,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.error = Some(e);
                    self.errored = true;
                    return false;
                }
            }
        }
    }

    fn window(&mut self) -> Option<&[u8]> {
        if !self.fill() {
            return None;
        }
        self.reader.as_ref().map(|r| r.buffer())
    }

    fn consume(&mut self, amt: usize) {
        if let Some(reader) = self.reader.as_mut() {
            reader.consume(amt);
        }
    }

    /// Returns the next byte without consuming it.
    pub fn peek(&mut self) -> Option<u8> {
        if self.pending_cr {
            return Some(b'\r');
        }
        self.window().and_then(|w| w.first().copied())
    }

    pub fn next_byte(&mut self) -> Option<u8> {
        if self.pending_cr {
            self.pending_cr = false;
            return Some(b'\r');
        }
        let byte = self.peek()?;
        self.consume(1);
        Some(byte)
    }

    /// Consumes a `\n` or `\r\n` if one is next, also when the pair
    /// straddles a refill. Returns whether a line end was consumed.
    pub fn skip_line_end(&mut self) -> bool {
        if self.pending_cr {
            return false;
        }
        let Some(window) = self.window() else {
            return false;
        };
        match window {
            [b'\n', ..] => {
                self.consume(1);
                true
            }
            [b'\r', b'\n', ..] => {
                self.consume(2);
                true
            }
            [b'\r'] => {
                self.consume(1);
                if self.peek() == Some(b'\n') {
                    self.consume(1);
                    true
                } else {
                    self.pending_cr = true;
                    false
                }
            }
            _ => false,
        }
    }

    /// Copies bytes into `sink` until a `delimiter` byte is next, input ends
    /// or `max_len` bytes were taken.
    ///
    /// Runs are located with `memchr` over the current window and copied in
    /// one go; the delimiter check is redone on every refilled window. For
    /// [`Delimiter::LineEnd`] a `\r` immediately followed by `\n` is dropped,
    /// even when the pair straddles a refill, while any other `\r` is data.
    pub fn scan_until(
        &mut self,
        delimiter: Delimiter,
        mut sink: Option<&mut Vec<u8>>,
        max_len: usize,
    ) -> Scan {
        let mut scan = Scan::default();

        loop {
            if scan.len >= max_len {
                scan.hit_limit = true;
                return scan;
            }
            let remaining = max_len - scan.len;

            if self.pending_cr {
                if delimiter == Delimiter::Whitespace {
                    scan.terminator = Some(b'\r');
                    return scan;
                }
                self.pending_cr = false;
                if let Some(sink) = sink.as_deref_mut() {
                    sink.push(b'\r');
                }
                scan.len += 1;
                continue;
            }

            let Some(window) = self.window() else {
                return scan;
            };
            let chunk = &window[..remaining.min(window.len())];

            let found = match delimiter {
                Delimiter::Whitespace => chunk.iter().position(|&b| is_space(b)),
                Delimiter::LineEnd => memchr2(b'\n', b'\r', chunk),
            };

            let (copied, consumed, outcome) = match found {
                None => (chunk.len(), chunk.len(), Outcome::Continue),
                Some(pos) if delimiter == Delimiter::LineEnd && chunk[pos] == b'\r' => {
                    match window.get(pos + 1) {
                        Some(b'\n') => (pos, pos + 1, Outcome::Delimited(b'\n')),
                        Some(_) => (pos + 1, pos + 1, Outcome::Continue),
                        None => (pos, pos + 1, Outcome::CarriageReturnAtEnd),
                    }
                }
                Some(pos) => (pos, pos, Outcome::Delimited(chunk[pos])),
            };

            if let Some(sink) = sink.as_deref_mut() {
                sink.extend_from_slice(&window[..copied]);
            }
            self.consume(consumed);
            scan.len += copied;

            match outcome {
                Outcome::Continue => {}
                Outcome::Delimited(byte) => {
                    scan.terminator = Some(byte);
                    return scan;
                }
                Outcome::CarriageReturnAtEnd => {
                    if self.peek() == Some(b'\n') {
                        scan.terminator = Some(b'\n');
                        return scan;
                    }
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.push(b'\r');
                    }
                    scan.len += 1;
                }
            }
        }
    }

    /// Skips past the next `\n`, or to end of input.
    pub fn skip_line(&mut self) {
        let scan = self.scan_until(Delimiter::LineEnd, None, usize::MAX);
        if scan.terminator.is_some() {
            self.next_byte();
        }
    }
}
