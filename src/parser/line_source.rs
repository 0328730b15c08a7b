//! Line sources feeding the scanner
//!
//! The scanner consumes input one physical line at a time through the
//! [`LineSource`] trait, so it stays unaware of whether bytes come from an
//! open stream or a fixed in-memory buffer.

use std::io::{self, BufRead};

/// A source of successive physical lines.
///
/// Each call fills `line` with the next line, without its terminator, and
/// returns `Ok(false)` once the source is exhausted. A physical line longer
/// than `max_len - 1` bytes is truncated to that length and the excess up
/// to the newline is discarded; truncation is a documented policy, not an
/// error. A trailing carriage return is dropped and non-UTF-8 bytes are
/// replaced lossily.
pub trait LineSource {
    fn next_line(&mut self, line: &mut String, max_len: usize) -> io::Result<bool>;
}

/// Stream-backed line source over any buffered reader.
pub struct StreamSource<R> {
    inner: R,
}

impl<R: BufRead> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: BufRead> LineSource for StreamSource<R> {
    fn next_line(&mut self, line: &mut String, max_len: usize) -> io::Result<bool> {
        line.clear();
        let cap = max_len.saturating_sub(1);
        let mut raw = Vec::with_capacity(cap.min(128));
        let mut seen_any = false;

        loop {
            let (done, used) = {
                let available = self.inner.fill_buf()?;
                if available.is_empty() {
                    (true, 0)
                } else {
                    seen_any = true;
                    match available.iter().position(|&b| b == b'\n') {
                        Some(at) => {
                            push_capped(&mut raw, &available[..at], cap);
                            (true, at + 1)
                        }
                        None => {
                            push_capped(&mut raw, available, cap);
                            (false, available.len())
                        }
                    }
                }
            };
            self.inner.consume(used);
            if done {
                break;
            }
        }

        if !seen_any {
            return Ok(false);
        }
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        line.push_str(&String::from_utf8_lossy(&raw));
        Ok(true)
    }
}

fn push_capped(dst: &mut Vec<u8>, src: &[u8], cap: usize) {
    let room = cap.saturating_sub(dst.len());
    dst.extend_from_slice(&src[..src.len().min(room)]);
}

/// Buffer-backed line source over an explicit-length byte slice.
///
/// No NUL termination is assumed; the source is exhausted exactly when the
/// remaining byte count reaches zero.
pub struct BufferSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufferSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl LineSource for BufferSource<'_> {
    fn next_line(&mut self, line: &mut String, max_len: usize) -> io::Result<bool> {
        line.clear();
        if self.pos >= self.data.len() {
            return Ok(false);
        }

        let rest = &self.data[self.pos..];
        let (mut raw, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(at) => (&rest[..at], at + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;

        let cap = max_len.saturating_sub(1);
        if raw.len() > cap {
            raw = &raw[..cap];
        }
        if raw.last() == Some(&b'\r') {
            raw = &raw[..raw.len() - 1];
        }
        line.push_str(&String::from_utf8_lossy(raw));
        Ok(true)
    }
}
