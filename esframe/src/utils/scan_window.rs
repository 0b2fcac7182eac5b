//! Fixed-capacity read window over a byte source.
//!
//! The window is the only place the extractors touch the backing source.
//! Scanners report how far they got with [`ScanWindow::consume`]; bytes not
//! consumed stay buffered and are presented again, moved to the front of the
//! window, by the next [`ScanWindow::fill`]. The source itself is only ever
//! read forward, and each stream byte is read from it once.

use std::io::{self, Read};

use log::trace;

/// A byte source read in chunks.
///
/// Every `Read` type is a `ByteSource`, which covers files, `BufReader<File>`,
/// stdin and in-memory `Cursor`s.
pub trait ByteSource {
    /// Reads until `buf` is full or the source is exhausted, returning the
    /// number of bytes read.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: Read> ByteSource for T {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }
}

#[derive(Debug)]
pub struct ScanWindow {
    buffer: Vec<u8>,
    len: usize,
    pos: usize,
    /// Stream offset of `buffer[0]`.
    base: u64,
    exhausted: bool,
}

impl ScanWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            len: 0,
            pos: 0,
            base: 0,
            exhausted: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Moves the unconsumed bytes to the front of the window and tops it up
    /// from `source`.
    ///
    /// Returns the number of bytes newly read. A read coming back short of
    /// the free space marks the window final.
    pub fn fill<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> io::Result<usize> {
        let kept = self.len - self.pos;
        if self.pos > 0 {
            self.buffer.copy_within(self.pos..self.len, 0);
            self.base += self.pos as u64;
            self.pos = 0;
        }

        let free = self.buffer.len() - kept;
        let read = source.read_chunk(&mut self.buffer[kept..])?;
        self.len = kept + read;
        self.exhausted = read < free;

        trace!(
            "window filled with {} new bytes, {} kept, at offset {}",
            read, kept, self.base
        );

        Ok(read)
    }

    /// Marks the first `n` unconsumed bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len - self.pos);
        self.pos = (self.pos + n).min(self.len);
    }

    /// Stream offset of the first unconsumed byte.
    pub fn start_offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Stream offset one past the last buffered byte; the source position.
    pub fn end_offset(&self) -> u64 {
        self.base + self.len as u64
    }

    /// Whether the source is exhausted, i.e. the buffered bytes are all that
    /// is left of the stream.
    pub fn is_final(&self) -> bool {
        self.exhausted
    }

    /// Buffered bytes not yet consumed.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[self.pos..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.len
    }
}
