//! A buffered reader with length- and delimiter-based reads.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// How many bytes we ask the source for at a time.
const BUF_SIZE: usize = 256;

/// A buffered wrapper for comfortable framed reads from a byte source.
///
/// The source may hand back any nonempty prefix of what was asked for
/// (sockets do), and signals EOF by returning zero bytes. On top of
/// that, this type offers reads of an exact byte count and reads up to
/// a delimiter, both of which may span many underlying reads.
///
/// Every byte from the source is returned exactly once, in order.
pub struct BufferedReader<R> {
    /// The wrapped source.
    src: R,
    /// Bytes read from the source but not yet handed out.
    buf: Vec<u8>,
    /// Offset of the first unconsumed byte in `buf`.
    start: usize,
}

impl<R: AsyncRead + Unpin> BufferedReader<R> {
    /// Wrap `src` in a new, empty BufferedReader.
    pub fn new(src: R) -> Self {
        BufferedReader {
            src,
            buf: Vec::with_capacity(BUF_SIZE),
            start: 0,
        }
    }

    /// Return true if buffered bytes remain from an earlier read.
    ///
    /// Callers multiplexing many sources use this to drain pipelined
    /// input before going back to waiting for readiness.
    pub fn has_buffered(&self) -> bool {
        self.start < self.buf.len()
    }

    /// Unwrap this reader. Any buffered bytes are dropped.
    pub fn into_inner(self) -> R {
        self.src
    }

    /// Read exactly `n` bytes.
    ///
    /// Returns fewer than `n` bytes only if the source reaches EOF
    /// first, in which case everything up to the EOF is returned.
    pub async fn read_n(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        loop {
            let avail = &self.buf[self.start..];
            let to_copy = avail.len().min(n - out.len());
            out.extend_from_slice(&avail[..to_copy]);
            self.start += to_copy;
            if out.len() == n {
                return Ok(out);
            }
            self.refill().await?;
            if self.buf.is_empty() {
                // EOF: give back what we have.
                return Ok(out);
            }
        }
    }

    /// Read bytes up to, but not including, the first `delim`.
    ///
    /// The delimiter itself is consumed and discarded. If the source
    /// reaches EOF before a delimiter appears, the residual bytes are
    /// returned as-is (possibly none).
    pub async fn read_until(&mut self, delim: u8) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            match self.buf[self.start..].iter().position(|b| *b == delim) {
                Some(i) => {
                    out.extend_from_slice(&self.buf[self.start..self.start + i]);
                    self.start += i + 1;
                    return Ok(out);
                }
                None => {
                    out.extend_from_slice(&self.buf[self.start..]);
                    self.start = self.buf.len();
                    self.refill().await?;
                    if self.buf.is_empty() {
                        return Ok(out);
                    }
                }
            }
        }
    }

    /// Replace the buffer contents with one read from the source.
    ///
    /// An empty buffer afterwards means EOF. Only call this when the
    /// buffer is fully consumed.
    async fn refill(&mut self) -> io::Result<()> {
        debug_assert!(!self.has_buffered());
        self.start = 0;
        self.buf.resize(BUF_SIZE, 0);
        let n = self.src.read(&mut self.buf[..]).await?;
        self.buf.truncate(n);
        Ok(())
    }
}
