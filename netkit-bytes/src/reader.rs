//! The Reader type for picking apart wire objects in memory.

use crate::{Error, Readable, Result};
use arrayref::array_ref;

/// A cursor for decoding messages from a slice of bytes.
///
/// Compared to `std::io::Read` this has a far simpler error story:
/// the only things that can go wrong are running out of bytes or
/// finding bytes that don't parse, and both are reported through
/// [`Error`].
///
/// # Example
///
/// ```
/// use netkit_bytes::{Reader, Result};
/// let msg = [0x00, 0x03, 0x00, 0x01, b'h', b'i'];
/// let mut r = Reader::from_slice(&msg[..]);
/// assert_eq!(r.take_u16()?, 3); // multi-byte values are big-endian
/// assert_eq!(r.take_u16()?, 1);
/// assert_eq!(r.take(2)?, b"hi");
/// r.should_be_exhausted()?;
/// # Result::Ok(())
/// ```
pub struct Reader<'a> {
    /// The underlying slice being read.
    b: &'a [u8],
    /// Offset of the next unread byte.
    off: usize,
}

impl<'a> Reader<'a> {
    /// Construct a new Reader over a slice of bytes.
    pub fn from_slice(slice: &'a [u8]) -> Self {
        Reader { b: slice, off: 0 }
    }
    /// Return the number of bytes that have not been read yet.
    pub fn remaining(&self) -> usize {
        self.b.len() - self.off
    }
    /// Return the number of bytes read so far.
    pub fn consumed(&self) -> usize {
        self.off
    }
    /// Consume this reader, returning the bytes it did not read.
    pub fn into_rest(self) -> &'a [u8] {
        &self.b[self.off..]
    }
    /// Skip `n` bytes; `Error::Truncated` if fewer remain.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::Truncated);
        }
        self.off += n;
        Ok(())
    }
    /// Succeed iff every byte of the input has been consumed.
    pub fn should_be_exhausted(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::ExtraneousBytes);
        }
        Ok(())
    }
    /// Borrow the next `n` bytes without consuming them.
    pub fn peek(&self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated);
        }
        Ok(&self.b[self.off..(self.off + n)])
    }
    /// Consume and return the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let b = self.peek(n)?;
        self.advance(n)?;
        Ok(b)
    }
    /// Consume and return one byte.
    pub fn take_u8(&mut self) -> Result<u8> {
        let b = self.take(1)?;
        Ok(b[0])
    }
    /// Consume and return a big-endian u16.
    pub fn take_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes(*array_ref![b, 0, 2]))
    }
    /// Consume and return a big-endian u32.
    pub fn take_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes(*array_ref![b, 0, 4]))
    }
    /// Consume bytes up to the first occurrence of `term`, returning
    /// them without the terminator. The terminator itself is consumed.
    ///
    /// Gives `Error::Truncated` when `term` never appears; in that
    /// case nothing is consumed.
    pub fn take_until(&mut self, term: u8) -> Result<&'a [u8]> {
        let pos = self.b[self.off..]
            .iter()
            .position(|b| *b == term)
            .ok_or(Error::Truncated)?;
        let result = self.take(pos)?;
        self.advance(1)?;
        Ok(result)
    }
    /// Decode one `E` from this reader via its [`Readable`] impl.
    ///
    /// On failure, consumes nothing.
    pub fn extract<E: Readable>(&mut self) -> Result<E> {
        let off_orig = self.off;
        let result = E::take_from(self);
        if result.is_err() {
            self.off = off_orig;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_ok() {
        let bytes = b"\x00\x04\x12\x34\x56\x78netascii\0octet\0";
        let mut r = Reader::from_slice(&bytes[..]);

        assert_eq!(r.consumed(), 0);
        assert_eq!(r.remaining(), 21);

        assert_eq!(r.take_u16().unwrap(), 4);
        assert_eq!(r.take_u32().unwrap(), 0x1234_5678);
        assert_eq!(r.consumed(), 6);

        assert_eq!(r.take_until(0).unwrap(), &b"netascii"[..]);
        assert_eq!(r.peek(5).unwrap(), &b"octet"[..]);
        assert_eq!(r.take_until(0).unwrap(), &b"octet"[..]);
        r.should_be_exhausted().unwrap();
    }

    #[test]
    fn read_missing() {
        let bytes = b"\x01\x02\x03";
        let mut r = Reader::from_slice(&bytes[..]);

        assert_eq!(r.take_u32(), Err(Error::Truncated));
        // A failed read consumes nothing.
        assert_eq!(r.remaining(), 3);

        assert_eq!(r.take_u16().unwrap(), 0x0102);
        assert_eq!(r.take_u16(), Err(Error::Truncated));
        assert_eq!(r.take_u8().unwrap(), 3);
        assert_eq!(r.take_u8(), Err(Error::Truncated));
    }

    #[test]
    fn advance_and_rest() {
        let mut r = Reader::from_slice(&b"abcdef"[..]);
        assert_eq!(r.advance(7), Err(Error::Truncated));
        r.advance(2).unwrap();
        assert_eq!(r.into_rest(), b"cdef");
    }

    #[test]
    fn take_until_missing_terminator() {
        let mut r = Reader::from_slice(&b"filename.txt"[..]);
        assert_eq!(r.take_until(0), Err(Error::Truncated));
        // Nothing was consumed by the failed search.
        assert_eq!(r.remaining(), 12);
    }

    #[test]
    fn exhaust() {
        let r = Reader::from_slice(&b""[..]);
        assert_eq!(r.should_be_exhausted(), Ok(()));

        let mut r = Reader::from_slice(&b"ok"[..]);
        assert_eq!(r.should_be_exhausted(), Err(Error::ExtraneousBytes));
        r.take(2).unwrap();
        assert_eq!(r.should_be_exhausted(), Ok(()));
    }

    #[test]
    fn extract_rewinds_on_failure() {
        // A length-prefixed string type, for example purposes.
        #[derive(Debug)]
        struct LenEnc(Vec<u8>);
        impl Readable for LenEnc {
            fn take_from(b: &mut Reader<'_>) -> Result<Self> {
                let length = b.take_u8()?;
                Ok(LenEnc(b.take(length as usize)?.into()))
            }
        }

        let bytes = b"\x05hello\x09war";
        let mut r = Reader::from_slice(&bytes[..]);

        let le: LenEnc = r.extract().unwrap();
        assert_eq!(&le.0[..], b"hello");

        let failed: Result<LenEnc> = r.extract();
        assert_eq!(failed.unwrap_err(), Error::Truncated);
        assert_eq!(r.remaining(), 4);
    }
}
