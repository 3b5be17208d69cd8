//! Utilities to decode and encode protocol objects as bytes.
//!
//! Every wire format in this workspace bottoms out here: the TFTP
//! packet codec and the chat framing build their messages through the
//! [`Writer`] trait and pick them apart with a [`Reader`], while the
//! stream-oriented engines read frames off a socket through
//! [`BufferedReader`].
//!
//! [`Reader`] and [`Writer`] work on in-memory buffers only and are
//! meant for messages of at most a few kilobytes. [`BufferedReader`]
//! is the one async type here; it wraps any byte source and offers
//! exact-length and until-delimiter reads.

#![warn(missing_docs)]
#![deny(unreachable_pub)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::unwrap_used)]

mod buffered;
mod err;
mod impls;
mod reader;
mod writer;

pub use buffered::BufferedReader;
pub use err::Error;
pub use reader::Reader;
pub use writer::Writer;

/// Result type returned by this crate's in-memory parsing functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for an object that can be encoded onto a Writer by reference.
pub trait Writeable {
    /// Encode this object onto `b`.
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B);
}

/// Trait for an object that can be extracted from a Reader.
pub trait Readable: Sized {
    /// Try to decode one value of this type from `b`, advancing it.
    fn take_from(b: &mut Reader<'_>) -> Result<Self>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn writer() {
        let mut v: Vec<u8> = Vec::new();
        v.write_u16(0x0102);
        v.write_u8(0x33);
        v.write_all(b"block");
        v.write_zeros(2);
        assert_eq!(&v[..], &b"\x01\x02\x33block\0\0"[..]);
    }
}
