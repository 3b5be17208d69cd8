//! The Writer trait for building wire objects in memory.

use crate::Writeable;

/// A byte-oriented sink for building small protocol messages.
///
/// Unlike `std::io::Write`, methods on this trait cannot fail: it is
/// for assembling bytes in memory, not for I/O. `Vec<u8>` implements
/// it, and that is the implementation the rest of the workspace uses.
///
/// # Example
///
/// ```
/// use netkit_bytes::Writer;
/// let mut w: Vec<u8> = Vec::new();
/// w.write_u16(4);
/// w.write_all(b"ok");
/// w.write_u8(0);
/// assert_eq!(w, &[0x00, 0x04, b'o', b'k', 0x00]);
/// ```
pub trait Writer {
    /// Append a slice to the end of this writer.
    fn write_all(&mut self, b: &[u8]);

    /// Append a single u8 to this writer.
    fn write_u8(&mut self, x: u8) {
        self.write_all(&[x])
    }
    /// Append a u16 to this writer, in network (big-endian) byte order.
    fn write_u16(&mut self, x: u16) {
        self.write_all(&x.to_be_bytes())
    }
    /// Append a u32 to this writer, in network (big-endian) byte order.
    fn write_u32(&mut self, x: u32) {
        self.write_all(&x.to_be_bytes())
    }
    /// Append `n` zero bytes to this writer.
    fn write_zeros(&mut self, n: usize) {
        let v = vec![0_u8; n];
        self.write_all(&v[..])
    }
    /// Encode a [`Writeable`] object onto this writer.
    fn write<E: Writeable + ?Sized>(&mut self, e: &E) {
        e.write_onto(self)
    }
}
