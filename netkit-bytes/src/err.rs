//! Error type for in-memory decoding.

use thiserror::Error;

/// Error returned when decoding an object from bytes fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The input ended before the object was complete.
    #[error("object truncated (or not fully present)")]
    Truncated,
    /// The object was complete, but bytes were left over.
    #[error("extra bytes at end of object")]
    ExtraneousBytes,
    /// The bytes were present but did not form a valid object.
    #[error("bad object: {0}")]
    BadMessage(&'static str),
}
