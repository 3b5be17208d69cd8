//! Error type for the proxy.

use thiserror::Error;

/// An error from running the proxy or one of its sessions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A socket operation failed. Fatal for the session it happened
    /// in; fatal for the server only at bind time.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The request target's host did not resolve to any address.
    #[error("couldn't resolve {0}")]
    NoAddress(String),

    /// Internal programming error.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Error {
        Error::Internal("cache lock poisoned")
    }
}
