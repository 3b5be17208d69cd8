//! Error type for the chat engine.

use thiserror::Error;

/// An error from the chat server or client.
///
/// Peer disconnects are not errors (they are ordinary lifecycle), so
/// everything here is fatal to the component that returns it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A socket or terminal operation failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The server hostname did not resolve to any address.
    #[error("couldn't resolve {0}")]
    NoAddress(String),
}
