//! Error types for the TFTP engine.

use thiserror::Error;

use crate::packet::{ErrorCode, Opcode};

/// A datagram that could not be decoded as a TFTP packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The datagram ended before the packet was complete, or a
    /// zero-terminated string was missing its terminator.
    #[error("Packet is too short")]
    Truncated,
    /// The opcode is not one of the five RFC 1350 operations.
    #[error("Unknown opcode {0}")]
    UnknownOpcode(Opcode),
    /// A request named a transfer mode other than netascii or octet.
    #[error("Unknown transfer mode {0:?}")]
    BadMode(String),
    /// Anything else structurally wrong with the packet.
    #[error("Malformed packet: {0}")]
    BadMessage(&'static str),
}

impl ParseError {
    /// The wire error code to use when answering this datagram.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ParseError::UnknownOpcode(_) => ErrorCode::ILLEGAL_OPERATION,
            _ => ErrorCode::UNDEFINED,
        }
    }
}

impl From<netkit_bytes::Error> for ParseError {
    fn from(e: netkit_bytes::Error) -> ParseError {
        match e {
            netkit_bytes::Error::Truncated => ParseError::Truncated,
            netkit_bytes::Error::ExtraneousBytes => ParseError::BadMessage("extra bytes"),
            netkit_bytes::Error::BadMessage(m) => ParseError::BadMessage(m),
            _ => ParseError::BadMessage("unrecognized decoding problem"),
        }
    }
}

/// An error from running a transfer.
///
/// The `Server`/`Client` prefixes on the ERROR-packet variants name
/// which side *authored* the packet: [`Error::Server`] wraps an ERROR
/// the peer sent us, [`Error::Client`] one we sent the peer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A socket or file operation failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer did not answer within the configured timeout.
    #[error("Timeout")]
    Timeout,

    /// The peer sent a datagram that does not decode as TFTP.
    #[error("Illegal answer from server")]
    IllegalAnswer,

    /// The transfer ended with an ERROR packet from the peer.
    #[error("Server: {0}")]
    Server(String),

    /// The transfer ended with an ERROR packet of our own making.
    #[error("Client: {0}")]
    Client(String),

    /// The server hostname did not resolve to any address.
    #[error("couldn't resolve {0}")]
    NoAddress(String),
}
