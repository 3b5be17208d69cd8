//! A TFTP (RFC 1350) implementation: packet codec, client, and server.
//!
//! TFTP moves files over UDP in lock-step: every 512-byte DATA block
//! must be acknowledged before the next one is sent, and a block
//! shorter than 512 bytes ends the transfer. Each transfer runs
//! between a pair of *transfer IDs* (UDP ports), with the server
//! answering every accepted request from a fresh ephemeral port.
//!
//! The pieces:
//!
//! - [`Packet`]: the five packet kinds and their binary codec,
//!   including NetASCII translation of filenames and error text.
//! - [`Transport`]: a datagram endpoint that encodes, decodes, logs,
//!   and reports each sender's transfer ID.
//! - [`Client`]: lock-step read and write transfers against a server.
//! - [`Server`]: the well-known-port listener that demultiplexes each
//!   accepted request onto its own ephemeral-port transfer.
//!
//! Unlike the lock-step rules, error handling is asymmetric by design:
//! ERROR packets are a courtesy, never retransmitted, and most
//! failures simply end the transfer.

#![warn(missing_docs)]
#![deny(unreachable_pub)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::unwrap_used)]

mod client;
mod err;
mod netascii;
mod packet;
mod server;
mod transport;

pub use client::Client;
pub use err::{Error, ParseError};
pub use netascii::{from_netascii, to_netascii};
pub use packet::{ErrorCode, Mode, Opcode, Packet, MAX_BLOCK_LEN};
pub use server::Server;
pub use transport::{Received, Transport};

/// A Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
