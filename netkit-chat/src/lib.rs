//! A line-framed group chat over TCP.
//!
//! The server fans every accepted message out to every connected peer
//! and replays the whole history to newcomers; the client bridges a
//! terminal to the server socket. Messages travel as four
//! newline-terminated fields (text length, author, timestamp, text),
//! decoded with the buffered reads from `netkit-bytes`.
//!
//! Authorship is declarative and timestamps are assigned by the
//! server: whatever a client claims, the server overwrites the
//! timestamp with its own receipt time before fanning out.

#![warn(missing_docs)]
#![deny(unreachable_pub)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::unwrap_used)]

mod client;
mod err;
mod msg;
mod server;

pub use client::ChatClient;
pub use err::Error;
pub use msg::{read_message, Message};
pub use server::ChatServer;

/// A Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
