//! Incremental HTTP/1.1 parsing and serialization.
//!
//! This crate implements the subset of HTTP/1.1 that a caching forward
//! proxy needs: a message model that preserves header order and
//! duplicates, byte-at-a-time request and response parsers that can be
//! fed straight from a socket read loop, chunked-transfer reassembly on
//! responses, and a serializer whose output reparses to the same
//! message.
//!
//! The parsers are deliberately total: malformed input never produces
//! an error, it just never completes. A proxy treats a parser that
//! stays in [`ParseStatus::Await`] the same way it treats a peer that
//! stops sending: it times out or disconnects. See
//! [`RequestParser`] and [`ResponseParser`].
//!
//! Header *values* are split into tokens on runs of spaces and commas
//! by [`split_value`]. That is the right thing for the lists this
//! proxy inspects (`Cache-Control`, `Accept-Encoding`,
//! `Transfer-Encoding`, `Content-Encoding`) and knowingly wrong for
//! quoted values containing spaces.

#![warn(missing_docs)]
#![deny(unreachable_pub)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::unwrap_used)]

mod msg;
mod parse;

pub use msg::{split_value, Header, Headers, Request, RequestLine, Response, StatusLine};
pub use parse::{ParseStatus, RequestParser, ResponseParser};
