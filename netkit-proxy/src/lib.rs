//! A caching HTTP/1.1 forward proxy.
//!
//! The proxy accepts client connections, parses each request with the
//! incremental parsers from `netkit-httpproto`, answers from a
//! URL-keyed TTL cache when it can, and otherwise forwards the request
//! upstream, parses the reply (dechunking if needed), caches it when
//! `Cache-Control` allows, and writes it back, gzip-compressed on the
//! way out when the client advertised support.
//!
//! One [`ProxyServer`] owns the listening socket and the cache; each
//! accepted connection becomes a session that runs its own strictly
//! sequenced read-request, fetch-or-cache, write-reply state machine
//! and then disappears.

#![warn(missing_docs)]
#![deny(unreachable_pub)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::unwrap_used)]

mod cache;
mod err;
mod gzip;
mod server;
mod session;

pub use cache::Cache;
pub use err::Error;
pub use server::ProxyServer;

/// A Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
