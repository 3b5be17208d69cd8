//! The lock-step client.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::lookup_host;
use tokio::time::timeout;

use crate::packet::{ErrorCode, Mode, Packet, MAX_BLOCK_LEN};
use crate::transport::Transport;
use crate::{Error, Result};

/// How long to wait for each reply unless configured otherwise.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// A TFTP client bound to one server.
///
/// Each [`read`](Client::read) or [`write`](Client::write) call is an
/// independent transfer on a fresh ephemeral port. Transfers run in
/// octet mode. A missed timeout is fatal to the transfer: the client
/// does not retransmit; it reports [`Error::Timeout`] and lets the
/// caller retry the whole file.
pub struct Client {
    host: String,
    port: u16,
    timeout: Duration,
}

impl Client {
    /// A client for the server at `host`:`port` (69 is the well-known
    /// port).
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Client {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Change the per-reply timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Download `filename` into `sink`.
    pub async fn read(&self, filename: &str, sink: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
        let transport = Transport::open(None).await?;
        let server = self.resolve().await?;
        transport
            .send(
                server,
                &Packet::Rrq {
                    filename: filename.to_string(),
                    mode: Mode::Octet,
                },
            )
            .await?;

        let mut peer: Option<SocketAddr> = None;
        let mut expected: u16 = 1;
        loop {
            let (from, packet) = match self.next_packet(&transport, &mut peer).await? {
                Some(answer) => answer,
                // A datagram from some other TID; keep waiting.
                None => continue,
            };
            match packet {
                Packet::Error { message, .. } => return Err(Error::Server(message)),
                Packet::Data { block, payload } => {
                    if block != expected {
                        // A retransmitted block we already have.
                        continue;
                    }
                    sink.write_all(&payload).await?;
                    transport.send(from, &Packet::Ack { block }).await?;
                    if payload.len() < MAX_BLOCK_LEN {
                        return Ok(());
                    }
                    expected = expected.wrapping_add(1);
                }
                _ => return Err(self.reject(&transport, from).await?),
            }
        }
    }

    /// Upload `source` to the server as `filename`.
    pub async fn write(&self, filename: &str, source: &mut (impl AsyncRead + Unpin)) -> Result<()> {
        let transport = Transport::open(None).await?;
        let server = self.resolve().await?;
        transport
            .send(
                server,
                &Packet::Wrq {
                    filename: filename.to_string(),
                    mode: Mode::Octet,
                },
            )
            .await?;

        let mut peer: Option<SocketAddr> = None;
        // ACK 0 acknowledges the request itself.
        let dest = self.await_ack(&transport, &mut peer, 0).await?;

        let mut block: u16 = 1;
        loop {
            let payload = read_block(source).await?;
            let len = payload.len();
            transport.send(dest, &Packet::Data { block, payload }).await?;
            self.await_ack(&transport, &mut peer, block).await?;
            if len < MAX_BLOCK_LEN {
                // The short (possibly empty) block ended the transfer.
                return Ok(());
            }
            block = block.wrapping_add(1);
        }
    }

    /// Wait for the next in-transfer datagram.
    ///
    /// Applies the timeout, answers undecodable datagrams with an
    /// ERROR and gives up, and locks onto the first responder's
    /// transfer ID. Anything later from a different port gets an
    /// `UNKNOWN_TRANSFER_ID` answer and a `None` so the caller keeps
    /// waiting, per RFC 1350's duplicate-connection rule.
    async fn next_packet(
        &self,
        transport: &Transport,
        peer: &mut Option<SocketAddr>,
    ) -> Result<Option<(SocketAddr, Packet)>> {
        let received = timeout(self.timeout, transport.recv())
            .await
            .map_err(|_| Error::Timeout)??;

        let packet = match received.packet {
            Ok(p) => p,
            Err(e) => {
                transport
                    .send(
                        received.from,
                        &Packet::error(ErrorCode::ILLEGAL_OPERATION, &e.to_string()),
                    )
                    .await?;
                return Err(Error::IllegalAnswer);
            }
        };

        match *peer {
            None => *peer = Some(received.from),
            Some(locked) if locked.port() != received.transfer_id => {
                transport
                    .send(
                        received.from,
                        &Packet::error(ErrorCode::UNKNOWN_TRANSFER_ID, ""),
                    )
                    .await?;
                return Ok(None);
            }
            Some(_) => {}
        }
        Ok(Some((received.from, packet)))
    }

    /// Wait until the peer acknowledges block `want`.
    ///
    /// Stale acknowledgments are ignored; an ERROR fails the transfer
    /// with the peer's message; any other packet kind is rejected.
    async fn await_ack(
        &self,
        transport: &Transport,
        peer: &mut Option<SocketAddr>,
        want: u16,
    ) -> Result<SocketAddr> {
        loop {
            let (from, packet) = match self.next_packet(transport, peer).await? {
                Some(answer) => answer,
                None => continue,
            };
            match packet {
                Packet::Error { message, .. } => return Err(Error::Server(message)),
                Packet::Ack { block } if block == want => return Ok(from),
                Packet::Ack { .. } => continue,
                _ => return Err(self.reject(transport, from).await?),
            }
        }
    }

    /// Answer an unexpected packet kind with ILLEGAL_OPERATION and
    /// build the matching local error.
    async fn reject(&self, transport: &Transport, to: SocketAddr) -> Result<Error> {
        let answer = Packet::error(ErrorCode::ILLEGAL_OPERATION, "");
        transport.send(to, &answer).await?;
        Ok(Error::Client(
            ErrorCode::ILLEGAL_OPERATION.default_message().to_string(),
        ))
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| Error::NoAddress(self.host.clone()))
    }
}

/// Pull the next block (up to 512 bytes) out of `source`.
///
/// Only EOF may make the block short; partial reads are retried until
/// the block fills up.
async fn read_block(source: &mut (impl AsyncRead + Unpin)) -> std::io::Result<Vec<u8>> {
    let mut block = vec![0_u8; MAX_BLOCK_LEN];
    let mut filled = 0;
    while filled < MAX_BLOCK_LEN {
        let n = source.read(&mut block[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    block.truncate(filled);
    Ok(block)
}
