//! The server: a request listener and one task per transfer.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::netascii::{from_netascii, to_netascii};
use crate::packet::{ErrorCode, Mode, Packet, MAX_BLOCK_LEN};
use crate::transport::Transport;
use crate::Result;

/// How long a transfer waits for its peer before retransmitting.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);
/// How many retransmissions of the last packet before a transfer is
/// declared dead. RFC 1350 requires a bounded retry, not an immediate
/// expiry.
const MAX_RETRIES: u32 = 5;

/// A TFTP server.
///
/// One transport listens on the well-known port for RRQ/WRQ packets;
/// every accepted request gets its own transfer with its own
/// ephemeral-port transport, so the kernel demultiplexes transfers by
/// TID. Filenames are used verbatim as paths relative to the server's
/// working directory.
pub struct Server {
    requests: Transport,
    timeout: Duration,
    retries: u32,
}

impl Server {
    /// Bind the request transport. Port 69 is the well-known default;
    /// 0 picks any free port.
    pub async fn bind(port: u16) -> Result<Server> {
        Ok(Server {
            requests: Transport::open(Some(port)).await?,
            timeout: DEFAULT_TIMEOUT,
            retries: MAX_RETRIES,
        })
    }

    /// Change how long transfers wait before retransmitting.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The port the request transport actually bound.
    pub fn local_port(&self) -> Result<u16> {
        self.requests.local_port()
    }

    /// Serve requests forever. Only request-socket failures are fatal;
    /// each transfer cleans up after itself.
    pub async fn run(&self) -> Result<()> {
        loop {
            let received = self.requests.recv().await?;
            let packet = match received.packet {
                Err(e) => {
                    warn!("Server: {}", e);
                    self.requests
                        .send(
                            received.from,
                            &Packet::error(ErrorCode::ILLEGAL_OPERATION, &e.to_string()),
                        )
                        .await?;
                    continue;
                }
                Ok(p) => p,
            };
            match packet {
                Packet::Rrq { filename, mode } => {
                    self.start_read(received.from, filename, mode).await?;
                }
                Packet::Wrq { filename, mode } => {
                    self.start_write(received.from, filename, mode).await?;
                }
                Packet::Error { message, .. } => warn!("Client: {}", message),
                _ => {
                    let answer = Packet::error(ErrorCode::ILLEGAL_OPERATION, "");
                    warn!("Server: {}", ErrorCode::ILLEGAL_OPERATION.default_message());
                    self.requests.send(received.from, &answer).await?;
                }
            }
        }
    }

    /// Accept an RRQ: reject missing files on the request port, or
    /// spin up a reading transfer.
    async fn start_read(&self, peer: SocketAddr, filename: String, mode: Mode) -> Result<()> {
        if fs::metadata(&filename).await.is_err() {
            warn!("Server: {}", ErrorCode::FILE_NOT_FOUND.default_message());
            self.requests
                .send(peer, &Packet::error(ErrorCode::FILE_NOT_FOUND, ""))
                .await?;
            return Ok(());
        }
        info!("read transfer of {:?} for {}", filename, peer);

        let transport = Transport::open(None).await?;
        let (wait, retries) = (self.timeout, self.retries);
        tokio::spawn(async move {
            let machine = match ReadTransfer::open(&filename, mode).await {
                Ok(m) => Machine::Read(m),
                Err(e) => {
                    // The file vanished between the check and the open.
                    warn!("Server: {}", e);
                    let _ = transport
                        .send(peer, &Packet::error(ErrorCode::FILE_NOT_FOUND, ""))
                        .await;
                    return;
                }
            };
            if let Err(e) = run_transfer(transport, peer, machine, wait, retries).await {
                debug!("transfer with {} failed: {}", peer, e);
            }
        });
        Ok(())
    }

    /// Accept a WRQ: create the file and spin up a writing transfer.
    async fn start_write(&self, peer: SocketAddr, filename: String, mode: Mode) -> Result<()> {
        info!("write transfer of {:?} for {}", filename, peer);

        let transport = Transport::open(None).await?;
        let (wait, retries) = (self.timeout, self.retries);
        tokio::spawn(async move {
            let machine = match WriteTransfer::create(&filename, mode).await {
                Ok(m) => Machine::Write(m),
                Err(e) => {
                    warn!("Server: {}", e);
                    let _ = transport
                        .send(peer, &Packet::error(ErrorCode::ACCESS_VIOLATION, ""))
                        .await;
                    return;
                }
            };
            if let Err(e) = run_transfer(transport, peer, machine, wait, retries).await {
                debug!("transfer with {} failed: {}", peer, e);
            }
        });
        Ok(())
    }
}

/// Drive one transfer to completion on its private transport.
///
/// The loop enforces the lock-step discipline shared by both transfer
/// directions: wait for the peer (retransmitting the last packet on
/// timeout, up to the retry budget), ignore datagrams from foreign
/// TIDs, and hand real packets to the state machine.
async fn run_transfer(
    transport: Transport,
    peer: SocketAddr,
    mut machine: Machine,
    wait: Duration,
    retries: u32,
) -> Result<()> {
    let first = machine.start().await?;
    transport.send(peer, &first).await?;
    let mut last_sent = first;

    let mut attempts: u32 = 0;
    loop {
        let received = match timeout(wait, transport.recv()).await {
            Err(_) => {
                attempts += 1;
                if attempts > retries {
                    warn!("Server: timeout");
                    return Ok(());
                }
                transport.send(peer, &last_sent).await?;
                continue;
            }
            Ok(r) => r?,
        };
        attempts = 0;

        if received.from != peer {
            // Somebody else's datagram wandered onto our port.
            transport
                .send(
                    received.from,
                    &Packet::error(ErrorCode::UNKNOWN_TRANSFER_ID, ""),
                )
                .await?;
            continue;
        }

        let packet = match received.packet {
            Err(e) => {
                warn!("Server: {}", e);
                transport
                    .send(peer, &Packet::error(ErrorCode::ILLEGAL_OPERATION, &e.to_string()))
                    .await?;
                return Ok(());
            }
            Ok(p) => p,
        };

        let step = machine.handle(packet).await?;
        if let Some(reply) = step.reply {
            transport.send(peer, &reply).await?;
            last_sent = reply;
        }
        if step.done {
            return Ok(());
        }
    }
}

/// What the state machine wants done after one packet.
struct Step {
    /// Send this, and remember it for retransmission.
    reply: Option<Packet>,
    /// Tear the transfer down afterwards.
    done: bool,
}

impl Step {
    fn idle() -> Step {
        Step {
            reply: None,
            done: false,
        }
    }
    fn reply(p: Packet) -> Step {
        Step {
            reply: Some(p),
            done: false,
        }
    }
    fn finished() -> Step {
        Step {
            reply: None,
            done: true,
        }
    }
    fn final_reply(p: Packet) -> Step {
        Step {
            reply: Some(p),
            done: true,
        }
    }
}

/// The answer to a packet kind that has no business in this transfer.
fn illegal() -> Step {
    warn!("Server: {}", ErrorCode::ILLEGAL_OPERATION.default_message());
    Step::final_reply(Packet::error(ErrorCode::ILLEGAL_OPERATION, ""))
}

/// Either direction of transfer.
enum Machine {
    Read(ReadTransfer),
    Write(WriteTransfer),
}

impl Machine {
    /// The packet that opens the exchange: the first DATA block for a
    /// read, ACK 0 for a write.
    async fn start(&mut self) -> std::io::Result<Packet> {
        match self {
            Machine::Read(t) => t.start().await,
            Machine::Write(t) => Ok(t.start()),
        }
    }

    async fn handle(&mut self, packet: Packet) -> std::io::Result<Step> {
        match self {
            Machine::Read(t) => t.handle(packet).await,
            Machine::Write(t) => t.handle(packet).await,
        }
    }
}

/// Server-to-client: serve blocks, advance on matching ACKs.
struct ReadTransfer {
    source: BlockSource,
    /// The block we sent most recently.
    last_block: u16,
    /// The last DATA was short; the matching ACK ends the transfer.
    finished: bool,
}

/// Where a reading transfer's blocks come from.
enum BlockSource {
    /// Octet mode streams the file.
    File(fs::File),
    /// NetASCII mode encodes the whole file up front and serves
    /// 512-byte windows of the encoding.
    Window { data: Vec<u8>, pos: usize },
}

impl BlockSource {
    async fn next_block(&mut self) -> std::io::Result<Vec<u8>> {
        match self {
            BlockSource::File(file) => {
                let mut block = vec![0_u8; MAX_BLOCK_LEN];
                let mut filled = 0;
                while filled < MAX_BLOCK_LEN {
                    let n = file.read(&mut block[filled..]).await?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
                block.truncate(filled);
                Ok(block)
            }
            BlockSource::Window { data, pos } => {
                let end = (*pos + MAX_BLOCK_LEN).min(data.len());
                let block = data[*pos..end].to_vec();
                *pos = end;
                Ok(block)
            }
        }
    }
}

impl ReadTransfer {
    async fn open(filename: &str, mode: Mode) -> std::io::Result<ReadTransfer> {
        let source = match mode {
            Mode::Octet => BlockSource::File(fs::File::open(filename).await?),
            Mode::Netascii => BlockSource::Window {
                data: to_netascii(&fs::read(filename).await?),
                pos: 0,
            },
        };
        Ok(ReadTransfer {
            source,
            last_block: 0,
            finished: false,
        })
    }

    async fn start(&mut self) -> std::io::Result<Packet> {
        let payload = self.source.next_block().await?;
        self.last_block = 1;
        self.finished = payload.len() < MAX_BLOCK_LEN;
        Ok(Packet::Data { block: 1, payload })
    }

    async fn handle(&mut self, packet: Packet) -> std::io::Result<Step> {
        match packet {
            Packet::Ack { block } if block == self.last_block => {
                if self.finished {
                    // That was the ACK for the final short block.
                    return Ok(Step::finished());
                }
                let payload = self.source.next_block().await?;
                self.last_block = self.last_block.wrapping_add(1);
                self.finished = payload.len() < MAX_BLOCK_LEN;
                Ok(Step::reply(Packet::Data {
                    block: self.last_block,
                    payload,
                }))
            }
            // An ACK for some older block: a duplicate, not progress.
            Packet::Ack { .. } => Ok(Step::idle()),
            Packet::Error { message, .. } => {
                warn!("Client: {}", message);
                Ok(Step::finished())
            }
            _ => Ok(illegal()),
        }
    }
}

/// Client-to-server: collect blocks, acknowledge each one.
struct WriteTransfer {
    sink: BlockSink,
    /// The highest block we have acknowledged.
    last_ack: u16,
}

/// Where a writing transfer's blocks go.
enum BlockSink {
    /// Octet mode appends straight to the file.
    File(fs::File),
    /// NetASCII mode buffers the wire bytes and decodes them once the
    /// transfer completes.
    Buffer { path: PathBuf, data: Vec<u8> },
}

impl WriteTransfer {
    async fn create(filename: &str, mode: Mode) -> std::io::Result<WriteTransfer> {
        let sink = match mode {
            Mode::Octet => BlockSink::File(fs::File::create(filename).await?),
            Mode::Netascii => BlockSink::Buffer {
                path: PathBuf::from(filename),
                data: Vec::new(),
            },
        };
        Ok(WriteTransfer { sink, last_ack: 0 })
    }

    fn start(&self) -> Packet {
        Packet::Ack { block: 0 }
    }

    async fn handle(&mut self, packet: Packet) -> std::io::Result<Step> {
        match packet {
            Packet::Data { block, payload } => {
                if block != self.last_ack.wrapping_add(1) {
                    // Our ACK got lost and the peer resent its block;
                    // repeat the ACK so lock-step can move on.
                    return Ok(Step::reply(Packet::Ack {
                        block: self.last_ack,
                    }));
                }
                self.append(&payload).await?;
                self.last_ack = block;
                if payload.len() < MAX_BLOCK_LEN {
                    self.finish().await?;
                    return Ok(Step::final_reply(Packet::Ack { block }));
                }
                Ok(Step::reply(Packet::Ack { block }))
            }
            Packet::Error { message, .. } => {
                warn!("Client: {}", message);
                Ok(Step::finished())
            }
            _ => Ok(illegal()),
        }
    }

    async fn append(&mut self, payload: &[u8]) -> std::io::Result<()> {
        match &mut self.sink {
            BlockSink::File(file) => file.write_all(payload).await,
            BlockSink::Buffer { data, .. } => {
                data.extend_from_slice(payload);
                Ok(())
            }
        }
    }

    /// Flush everything to disk before the final ACK goes out.
    async fn finish(&mut self) -> std::io::Result<()> {
        match &mut self.sink {
            BlockSink::File(file) => file.flush().await,
            BlockSink::Buffer { path, data } => fs::write(path, from_netascii(data)).await,
        }
    }
}
