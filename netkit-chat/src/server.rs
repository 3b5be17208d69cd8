//! The broadcast server.

use std::net::{Ipv4Addr, SocketAddr};

use chrono::Utc;
use log::{debug, info};
use netkit_bytes::BufferedReader;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::mpsc;

use crate::msg::{read_message, Message};
use crate::Result;

/// One connected peer, as the hub sees it.
struct Peer {
    /// Stable identity; reader tasks report back with it.
    id: u64,
    /// The write half. The read half lives in the peer's reader task.
    writer: OwnedWriteHalf,
}

/// What a reader task tells the hub.
struct Event {
    /// Which peer this is about.
    id: u64,
    /// A decoded message, or `None` for "this peer is gone".
    msg: Option<Message>,
}

/// A chat server: one listener, one history, many peers.
///
/// All bookkeeping happens in [`run`](ChatServer::run)'s loop, which
/// alternates between accepting new peers and processing one decoded
/// message at a time. A message is written to every connected peer's
/// socket before the next message is looked at, and a freshly accepted
/// peer has the whole history replayed before the hub does anything
/// else. That is exactly the ordering the chat promises.
pub struct ChatServer {
    listener: TcpListener,
}

/// Accept queue depth for the listening socket.
const MAX_CONNECTIONS_QUEUED: u32 = 16;

impl ChatServer {
    /// Listen on `0.0.0.0:port`.
    pub fn bind(port: u16) -> Result<Self> {
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?;
        let listener = socket.listen(MAX_CONNECTIONS_QUEUED)?;
        Ok(ChatServer { listener })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve forever. Accept failures are fatal; everything a peer can
    /// do wrong just disconnects that peer.
    pub async fn run(self) -> Result<()> {
        let mut peers: Vec<Peer> = Vec::new();
        let mut history: Vec<Message> = Vec::new();
        let mut next_id: u64 = 0;
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted?;
                    info!("peer {} connected from {}", next_id, addr);

                    let (read_half, write_half) = stream.into_split();
                    let mut peer = Peer { id: next_id, writer: write_half };

                    // Late joiners get the full history, in order,
                    // before they can see anything newer.
                    let mut alive = true;
                    for message in &history {
                        if peer.writer.write_all(&message.encode()).await.is_err() {
                            alive = false;
                            break;
                        }
                    }
                    if alive {
                        peers.push(peer);
                        spawn_reader(read_half, next_id, tx.clone());
                    }
                    next_id += 1;
                }

                Some(event) = rx.recv() => match event.msg {
                    Some(mut message) => {
                        message.accepted = Utc::now().timestamp();
                        let data = message.encode();
                        // Synchronous fan-out: every peer's socket sees
                        // this message before the next one is handled.
                        // Peers that fail the write are dropped on the
                        // spot.
                        let mut i = 0;
                        while i < peers.len() {
                            if peers[i].writer.write_all(&data).await.is_err() {
                                debug!("peer {} dropped during fan-out", peers[i].id);
                                peers.swap_remove(i);
                            } else {
                                i += 1;
                            }
                        }
                        history.push(message);
                    }
                    None => {
                        if let Some(pos) = peers.iter().position(|p| p.id == event.id) {
                            info!("peer {} disconnected", event.id);
                            peers.swap_remove(pos);
                        }
                    }
                },
            }
        }
    }
}

/// Decode messages off one peer's read half and feed them to the hub.
fn spawn_reader(
    read_half: tokio::net::tcp::OwnedReadHalf,
    id: u64,
    tx: mpsc::UnboundedSender<Event>,
) {
    tokio::spawn(async move {
        let mut reader = BufferedReader::new(read_half);
        loop {
            match read_message(&mut reader).await {
                Ok(Some(msg)) => {
                    if tx.send(Event { id, msg: Some(msg) }).is_err() {
                        // Hub is gone; nothing left to do.
                        return;
                    }
                }
                Ok(None) | Err(_) => {
                    let _ = tx.send(Event { id, msg: None });
                    return;
                }
            }
        }
    });
}
