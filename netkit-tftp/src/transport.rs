//! The datagram endpoint a transfer runs over.

use std::net::{Ipv4Addr, SocketAddr};

use log::debug;
use rand::Rng;
use tokio::net::UdpSocket;

use crate::packet::Packet;
use crate::{ParseError, Result};

/// Largest datagram worth receiving: opcode, block number, one full
/// block, and a little slack.
const RECV_BUF: usize = 520;

/// One decoded (or undecodable) datagram.
pub struct Received {
    /// Who sent it.
    pub from: SocketAddr,
    /// The sender's transfer ID, i.e. its UDP source port.
    pub transfer_id: u16,
    /// The packet, or why it didn't decode.
    pub packet: std::result::Result<Packet, ParseError>,
}

/// A UDP socket that speaks in [`Packet`]s.
///
/// The transport owns its socket; dropping it closes the port. Every
/// packet that passes through is logged at debug level, which is what
/// the `-v` flags on the CLIs surface.
pub struct Transport {
    socket: UdpSocket,
}

impl Transport {
    /// Bind to `port`. Given `None`, keep trying random ephemeral
    /// ports in `[1024, 65535]` until one binds.
    pub async fn open(port: Option<u16>) -> Result<Transport> {
        let socket = match port {
            Some(p) => UdpSocket::bind((Ipv4Addr::UNSPECIFIED, p)).await?,
            None => loop {
                let p: u16 = rand::thread_rng().gen_range(1024..=u16::MAX);
                match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, p)).await {
                    Ok(socket) => break socket,
                    // Someone holds this port; roll again.
                    Err(_) => continue,
                }
            },
        };
        Ok(Transport { socket })
    }

    /// The port this transport is bound to: our transfer ID.
    pub fn local_port(&self) -> Result<u16> {
        Ok(self.socket.local_addr()?.port())
    }

    /// Encode `packet` and send it to `to`.
    pub async fn send(&self, to: SocketAddr, packet: &Packet) -> Result<()> {
        debug!("SEND {}", packet);
        self.socket.send_to(&packet.encode(), to).await?;
        Ok(())
    }

    /// Wait for one datagram and try to decode it.
    ///
    /// Decode failures are data, not errors: the caller decides
    /// whether to answer with an ERROR packet, so they travel inside
    /// [`Received`]. Only socket failures surface as `Err`.
    pub async fn recv(&self) -> Result<Received> {
        let mut buf = [0_u8; RECV_BUF];
        let (n, from) = self.socket.recv_from(&mut buf).await?;
        let packet = Packet::decode(&buf[..n]);
        match &packet {
            Ok(p) => debug!("RECV {}", p),
            Err(e) => debug!("RECV undecodable datagram: {}", e),
        }
        Ok(Received {
            from,
            transfer_id: from.port(),
            packet,
        })
    }
}
