//! The terminal client.

use log::debug;
use netkit_bytes::BufferedReader;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpStream};

use crate::msg::{read_message, Message};
use crate::{Error, Result};

/// A chat client: a connected socket and a name to sign messages with.
///
/// [`run`](ChatClient::run) bridges the terminal and the server in one
/// task: lines typed on stdin go out as messages with a zero
/// timestamp (the server stamps them on receipt), and messages from
/// the server are rendered to stdout. Either side closing ends the
/// client.
pub struct ChatClient {
    stream: TcpStream,
    author: String,
}

impl ChatClient {
    /// Resolve `host`:`port` and connect.
    pub async fn connect(host: &str, port: u16, author: impl Into<String>) -> Result<Self> {
        let addr = lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| Error::NoAddress(host.to_string()))?;
        let stream = TcpStream::connect(addr).await?;
        Ok(ChatClient {
            stream,
            author: author.into(),
        })
    }

    /// Run until stdin closes or the server goes away.
    pub async fn run(self) -> Result<()> {
        let (read_half, mut write_half) = self.stream.into_split();
        let author = self.author;

        let receive = async {
            let mut reader = BufferedReader::new(read_half);
            while let Some(message) = read_message(&mut reader).await? {
                println!("{}", message.show());
            }
            debug!("server closed the connection");
            Ok::<(), Error>(())
        };

        let send = async {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let message = Message::new(author.clone(), 0, line);
                write_half.write_all(&message.encode()).await?;
            }
            debug!("stdin closed");
            Ok::<(), Error>(())
        };

        // Whichever direction finishes first (EOF on stdin, or the
        // server hanging up) takes the whole client down with it.
        tokio::select! {
            r = receive => r,
            r = send => r,
        }
    }
}
