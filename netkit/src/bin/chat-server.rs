//! The chat broadcast server.
//!
//! `chat-server PORT` listens on `0.0.0.0:PORT` and fans every message
//! out to every connected peer, replaying history to late joiners.

#![deny(clippy::unwrap_used)]

use anyhow::Result;
use argh::FromArgs;
use netkit_chat::ChatServer;
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(FromArgs, Debug)]
/// Run a group chat server.
struct Args {
    /// port to listen on
    #[argh(positional)]
    port: u16,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    let server = ChatServer::bind(args.port)?;
    info!("listening on {}", server.local_addr()?);
    server.run().await?;
    Ok(())
}
