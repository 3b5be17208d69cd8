//! The chat terminal client.
//!
//! `chat-client HOST PORT [--name <str>]` connects to a chat server,
//! sends each line typed on stdin, and prints everything the room
//! says. Closing stdin or losing the server ends the client.

#![deny(clippy::unwrap_used)]

use anyhow::Result;
use argh::FromArgs;
use netkit_chat::ChatClient;
use tracing::level_filters::LevelFilter;

#[derive(FromArgs, Debug)]
/// Connect to a group chat server.
struct Args {
    /// server hostname
    #[argh(positional)]
    host: String,
    /// server port
    #[argh(positional)]
    port: u16,
    /// your name in the chat
    #[argh(option, short = 'n', default = "String::from(\"anonymous\")")]
    name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::WARN)
        .init();

    let client = ChatClient::connect(&args.host, args.port, args.name).await?;
    client.run().await?;
    Ok(())
}
