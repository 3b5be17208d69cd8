//! The interactive TFTP client.
//!
//! `tftp-client HOST [-p PORT] [-t TIMEOUT_MS] [-v]` reads commands
//! from an interactive `> ` prompt:
//!
//! ```text
//! read FILE | get FILE    download FILE from the server
//! write FILE | put FILE   upload FILE to the server
//! help                    list the commands
//! ```
//!
//! Transfer failures are printed and the prompt comes back; EOF quits.

#![deny(clippy::unwrap_used)]

use std::io::Write as _;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use netkit_tftp::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::level_filters::LevelFilter;

#[derive(FromArgs, Debug)]
/// Talk to a TFTP server.
struct Args {
    /// server hostname
    #[argh(positional)]
    host: String,
    /// server port, default 69
    #[argh(option, short = 'p', default = "69")]
    port: u16,
    /// reply timeout in milliseconds, default 2000
    #[argh(option, short = 't', default = "2000")]
    timeout: u64,
    /// log every packet
    #[argh(switch, short = 'v')]
    verbose: bool,
}

async fn download(client: &Client, file: &str) -> Result<()> {
    let mut sink = tokio::fs::File::create(file).await?;
    client.read(file, &mut sink).await?;
    sink.flush().await?;
    Ok(())
}

async fn upload(client: &Client, file: &str) -> Result<()> {
    let mut source = tokio::fs::File::open(file).await?;
    client.write(file, &mut source).await?;
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut client = Client::new(args.host, args.port);
    client.set_timeout(Duration::from_millis(args.timeout));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("read" | "get"), Some(file)) => {
                if let Err(e) = download(&client, file).await {
                    eprintln!("{e}");
                }
            }
            (Some("write" | "put"), Some(file)) => {
                if let Err(e) = upload(&client, file).await {
                    eprintln!("{e}");
                }
            }
            (Some("help"), _) => {
                println!("commands: read FILE | get FILE | write FILE | put FILE | help");
            }
            (None, _) => {}
            _ => eprintln!("Unknown command"),
        }
        prompt()?;
    }
    Ok(())
}
