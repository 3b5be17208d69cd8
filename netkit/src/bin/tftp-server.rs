//! The TFTP server.
//!
//! `tftp-server [-p PORT] [-v]` serves files from the current working
//! directory over RFC 1350 TFTP. `-v` traces every packet sent and
//! received.

#![deny(clippy::unwrap_used)]

use anyhow::Result;
use argh::FromArgs;
use netkit_tftp::Server;
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(FromArgs, Debug)]
/// Run a TFTP server.
struct Args {
    /// port to listen on, default 69
    #[argh(option, short = 'p', default = "69")]
    port: u16,
    /// log every packet
    #[argh(switch, short = 'v')]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let server = Server::bind(args.port).await?;
    info!("listening on port {}", server.local_port()?);
    server.run().await?;
    Ok(())
}
