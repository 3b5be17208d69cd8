//! The caching HTTP/1.1 forward proxy.
//!
//! `proxy HOST PORT` binds a listening socket and serves until a
//! SIGINT, SIGTERM, or SIGQUIT arrives, at which point the acceptor
//! closes, every live session is torn down, and the process exits
//! cleanly. Bind failures exit nonzero before any traffic is taken.

#![deny(clippy::unwrap_used)]

use anyhow::Result;
use argh::FromArgs;
use netkit_proxy::ProxyServer;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(FromArgs, Debug)]
/// Run a caching HTTP/1.1 forward proxy.
struct Args {
    /// address to listen on
    #[argh(positional)]
    host: String,
    /// port to listen on
    #[argh(positional)]
    port: u16,
}

/// Resolve on the first of SIGINT, SIGTERM, or SIGQUIT.
async fn wait_for_shutdown() -> Result<()> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;
    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    let server = ProxyServer::bind(&args.host, args.port).await?;
    info!("listening on {}", server.local_addr()?);

    // Dropping the accept loop closes the acceptor and aborts every
    // session mid-flight; their sockets go down with them.
    tokio::select! {
        r = wait_for_shutdown() => {
            info!("signal received; shutting down");
            r
        }
        r = server.run() => r.map_err(Into::into),
    }
}
