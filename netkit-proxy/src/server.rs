//! The accept loop.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use log::debug;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::cache::Cache;
use crate::session::Session;
use crate::Result;

/// A listening proxy with its cache.
///
/// Binding and running are separate so a bind failure can be reported
/// before the process commits to serving. [`run`](ProxyServer::run)
/// accepts forever; shutting down is the caller's job: select this
/// future against a signal handler and drop it, which closes the
/// acceptor and tears down every live session.
pub struct ProxyServer {
    /// The bound acceptor.
    listener: TcpListener,
    /// Shared across all sessions. Locked only for the duration of a
    /// lookup or insert, never across an await.
    cache: Arc<Mutex<Cache>>,
}

impl ProxyServer {
    /// Resolve `host`:`port` and bind the listening socket.
    pub async fn bind(host: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        Ok(ProxyServer {
            listener,
            cache: Arc::new(Mutex::new(Cache::new())),
        })
    }

    /// The address the acceptor actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve clients until this future is dropped.
    pub async fn run(self) -> Result<()> {
        let mut sessions: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("accepted {}", peer);
                        let session = Session::new(stream, Arc::clone(&self.cache));
                        sessions.spawn(async move {
                            if let Err(e) = session.run().await {
                                debug!("session ended: {}", e);
                            }
                        });
                    }
                    Err(e) => debug!("failed to accept client: {}", e),
                },
                // Reap finished sessions; the branch is disabled while
                // none are running.
                Some(_) = sessions.join_next() => {}
            }
        }
    }
}
