//! One proxied connection, from accept to shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use log::info;
use netkit_httpproto::{ParseStatus, Request, RequestParser, Response, ResponseParser};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};

use crate::cache::Cache;
use crate::{gzip, Error, Result};

/// Socket read granularity for both legs.
const READ_CHUNK: usize = 4096;

/// The per-connection state machine.
///
/// A session advances strictly: read the client's request, serve from
/// cache or forward upstream and read the reply, compress when the
/// client can take it, write back and shut down. Any socket error
/// anywhere aborts the session; the proxy never synthesizes an HTTP
/// error reply of its own.
pub(crate) struct Session {
    /// The accepted client connection.
    client: TcpStream,
    /// The server-wide response cache.
    cache: Arc<Mutex<Cache>>,
}

impl Session {
    pub(crate) fn new(client: TcpStream, cache: Arc<Mutex<Cache>>) -> Self {
        Session { client, cache }
    }

    /// Drive this session to completion.
    pub(crate) async fn run(mut self) -> Result<()> {
        let mut request = self.read_request().await?;
        let client_gzip = gzip::accepts_gzip(&request);
        // Upstream must send plain bytes the cache can reuse.
        request.headers.remove("Accept-Encoding");

        let url = request.line.target.clone();
        info!("[REQ]   {}", url);

        let cached = self.cache.lock()?.serve_cached(&url);
        if let Some(mut cached) = cached {
            if client_gzip {
                gzip::compress(&mut cached)?;
            }
            info!("[CACHE] {}{}", url, gzip_tag(client_gzip));
            return self.write_client(&cached.serialize()).await;
        }

        let (scheme, host) = split_url(&url);
        let addr = resolve(&host, &scheme).await?;
        let mut origin = TcpStream::connect(addr).await?;
        origin.write_all(&request.serialize()).await?;

        let response = read_response(&mut origin).await?;
        let _ = origin.shutdown().await;
        drop(origin);

        let mut reply = response.clone();
        if client_gzip {
            gzip::compress(&mut reply)?;
        }
        info!("[RESP]  {}{}", url, gzip_tag(client_gzip));
        // The cache keeps the uncompressed form.
        self.cache.lock()?.cache_response(&request, &response);
        self.write_client(&reply.serialize()).await
    }

    /// Read from the client until the request parser completes.
    async fn read_request(&mut self) -> Result<Request> {
        let mut parser = RequestParser::new();
        let mut buf = [0_u8; READ_CHUNK];
        loop {
            let n = self.client.read(&mut buf).await?;
            if n == 0 {
                return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
            for &b in &buf[..n] {
                if parser.consume(b) == ParseStatus::Done {
                    return Ok(parser.parsed());
                }
            }
        }
    }

    /// Write the reply and close our half of the connection.
    async fn write_client(&mut self, bytes: &[u8]) -> Result<()> {
        self.client.write_all(bytes).await?;
        self.client.shutdown().await?;
        Ok(())
    }
}

/// Read from the origin until the response parser completes.
async fn read_response(origin: &mut TcpStream) -> Result<Response> {
    let mut parser = ResponseParser::new();
    let mut buf = [0_u8; READ_CHUNK];
    loop {
        let n = origin.read(&mut buf).await?;
        if n == 0 {
            return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        for &b in &buf[..n] {
            if parser.consume(b) == ParseStatus::Done {
                return Ok(parser.parsed());
            }
        }
    }
}

fn gzip_tag(compressed: bool) -> &'static str {
    if compressed {
        " (gzip)"
    } else {
        ""
    }
}

/// Split a request target into scheme and host.
///
/// The scheme is whatever precedes `://` (`http` when absent); the
/// host runs to the first `/` after it, or to the end of the URL.
fn split_url(url: &str) -> (String, String) {
    let (scheme, rest) = match url.find("://") {
        Some(i) => (&url[..i], &url[i + 3..]),
        None => ("http", url),
    };
    let host = match rest.find('/') {
        Some(j) => &rest[..j],
        None => rest,
    };
    (scheme.to_string(), host.to_string())
}

/// Turn `(host, scheme)` into one concrete endpoint.
async fn resolve(host: &str, scheme: &str) -> Result<SocketAddr> {
    let port = match scheme {
        "https" => 443,
        _ => 80,
    };
    let mut addrs = if host.contains(':') {
        // The target carried an explicit port.
        lookup_host(host.to_string()).await?
    } else {
        lookup_host(format!("{}:{}", host, port)).await?
    };
    addrs
        .next()
        .ok_or_else(|| Error::NoAddress(host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_splitting() {
        assert_eq!(
            split_url("http://example.com/path/x"),
            ("http".into(), "example.com".into())
        );
        assert_eq!(
            split_url("https://example.com"),
            ("https".into(), "example.com".into())
        );
        assert_eq!(
            split_url("example.com/path"),
            ("http".into(), "example.com".into())
        );
        assert_eq!(
            split_url("http://127.0.0.1:8080/x"),
            ("http".into(), "127.0.0.1:8080".into())
        );
    }
}
