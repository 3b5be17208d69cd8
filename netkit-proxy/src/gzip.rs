//! gzip as an egress filter.
//!
//! Cached bodies stay uncompressed; compression happens on the way
//! out, and only for clients that asked for it. That way a cache hit
//! serves the same bytes no matter which client warmed it.

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use netkit_httpproto::{split_value, Request, Response};

/// Did this client's original request advertise gzip support?
///
/// Call before the proxy strips `Accept-Encoding` for the upstream leg.
pub(crate) fn accepts_gzip(request: &Request) -> bool {
    request
        .headers
        .get("Accept-Encoding")
        .map(|v| split_value(v).contains(&"gzip"))
        .unwrap_or(false)
}

/// Is the response body already gzip-encoded?
fn is_compressed(response: &Response) -> bool {
    response
        .headers
        .get("Content-Encoding")
        .map(|v| split_value(v).contains(&"gzip"))
        .unwrap_or(false)
}

/// gzip-encode `response` in place, unless it already is.
///
/// Every existing `Content-Encoding` header gains a `, gzip` suffix
/// (one is created if there were none), and `Content-Length` is set to
/// the compressed size.
pub(crate) fn compress(response: &mut Response) -> io::Result<()> {
    if is_compressed(response) {
        return Ok(());
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&response.body)?;
    response.body = encoder.finish()?;

    let mut tagged = false;
    let rewritten: Vec<(String, String)> = response
        .headers
        .iter()
        .map(|h| {
            if h.name == "Content-Encoding" {
                tagged = true;
                (h.name.clone(), format!("{}, gzip", h.value))
            } else {
                (h.name.clone(), h.value.clone())
            }
        })
        .collect();
    response.headers = rewritten.into_iter().collect();
    if !tagged {
        response.headers.append("Content-Encoding", "gzip");
    }

    response.update_content_length();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use netkit_httpproto::{Headers, RequestLine, StatusLine};
    use std::io::Read;

    fn request_with(accept_encoding: Option<&str>) -> Request {
        let mut headers = Headers::new();
        if let Some(v) = accept_encoding {
            headers.append("Accept-Encoding", v);
        }
        Request {
            line: RequestLine {
                method: "GET".into(),
                target: "http://e/".into(),
                version: "HTTP/1.1".into(),
            },
            headers,
            body: Vec::new(),
        }
    }

    fn response_with(content_encoding: Option<&str>, body: &[u8]) -> Response {
        let mut headers = Headers::new();
        if let Some(v) = content_encoding {
            headers.append("Content-Encoding", v);
        }
        Response {
            line: StatusLine {
                version: "HTTP/1.1".into(),
                code: "200".into(),
                reason: "OK".into(),
            },
            headers,
            body: body.to_vec(),
        }
    }

    #[test]
    fn accept_encoding_token_detection() {
        assert!(accepts_gzip(&request_with(Some("gzip"))));
        assert!(accepts_gzip(&request_with(Some("deflate, gzip, br"))));
        assert!(!accepts_gzip(&request_with(Some("deflate, br"))));
        assert!(!accepts_gzip(&request_with(None)));
    }

    #[test]
    fn compress_round_trips_through_gzip() {
        let mut resp = response_with(None, b"some fairly compressible body body body");
        compress(&mut resp).expect("compression");

        assert_eq!(resp.headers.get("Content-Encoding"), Some("gzip"));
        assert_eq!(
            resp.headers.get("Content-Length"),
            Some(resp.body.len().to_string().as_str())
        );

        let mut decoder = GzDecoder::new(&resp.body[..]);
        let mut plain = Vec::new();
        decoder.read_to_end(&mut plain).expect("valid gzip stream");
        assert_eq!(plain, b"some fairly compressible body body body");
    }

    #[test]
    fn existing_encoding_gains_gzip_suffix() {
        let mut resp = response_with(Some("br"), b"body");
        compress(&mut resp).expect("compression");
        assert_eq!(resp.headers.get("Content-Encoding"), Some("br, gzip"));
    }

    #[test]
    fn already_gzipped_response_is_left_alone() {
        let mut resp = response_with(Some("gzip"), b"\x1f\x8bpretend");
        let before = resp.clone();
        compress(&mut resp).expect("no-op");
        assert_eq!(resp, before);
    }
}
