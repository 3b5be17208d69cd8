//! The HTTP/1.1 message model: start lines, headers, messages.

use std::collections::BTreeMap;

/// The first line of a request: method, target URL, version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// Request method, as received (`GET`, `POST`, …).
    pub method: String,
    /// Request target. For a forward proxy this is an absolute URL.
    pub target: String,
    /// Protocol version string (`HTTP/1.1`).
    pub version: String,
}

impl RequestLine {
    /// Render this line without its trailing CRLF.
    pub fn serialize(&self) -> String {
        format!("{} {} {}", self.method, self.target, self.version)
    }
}

/// The first line of a response: version, status code, reason phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Protocol version string (`HTTP/1.1`).
    pub version: String,
    /// Status code, kept as the string the origin sent.
    pub code: String,
    /// Reason phrase.
    pub reason: String,
}

impl StatusLine {
    /// Render this line without its trailing CRLF.
    pub fn serialize(&self) -> String {
        format!("{} {} {}", self.version, self.code, self.reason)
    }
}

/// One header field as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Field name, case preserved.
    pub name: String,
    /// Field value, everything after the `": "` separator.
    pub value: String,
}

/// Split a header value into tokens.
///
/// Tokens are separated by any run of spaces and commas. This is how
/// the proxy reads every list-valued header it cares about; it does
/// not understand quoting.
///
/// ```
/// use netkit_httpproto::split_value;
/// assert_eq!(split_value("private, max-age=30"), vec!["private", "max-age=30"]);
/// assert_eq!(split_value("gzip,br  deflate"), vec!["gzip", "br", "deflate"]);
/// ```
pub fn split_value(value: &str) -> Vec<&str> {
    value
        .split([' ', ','])
        .filter(|t| !t.is_empty())
        .collect()
}

/// An ordered header list with a first-occurrence lookup index.
///
/// The list keeps every header in insertion order, duplicates
/// included, so serialization reproduces the wire bytes. The index
/// maps each name to the value of its *first* occurrence; names are
/// compared case-sensitively, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    /// All headers, in insertion order.
    entries: Vec<Header>,
    /// Name to first-occurrence value.
    index: BTreeMap<String, String>,
}

impl Headers {
    /// Create an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of headers, duplicates counted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no headers at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a header at the end of the list.
    pub fn append(&mut self, name: &str, value: &str) {
        self.entries.push(Header {
            name: name.to_string(),
            value: value.to_string(),
        });
        self.index
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }

    /// Look up the first occurrence of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(String::as_str)
    }

    /// Set `name` to `value` everywhere it occurs, appending it if it
    /// does not occur at all.
    pub fn update(&mut self, name: &str, value: &str) {
        match self.index.get_mut(name) {
            None => self.append(name, value),
            Some(indexed) => {
                *indexed = value.to_string();
                for h in self.entries.iter_mut().filter(|h| h.name == name) {
                    h.value = value.to_string();
                }
            }
        }
    }

    /// Remove every occurrence of `name`.
    pub fn remove(&mut self, name: &str) {
        self.index.remove(name);
        self.entries.retain(|h| h.name != name);
    }

    /// Iterate over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    /// Render every header as `name: value\r\n`.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for h in &self.entries {
            out.push_str(&h.name);
            out.push_str(": ");
            out.push_str(&h.value);
            out.push_str("\r\n");
        }
        out
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(&name, &value);
        }
        headers
    }
}

/// A parsed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The request line.
    pub line: RequestLine,
    /// The headers, order preserved.
    pub headers: Headers,
    /// The body, possibly empty.
    pub body: Vec<u8>,
}

impl Request {
    /// Serialize this request back into wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        serialize_message(&self.line.serialize(), &self.headers, &self.body)
    }
}

/// A parsed HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The status line.
    pub line: StatusLine,
    /// The headers, order preserved.
    pub headers: Headers,
    /// The body, dechunked if it arrived chunked.
    pub body: Vec<u8>,
}

impl Response {
    /// Serialize this response back into wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        serialize_message(&self.line.serialize(), &self.headers, &self.body)
    }

    /// Set `Content-Length` to the current body size.
    pub fn update_content_length(&mut self) {
        self.headers
            .update("Content-Length", &self.body.len().to_string());
    }
}

/// Start line + headers + blank line + body.
fn serialize_message(start: &str, headers: &Headers, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(start.len() + body.len() + 64);
    out.extend_from_slice(start.as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(headers.serialize().as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}
