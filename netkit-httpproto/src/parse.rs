//! Byte-at-a-time parsers for HTTP/1.1 requests and responses.
//!
//! Both parsers are state machines advanced by [`consume`]: feed them
//! one byte at a time from the socket read loop, stop at
//! [`ParseStatus::Done`], then pick up the message with `parsed()`.
//! They never allocate per byte beyond growing their accumulators, and
//! they never fail: input that cannot form a message leaves them in
//! `Await` forever, which the caller surfaces as a timeout or a
//! disconnect.
//!
//! [`consume`]: RequestParser::consume

use crate::msg::{Headers, Request, RequestLine, Response, StatusLine};
use crate::split_value;

/// What a parser knows after eating one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// The message is not complete yet; keep feeding bytes.
    Await,
    /// The message is complete; call `parsed()`.
    Done,
}

/// Accumulates bytes until a delimiter sequence has been seen.
///
/// The delimiter is stripped from the accumulated bytes.
struct UntilParser {
    /// The terminating byte sequence.
    delim: &'static [u8],
    /// Everything consumed so far, minus the delimiter once found.
    acc: Vec<u8>,
}

impl UntilParser {
    fn new(delim: &'static [u8]) -> Self {
        UntilParser {
            delim,
            acc: Vec::new(),
        }
    }

    fn consume(&mut self, b: u8) -> ParseStatus {
        self.acc.push(b);
        if self.acc.ends_with(self.delim) {
            self.acc.truncate(self.acc.len() - self.delim.len());
            ParseStatus::Done
        } else {
            ParseStatus::Await
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.acc
    }

    fn clear(&mut self) {
        self.acc.clear();
    }
}

/// Accumulates an exact number of bytes.
struct CountedParser {
    /// Bytes still expected.
    want: usize,
    /// Bytes consumed so far.
    acc: Vec<u8>,
}

impl CountedParser {
    fn new() -> Self {
        CountedParser {
            want: 0,
            acc: Vec::new(),
        }
    }

    /// Start over, expecting exactly `n` bytes. `n` must be nonzero.
    fn expect(&mut self, n: usize) {
        self.want = n;
        self.acc.clear();
        self.acc.reserve(n);
    }

    fn consume(&mut self, b: u8) -> ParseStatus {
        self.acc.push(b);
        self.want -= 1;
        if self.want == 0 {
            ParseStatus::Done
        } else {
            ParseStatus::Await
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.acc
    }
}

/// Parses a three-field start line: two space-separated fields and a
/// CRLF-terminated rest. Covers both request lines and status lines.
struct StartLineParser {
    first: UntilParser,
    second: UntilParser,
    rest: UntilParser,
    state: StartLineState,
}

#[derive(PartialEq)]
enum StartLineState {
    First,
    Second,
    Rest,
}

impl StartLineParser {
    fn new() -> Self {
        StartLineParser {
            first: UntilParser::new(b" "),
            second: UntilParser::new(b" "),
            rest: UntilParser::new(b"\r\n"),
            state: StartLineState::First,
        }
    }

    fn consume(&mut self, b: u8) -> ParseStatus {
        match self.state {
            StartLineState::First => {
                if self.first.consume(b) == ParseStatus::Done {
                    self.state = StartLineState::Second;
                }
            }
            StartLineState::Second => {
                if self.second.consume(b) == ParseStatus::Done {
                    self.state = StartLineState::Rest;
                }
            }
            StartLineState::Rest => {
                if self.rest.consume(b) == ParseStatus::Done {
                    return ParseStatus::Done;
                }
            }
        }
        ParseStatus::Await
    }

    fn fields(&self) -> (String, String, String) {
        (
            String::from_utf8_lossy(self.first.bytes()).into_owned(),
            String::from_utf8_lossy(self.second.bytes()).into_owned(),
            String::from_utf8_lossy(self.rest.bytes()).into_owned(),
        )
    }
}

/// Parses `name: value` lines up to and including the blank line.
struct HeadersParser {
    line: UntilParser,
    parsed: Headers,
}

impl HeadersParser {
    fn new() -> Self {
        HeadersParser {
            line: UntilParser::new(b"\r\n"),
            parsed: Headers::new(),
        }
    }

    fn consume(&mut self, b: u8) -> ParseStatus {
        if self.line.consume(b) == ParseStatus::Done {
            if self.line.bytes().is_empty() {
                return ParseStatus::Done;
            }
            let line = String::from_utf8_lossy(self.line.bytes()).into_owned();
            match line.find(": ") {
                Some(i) => self.parsed.append(&line[..i], &line[i + 2..]),
                // No separator: the whole line is the name.
                None => self.parsed.append(&line, ""),
            }
            self.line.clear();
        }
        ParseStatus::Await
    }

    fn headers(&self) -> &Headers {
        &self.parsed
    }
}

/// Body length as announced by `Content-Length`.
///
/// Scans every occurrence; the last one wins, and one that does not
/// parse as a number reads as zero. No header at all also reads as
/// zero, which ends the message right after the blank line.
fn body_length(headers: &Headers) -> usize {
    let mut len = 0;
    for h in headers.iter() {
        if h.name == "Content-Length" {
            len = h.value.parse().unwrap_or(0);
        }
    }
    len
}

/// True if `Transfer-Encoding` names the `chunked` coding.
fn is_chunked(headers: &Headers) -> bool {
    headers
        .get("Transfer-Encoding")
        .map(|v| split_value(v).contains(&"chunked"))
        .unwrap_or(false)
}

/// Hex chunk-size line to byte count. Ignores chunk extensions; a line
/// with no leading hex digits reads as zero and therefore terminates.
fn chunk_length(line: &[u8]) -> usize {
    let digits: usize = line
        .iter()
        .take_while(|b| b.is_ascii_hexdigit())
        .count();
    let digits = std::str::from_utf8(&line[..digits]).unwrap_or("");
    usize::from_str_radix(digits, 16).unwrap_or(0)
}

/// Incremental parser for an HTTP/1.1 request.
///
/// State sequence: request line, then headers, then a body sized by
/// `Content-Length`. Requests are never chunked-parsed.
///
/// After [`ParseStatus::Done`] is returned, further `consume` calls
/// are undefined until [`reset`](RequestParser::reset).
pub struct RequestParser {
    state: RequestState,
    line: StartLineParser,
    headers: HeadersParser,
    body: CountedParser,
}

enum RequestState {
    Line,
    Headers,
    Body,
}

impl RequestParser {
    /// A parser in its initial state.
    pub fn new() -> Self {
        RequestParser {
            state: RequestState::Line,
            line: StartLineParser::new(),
            headers: HeadersParser::new(),
            body: CountedParser::new(),
        }
    }

    /// Discard all progress and start over.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed one byte.
    pub fn consume(&mut self, b: u8) -> ParseStatus {
        match self.state {
            RequestState::Line => {
                if self.line.consume(b) == ParseStatus::Done {
                    self.state = RequestState::Headers;
                }
            }
            RequestState::Headers => {
                if self.headers.consume(b) == ParseStatus::Done {
                    let len = body_length(self.headers.headers());
                    if len == 0 {
                        return ParseStatus::Done;
                    }
                    self.body.expect(len);
                    self.state = RequestState::Body;
                }
            }
            RequestState::Body => {
                if self.body.consume(b) == ParseStatus::Done {
                    return ParseStatus::Done;
                }
            }
        }
        ParseStatus::Await
    }

    /// The completed request. Meaningful only after `Done`.
    pub fn parsed(&self) -> Request {
        let (method, target, version) = self.line.fields();
        Request {
            line: RequestLine {
                method,
                target,
                version,
            },
            headers: self.headers.headers().clone(),
            body: self.body.bytes().to_vec(),
        }
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental parser for an HTTP/1.1 response.
///
/// Beyond the request states this handles `Transfer-Encoding:
/// chunked`: hex-sized chunks are reassembled into a plain body, and
/// the finished message carries `Content-Length` instead of
/// `Transfer-Encoding`. Chunked is input-only; serialization always
/// emits a sized body.
pub struct ResponseParser {
    state: ResponseState,
    line: StartLineParser,
    headers: HeadersParser,
    body: CountedParser,
    chunked: bool,
    chunk_len: UntilParser,
    chunk: CountedParser,
    chunked_data: Vec<u8>,
}

enum ResponseState {
    Line,
    Headers,
    Body,
    ChunkLength,
    ChunkData,
}

impl ResponseParser {
    /// A parser in its initial state.
    pub fn new() -> Self {
        ResponseParser {
            state: ResponseState::Line,
            line: StartLineParser::new(),
            headers: HeadersParser::new(),
            body: CountedParser::new(),
            chunked: false,
            chunk_len: UntilParser::new(b"\r\n"),
            chunk: CountedParser::new(),
            chunked_data: Vec::new(),
        }
    }

    /// Discard all progress and start over.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed one byte.
    pub fn consume(&mut self, b: u8) -> ParseStatus {
        match self.state {
            ResponseState::Line => {
                if self.line.consume(b) == ParseStatus::Done {
                    self.state = ResponseState::Headers;
                }
            }
            ResponseState::Headers => {
                if self.headers.consume(b) == ParseStatus::Done {
                    let len = body_length(self.headers.headers());
                    let chunked = is_chunked(self.headers.headers());
                    if len == 0 && !chunked {
                        return ParseStatus::Done;
                    }
                    if chunked {
                        self.chunked = true;
                        self.state = ResponseState::ChunkLength;
                    } else {
                        self.body.expect(len);
                        self.state = ResponseState::Body;
                    }
                }
            }
            ResponseState::Body => {
                if self.body.consume(b) == ParseStatus::Done {
                    return ParseStatus::Done;
                }
            }
            ResponseState::ChunkLength => {
                if self.chunk_len.consume(b) == ParseStatus::Done {
                    let len = chunk_length(self.chunk_len.bytes());
                    self.chunk_len.clear();
                    if len == 0 {
                        return ParseStatus::Done;
                    }
                    // The chunk body is followed by its own CRLF.
                    self.chunk.expect(len + 2);
                    self.state = ResponseState::ChunkData;
                }
            }
            ResponseState::ChunkData => {
                if self.chunk.consume(b) == ParseStatus::Done {
                    let chunk = self.chunk.bytes();
                    self.chunked_data
                        .extend_from_slice(&chunk[..chunk.len() - 2]);
                    self.state = ResponseState::ChunkLength;
                }
            }
        }
        ParseStatus::Await
    }

    /// The completed response. Meaningful only after `Done`.
    ///
    /// A chunked response comes back with the reassembled body, no
    /// `Transfer-Encoding`, and a `Content-Length` matching the body.
    pub fn parsed(&self) -> Response {
        let (version, code, reason) = self.line.fields();
        let body = if self.chunked {
            self.chunked_data.clone()
        } else {
            self.body.bytes().to_vec()
        };
        let mut response = Response {
            line: StatusLine {
                version,
                code,
                reason,
            },
            headers: self.headers.headers().clone(),
            body,
        };
        if self.chunked {
            response.update_content_length();
            response.headers.remove("Transfer-Encoding");
        }
        response
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}
