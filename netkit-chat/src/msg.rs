//! Chat messages and their wire framing.

use std::io;

use chrono::{DateTime, Local, TimeZone};
use netkit_bytes::BufferedReader;
use tokio::io::AsyncRead;

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Who said it. Purely declarative; the server does not check.
    pub author: String,
    /// When the server accepted it, in unix seconds. Clients send 0.
    pub accepted: i64,
    /// What was said, without any trailing newline.
    pub text: String,
}

impl Message {
    /// Construct a message.
    pub fn new(author: impl Into<String>, accepted: i64, text: impl Into<String>) -> Self {
        Message {
            author: author.into(),
            accepted,
            text: text.into(),
        }
    }

    /// Encode this message for the wire.
    ///
    /// Four newline-terminated fields: the decimal byte length of the
    /// text plus one (for its own trailing newline), the author, the
    /// timestamp, and the text.
    ///
    /// ```
    /// use netkit_chat::Message;
    /// let m = Message::new("Alice", 0, "Hello!");
    /// assert_eq!(m.encode(), b"7\nAlice\n0\nHello!\n");
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{}\n{}\n{}\n{}\n",
            self.text.len() + 1,
            self.author,
            self.accepted,
            self.text
        )
        .into_bytes()
    }

    /// Render this message for a terminal, using local time.
    pub fn show(&self) -> String {
        self.show_in(&Local)
    }

    /// Render this message in an explicit timezone.
    ///
    /// Split out from [`show`](Message::show) so tests don't depend on
    /// the timezone of the machine they run on.
    pub fn show_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let accepted = DateTime::from_timestamp(self.accepted, 0)
            .unwrap_or_default()
            .with_timezone(tz);
        format!(
            "<{}> [{}] {}",
            accepted.format("%H:%M"),
            self.author,
            self.text
        )
    }
}

/// Decode one message off `reader`.
///
/// `Ok(None)` means the peer is gone: either a clean EOF on the length
/// line, or a frame too mangled to make sense of. The protocol has no
/// way to resynchronize, so a bad frame and a hangup look the same to
/// callers.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut BufferedReader<R>,
) -> io::Result<Option<Message>> {
    let len_line = reader.read_until(b'\n').await?;
    if len_line.is_empty() {
        // EOF before a new frame: clean disconnect.
        return Ok(None);
    }
    let len: usize = match std::str::from_utf8(&len_line).ok().and_then(|s| s.parse().ok()) {
        Some(n) => n,
        None => return Ok(None),
    };

    let author = String::from_utf8_lossy(&reader.read_until(b'\n').await?).into_owned();
    let stamp_line = reader.read_until(b'\n').await?;
    let accepted: i64 = std::str::from_utf8(&stamp_line)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let mut text = reader.read_n(len).await?;
    if text.len() < len {
        // EOF in the middle of the text field.
        return Ok(None);
    }
    if text.last() == Some(&b'\n') {
        text.pop();
    }

    Ok(Some(Message {
        author,
        accepted,
        text: String::from_utf8_lossy(&text).into_owned(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    async fn decode(bytes: &[u8]) -> io::Result<Option<Message>> {
        let mut reader = BufferedReader::new(bytes);
        read_message(&mut reader).await
    }

    #[test]
    fn encoding_matches_wire_format() {
        let m = Message::new("Alice", 0, "Hello!");
        assert_eq!(m.encode(), b"7\nAlice\n0\nHello!\n");
    }

    #[tokio::test]
    async fn decoding_inverts_encoding() {
        let m = Message::new("Alice", 0, "Hello!");
        let decoded = decode(b"7\nAlice\n0\nHello!\n").await.expect("io");
        assert_eq!(decoded, Some(m));
    }

    #[tokio::test]
    async fn round_trip_with_timestamp_and_spaces() {
        let m = Message::new("Peter the Great", 1_585_445_130, "two words ");
        let decoded = decode(&m.encode()).await.expect("io");
        assert_eq!(decoded, Some(m));
    }

    #[tokio::test]
    async fn eof_on_length_line_is_clean_disconnect() {
        assert_eq!(decode(b"").await.expect("io"), None);
    }

    #[tokio::test]
    async fn garbage_length_reads_as_disconnect() {
        assert_eq!(decode(b"banana\nAlice\n0\nHello!\n").await.expect("io"), None);
    }

    #[tokio::test]
    async fn truncated_text_reads_as_disconnect() {
        assert_eq!(decode(b"20\nAlice\n0\nshort\n").await.expect("io"), None);
    }

    #[test]
    fn show_renders_hours_and_minutes() {
        let utc3 = FixedOffset::east_opt(3 * 3600).expect("offset");
        let accepted = utc3
            .with_ymd_and_hms(2020, 3, 29, 4, 20, 30)
            .single()
            .expect("valid time")
            .timestamp();
        let m = Message::new("Peter", accepted, "Hello!");
        assert_eq!(m.show_in(&utc3), "<04:20> [Peter] Hello!");
    }

    #[test]
    fn show_pads_with_zeros() {
        let utc = FixedOffset::east_opt(0).expect("offset");
        let accepted = utc
            .with_ymd_and_hms(2020, 3, 29, 0, 5, 0)
            .single()
            .expect("valid time")
            .timestamp();
        let m = Message::new("Peter", accepted, "night");
        assert_eq!(m.show_in(&utc), "<00:05> [Peter] night");
    }
}
