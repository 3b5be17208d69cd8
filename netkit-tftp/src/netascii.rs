//! NetASCII translation.
//!
//! RFC 764's text encoding, as TFTP uses it: a line break travels as
//! `\r\n`, and a bare carriage return travels as `\r\0` so the two can
//! be told apart on the far side.

/// Encode raw bytes as NetASCII: `\n` becomes `\r\n`, `\r` becomes
/// `\r\0`.
pub fn to_netascii(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &b in data {
        match b {
            b'\n' => out.extend_from_slice(b"\r\n"),
            b'\r' => out.extend_from_slice(b"\r\0"),
            _ => out.push(b),
        }
    }
    out
}

/// Decode NetASCII back into raw bytes. Inverse of [`to_netascii`].
pub fn from_netascii(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        match (data[i], data.get(i + 1)) {
            (b'\r', Some(b'\n')) => {
                out.push(b'\n');
                i += 2;
            }
            (b'\r', Some(0)) => {
                out.push(b'\r');
                i += 2;
            }
            (b, _) => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newline_becomes_crlf() {
        assert_eq!(to_netascii(b"\n"), b"\r\n");
        assert_eq!(from_netascii(b"\r\n"), b"\n");
    }

    #[test]
    fn carriage_return_becomes_cr_nul() {
        assert_eq!(to_netascii(b"\r"), b"\r\0");
        assert_eq!(from_netascii(b"\r\0"), b"\r");
    }

    #[test]
    fn empty_round_trips_as_empty() {
        assert_eq!(to_netascii(b""), b"");
        assert_eq!(from_netascii(b""), b"");
    }

    #[test]
    fn every_byte_string_round_trips() {
        let awkward: &[&[u8]] = &[
            b"plain text",
            b"one\ntwo\nthree\n",
            b"mixed\r\nline\rendings\n\r",
            b"\r\r\r",
            b"\n\n",
            b"\x00\x01\xff\r\n\x80",
        ];
        for &case in awkward {
            assert_eq!(
                from_netascii(&to_netascii(case)),
                case,
                "case {:?}",
                case
            );
        }
    }

    #[test]
    fn trailing_bare_cr_survives() {
        // A final \r with nothing after it decodes as itself.
        assert_eq!(from_netascii(b"end\r"), b"end\r");
    }
}
