//! TFTP packets and their binary codec.
//!
//! Wire layouts, all integers big-endian:
//!
//! ```ignore
//!  RRQ/WRQ : u16 op | filename | 0 | mode | 0
//!  DATA    : u16 op | u16 block | payload[0..512]
//!  ACK     : u16 op | u16 block
//!  ERROR   : u16 op | u16 code | message | 0
//! ```

use std::fmt;

use caret::caret_int;
use netkit_bytes::{Reader, Writer};

use crate::netascii::{from_netascii, to_netascii};
use crate::ParseError;

/// The payload size of every DATA block except the last.
pub const MAX_BLOCK_LEN: usize = 512;

caret_int! {
    /// A TFTP operation code.
    ///
    /// Any u16 can appear on the wire; only these five are meaningful.
    pub struct Opcode(u16) {
        /// Read request.
        RRQ = 1,
        /// Write request.
        WRQ = 2,
        /// One block of file content.
        DATA = 3,
        /// Acknowledgment of one block.
        ACK = 4,
        /// Terminal error report.
        ERROR = 5,
    }
}

caret_int! {
    /// A TFTP error code, as carried in ERROR packets.
    pub struct ErrorCode(u16) {
        /// Not defined, see error message.
        UNDEFINED = 0,
        /// File not found.
        FILE_NOT_FOUND = 1,
        /// Access violation.
        ACCESS_VIOLATION = 2,
        /// Disk full or allocation exceeded.
        DISK_FULL = 3,
        /// Illegal TFTP operation.
        ILLEGAL_OPERATION = 4,
        /// Unknown transfer ID.
        UNKNOWN_TRANSFER_ID = 5,
        /// File already exists.
        FILE_EXISTS = 6,
        /// No such user.
        NO_USER = 7,
    }
}

impl ErrorCode {
    /// The stock RFC 1350 text for this code.
    ///
    /// Codes 0 and 7 have none and yield the empty string.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::FILE_NOT_FOUND => "File not found",
            ErrorCode::ACCESS_VIOLATION => "Access violation",
            ErrorCode::DISK_FULL => "Disk full or allocation exceeded",
            ErrorCode::ILLEGAL_OPERATION => "Illegal TFTP operation",
            ErrorCode::UNKNOWN_TRANSFER_ID => "Unknown transfer ID",
            ErrorCode::FILE_EXISTS => "File already exists",
            _ => "",
        }
    }
}

/// A file transfer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Text mode: content travels NetASCII-encoded.
    Netascii,
    /// Binary mode: content travels verbatim.
    Octet,
}

impl Mode {
    /// The lowercase name used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Mode::Netascii => "netascii",
            Mode::Octet => "octet",
        }
    }

    /// Match a wire mode string, case-insensitively.
    pub fn from_wire(name: &str) -> Option<Mode> {
        match name.to_ascii_lowercase().as_str() {
            "netascii" => Some(Mode::Netascii),
            "octet" => Some(Mode::Octet),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Netascii => write!(f, "NetASCII"),
            Mode::Octet => write!(f, "Octet"),
        }
    }
}

/// One TFTP packet of any kind.
///
/// Filenames and error messages are stored decoded; the codec applies
/// NetASCII on the way to and from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Read request: "send me this file".
    Rrq {
        /// The file to read, verbatim as a path.
        filename: String,
        /// How the content should travel.
        mode: Mode,
    },
    /// Write request: "take this file from me".
    Wrq {
        /// The file to create, verbatim as a path.
        filename: String,
        /// How the content will travel.
        mode: Mode,
    },
    /// One block of content. Fewer than 512 payload bytes ends the
    /// transfer.
    Data {
        /// Block number, starting at 1.
        block: u16,
        /// The content, at most 512 bytes.
        payload: Vec<u8>,
    },
    /// Acknowledgment of one block (0 acknowledges a write request).
    Ack {
        /// The block being acknowledged.
        block: u16,
    },
    /// Terminal error report. Never acknowledged, never retransmitted.
    Error {
        /// What went wrong, as an RFC 1350 code.
        code: ErrorCode,
        /// Human-readable detail.
        message: String,
    },
}

impl Packet {
    /// Build an ERROR packet, substituting the code's stock text when
    /// `message` is empty.
    pub fn error(code: ErrorCode, message: &str) -> Packet {
        let message = if message.is_empty() {
            code.default_message().to_string()
        } else {
            message.to_string()
        };
        Packet::Error { code, message }
    }

    /// The operation code of this packet.
    pub fn opcode(&self) -> Opcode {
        match self {
            Packet::Rrq { .. } => Opcode::RRQ,
            Packet::Wrq { .. } => Opcode::WRQ,
            Packet::Data { .. } => Opcode::DATA,
            Packet::Ack { .. } => Opcode::ACK,
            Packet::Error { .. } => Opcode::ERROR,
        }
    }

    /// Encode this packet into wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        out.write_u16(self.opcode().into());
        match self {
            Packet::Rrq { filename, mode } | Packet::Wrq { filename, mode } => {
                out.write(&to_netascii(filename.as_bytes()));
                out.write_u8(0);
                out.write_all(mode.wire_name().as_bytes());
                out.write_u8(0);
            }
            Packet::Data { block, payload } => {
                out.write_u16(*block);
                out.write_all(payload);
            }
            Packet::Ack { block } => {
                out.write_u16(*block);
            }
            Packet::Error { code, message } => {
                out.write_u16((*code).into());
                out.write(&to_netascii(message.as_bytes()));
                out.write_u8(0);
            }
        }
        out
    }

    /// Decode one packet from a received datagram.
    pub fn decode(buf: &[u8]) -> std::result::Result<Packet, ParseError> {
        let mut r = Reader::from_slice(buf);
        let opcode: Opcode = r.take_u16()?.into();
        match opcode {
            Opcode::RRQ | Opcode::WRQ => {
                let filename = string_field(r.take_until(0)?);
                let mode_raw = String::from_utf8_lossy(r.take_until(0)?).into_owned();
                let mode = Mode::from_wire(&mode_raw).ok_or(ParseError::BadMode(mode_raw))?;
                if opcode == Opcode::RRQ {
                    Ok(Packet::Rrq { filename, mode })
                } else {
                    Ok(Packet::Wrq { filename, mode })
                }
            }
            Opcode::DATA => {
                let block = r.take_u16()?;
                Ok(Packet::Data {
                    block,
                    payload: r.into_rest().to_vec(),
                })
            }
            Opcode::ACK => Ok(Packet::Ack {
                block: r.take_u16()?,
            }),
            Opcode::ERROR => {
                let code: ErrorCode = r.take_u16()?.into();
                let message = string_field(r.take_until(0)?);
                Ok(Packet::Error { code, message })
            }
            _ => Err(ParseError::UnknownOpcode(opcode)),
        }
    }
}

/// Decode a zero-terminated NetASCII string field.
fn string_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&from_netascii(bytes)).into_owned()
}

/// The one-line rendering used by the packet trace logs.
impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Rrq { filename, mode } => {
                write!(f, "ReadRequest Filename={:?} Mode={}", filename, mode)
            }
            Packet::Wrq { filename, mode } => {
                write!(f, "WriteRequest Filename={:?} Mode={}", filename, mode)
            }
            Packet::Data { block, payload } => {
                write!(f, "Data BlockID={} Data=[{} bytes]", block, payload.len())
            }
            Packet::Ack { block } => write!(f, "Acknowledge BlockID={}", block),
            Packet::Error { code, message } => {
                write!(f, "Error Type={} Message={:?}", u16::from(*code), message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_encodings() {
        let rrq = Packet::Rrq {
            filename: "file.txt".into(),
            mode: Mode::Octet,
        };
        assert_eq!(rrq.encode(), b"\x00\x01file.txt\x00octet\x00");

        let wrq = Packet::Wrq {
            filename: "file.txt".into(),
            mode: Mode::Netascii,
        };
        assert_eq!(wrq.encode(), b"\x00\x02file.txt\x00netascii\x00");
    }

    #[test]
    fn data_and_ack_encodings() {
        let data = Packet::Data {
            block: 0x1234,
            payload: hex::decode("deadbeef").expect("hex"),
        };
        assert_eq!(data.encode(), hex::decode("00031234deadbeef").expect("hex"));

        let ack = Packet::Ack { block: 0x102f };
        assert_eq!(ack.encode(), hex::decode("0004102f").expect("hex"));
    }

    #[test]
    fn error_with_empty_message_takes_default_text() {
        let err = Packet::error(ErrorCode::UNKNOWN_TRANSFER_ID, "");
        assert_eq!(err.encode(), b"\x00\x05\x00\x05Unknown transfer ID\x00");

        // Codes without stock text stay empty.
        let undef = Packet::error(ErrorCode::UNDEFINED, "");
        assert_eq!(undef.encode(), b"\x00\x05\x00\x00\x00");
    }

    #[test]
    fn every_kind_round_trips() {
        let packets = [
            Packet::Rrq {
                filename: "dir/notes.txt".into(),
                mode: Mode::Netascii,
            },
            Packet::Wrq {
                filename: "out.bin".into(),
                mode: Mode::Octet,
            },
            Packet::Data {
                block: 1,
                payload: vec![0; MAX_BLOCK_LEN],
            },
            Packet::Data {
                block: 65535,
                payload: Vec::new(),
            },
            Packet::Ack { block: 0 },
            Packet::error(ErrorCode::FILE_NOT_FOUND, ""),
            Packet::error(ErrorCode::UNDEFINED, "something odd"),
        ];
        for p in packets {
            assert_eq!(Packet::decode(&p.encode()), Ok(p.clone()), "packet {:?}", p);
        }
    }

    #[test]
    fn filenames_travel_netascii_encoded() {
        let rrq = Packet::Rrq {
            filename: "odd\nname".into(),
            mode: Mode::Octet,
        };
        let wire = rrq.encode();
        assert_eq!(&wire[..2], b"\x00\x01");
        assert!(wire.windows(9).any(|w| w == b"odd\r\nname"));
        assert_eq!(Packet::decode(&wire), Ok(rrq));
    }

    #[test]
    fn mode_matching_is_case_insensitive() {
        let wire = b"\x00\x01f\x00OcTeT\x00";
        assert_eq!(
            Packet::decode(wire),
            Ok(Packet::Rrq {
                filename: "f".into(),
                mode: Mode::Octet
            })
        );
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let wire = b"\x00\x01f\x00mail\x00";
        assert_eq!(
            Packet::decode(wire),
            Err(ParseError::BadMode("mail".into()))
        );
    }

    #[test]
    fn unknown_opcode_is_a_parse_error() {
        let err = Packet::decode(b"\x00\x09whatever").expect_err("must fail");
        assert_eq!(err, ParseError::UnknownOpcode(9.into()));
        assert_eq!(err.error_code(), ErrorCode::ILLEGAL_OPERATION);
    }

    #[test]
    fn truncated_packets_are_parse_errors() {
        assert_eq!(Packet::decode(b""), Err(ParseError::Truncated));
        assert_eq!(Packet::decode(b"\x00"), Err(ParseError::Truncated));
        // ACK missing its block number.
        assert_eq!(Packet::decode(b"\x00\x04\x10"), Err(ParseError::Truncated));
        // RRQ with no mode field at all.
        assert_eq!(Packet::decode(b"\x00\x01hi"), Err(ParseError::Truncated));
        // RRQ whose mode is missing its terminator.
        assert_eq!(
            Packet::decode(b"\x00\x01hi\x00octet"),
            Err(ParseError::Truncated)
        );
    }
}
