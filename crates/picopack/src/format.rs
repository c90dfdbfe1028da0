//! Wire-format selector and format-tagged messages.

use std::fmt;
use std::str::FromStr;

use picopack_bitbuf::{bytes_to_hex, format_bits, hex_to_bytes, parse_bits, BitWriter};

use crate::error::Error;

/// External rendering of an encoded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Literal bit string, e.g. `"10110000"`.
    Bin,
    /// Lowercase plain hex of the byte-packed bits.
    Hex,
    /// The packed octet sequence itself.
    Bytes,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bin" => Ok(Format::Bin),
            "hex" => Ok(Format::Hex),
            "bytes" => Ok(Format::Bytes),
            other => Err(Error::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Bin => "bin",
            Format::Hex => "hex",
            Format::Bytes => "bytes",
        })
    }
}

/// An encoded message together with its rendering.
///
/// The three renderings are equivalent: hex and bytes are the nibble- and
/// octet-packed views of the same MSB-first bit vector. Inputs are validated
/// when the message is converted back to bits, so a hand-built `Message`
/// with foreign characters fails decoding with a malformed-message error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Bin(String),
    Hex(String),
    Bytes(Vec<u8>),
}

impl Message {
    pub fn format(&self) -> Format {
        match self {
            Message::Bin(_) => Format::Bin,
            Message::Hex(_) => Format::Hex,
            Message::Bytes(_) => Format::Bytes,
        }
    }

    pub fn as_bin(&self) -> Option<&str> {
        match self {
            Message::Bin(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_hex(&self) -> Option<&str> {
        match self {
            Message::Hex(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Message::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub(crate) fn from_writer(writer: &BitWriter, format: Format) -> Message {
        match format {
            Format::Bin => Message::Bin(format_bits(writer.as_bytes(), writer.len_bits())),
            Format::Hex => Message::Hex(bytes_to_hex(writer.as_bytes())),
            Format::Bytes => Message::Bytes(writer.as_bytes().to_vec()),
        }
    }

    /// Unpacks into `(bytes, bit length)`, validating the rendering.
    pub(crate) fn to_bits(&self) -> Result<(Vec<u8>, usize), Error> {
        match self {
            Message::Bin(s) => parse_bits(s).ok_or_else(|| Error::Malformed {
                reason: "input is not a valid bit string".to_string(),
            }),
            Message::Hex(s) => hex_to_bytes(s)
                .map(|bytes| {
                    let bits = bytes.len() * 8;
                    (bytes, bits)
                })
                .ok_or_else(|| Error::Malformed {
                    reason: "input is not a valid hex string".to_string(),
                }),
            Message::Bytes(bytes) => Ok((bytes.clone(), bytes.len() * 8)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_str() {
        assert_eq!("bin".parse::<Format>().unwrap(), Format::Bin);
        assert_eq!("hex".parse::<Format>().unwrap(), Format::Hex);
        assert_eq!("bytes".parse::<Format>().unwrap(), Format::Bytes);
        assert!(matches!(
            "base64".parse::<Format>(),
            Err(Error::InvalidFormat(s)) if s == "base64"
        ));
    }

    #[test]
    fn message_renderings_agree() {
        let mut w = BitWriter::new();
        w.push_bits(0xdead, 16);
        assert_eq!(
            Message::from_writer(&w, Format::Bin),
            Message::Bin("1101111010101101".to_string())
        );
        assert_eq!(
            Message::from_writer(&w, Format::Hex),
            Message::Hex("dead".to_string())
        );
        assert_eq!(
            Message::from_writer(&w, Format::Bytes),
            Message::Bytes(vec![0xde, 0xad])
        );
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        assert!(Message::Bin("012".to_string()).to_bits().is_err());
        assert!(Message::Hex("abc".to_string()).to_bits().is_err());
        assert!(Message::Hex("zz".to_string()).to_bits().is_err());
        let (bytes, bits) = Message::Bytes(vec![1, 2]).to_bits().unwrap();
        assert_eq!((bytes.len(), bits), (2, 16));
    }
}
