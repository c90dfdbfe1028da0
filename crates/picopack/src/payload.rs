//! Payload envelope and multi-spec resolution.
//!
//! The envelope is a strictly ordered, single pass over one message buffer:
//! optional version tag, optional header object, body object, zero padding to
//! the byte boundary, optional 8-bit checksum trailer. Every phase except the
//! body is switched by the spec's `meta`.

use crc::{Crc, CRC_8_SMBUS};
use picopack_bitbuf::{bytes_to_hex, BitReader, BitWriter};
use serde_json::Value;

use crate::error::Error;
use crate::field::{decode_object, encode_object};
use crate::format::{Format, Message};
use crate::spec::{FieldSpec, PayloadSpec};

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Decoded envelope metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageMeta {
    /// The spec's name.
    pub name: String,
    /// The spec's declared version (equal to the wire tag when one exists,
    /// since a mismatch fails the decode).
    pub version: i64,
    /// `"0x"`-prefixed lowercase hex of the complete received message,
    /// checksum trailer included.
    pub message: String,
    /// Checksum comparison result; `None` when the spec has no trailer.
    /// A mismatch is reported, never raised — accept/reject is caller
    /// policy.
    pub checksum: Option<bool>,
    /// Header values, wire-decoded entries merged with static ones.
    pub header: Option<Value>,
}

/// Result of decoding one message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub meta: MessageMeta,
    pub body: Value,
}

/// Encodes `data` against `spec` into the requested rendering.
pub fn encode(data: &Value, spec: &PayloadSpec, format: Format) -> Result<Message, Error> {
    let writer = bin_encode(data, spec)?;
    Ok(Message::from_writer(&writer, format))
}

/// Decodes a message against `spec`.
pub fn decode(message: &Message, spec: &PayloadSpec) -> Result<DecodedMessage, Error> {
    let (bytes, len_bits) = message.to_bits()?;
    bin_decode(&bytes, len_bits, spec)
}

/// Tries `specs` in order and returns the first successful decode.
///
/// The spec list itself is validated up front and those failures propagate;
/// per-candidate decode failures are swallowed. The version tag is what
/// disqualifies structurally compatible candidates of the wrong version.
pub fn decode_from_specs(
    message: &Message,
    specs: &[PayloadSpec],
) -> Result<DecodedMessage, Error> {
    validate_spec_set(specs)?;
    for spec in specs {
        if let Ok(decoded) = decode(message, spec) {
            return Ok(decoded);
        }
    }
    Err(Error::NoMatchingSpec)
}

/// One shared name, pairwise-distinct versions.
fn validate_spec_set(specs: &[PayloadSpec]) -> Result<(), Error> {
    let mismatch = |key: &str, reason: String| Error::TypeMismatch {
        field: "payload specs".to_string(),
        key: key.to_string(),
        reason,
    };
    if let Some(first) = specs.first() {
        if let Some(other) = specs.iter().find(|s| s.name() != first.name()) {
            return Err(mismatch(
                "name",
                format!(
                    "specs must share one name, got '{}' and '{}'",
                    first.name(),
                    other.name()
                ),
            ));
        }
    }
    let mut versions: Vec<i64> = specs.iter().map(PayloadSpec::version).collect();
    versions.sort_unstable();
    if let Some(dup) = versions.windows(2).find(|w| w[0] == w[1]) {
        return Err(mismatch(
            "version",
            format!("conflicting specs for version {}", dup[0]),
        ));
    }
    Ok(())
}

fn bin_encode(data: &Value, spec: &PayloadSpec) -> Result<BitWriter, Error> {
    let meta = spec.meta();
    let mut out = BitWriter::new();

    if meta.encode_version {
        out.push_bits(version_tag(spec.version(), meta.version_bits), meta.version_bits);
    }

    if let Some(header) = &meta.header {
        encode_object("header", &wire_header(header), data, &mut out)?;
    }

    encode_object("payload", spec.body(), data, &mut out)?;
    out.pad_to_byte();

    if meta.crc8 {
        let crc = CRC8.checksum(out.as_bytes());
        out.push_bits(crc as u64, 8);
    }
    Ok(out)
}

fn bin_decode(bytes: &[u8], len_bits: usize, spec: &PayloadSpec) -> Result<DecodedMessage, Error> {
    let meta = spec.meta();
    let rendered = format!("0x{}", bytes_to_hex(bytes));
    let mut input = BitReader::new(bytes, len_bits);

    let checksum = if meta.crc8 {
        let valid = checksum_valid(bytes, len_bits);
        input.truncate(8).map_err(|_| Error::Malformed {
            reason: "message too short for the checksum trailer".to_string(),
        })?;
        Some(valid)
    } else {
        None
    };

    if meta.encode_version {
        let found = input
            .read_bits(meta.version_bits)
            .map_err(|_| Error::short_input("version"))?;
        if found as i128 != spec.version() as i128 {
            return Err(Error::VersionMismatch {
                expected: spec.version(),
                found: i64::try_from(found).unwrap_or(i64::MAX),
            });
        }
    }

    let header = match &meta.header {
        None => None,
        Some(entries) => {
            let mut decoded = decode_object("header", &wire_header(entries), &mut input)?;
            // Entries carrying a static value never reach the wire; they are
            // injected into the decoded output verbatim.
            if let Value::Object(map) = &mut decoded {
                for entry in entries {
                    if let Some(value) = entry.static_value() {
                        map.insert(entry.key().to_string(), value.clone());
                    }
                }
            }
            Some(decoded)
        }
    };

    let body = decode_object("payload", spec.body(), &mut input)?;

    Ok(DecodedMessage {
        meta: MessageMeta {
            name: spec.name().to_string(),
            version: spec.version(),
            message: rendered,
            checksum,
            header,
        },
        body,
    })
}

/// Header entries that go on the wire: those without a static value.
fn wire_header(entries: &[FieldSpec]) -> Vec<FieldSpec> {
    entries
        .iter()
        .filter(|entry| entry.static_value().is_none())
        .cloned()
        .collect()
}

/// The version tag is an unsigned integer field: out-of-range versions clamp
/// onto the representable range.
fn version_tag(version: i64, bits: usize) -> u64 {
    let max = if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    if version < 0 {
        0
    } else {
        (version as u64).min(max)
    }
}

/// Compares the trailing 8 bits against the checksum of the preceding
/// byte-aligned payload. A message whose payload is not byte-aligned cannot
/// carry a valid trailer.
fn checksum_valid(bytes: &[u8], len_bits: usize) -> bool {
    if len_bits < 8 || (len_bits - 8) % 8 != 0 {
        return false;
    }
    let payload_bytes = (len_bits - 8) / 8;
    let mut reader = BitReader::new(bytes, len_bits);
    if reader.skip(len_bits - 8).is_err() {
        return false;
    }
    let received = match reader.read_bits(8) {
        Ok(v) => v as u8,
        Err(_) => return false,
    };
    CRC8.checksum(&bytes[..payload_bytes]) == received
}
