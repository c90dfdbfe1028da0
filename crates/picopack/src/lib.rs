//! Schema-driven bit-packing codec for size-constrained payloads.
//!
//! picopack packs structured values into minimal-length bit vectors and back,
//! following a declarative payload specification shared out of band by
//! producer and consumer. Messages self-delimit through recursive bit-width
//! discovery, so nested, variable-length structures need no framing beyond
//! the schema itself. The envelope adds optional version tagging, header
//! fields and an 8-bit checksum trailer, and an ordered set of spec versions
//! can be resolved against one message for backward-compatible decoding.
//!
//! # Example
//!
//! ```
//! use picopack::{decode, encode, Format, PayloadSpec};
//! use serde_json::json;
//!
//! let spec = PayloadSpec::from_value(&json!({
//!     "name": "telemetry",
//!     "version": 1,
//!     "body": [
//!         {"key": "battery", "type": "steps", "steps": [10, 50, 90],
//!          "steps_names": ["critical", "low", "charged", "full"]},
//!         {"key": "temperature", "type": "float", "bits": 8, "lower": -20, "upper": 60}
//!     ]
//! }))
//! .unwrap();
//!
//! let data = json!({"battery": 73, "temperature": 21.5});
//! let message = encode(&data, &spec, Format::Hex).unwrap();
//! let decoded = decode(&message, &spec).unwrap();
//! assert_eq!(decoded.body["battery"], json!("charged"));
//! ```

mod error;
mod field;
mod format;
mod payload;
mod spec;

use picopack_bitbuf::{format_bits, parse_bits, BitReader, BitWriter};
use serde_json::Value;

use crate::field::Field;

pub use error::Error;
pub use format::{Format, Message};
pub use payload::{decode, decode_from_specs, encode, DecodedMessage, MessageMeta};
pub use spec::{Approximation, FieldKind, FieldSpec, IntegerMode, PayloadSpec, TYPE_NAMES};

/// Encodes a single value against one field spec into a literal bit string.
pub fn encode_field(value: &Value, spec: &FieldSpec) -> Result<String, Error> {
    let mut out = BitWriter::new();
    Field::new(spec).encode(Some(value), &mut out)?;
    Ok(format_bits(out.as_bytes(), out.len_bits()))
}

/// Decodes a literal bit string against one field spec.
pub fn decode_field(message: &str, spec: &FieldSpec) -> Result<Value, Error> {
    let (bytes, len_bits) = parse_bits(message).ok_or_else(|| Error::Malformed {
        reason: "input is not a valid bit string".to_string(),
    })?;
    let mut input = BitReader::new(&bytes, len_bits);
    Field::new(spec).decode(&mut input)
}

/// Discovers how many leading bits of `message` the field would consume.
///
/// This is the self-delimiting half of the codec: array counts and
/// value-dependent widths make a composite's size a function of the buffer
/// itself, so the consumed length must be discovered before any slicing.
pub fn field_width(message: &str, spec: &FieldSpec) -> Result<usize, Error> {
    let (bytes, len_bits) = parse_bits(message).ok_or_else(|| Error::Malformed {
        reason: "input is not a valid bit string".to_string(),
    })?;
    Field::new(spec).width(BitReader::new(&bytes, len_bits))
}
