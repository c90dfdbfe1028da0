//! Runtime field codecs.
//!
//! A [`Field`] binds one validated [`FieldSpec`] for the duration of a single
//! encode, decode or width-discovery call. It owns no long-lived state:
//! derived tables (string alphabets) are rebuilt per call, so concurrent
//! callers never share anything but the immutable spec.

mod composite;
mod scalar;
mod text;

use picopack_bitbuf::{BitReader, BitWriter};
use serde_json::Value;

use crate::error::Error;
use crate::spec::{FieldKind, FieldSpec};

pub(crate) use composite::{decode_object, encode_object};

/// Uniform encode / decode / width-discovery facade over one field spec.
pub(crate) struct Field<'s> {
    spec: &'s FieldSpec,
}

impl<'s> Field<'s> {
    pub fn new(spec: &'s FieldSpec) -> Self {
        Field { spec }
    }

    /// Encodes `value` onto `out`.
    ///
    /// `value` may be `None` for pad fields and for specs carrying a static
    /// value; anything else fails as an invalid (missing) value.
    pub fn encode(&self, value: Option<&Value>, out: &mut BitWriter) -> Result<(), Error> {
        let key = self.spec.key();
        let value = match self.spec.static_value() {
            Some(fixed) => Some(fixed),
            None => value,
        };
        if let FieldKind::Pad { bits } = self.spec.kind() {
            scalar::encode_pad(*bits, out);
            return Ok(());
        }
        let value = value.ok_or_else(|| Error::InvalidValue {
            field: key.to_string(),
            reason: "value is missing".to_string(),
        })?;
        match self.spec.kind() {
            FieldKind::Boolean => scalar::encode_boolean(key, value, out),
            FieldKind::Binary { bits } => scalar::encode_binary(key, *bits, value, out),
            FieldKind::Integer { bits, offset, mode } => {
                scalar::encode_integer(key, *bits, *offset, *mode, value, out)
            }
            FieldKind::Float {
                bits,
                lower,
                upper,
                approximation,
            } => scalar::encode_float(key, *bits, *lower, *upper, *approximation, value, out),
            FieldKind::Pad { .. } => unreachable!("pad handled above"),
            FieldKind::String { length, overrides } => {
                text::encode_string(key, *length, overrides, value, out)
            }
            FieldKind::Steps { boundaries, .. } => {
                text::encode_steps(key, boundaries, value, out)
            }
            FieldKind::Categories { categories, error } => {
                text::encode_categories(key, categories, error.as_deref(), value, out)
            }
            FieldKind::Array {
                length,
                fixed,
                items,
            } => composite::encode_array(key, *length, *fixed, items, value, out),
            FieldKind::Object { fields } => composite::encode_object(key, fields, value, out),
        }
    }

    /// Decodes one value, consuming this field's bits from `input`.
    ///
    /// A pad field decodes to its consumed bit count; enclosing objects drop
    /// pad members by field type, so the count only surfaces from top-level
    /// single-field decoding.
    pub fn decode(&self, input: &mut BitReader<'_>) -> Result<Value, Error> {
        let key = self.spec.key();
        match self.spec.kind() {
            FieldKind::Boolean => scalar::decode_boolean(key, input),
            FieldKind::Binary { bits } => scalar::decode_binary(key, *bits, input),
            FieldKind::Integer { bits, offset, .. } => {
                scalar::decode_integer(key, *bits, *offset, input)
            }
            FieldKind::Float {
                bits, lower, upper, ..
            } => scalar::decode_float(key, *bits, *lower, *upper, input),
            FieldKind::Pad { bits } => scalar::decode_pad(key, *bits, input),
            FieldKind::String { length, overrides } => {
                text::decode_string(key, *length, overrides, input)
            }
            FieldKind::Steps {
                boundaries, labels, ..
            } => text::decode_steps(key, boundaries, labels, input),
            FieldKind::Categories { categories, error } => {
                text::decode_categories(key, categories, error.as_deref(), input)
            }
            FieldKind::Array {
                length,
                fixed,
                items,
            } => composite::decode_array(key, *length, *fixed, items, input),
            FieldKind::Object { fields } => composite::decode_object(key, fields, input),
        }
    }

    /// Discovers how many leading bits of `input` this field would consume,
    /// without consuming them.
    ///
    /// Needed before any slice-based decode of a composite: array element
    /// counts and value-dependent widths are only known from the buffer
    /// itself. The reader is taken by copy; the caller's cursor stays put.
    pub fn width(&self, input: BitReader<'_>) -> Result<usize, Error> {
        let key = self.spec.key();
        match self.spec.kind() {
            FieldKind::Boolean => Ok(1),
            FieldKind::Binary { bits } | FieldKind::Pad { bits } => Ok(*bits),
            FieldKind::Integer { bits, .. } | FieldKind::Float { bits, .. } => Ok(*bits as usize),
            FieldKind::String { length, .. } => Ok(length * 6),
            FieldKind::Steps { boundaries, .. } => Ok(steps_width(boundaries.len())),
            FieldKind::Categories { categories, error } => {
                Ok(categories_width(categories, error.as_deref()))
            }
            FieldKind::Array {
                length,
                fixed,
                items,
            } => composite::array_width(key, *length, *fixed, items, input),
            FieldKind::Object { fields } => composite::object_width(fields, input),
        }
    }
}

/// Bits needed to represent `count` distinct values: `ceil(log2(count))`.
pub(crate) fn bits_for(count: usize) -> usize {
    if count <= 1 {
        0
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as usize
    }
}

/// Width of a steps field: one code per interval, `boundaries + 1` of them.
pub(crate) fn steps_width(boundary_count: usize) -> usize {
    bits_for(boundary_count + 1)
}

/// Width of a categories field, counting the reserved slot when an error
/// label is configured but not itself a category.
pub(crate) fn categories_width(categories: &[String], error: Option<&str>) -> usize {
    let reserved = match error {
        Some(label) => !categories.iter().any(|c| c == label) as usize,
        None => 0,
    };
    bits_for(categories.len() + reserved)
}

/// Width of an array's element-count prefix.
pub(crate) fn count_prefix_width(length: usize) -> usize {
    bits_for(length + 1)
}

/// Reads `width` bits, mapping an underrun to a malformed-message failure
/// naming `key`.
pub(crate) fn read_bits(input: &mut BitReader<'_>, width: usize, key: &str) -> Result<u64, Error> {
    input.read_bits(width).map_err(|_| Error::short_input(key))
}
