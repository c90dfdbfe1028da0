//! Array and object codecs.
//!
//! Composites are where width discovery earns its keep: an array's wire size
//! depends on its decoded element count, and an element's own width can
//! depend on its content. Decoding therefore runs in two passes per level —
//! discover the consumed bit count against the remaining buffer, then decode.

use picopack_bitbuf::{BitReader, BitWriter};
use serde_json::{Map, Value};

use super::{count_prefix_width, read_bits, Field};
use crate::error::Error;
use crate::spec::{FieldKind, FieldSpec};

pub(super) fn encode_array(
    key: &str,
    length: usize,
    fixed: bool,
    items: &FieldSpec,
    value: &Value,
    out: &mut BitWriter,
) -> Result<(), Error> {
    let elements = value.as_array().ok_or_else(|| Error::InvalidValue {
        field: key.to_string(),
        reason: "expected an array".to_string(),
    })?;
    let count = if fixed {
        if elements.len() < length {
            return Err(Error::InvalidValue {
                field: key.to_string(),
                reason: format!(
                    "fixed array expects {length} elements, got {}",
                    elements.len()
                ),
            });
        }
        length
    } else {
        // Excess elements beyond the declared capacity are dropped.
        let count = elements.len().min(length);
        out.push_bits(count as u64, count_prefix_width(length));
        count
    };
    let item_field = Field::new(items);
    for element in &elements[..count] {
        item_field.encode(Some(element), out)?;
    }
    Ok(())
}

pub(super) fn decode_array(
    key: &str,
    length: usize,
    fixed: bool,
    items: &FieldSpec,
    input: &mut BitReader<'_>,
) -> Result<Value, Error> {
    let count = if fixed {
        length
    } else {
        read_bits(input, count_prefix_width(length), key)? as usize
    };
    let item_field = Field::new(items);
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        elements.push(item_field.decode(input)?);
    }
    Ok(Value::Array(elements))
}

/// Array width: count prefix plus decoded-count times the element width,
/// measured once against the buffer just past the prefix — elements share
/// one spec and therefore one width.
pub(super) fn array_width(
    key: &str,
    length: usize,
    fixed: bool,
    items: &FieldSpec,
    mut input: BitReader<'_>,
) -> Result<usize, Error> {
    let mut total = 0;
    let count = if fixed {
        length
    } else {
        let prefix = count_prefix_width(length);
        total += prefix;
        read_bits(&mut input, prefix, key)? as usize
    };
    if count > 0 {
        total += count * Field::new(items).width(input)?;
    }
    Ok(total)
}

pub(crate) fn encode_object(
    key: &str,
    fields: &[FieldSpec],
    value: &Value,
    out: &mut BitWriter,
) -> Result<(), Error> {
    let map = value.as_object().ok_or_else(|| Error::InvalidValue {
        field: key.to_string(),
        reason: "expected an object".to_string(),
    })?;
    for member in fields {
        let member_value = get_path(map, member.key());
        Field::new(member).encode(member_value, out)?;
    }
    Ok(())
}

pub(crate) fn decode_object(
    _key: &str,
    fields: &[FieldSpec],
    input: &mut BitReader<'_>,
) -> Result<Value, Error> {
    let mut out = Map::new();
    for member in fields {
        // Pad members consume their bits and vanish from the output. This is
        // keyed on the field type, not the decoded value.
        if let FieldKind::Pad { bits } = member.kind() {
            input
                .skip(*bits)
                .map_err(|_| Error::short_input(member.key()))?;
            continue;
        }
        let value = Field::new(member).decode(input)?;
        nest_into(&mut out, member.key(), value);
    }
    Ok(Value::Object(out))
}

/// Object width: the sum of member widths, each discovered against the
/// progressively shrinking remainder of the buffer.
pub(crate) fn object_width(fields: &[FieldSpec], mut input: BitReader<'_>) -> Result<usize, Error> {
    let mut total = 0;
    for member in fields {
        let width = Field::new(member).width(input)?;
        input
            .skip(width)
            .map_err(|_| Error::short_input(member.key()))?;
        total += width;
    }
    Ok(total)
}

/// Resolves a dotted key path inside nested mappings.
fn get_path<'v>(map: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    match key.split_once('.') {
        Some((head, rest)) => get_path(map.get(head)?.as_object()?, rest),
        None => map.get(key),
    }
}

/// Inserts a decoded member under its (possibly dotted) key, deep-merging
/// mappings that share a path prefix. Members merge in declaration order;
/// later scalars overwrite earlier ones on collision.
fn nest_into(out: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        Some((head, rest)) => {
            let slot = out
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                nest_into(inner, rest, value);
            }
        }
        None => match (out.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                out.insert(key.to_string(), value);
            }
        },
    }
}

fn deep_merge(dst: &mut Map<String, Value>, src: Map<String, Value>) {
    for (key, value) in src {
        match (dst.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                dst.insert(key, value);
            }
        }
    }
}
