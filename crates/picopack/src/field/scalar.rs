//! Boolean, binary, integer, float and pad codecs.

use picopack_bitbuf::{BitReader, BitWriter};
use serde_json::Value;

use super::read_bits;
use crate::error::Error;
use crate::spec::{Approximation, IntegerMode};

fn invalid(key: &str, reason: impl Into<String>) -> Error {
    Error::InvalidValue {
        field: key.to_string(),
        reason: reason.into(),
    }
}

/// Largest value representable in `bits` bits.
fn overflow(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

pub(super) fn encode_boolean(key: &str, value: &Value, out: &mut BitWriter) -> Result<(), Error> {
    let bit = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_i64().or_else(|| n.as_u64().map(|u| u as i64)) {
            Some(i) => i != 0,
            None => return Err(invalid(key, "expected a boolean or an integer")),
        },
        _ => return Err(invalid(key, "expected a boolean or an integer")),
    };
    out.push_bit(bit);
    Ok(())
}

pub(super) fn decode_boolean(key: &str, input: &mut BitReader<'_>) -> Result<Value, Error> {
    Ok(Value::Bool(read_bits(input, 1, key)? == 1))
}

pub(super) fn encode_binary(
    key: &str,
    bits: usize,
    value: &Value,
    out: &mut BitWriter,
) -> Result<(), Error> {
    let s = value
        .as_str()
        .ok_or_else(|| invalid(key, "expected a bit or hex string"))?;
    let source: Vec<bool> = if !s.is_empty() && s.chars().all(|c| c == '0' || c == '1') {
        s.chars().map(|c| c == '1').collect()
    } else if !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit()) {
        // Nibble-to-4-bits expansion.
        s.chars()
            .flat_map(|c| {
                let nibble = c.to_digit(16).unwrap_or(0) as u8;
                (0..4).rev().map(move |i| nibble & (1u8 << i) != 0)
            })
            .collect()
    } else {
        return Err(invalid(key, "expected a bit or hex string"));
    };
    // Left-pad with zeroes, then keep the leading `bits` bits.
    if source.len() < bits {
        out.push_repeated(false, bits - source.len());
        for bit in source {
            out.push_bit(bit);
        }
    } else {
        for bit in &source[..bits] {
            out.push_bit(*bit);
        }
    }
    Ok(())
}

pub(super) fn decode_binary(
    key: &str,
    bits: usize,
    input: &mut BitReader<'_>,
) -> Result<Value, Error> {
    let mut s = String::with_capacity(bits);
    for _ in 0..bits {
        let bit = input.read_bit().map_err(|_| Error::short_input(key))?;
        s.push(if bit { '1' } else { '0' });
    }
    Ok(Value::String(s))
}

pub(super) fn encode_integer(
    key: &str,
    bits: u32,
    offset: i64,
    mode: IntegerMode,
    value: &Value,
    out: &mut BitWriter,
) -> Result<(), Error> {
    let n = integer_input(value).ok_or_else(|| invalid(key, "expected an integer"))?;
    let shifted = n as i128 - offset as i128;
    let raw = match mode {
        IntegerMode::Truncate => shifted.clamp(0, overflow(bits) as i128) as u64,
        IntegerMode::Remainder => shifted.rem_euclid(1i128 << bits) as u64,
    };
    out.push_bits(raw, bits as usize);
    Ok(())
}

pub(super) fn decode_integer(
    key: &str,
    bits: u32,
    offset: i64,
    input: &mut BitReader<'_>,
) -> Result<Value, Error> {
    let raw = read_bits(input, bits as usize, key)?;
    let value = offset as i128 + raw as i128;
    if let Ok(n) = i64::try_from(value) {
        Ok(Value::from(n))
    } else {
        Ok(Value::from(value as u64))
    }
}

/// Accepts JSON integers, and floats whose fractional part is zero.
fn integer_input(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
}

pub(super) fn encode_float(
    key: &str,
    bits: u32,
    lower: f64,
    upper: f64,
    approximation: Approximation,
    value: &Value,
    out: &mut BitWriter,
) -> Result<(), Error> {
    let x = value
        .as_f64()
        .ok_or_else(|| invalid(key, "expected a number"))?;
    let overflow = overflow(bits) as f64;
    let scaled = (overflow * (x - lower) / (upper - lower)).clamp(0.0, overflow);
    let raw = match approximation {
        Approximation::Round => scaled.round_ties_even(),
        Approximation::Floor => scaled.floor(),
        Approximation::Ceil => scaled.ceil(),
    };
    out.push_bits(raw as u64, bits as usize);
    Ok(())
}

pub(super) fn decode_float(
    key: &str,
    bits: u32,
    lower: f64,
    upper: f64,
    input: &mut BitReader<'_>,
) -> Result<Value, Error> {
    let raw = read_bits(input, bits as usize, key)?;
    let value = raw as f64 * (upper - lower) / overflow(bits) as f64 + lower;
    Ok(Value::from(value))
}

/// Reserved filler: `bits` one-bits, regardless of input.
pub(super) fn encode_pad(bits: usize, out: &mut BitWriter) {
    out.push_repeated(true, bits);
}

/// Reports only the consumed bit count; enclosing objects drop the member.
pub(super) fn decode_pad(
    key: &str,
    bits: usize,
    input: &mut BitReader<'_>,
) -> Result<Value, Error> {
    input.skip(bits).map_err(|_| Error::short_input(key))?;
    Ok(Value::from(bits))
}
