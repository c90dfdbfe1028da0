//! String, steps and categories codecs.

use picopack_bitbuf::{BitReader, BitWriter};
use serde_json::Value;

use super::{categories_width, read_bits, steps_width};
use crate::error::Error;

/// Base64-ordered default alphabet for 6-bit character codes. Index 62 also
/// serves as the space fallback and 63 as the catch-all for unmapped
/// characters.
const DEFAULT_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

/// Forward and reverse character tables, built once per instantiated field
/// and owned by it.
struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    fn new(overrides: &[(usize, char)]) -> Self {
        let mut chars: Vec<char> = DEFAULT_ALPHABET.chars().collect();
        for (index, replacement) in overrides {
            chars[*index] = *replacement;
        }
        Alphabet { chars }
    }

    fn index_of(&self, c: char) -> u64 {
        match self.chars.iter().position(|&a| a == c) {
            Some(i) => i as u64,
            None if c == ' ' => 62,
            None => 63,
        }
    }

    fn char_at(&self, index: u64) -> char {
        self.chars[index as usize]
    }
}

pub(super) fn encode_string(
    key: &str,
    length: usize,
    overrides: &[(usize, char)],
    value: &Value,
    out: &mut BitWriter,
) -> Result<(), Error> {
    let s = value.as_str().ok_or_else(|| Error::InvalidValue {
        field: key.to_string(),
        reason: "expected a string".to_string(),
    })?;
    let alphabet = Alphabet::new(overrides);
    // Left-pad with spaces, then keep exactly `length` characters.
    let chars: Vec<char> = s.chars().collect();
    let pad = length.saturating_sub(chars.len());
    let padded = std::iter::repeat(' ')
        .take(pad)
        .chain(chars.into_iter())
        .take(length);
    for c in padded {
        out.push_bits(alphabet.index_of(c), 6);
    }
    Ok(())
}

pub(super) fn decode_string(
    key: &str,
    length: usize,
    overrides: &[(usize, char)],
    input: &mut BitReader<'_>,
) -> Result<Value, Error> {
    let alphabet = Alphabet::new(overrides);
    let mut s = String::with_capacity(length);
    for _ in 0..length {
        let index = read_bits(input, 6, key)?;
        s.push(alphabet.char_at(index));
    }
    Ok(Value::String(s))
}

pub(super) fn encode_steps(
    key: &str,
    boundaries: &[f64],
    value: &Value,
    out: &mut BitWriter,
) -> Result<(), Error> {
    let x = value.as_f64().ok_or_else(|| Error::InvalidValue {
        field: key.to_string(),
        reason: "expected a number".to_string(),
    })?;
    // Index of the first boundary strictly greater than the value; a value
    // equal to a boundary falls in the interval that boundary starts.
    let index = boundaries
        .iter()
        .position(|b| x < *b)
        .unwrap_or(boundaries.len());
    out.push_bits(index as u64, steps_width(boundaries.len()));
    Ok(())
}

pub(super) fn decode_steps(
    key: &str,
    boundaries: &[f64],
    labels: &[String],
    input: &mut BitReader<'_>,
) -> Result<Value, Error> {
    let index = read_bits(input, steps_width(boundaries.len()), key)? as usize;
    let label = labels.get(index).ok_or_else(|| Error::OutOfDomain {
        field: key.to_string(),
        reason: format!("interval index {index} has no label"),
    })?;
    Ok(Value::String(label.clone()))
}

pub(super) fn encode_categories(
    key: &str,
    categories: &[String],
    error: Option<&str>,
    value: &Value,
    out: &mut BitWriter,
) -> Result<(), Error> {
    let s = value.as_str().ok_or_else(|| Error::InvalidValue {
        field: key.to_string(),
        reason: "expected a string".to_string(),
    })?;
    let width = categories_width(categories, error);
    let index = match categories.iter().position(|c| c == s) {
        Some(i) => i,
        None => match error {
            Some(label) => match categories.iter().position(|c| c == label) {
                Some(i) => i,
                None => categories.len(),
            },
            // Without an error fallback the overflow slot is only usable
            // when the width leaves a spare code.
            None if (categories.len() as u64) < (1u64 << width) => categories.len(),
            None => {
                return Err(Error::OutOfDomain {
                    field: key.to_string(),
                    reason: format!("'{s}' is not a known category"),
                })
            }
        },
    };
    out.push_bits(index as u64, width);
    Ok(())
}

pub(super) fn decode_categories(
    key: &str,
    categories: &[String],
    error: Option<&str>,
    input: &mut BitReader<'_>,
) -> Result<Value, Error> {
    let index = read_bits(input, categories_width(categories, error), key)? as usize;
    let label = match categories.get(index) {
        Some(category) => category.clone(),
        None => match error {
            Some(label) if index == categories.len() => label.to_string(),
            _ => "error".to_string(),
        },
    };
    Ok(Value::String(label))
}
