//! Canonical, validated schema types.
//!
//! A [`FieldSpec`] arrives as external configuration (a `serde_json::Value`
//! tree) and is parsed exactly once into a fully-defaulted, immutable form:
//! every optional setting is filled with its declared default, type-specific
//! initialization runs (boundary ordering, label generation, nested field
//! construction), and anything outside the declared key set is rejected.
//! After construction nothing is ever mutated.

use serde_json::{Map, Value};

use crate::error::Error;

/// Registered field type names, in registry order.
pub const TYPE_NAMES: [&str; 10] = [
    "boolean",
    "binary",
    "integer",
    "float",
    "pad",
    "string",
    "steps",
    "categories",
    "array",
    "object",
];

/// Overflow policy for integer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerMode {
    /// Clamp into `[0, 2^bits - 1]`.
    Truncate,
    /// Wrap with Euclidean modulo `2^bits`.
    Remainder,
}

/// Rounding policy for float fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approximation {
    /// Round half to even.
    Round,
    Floor,
    Ceil,
}

/// One field encoding, with all settings defaulted and validated.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Boolean,
    Binary {
        bits: usize,
    },
    Integer {
        bits: u32,
        offset: i64,
        mode: IntegerMode,
    },
    Float {
        bits: u32,
        lower: f64,
        upper: f64,
        approximation: Approximation,
    },
    Pad {
        bits: usize,
    },
    String {
        length: usize,
        /// Per-index replacements for the default 6-bit alphabet.
        overrides: Vec<(usize, char)>,
    },
    Steps {
        /// Non-decreasing interval boundaries (the `+inf` sentinel is
        /// implicit).
        boundaries: Vec<f64>,
        /// One label per interval: `boundaries.len() + 1` entries.
        labels: Vec<String>,
    },
    Categories {
        categories: Vec<String>,
        error: Option<String>,
    },
    Array {
        length: usize,
        fixed: bool,
        items: Box<FieldSpec>,
    },
    Object {
        fields: Vec<FieldSpec>,
    },
}

impl FieldKind {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Boolean => "boolean",
            FieldKind::Binary { .. } => "binary",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Float { .. } => "float",
            FieldKind::Pad { .. } => "pad",
            FieldKind::String { .. } => "string",
            FieldKind::Steps { .. } => "steps",
            FieldKind::Categories { .. } => "categories",
            FieldKind::Array { .. } => "array",
            FieldKind::Object { .. } => "object",
        }
    }
}

/// A validated, immutable field specification.
///
/// Construct with [`FieldSpec::from_value`] (external JSON configuration) or
/// [`FieldSpec::new`] (programmatic). Both run the full construction
/// contract; a `FieldSpec` in hand is always internally consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    key: String,
    kind: FieldKind,
    value: Option<Value>,
}

impl FieldSpec {
    /// Builds a spec from a key and a kind, validating kind invariants and
    /// filling derived settings (auto-generated step labels).
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Result<FieldSpec, Error> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::TypeMismatch {
                field: "field spec".to_string(),
                key: "key".to_string(),
                reason: "must be a non-empty string".to_string(),
            });
        }
        let kind = validate_kind(&key, kind)?;
        Ok(FieldSpec {
            key,
            kind,
            value: None,
        })
    }

    /// Like [`FieldSpec::new`], with a static value that is encoded in place
    /// of runtime input.
    pub fn with_static_value(
        key: impl Into<String>,
        kind: FieldKind,
        value: Value,
    ) -> Result<FieldSpec, Error> {
        let mut spec = FieldSpec::new(key, kind)?;
        spec.value = Some(value);
        Ok(spec)
    }

    /// Parses a spec from external JSON configuration.
    pub fn from_value(v: &Value) -> Result<FieldSpec, Error> {
        let obj = v.as_object().ok_or_else(|| Error::TypeMismatch {
            field: render_spec(v),
            key: "key".to_string(),
            reason: "field spec must be an object".to_string(),
        })?;

        let key = match obj.get("key") {
            None => {
                return Err(Error::MissingKey {
                    field: render_spec(v),
                    key: "key".to_string(),
                })
            }
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(_) => {
                return Err(Error::TypeMismatch {
                    field: render_spec(v),
                    key: "key".to_string(),
                    reason: "must be a non-empty string".to_string(),
                })
            }
        };

        let type_name = match obj.get("type") {
            None => {
                return Err(Error::MissingKey {
                    field: key,
                    key: "type".to_string(),
                })
            }
            Some(Value::String(s)) => s.as_str(),
            Some(_) => {
                return Err(Error::TypeMismatch {
                    field: key,
                    key: "type".to_string(),
                    reason: "must be a string".to_string(),
                })
            }
        };

        let reader = SettingsReader { key: &key, obj };
        let (kind, allowed): (FieldKind, &[&str]) = match type_name {
            "boolean" => (FieldKind::Boolean, &[]),
            "binary" => (
                FieldKind::Binary {
                    bits: reader.required_width("bits")?,
                },
                &["bits"],
            ),
            "integer" => (
                FieldKind::Integer {
                    bits: reader.required_numeric_width("bits")?,
                    offset: reader.optional_i64("offset", 0)?,
                    mode: match reader
                        .optional_choice("mode", "truncate", &["truncate", "remainder"])?
                        .as_str()
                    {
                        "remainder" => IntegerMode::Remainder,
                        _ => IntegerMode::Truncate,
                    },
                },
                &["bits", "offset", "mode"],
            ),
            "float" => (
                FieldKind::Float {
                    bits: reader.required_numeric_width("bits")?,
                    lower: reader.optional_f64("lower", 0.0)?,
                    upper: reader.optional_f64("upper", 1.0)?,
                    approximation: match reader
                        .optional_choice("approximation", "round", &["round", "floor", "ceil"])?
                        .as_str()
                    {
                        "floor" => Approximation::Floor,
                        "ceil" => Approximation::Ceil,
                        _ => Approximation::Round,
                    },
                },
                &["bits", "lower", "upper", "approximation"],
            ),
            "pad" => (
                FieldKind::Pad {
                    bits: reader.required_width("bits")?,
                },
                &["bits"],
            ),
            "string" => (
                FieldKind::String {
                    length: reader.required_width("length")?,
                    overrides: reader.optional_alphabet_overrides("custom_alphabet")?,
                },
                &["length", "custom_alphabet"],
            ),
            "steps" => (
                FieldKind::Steps {
                    boundaries: reader.required_number_list("steps")?,
                    labels: reader.optional_string_list("steps_names")?,
                },
                &["steps", "steps_names"],
            ),
            "categories" => (
                FieldKind::Categories {
                    categories: reader.required_string_list("categories")?,
                    error: reader.optional_string("error")?,
                },
                &["categories", "error"],
            ),
            "array" => (
                FieldKind::Array {
                    length: reader.required_width("length")?,
                    fixed: reader.optional_bool("fixed", false)?,
                    items: Box::new(FieldSpec::from_value(reader.required("blocks")?)?),
                },
                &["length", "blocks", "fixed"],
            ),
            "object" => (
                FieldKind::Object {
                    fields: reader.required_spec_list("blocklist")?,
                },
                &["blocklist"],
            ),
            other => {
                return Err(Error::UnknownType {
                    field: key,
                    type_name: other.to_string(),
                    known: TYPE_NAMES.join(", "),
                })
            }
        };

        reader.reject_unexpected(allowed)?;

        let kind = validate_kind(&key, kind)?;
        Ok(FieldSpec {
            key,
            kind,
            value: obj.get("value").cloned(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The static value encoded in place of runtime input, when declared.
    pub fn static_value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// Kind-level construction checks and initialization.
fn validate_kind(key: &str, kind: FieldKind) -> Result<FieldKind, Error> {
    let mismatch = |setting: &str, reason: String| Error::TypeMismatch {
        field: key.to_string(),
        key: setting.to_string(),
        reason,
    };
    match kind {
        FieldKind::Binary { bits } | FieldKind::Pad { bits } if bits == 0 => {
            Err(mismatch("bits", "must be at least 1".to_string()))
        }
        FieldKind::Integer { bits, .. } | FieldKind::Float { bits, .. }
            if bits == 0 || bits > 64 =>
        {
            Err(mismatch("bits", "must be between 1 and 64".to_string()))
        }
        FieldKind::Float { lower, upper, .. } if !(upper > lower) => Err(mismatch(
            "upper",
            format!("must be greater than 'lower' ({lower})"),
        )),
        FieldKind::String { ref overrides, .. } => {
            for (index, _) in overrides {
                if *index > 64 {
                    return Err(mismatch(
                        "custom_alphabet",
                        format!("index {index} is out of the alphabet range 0..=64"),
                    ));
                }
            }
            Ok(kind)
        }
        FieldKind::Steps {
            boundaries,
            mut labels,
        } => {
            if boundaries.windows(2).any(|w| w[0] > w[1]) {
                return Err(mismatch("steps", "must be sorted ascending".to_string()));
            }
            if labels.is_empty() && !boundaries.is_empty() {
                labels.push(format!("x<{}", fmt_number(boundaries[0])));
                for pair in boundaries.windows(2) {
                    labels.push(format!(
                        "{}<=x<{}",
                        fmt_number(pair[0]),
                        fmt_number(pair[1])
                    ));
                }
                labels.push(format!("x>={}", fmt_number(boundaries[boundaries.len() - 1])));
            }
            if labels.len() != boundaries.len() + 1 {
                return Err(mismatch(
                    "steps_names",
                    format!(
                        "must have {} entries, one per interval",
                        boundaries.len() + 1
                    ),
                ));
            }
            Ok(FieldKind::Steps { boundaries, labels })
        }
        FieldKind::Categories { ref categories, .. } if categories.is_empty() => {
            Err(mismatch("categories", "must not be empty".to_string()))
        }
        other => Ok(other),
    }
}

/// Renders a boundary for an auto-generated step label, without a trailing
/// `.0` on integral values.
fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn render_spec(v: &Value) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "<spec>".to_string())
}

/// Typed accessors over a raw field-spec object, producing taxonomy errors
/// that name the offending field and setting.
struct SettingsReader<'a> {
    key: &'a str,
    obj: &'a Map<String, Value>,
}

impl<'a> SettingsReader<'a> {
    fn required(&self, setting: &str) -> Result<&'a Value, Error> {
        self.obj.get(setting).ok_or_else(|| Error::MissingKey {
            field: self.key.to_string(),
            key: setting.to_string(),
        })
    }

    fn mismatch(&self, setting: &str, reason: &str) -> Error {
        Error::TypeMismatch {
            field: self.key.to_string(),
            key: setting.to_string(),
            reason: reason.to_string(),
        }
    }

    fn required_width(&self, setting: &str) -> Result<usize, Error> {
        self.required(setting)?
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| self.mismatch(setting, "must be a non-negative integer"))
    }

    /// A width that must also fit the codec's 64-bit arithmetic.
    fn required_numeric_width(&self, setting: &str) -> Result<u32, Error> {
        let bits = self.required_width(setting)?;
        u32::try_from(bits).map_err(|_| self.mismatch(setting, "must be between 1 and 64"))
    }

    fn optional_i64(&self, setting: &str, default: i64) -> Result<i64, Error> {
        match self.obj.get(setting) {
            None => Ok(default),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| self.mismatch(setting, "must be an integer")),
        }
    }

    fn optional_f64(&self, setting: &str, default: f64) -> Result<f64, Error> {
        match self.obj.get(setting) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| self.mismatch(setting, "must be a number")),
        }
    }

    fn optional_bool(&self, setting: &str, default: bool) -> Result<bool, Error> {
        match self.obj.get(setting) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| self.mismatch(setting, "must be a boolean")),
        }
    }

    fn optional_string(&self, setting: &str) -> Result<Option<String>, Error> {
        match self.obj.get(setting) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.mismatch(setting, "must be a string")),
        }
    }

    fn optional_choice(
        &self,
        setting: &str,
        default: &str,
        choices: &[&str],
    ) -> Result<String, Error> {
        match self.obj.get(setting) {
            None => Ok(default.to_string()),
            Some(Value::String(s)) if choices.contains(&s.as_str()) => Ok(s.clone()),
            Some(_) => Err(self.mismatch(
                setting,
                &format!("must be one of: {}", choices.join(", ")),
            )),
        }
    }

    fn required_number_list(&self, setting: &str) -> Result<Vec<f64>, Error> {
        let arr = self
            .required(setting)?
            .as_array()
            .ok_or_else(|| self.mismatch(setting, "must be an array of numbers"))?;
        arr.iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| self.mismatch(setting, "must be an array of numbers"))
            })
            .collect()
    }

    fn required_string_list(&self, setting: &str) -> Result<Vec<String>, Error> {
        let arr = self
            .required(setting)?
            .as_array()
            .ok_or_else(|| self.mismatch(setting, "must be an array of strings"))?;
        arr.iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.mismatch(setting, "must be an array of strings"))
            })
            .collect()
    }

    fn optional_string_list(&self, setting: &str) -> Result<Vec<String>, Error> {
        if self.obj.contains_key(setting) {
            self.required_string_list(setting)
        } else {
            Ok(Vec::new())
        }
    }

    fn required_spec_list(&self, setting: &str) -> Result<Vec<FieldSpec>, Error> {
        let arr = self
            .required(setting)?
            .as_array()
            .ok_or_else(|| self.mismatch(setting, "must be an array of field specs"))?;
        arr.iter().map(FieldSpec::from_value).collect()
    }

    fn optional_alphabet_overrides(&self, setting: &str) -> Result<Vec<(usize, char)>, Error> {
        let Some(v) = self.obj.get(setting) else {
            return Ok(Vec::new());
        };
        let obj = v
            .as_object()
            .ok_or_else(|| self.mismatch(setting, "must be an object of index -> character"))?;
        let mut overrides = Vec::with_capacity(obj.len());
        for (index, replacement) in obj {
            let index: usize = index
                .parse()
                .map_err(|_| self.mismatch(setting, "indices must be non-negative integers"))?;
            let replacement = replacement
                .as_str()
                .and_then(|s| {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(c),
                        _ => None,
                    }
                })
                .ok_or_else(|| self.mismatch(setting, "replacements must be single characters"))?;
            overrides.push((index, replacement));
        }
        Ok(overrides)
    }

    fn reject_unexpected(&self, allowed: &[&str]) -> Result<(), Error> {
        for key in self.obj.keys() {
            let reserved = matches!(key.as_str(), "key" | "type" | "value");
            if !reserved && !allowed.contains(&key.as_str()) {
                return Err(Error::UnexpectedKey {
                    field: self.key.to_string(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Envelope options of a payload spec.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PayloadMeta {
    pub(crate) encode_version: bool,
    pub(crate) version_bits: usize,
    pub(crate) header: Option<Vec<FieldSpec>>,
    pub(crate) crc8: bool,
}

/// A validated top-level payload specification.
///
/// The schema tree is the wire contract: producer and consumer must hold the
/// same spec (up to multi-version resolution) for a message to be readable.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadSpec {
    name: String,
    version: i64,
    body: Vec<FieldSpec>,
    meta: PayloadMeta,
}

impl PayloadSpec {
    /// Builds a spec with no envelope options.
    pub fn new(
        name: impl Into<String>,
        version: i64,
        body: Vec<FieldSpec>,
    ) -> Result<PayloadSpec, Error> {
        let name = name.into();
        if body.is_empty() {
            return Err(Error::TypeMismatch {
                field: "payload spec".to_string(),
                key: "body".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(PayloadSpec {
            name,
            version,
            body,
            meta: PayloadMeta::default(),
        })
    }

    /// Enables the version tag, `bits` wide on the wire.
    pub fn with_version_tag(mut self, bits: usize) -> Result<PayloadSpec, Error> {
        if bits == 0 || bits > 64 {
            return Err(Error::TypeMismatch {
                field: "payload spec meta".to_string(),
                key: "version_bits".to_string(),
                reason: "must be between 1 and 64".to_string(),
            });
        }
        self.meta.encode_version = true;
        self.meta.version_bits = bits;
        Ok(self)
    }

    /// Declares header fields, placed on the wire before the body.
    pub fn with_header(mut self, header: Vec<FieldSpec>) -> Result<PayloadSpec, Error> {
        if header.is_empty() {
            return Err(Error::TypeMismatch {
                field: "payload spec meta".to_string(),
                key: "header".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        self.meta.header = Some(header);
        Ok(self)
    }

    /// Enables the 8-bit checksum trailer.
    pub fn with_checksum(mut self) -> PayloadSpec {
        self.meta.crc8 = true;
        self
    }

    /// Parses a payload spec from external JSON configuration.
    pub fn from_value(v: &Value) -> Result<PayloadSpec, Error> {
        let label = "payload spec";
        let mismatch = |key: &str, reason: &str| Error::TypeMismatch {
            field: label.to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let missing = |key: &str| Error::MissingKey {
            field: label.to_string(),
            key: key.to_string(),
        };

        let obj = v
            .as_object()
            .ok_or_else(|| mismatch("spec", "must be an object"))?;

        let name = match obj.get("name") {
            None => return Err(missing("name")),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(mismatch("name", "must be a string")),
        };
        let version = match obj.get("version") {
            None => return Err(missing("version")),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| mismatch("version", "must be an integer"))?,
        };
        let body = match obj.get("body") {
            None => return Err(missing("body")),
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .map(FieldSpec::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            Some(Value::Array(_)) => return Err(mismatch("body", "must not be empty")),
            Some(_) => return Err(mismatch("body", "must be an array")),
        };

        for key in obj.keys() {
            if !matches!(key.as_str(), "name" | "version" | "body" | "meta") {
                return Err(Error::UnexpectedKey {
                    field: label.to_string(),
                    key: key.clone(),
                });
            }
        }

        let mut spec = PayloadSpec::new(name, version, body)?;

        if let Some(meta) = obj.get("meta") {
            let meta = meta
                .as_object()
                .ok_or_else(|| mismatch("meta", "must be an object"))?;
            for key in meta.keys() {
                if !matches!(
                    key.as_str(),
                    "encode_version" | "version_bits" | "crc8" | "header"
                ) {
                    return Err(Error::UnexpectedKey {
                        field: "payload spec meta".to_string(),
                        key: key.clone(),
                    });
                }
            }
            let encode_version = match meta.get("encode_version") {
                None => false,
                Some(v) => v
                    .as_bool()
                    .ok_or_else(|| mismatch("encode_version", "must be a boolean"))?,
            };
            if encode_version {
                let bits = meta
                    .get("version_bits")
                    .ok_or_else(|| Error::MissingKey {
                        field: "payload spec meta".to_string(),
                        key: "version_bits".to_string(),
                    })?
                    .as_u64()
                    .ok_or_else(|| mismatch("version_bits", "must be a positive integer"))?;
                spec = spec.with_version_tag(bits as usize)?;
            }
            if let Some(crc8) = meta.get("crc8") {
                if crc8
                    .as_bool()
                    .ok_or_else(|| mismatch("crc8", "must be a boolean"))?
                {
                    spec = spec.with_checksum();
                }
            }
            if let Some(header) = meta.get("header") {
                let items = header
                    .as_array()
                    .ok_or_else(|| mismatch("header", "must be an array"))?;
                let header = items
                    .iter()
                    .map(FieldSpec::from_value)
                    .collect::<Result<Vec<_>, _>>()?;
                spec = spec.with_header(header)?;
            }
        }

        Ok(spec)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn body(&self) -> &[FieldSpec] {
        &self.body
    }

    pub(crate) fn meta(&self) -> &PayloadMeta {
        &self.meta
    }
}
