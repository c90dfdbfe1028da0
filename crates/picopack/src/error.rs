//! Failure taxonomy for schema validation, encoding and decoding.

use thiserror::Error;

/// Every way the codec can fail.
///
/// All variants are unrecoverable at the point of detection and propagate
/// immediately; the one exception is multi-spec resolution, which swallows
/// per-candidate decode failures and surfaces [`Error::NoMatchingSpec`] once
/// the candidate list is exhausted. A checksum mismatch is deliberately not
/// represented here: it is reported as a boolean in the decoded metadata.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A required schema key is absent.
    #[error("'{field}' must have key '{key}'")]
    MissingKey { field: String, key: String },

    /// A schema key is present but has the wrong shape.
    #[error("'{field}' key '{key}': {reason}")]
    TypeMismatch {
        field: String,
        key: String,
        reason: String,
    },

    /// The field `type` is not a registered name.
    #[error("field '{field}' has unknown type '{type_name}', expected one of: {known}")]
    UnknownType {
        field: String,
        type_name: String,
        known: String,
    },

    /// A schema key outside the declared required/optional/reserved set.
    #[error("field '{field}' has an unexpected key '{key}'")]
    UnexpectedKey { field: String, key: String },

    /// A runtime value fails the field's declared input type, or is missing.
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// A runtime value has the right type but no representable encoding.
    #[error("value out of domain for field '{field}': {reason}")]
    OutOfDomain { field: String, reason: String },

    /// The decode input is not a valid bit vector, or is too short.
    #[error("malformed message: {reason}")]
    Malformed { reason: String },

    /// The decoded version tag disagrees with the spec's declared version.
    #[error("message version {found} does not match spec version {expected}")]
    VersionMismatch { expected: i64, found: i64 },

    /// Multi-spec resolution exhausted every candidate.
    #[error("message did not match any payload spec")]
    NoMatchingSpec,

    /// Unsupported wire-format selector.
    #[error("invalid format '{0}', choose one of: bin, hex, bytes")]
    InvalidFormat(String),
}

impl Error {
    /// Maps a bit-buffer underrun onto a malformed-message failure naming
    /// the field that ran out of input.
    pub(crate) fn short_input(field: &str) -> Self {
        Error::Malformed {
            reason: format!("message too short for field '{field}'"),
        }
    }
}
