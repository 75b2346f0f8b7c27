//! Canonical record identifiers.
//!
//! Every stored row (patient, visit, medical record, transaction, user) is keyed by a UUID in
//! canonical form: **32 lowercase hexadecimal characters**, no hyphens. This is the value
//! produced by `Uuid::new_v4().simple().to_string()`.
//!
//! Externally supplied identifiers (path parameters, request bodies, CLI arguments) must
//! already be canonical. Uppercase, hyphenated or otherwise malformed values are rejected
//! rather than normalised, so one record never has two spellings.

use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Error returned when an identifier is not in canonical form.
#[derive(Debug, thiserror::Error)]
pub enum RecordIdError {
    #[error("id must be 32 lowercase hex characters without hyphens, got: '{0}'")]
    NotCanonical(String),
}

/// A record identifier guaranteed to be in canonical form once constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`RecordIdError::NotCanonical`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> Result<Self, RecordIdError> {
        if !Self::is_canonical(input) {
            return Err(RecordIdError::NotCanonical(input.to_owned()));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| RecordIdError::NotCanonical(input.to_owned()))
    }

    /// Returns true if `input` is in canonical form. Purely syntactic.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = RecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}
