//! Input validation utilities.
//!
//! Form input arrives as loose strings. These helpers turn it into validated values and
//! produce the user-facing message when it is missing or malformed.

use crate::{SimrsError, SimrsResult};
use simrs_types::{NonEmptyText, RecordId};

/// Requires `value` to contain non-whitespace text.
///
/// # Errors
///
/// Returns `SimrsError::Validation("<field> is required")` otherwise.
pub fn required_text(field: &str, value: &str) -> SimrsResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|_| SimrsError::Validation(format!("{field} is required")))
}

/// Trims an optional field, treating blank input as absent.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a reference to another record.
///
/// # Errors
///
/// Returns `SimrsError::Validation` if `value` is blank or not a canonical id.
pub fn required_id(field: &str, value: &str) -> SimrsResult<RecordId> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SimrsError::Validation(format!("{field} is required")));
    }
    RecordId::parse(value).map_err(|e| SimrsError::Validation(format!("{field}: {e}")))
}

/// Requires a non-blank free-text search query.
pub fn search_query(value: &str) -> SimrsResult<NonEmptyText> {
    NonEmptyText::new(value)
        .map_err(|_| SimrsError::Validation("Search query is required".into()))
}
