//! Payment transactions.
//!
//! Transactions are append-only: a correction is a new row, never an edit.

use crate::{SimrsError, SimrsResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simrs_types::RecordId;
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Paid,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = SimrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TransactionStatus::Pending),
            "paid" => Ok(TransactionStatus::Paid),
            other => Err(SimrsError::Validation(format!(
                "unknown transaction status '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: RecordId,
    pub visit_id: RecordId,
    /// Whole rupiah.
    pub amount: u64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_paid(&self) -> bool {
        self.status == TransactionStatus::Paid
    }
}

/// Payment amount as submitted, before validation.
///
/// Amounts arrive as JSON numbers or numeric strings from form fields.
#[derive(Clone, Debug, PartialEq)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl From<u64> for AmountInput {
    fn from(value: u64) -> Self {
        AmountInput::Number(value as f64)
    }
}

impl From<i64> for AmountInput {
    fn from(value: i64) -> Self {
        AmountInput::Number(value as f64)
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        AmountInput::Text(value.to_owned())
    }
}

/// Validate a payment amount against `ceiling`.
///
/// Rejects non-numeric input, fractions, zero, negatives and anything above `ceiling`.
pub fn validate_amount(input: &AmountInput, ceiling: u64) -> SimrsResult<u64> {
    let value = match input {
        AmountInput::Number(n) => *n,
        AmountInput::Text(text) => {
            let cleaned = text.trim();
            cleaned.parse::<f64>().map_err(|_| {
                SimrsError::Validation(format!("amount must be a number, got '{cleaned}'"))
            })?
        }
    };

    if !value.is_finite() {
        return Err(SimrsError::Validation("amount must be a number".into()));
    }
    if value <= 0.0 {
        return Err(SimrsError::Validation(
            "amount must be greater than 0".into(),
        ));
    }
    if value.fract() != 0.0 {
        return Err(SimrsError::Validation(
            "amount must be a whole number of rupiah".into(),
        ));
    }
    if value > ceiling as f64 {
        return Err(SimrsError::Validation(format!(
            "amount exceeds the maximum of {ceiling}; please check the input"
        )));
    }

    Ok(value as u64)
}
