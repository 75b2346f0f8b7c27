//! Visits and their lifecycle status.
//!
//! A visit is one patient's encounter with a clinic department. Its status only ever moves
//! forward:
//!
//! ```text
//! registered ──► in_consultation ──► closed ──► paid
//!      └──────────────────────────────►┘
//! ```
//!
//! There is no "unpay" or "reopen"; [`VisitStatus::advance`] rejects any step backwards.

use crate::{SimrsError, SimrsResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simrs_types::{NonEmptyText, RecordId};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Registered,
    InConsultation,
    Closed,
    Paid,
}

impl VisitStatus {
    pub const ALL: [VisitStatus; 4] = [
        VisitStatus::Registered,
        VisitStatus::InConsultation,
        VisitStatus::Closed,
        VisitStatus::Paid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VisitStatus::Registered => "registered",
            VisitStatus::InConsultation => "in_consultation",
            VisitStatus::Closed => "closed",
            VisitStatus::Paid => "paid",
        }
    }

    fn rank(self) -> u8 {
        match self {
            VisitStatus::Registered => 0,
            VisitStatus::InConsultation => 1,
            VisitStatus::Closed => 2,
            VisitStatus::Paid => 3,
        }
    }

    /// Move to `next`, refusing to go backwards. Staying put is allowed.
    pub fn advance(self, next: VisitStatus) -> SimrsResult<VisitStatus> {
        if next.rank() < self.rank() {
            return Err(SimrsError::Validation(format!(
                "visit status cannot move from {self} back to {next}"
            )));
        }
        Ok(next)
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitStatus {
    type Err = SimrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VisitStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| SimrsError::Validation(format!("unknown visit status '{s}'")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: RecordId,
    pub patient_id: RecordId,
    /// Free-text department/doctor label chosen at registration, e.g. "Poli Anak".
    pub doctor: NonEmptyText,
    pub status: VisitStatus,
    pub created_at: DateTime<Utc>,
}
