//! Consultation notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simrs_types::{NonEmptyText, RecordId};

/// Diagnosis and notes written by the doctor for one visit. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: RecordId,
    pub visit_id: RecordId,
    pub diagnosis: NonEmptyText,
    pub notes: NonEmptyText,
    pub created_at: DateTime<Utc>,
}
