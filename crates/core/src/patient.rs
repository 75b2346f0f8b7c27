//! Patient registration and lookup.
//!
//! Patients never change state once registered; they are the anchor every visit points at.

use crate::store::Store;
use crate::validation::{optional_text, required_text, search_query};
use crate::SimrsResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simrs_types::{NonEmptyText, RecordId};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: RecordId,
    pub name: NonEmptyText,
    /// National identity number (NIK).
    pub nik: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Case-insensitive substring match over name, NIK, phone and address.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        std::iter::once(self.name.as_str())
            .chain(self.nik.as_deref())
            .chain(self.phone.as_deref())
            .chain(self.address.as_deref())
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// Registration form input.
#[derive(Clone, Debug, Default)]
pub struct NewPatient {
    pub name: String,
    pub nik: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Patient data operations - no API concerns.
#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn Store>,
}

impl PatientService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Registers a new patient.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::Validation` if the name is blank, or a store error if the write
    /// fails.
    pub fn register(&self, input: NewPatient) -> SimrsResult<Patient> {
        let patient = Patient {
            id: RecordId::new(),
            name: required_text("name", &input.name)?,
            nik: optional_text(input.nik),
            phone: optional_text(input.phone),
            address: optional_text(input.address),
            created_at: Utc::now(),
        };

        let patient = self.store.insert_patient(patient)?;
        tracing::info!("registered patient {}", patient.id);
        Ok(patient)
    }

    /// All patients, newest first.
    pub fn list(&self) -> SimrsResult<Vec<Patient>> {
        let mut patients = self.store.patients()?;
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(patients)
    }

    /// Patients matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::Validation` if the query is blank.
    pub fn search(&self, query: &str) -> SimrsResult<Vec<Patient>> {
        let query = search_query(query)?;
        Ok(self
            .list()?
            .into_iter()
            .filter(|p| p.matches(query.as_str()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableStore;
    use crate::SimrsError;

    fn service() -> PatientService {
        PatientService::new(Arc::new(TableStore::in_memory()))
    }

    fn budi() -> NewPatient {
        NewPatient {
            name: "Budi Santoso".into(),
            nik: Some("3174012304560001".into()),
            phone: Some("0812-3456-7890".into()),
            address: Some("Jl. Melati 5, Jakarta".into()),
        }
    }

    #[test]
    fn register_requires_a_name() {
        let err = service()
            .register(NewPatient {
                name: "   ".into(),
                ..budi()
            })
            .unwrap_err();
        assert!(matches!(err, SimrsError::Validation(msg) if msg.contains("name")));
    }

    #[test]
    fn blank_optional_fields_are_dropped() {
        let patient = service()
            .register(NewPatient {
                name: "Siti".into(),
                nik: Some("  ".into()),
                phone: None,
                address: Some(" Bandung ".into()),
            })
            .unwrap();
        assert_eq!(patient.nik, None);
        assert_eq!(patient.address.as_deref(), Some("Bandung"));
    }

    #[test]
    fn search_matches_any_contact_field() {
        let svc = service();
        svc.register(budi()).unwrap();
        svc.register(NewPatient {
            name: "Siti Aminah".into(),
            address: Some("Bandung".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(svc.search("budi").unwrap().len(), 1);
        assert_eq!(svc.search("3456").unwrap().len(), 1);
        assert_eq!(svc.search("BANDUNG").unwrap()[0].name.as_str(), "Siti Aminah");
        assert!(svc.search("Surabaya").unwrap().is_empty());
        assert!(svc.search(" ").is_err());
    }

    #[test]
    fn list_is_newest_first() {
        let svc = service();
        let first = svc.register(budi()).unwrap();
        let second = svc
            .register(NewPatient {
                name: "Siti".into(),
                ..Default::default()
            })
            .unwrap();
        let listed = svc.list().unwrap();
        assert_eq!(listed.len(), 2);
        if second.created_at > first.created_at {
            assert_eq!(listed[0].id, second.id);
        }
    }
}
