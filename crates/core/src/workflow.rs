//! Visit status engine.
//!
//! Every front-desk step is one call here: open a visit, record the doctor's notes, take a
//! payment. Each call validates its input, checks that the records it points at exist, and
//! decides the status written back to the visit.
//!
//! A visit counts as paid once any of its transactions is paid ([`is_visit_paid`]). Paying
//! closes the visit; a paid visit refuses further payments.

use crate::config::CoreConfig;
use crate::medical_record::MedicalRecord;
use crate::patient::Patient;
use crate::store::Store;
use crate::transaction::{validate_amount, AmountInput, Transaction, TransactionStatus};
use crate::validation::{required_id, required_text, search_query};
use crate::visit::{Visit, VisitStatus};
use crate::{SimrsError, SimrsResult};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use simrs_types::{NonEmptyText, RecordId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// True iff any transaction for `visit_id` is paid.
pub fn is_visit_paid(visit_id: RecordId, transactions: &[Transaction]) -> bool {
    transactions
        .iter()
        .any(|t| t.visit_id == visit_id && t.is_paid())
}

/// Patients that already have a visit on `as_of`, judged in the clinic's `offset`.
///
/// Every status counts, so a patient seen and paid this morning is still excluded.
pub fn active_patient_ids(
    as_of: NaiveDate,
    visits: &[Visit],
    offset: FixedOffset,
) -> BTreeSet<RecordId> {
    visits
        .iter()
        .filter(|v| v.created_at.with_timezone(&offset).date_naive() == as_of)
        .map(|v| v.patient_id)
        .collect()
}

/// A visit together with its patient's name and its transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VisitOverview {
    pub visit: Visit,
    pub patient_name: String,
    pub transactions: Vec<Transaction>,
}

impl VisitOverview {
    pub fn is_paid(&self) -> bool {
        self.transactions.iter().any(Transaction::is_paid)
    }

    fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        [
            self.patient_name.to_lowercase(),
            self.visit.doctor.as_str().to_lowercase(),
            self.visit.id.to_string(),
        ]
        .iter()
        .any(|field| field.contains(&query))
    }
}

/// A transaction with the visit it pays for and the patient's name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionView {
    pub transaction: Transaction,
    pub visit: Visit,
    pub patient_name: String,
}

impl TransactionView {
    fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.patient_name.to_lowercase().contains(&query)
            || self.transaction.amount.to_string().contains(&query)
            || self.transaction.status.as_str().contains(&query)
    }
}

/// One consultation in a patient's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MedicalHistoryEntry {
    pub record: MedicalRecord,
    pub doctor: NonEmptyText,
    pub visit_created_at: DateTime<Utc>,
    pub patient_name: String,
}

#[derive(Clone)]
pub struct VisitService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn Store>,
}

impl VisitService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn Store>) -> Self {
        Self { cfg, store }
    }

    /// Opens a visit for `patient_id` at `doctor` with status `registered`.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::Validation` if either argument is blank, or
    /// `SimrsError::NotFound` if the patient does not exist.
    pub fn create_visit(&self, patient_id: &str, doctor: &str) -> SimrsResult<Visit> {
        let visit = Visit {
            id: RecordId::new(),
            patient_id: required_id("patient_id", patient_id)?,
            doctor: required_text("doctor", doctor)?,
            status: VisitStatus::Registered,
            created_at: Utc::now(),
        };

        let visit = self.store.insert_visit(visit)?;
        tracing::info!(
            "opened visit {} for patient {} at {}",
            visit.id,
            visit.patient_id,
            visit.doctor
        );
        Ok(visit)
    }

    /// Appends the doctor's diagnosis and notes to a visit. The visit status is untouched.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::Validation` for blank input, or `SimrsError::NotFound` if the
    /// visit does not exist.
    pub fn record_consultation(
        &self,
        visit_id: &str,
        diagnosis: &str,
        notes: &str,
    ) -> SimrsResult<MedicalRecord> {
        let record = MedicalRecord {
            id: RecordId::new(),
            visit_id: required_id("visit_id", visit_id)?,
            diagnosis: required_text("diagnosis", diagnosis)?,
            notes: required_text("notes", notes)?,
            created_at: Utc::now(),
        };

        let record = self.store.insert_medical_record(record)?;
        tracing::info!("recorded consultation {} on visit {}", record.id, record.visit_id);
        Ok(record)
    }

    /// Records a payment against a visit.
    ///
    /// `status` defaults to `pending`. A `paid` transaction closes the visit; a `pending` one
    /// leaves it where it is. The transaction and the visit's new status are stored in one
    /// write, so nothing is written unless every check passes.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::Validation` for a bad amount or status, or if the visit has
    /// already been paid; `SimrsError::NotFound` if the visit does not exist.
    pub fn record_payment(
        &self,
        visit_id: &str,
        amount: &AmountInput,
        status: Option<&str>,
    ) -> SimrsResult<TransactionView> {
        let visit_id = required_id("visit_id", visit_id)?;
        let amount = validate_amount(amount, self.cfg.payment_ceiling())?;
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s.parse()?,
            None => TransactionStatus::default(),
        };

        let visit_status = match status {
            TransactionStatus::Paid => Some(VisitStatus::Closed),
            TransactionStatus::Pending => None,
        };

        let (transaction, visit) = self.store.insert_payment(
            Transaction {
                id: RecordId::new(),
                visit_id,
                amount,
                status,
                created_at: Utc::now(),
            },
            visit_status,
        )?;

        tracing::info!(
            "recorded {} payment {} of {} on visit {} (now {})",
            transaction.status,
            transaction.id,
            transaction.amount,
            visit.id,
            visit.status
        );

        let patient_name = self.patient_name(visit.patient_id)?;
        Ok(TransactionView {
            transaction,
            visit,
            patient_name,
        })
    }

    /// Every visit with its patient's name and transactions, newest first.
    pub fn overviews(&self) -> SimrsResult<Vec<VisitOverview>> {
        let names = self.patient_names()?;
        let mut by_visit: HashMap<RecordId, Vec<Transaction>> = HashMap::new();
        for t in self.store.transactions()? {
            by_visit.entry(t.visit_id).or_default().push(t);
        }

        let mut overviews: Vec<VisitOverview> = self
            .store
            .visits()?
            .into_iter()
            .map(|visit| {
                let mut transactions = by_visit.remove(&visit.id).unwrap_or_default();
                transactions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                VisitOverview {
                    patient_name: names.get(&visit.patient_id).cloned().unwrap_or_default(),
                    visit,
                    transactions,
                }
            })
            .collect();
        overviews.sort_by(|a, b| b.visit.created_at.cmp(&a.visit.created_at));
        Ok(overviews)
    }

    /// Visits whose patient name, doctor label or id contains `query`.
    pub fn search(&self, query: &str) -> SimrsResult<Vec<VisitOverview>> {
        let query = search_query(query)?;
        Ok(self
            .overviews()?
            .into_iter()
            .filter(|o| o.matches(query.as_str()))
            .collect())
    }

    /// Patients that may still be given a visit today.
    pub fn candidates(&self) -> SimrsResult<Vec<Patient>> {
        let active = active_patient_ids(
            self.cfg.clinic_today(),
            &self.store.visits()?,
            self.cfg.clinic_offset(),
        );
        let mut patients: Vec<Patient> = self
            .store
            .patients()?
            .into_iter()
            .filter(|p| !active.contains(&p.id))
            .collect();
        patients.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        Ok(patients)
    }

    /// All consultations across a patient's visits, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::NotFound` if the patient does not exist.
    pub fn medical_history(&self, patient_id: &str) -> SimrsResult<Vec<MedicalHistoryEntry>> {
        let patient_id = required_id("patient_id", patient_id)?;
        let patient = self
            .store
            .patient(patient_id)?
            .ok_or_else(|| SimrsError::not_found("patient", patient_id))?;

        let visits: HashMap<RecordId, Visit> = self
            .store
            .visits()?
            .into_iter()
            .filter(|v| v.patient_id == patient_id)
            .map(|v| (v.id, v))
            .collect();

        let mut history: Vec<MedicalHistoryEntry> = self
            .store
            .medical_records()?
            .into_iter()
            .filter_map(|record| {
                let visit = visits.get(&record.visit_id)?;
                Some(MedicalHistoryEntry {
                    doctor: visit.doctor.clone(),
                    visit_created_at: visit.created_at,
                    patient_name: patient.name.to_string(),
                    record,
                })
            })
            .collect();
        history.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
        Ok(history)
    }

    /// Every transaction with its visit and patient, newest first.
    pub fn transactions(&self) -> SimrsResult<Vec<TransactionView>> {
        let names = self.patient_names()?;
        let visits: HashMap<RecordId, Visit> = self
            .store
            .visits()?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let mut views: Vec<TransactionView> = self
            .store
            .transactions()?
            .into_iter()
            .filter_map(|transaction| {
                let visit = visits.get(&transaction.visit_id)?.clone();
                Some(TransactionView {
                    patient_name: names.get(&visit.patient_id).cloned().unwrap_or_default(),
                    visit,
                    transaction,
                })
            })
            .collect();
        views.sort_by(|a, b| b.transaction.created_at.cmp(&a.transaction.created_at));
        Ok(views)
    }

    /// Transactions whose patient name, amount or status contains `query`.
    pub fn search_transactions(&self, query: &str) -> SimrsResult<Vec<TransactionView>> {
        let query = search_query(query)?;
        Ok(self
            .transactions()?
            .into_iter()
            .filter(|t| t.matches(query.as_str()))
            .collect())
    }

    fn patient_name(&self, id: RecordId) -> SimrsResult<String> {
        Ok(self
            .store
            .patient(id)?
            .map(|p| p.name.to_string())
            .unwrap_or_default())
    }

    fn patient_names(&self) -> SimrsResult<HashMap<RecordId, String>> {
        Ok(self
            .store
            .patients()?
            .into_iter()
            .map(|p| (p.id, p.name.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{NewPatient, PatientService};
    use crate::store::TableStore;
    use chrono::TimeZone;

    struct Desk {
        patients: PatientService,
        visits: VisitService,
        store: Arc<TableStore>,
    }

    fn desk() -> Desk {
        let store = Arc::new(TableStore::in_memory());
        let cfg = Arc::new(CoreConfig::in_memory());
        Desk {
            patients: PatientService::new(store.clone()),
            visits: VisitService::new(cfg, store.clone()),
            store,
        }
    }

    fn register(desk: &Desk, name: &str) -> Patient {
        desk.patients
            .register(NewPatient {
                name: name.into(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn front_desk_walkthrough_closes_the_visit() {
        let desk = desk();
        let budi = register(&desk, "Budi Santoso");

        let visit = desk
            .visits
            .create_visit(&budi.id.to_string(), "Poli Anak")
            .unwrap();
        assert_eq!(visit.status, VisitStatus::Registered);

        desk.visits
            .record_consultation(&visit.id.to_string(), "J00 Common cold", "Rest, fluids")
            .unwrap();
        assert_eq!(
            desk.store.visit(visit.id).unwrap().unwrap().status,
            VisitStatus::Registered
        );

        let paid = desk
            .visits
            .record_payment(&visit.id.to_string(), &150_000u64.into(), Some("paid"))
            .unwrap();
        assert_eq!(paid.patient_name, "Budi Santoso");
        assert_eq!(paid.visit.status, VisitStatus::Closed);

        let overviews = desk.visits.overviews().unwrap();
        assert_eq!(overviews.len(), 1);
        let overview = &overviews[0];
        assert_eq!(overview.visit.status, VisitStatus::Closed);
        assert_eq!(overview.patient_name, "Budi Santoso");
        assert_eq!(overview.transactions.len(), 1);
        assert_eq!(overview.transactions[0].amount, 150_000);
        assert!(overview.transactions[0].is_paid());
    }

    #[test]
    fn negative_payment_writes_nothing() {
        let desk = desk();
        let patient = register(&desk, "Budi Santoso");
        let visit = desk
            .visits
            .create_visit(&patient.id.to_string(), "Poli Anak")
            .unwrap();

        let err = desk
            .visits
            .record_payment(&visit.id.to_string(), &(-5000i64).into(), Some("paid"))
            .unwrap_err();
        assert!(matches!(err, SimrsError::Validation(_)));

        assert!(desk.store.transactions().unwrap().is_empty());
        assert_eq!(
            desk.store.visit(visit.id).unwrap().unwrap().status,
            VisitStatus::Registered
        );
        assert!(!is_visit_paid(visit.id, &desk.store.transactions().unwrap()));
    }

    #[test]
    fn amount_over_ceiling_is_rejected() {
        let desk = desk();
        let patient = register(&desk, "Siti");
        let visit = desk
            .visits
            .create_visit(&patient.id.to_string(), "Poli Umum")
            .unwrap();

        let err = desk
            .visits
            .record_payment(&visit.id.to_string(), &100_000_001u64.into(), Some("paid"))
            .unwrap_err();
        assert!(err.to_string().contains("maximum"));
        assert!(desk.store.transactions().unwrap().is_empty());
    }

    #[test]
    fn pending_payment_defaults_and_leaves_status() {
        let desk = desk();
        let patient = register(&desk, "Siti");
        let visit = desk
            .visits
            .create_visit(&patient.id.to_string(), "Poli Umum")
            .unwrap();

        let view = desk
            .visits
            .record_payment(&visit.id.to_string(), &"50000".into(), None)
            .unwrap();
        assert_eq!(view.transaction.status, TransactionStatus::Pending);
        assert_eq!(view.visit.status, VisitStatus::Registered);
        assert!(!is_visit_paid(visit.id, &desk.store.transactions().unwrap()));
    }

    #[test]
    fn paid_visit_refuses_another_payment() {
        let desk = desk();
        let patient = register(&desk, "Siti");
        let visit = desk
            .visits
            .create_visit(&patient.id.to_string(), "Poli Umum")
            .unwrap();
        let id = visit.id.to_string();

        desk.visits
            .record_payment(&id, &10_000u64.into(), Some("paid"))
            .unwrap();
        let err = desk
            .visits
            .record_payment(&id, &10_000u64.into(), Some("paid"))
            .unwrap_err();
        assert!(matches!(err, SimrsError::Validation(msg) if msg.contains("already been paid")));
        assert_eq!(desk.store.transactions().unwrap().len(), 1);
    }

    #[test]
    fn failed_store_write_leaves_the_visit_payable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = Arc::new(TableStore::open(tmp.path()).unwrap());
        let cfg = Arc::new(CoreConfig::in_memory());
        let patients = PatientService::new(store.clone());
        let visits = VisitService::new(cfg, store.clone());

        let patient = patients
            .register(NewPatient {
                name: "Budi Santoso".into(),
                ..Default::default()
            })
            .unwrap();
        let visit = visits
            .create_visit(&patient.id.to_string(), "Poli Anak")
            .unwrap();
        let id = visit.id.to_string();

        let blocker = tmp.path().join("visits.yaml.tmp");
        std::fs::create_dir(&blocker).unwrap();
        let err = visits
            .record_payment(&id, &150_000u64.into(), Some("paid"))
            .unwrap_err();
        assert!(err.is_store_error());
        assert!(!is_visit_paid(visit.id, &store.transactions().unwrap()));
        assert_eq!(
            store.visit(visit.id).unwrap().unwrap().status,
            VisitStatus::Registered
        );

        std::fs::remove_dir(&blocker).unwrap();
        let view = visits
            .record_payment(&id, &150_000u64.into(), Some("paid"))
            .unwrap();
        assert_eq!(view.visit.status, VisitStatus::Closed);
        assert_eq!(store.transactions().unwrap().len(), 1);
    }

    #[test]
    fn unknown_status_and_visit_are_rejected() {
        let desk = desk();
        let patient = register(&desk, "Siti");
        let visit = desk
            .visits
            .create_visit(&patient.id.to_string(), "Poli Umum")
            .unwrap();

        assert!(matches!(
            desk.visits
                .record_payment(&visit.id.to_string(), &1u64.into(), Some("refunded")),
            Err(SimrsError::Validation(_))
        ));
        assert!(matches!(
            desk.visits
                .record_payment(&RecordId::new().to_string(), &1u64.into(), Some("paid")),
            Err(SimrsError::NotFound { .. })
        ));
    }

    #[test]
    fn create_visit_validates_and_checks_patient() {
        let desk = desk();
        assert!(matches!(
            desk.visits.create_visit("", "Poli Anak"),
            Err(SimrsError::Validation(msg)) if msg == "patient_id is required"
        ));
        let patient = register(&desk, "Budi");
        assert!(matches!(
            desk.visits.create_visit(&patient.id.to_string(), " "),
            Err(SimrsError::Validation(msg)) if msg == "doctor is required"
        ));
        assert!(matches!(
            desk.visits
                .create_visit(&RecordId::new().to_string(), "Poli Anak"),
            Err(SimrsError::NotFound { .. })
        ));
    }

    #[test]
    fn consultation_requires_diagnosis_notes_and_visit() {
        let desk = desk();
        let patient = register(&desk, "Budi");
        let visit = desk
            .visits
            .create_visit(&patient.id.to_string(), "Poli Anak")
            .unwrap();
        let id = visit.id.to_string();

        assert!(desk.visits.record_consultation(&id, "", "notes").is_err());
        assert!(desk.visits.record_consultation(&id, "J00", " ").is_err());
        assert!(matches!(
            desk.visits
                .record_consultation(&RecordId::new().to_string(), "J00", "notes"),
            Err(SimrsError::NotFound { .. })
        ));
        assert!(desk.store.medical_records().unwrap().is_empty());
    }

    #[test]
    fn patient_with_a_visit_today_is_not_a_candidate() {
        let desk = desk();
        let budi = register(&desk, "Budi Santoso");
        let siti = register(&desk, "Siti Aminah");
        desk.visits
            .create_visit(&budi.id.to_string(), "Poli Anak")
            .unwrap();

        let first = desk.visits.candidates().unwrap();
        let second = desk.visits.candidates().unwrap();
        for candidates in [first, second] {
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0].id, siti.id);
        }
    }

    #[test]
    fn active_patient_ids_uses_the_clinic_day() {
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        let patient_id = RecordId::new();
        // 18:30 UTC on the 1st is 01:30 WIB on the 2nd.
        let visit = Visit {
            id: RecordId::new(),
            patient_id,
            doctor: NonEmptyText::new("Poli Anak").unwrap(),
            status: VisitStatus::Paid,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 18, 30, 0).unwrap(),
        };
        let visits = [visit];

        let second = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(active_patient_ids(second, &visits, wib).contains(&patient_id));
        assert!(active_patient_ids(first, &visits, wib).is_empty());
    }

    #[test]
    fn medical_history_spans_the_patients_visits() {
        let desk = desk();
        let budi = register(&desk, "Budi Santoso");
        let other = register(&desk, "Siti");
        for doctor in ["Poli Anak", "Poli Umum"] {
            let visit = desk
                .visits
                .create_visit(&budi.id.to_string(), doctor)
                .unwrap();
            desk.visits
                .record_consultation(&visit.id.to_string(), "J00 Common cold", "Rest")
                .unwrap();
        }
        let visit = desk
            .visits
            .create_visit(&other.id.to_string(), "Poli Gigi")
            .unwrap();
        desk.visits
            .record_consultation(&visit.id.to_string(), "K02", "Filling")
            .unwrap();

        let history = desk.visits.medical_history(&budi.id.to_string()).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|h| h.patient_name == "Budi Santoso"));
        assert!(history.iter().any(|h| h.doctor.as_str() == "Poli Umum"));

        assert!(matches!(
            desk.visits.medical_history(&RecordId::new().to_string()),
            Err(SimrsError::NotFound { .. })
        ));
    }

    #[test]
    fn searches_match_patient_and_doctor() {
        let desk = desk();
        let budi = register(&desk, "Budi Santoso");
        let visit = desk
            .visits
            .create_visit(&budi.id.to_string(), "Poli Anak")
            .unwrap();
        desk.visits
            .record_payment(&visit.id.to_string(), &150_000u64.into(), Some("paid"))
            .unwrap();

        assert_eq!(desk.visits.search("anak").unwrap().len(), 1);
        assert_eq!(desk.visits.search("budi").unwrap().len(), 1);
        assert!(desk.visits.search("gigi").unwrap().is_empty());
        assert_eq!(desk.visits.search_transactions("150000").unwrap().len(), 1);
        assert_eq!(desk.visits.search_transactions("PAID").unwrap().len(), 1);
        assert!(matches!(
            desk.visits.search_transactions(""),
            Err(SimrsError::Validation(msg)) if msg == "Search query is required"
        ));
    }
}
