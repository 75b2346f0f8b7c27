//! Table-backed [`Store`] implementation.
//!
//! All five tables live in memory behind one lock. When opened on a directory, every mutation
//! also rewrites the affected table as a YAML file:
//!
//! ```text
//! <data_dir>/
//!   patients.yaml
//!   visits.yaml
//!   medical_records.yaml
//!   transactions.yaml
//!   users.yaml
//! ```
//!
//! Files are written to a sibling `.tmp` file and renamed into place. A mutation touching several
//! tables stages every file before renaming any. If persisting fails the in-memory tables are
//! rolled back, so memory never runs ahead of disk.

use super::Store;
use crate::config::{CoreConfig, StoreKind};
use crate::constants::{
    MEDICAL_RECORDS_TABLE, PATIENTS_TABLE, TABLE_FILE_EXTENSION, TRANSACTIONS_TABLE, USERS_TABLE,
    VISITS_TABLE,
};
use crate::medical_record::MedicalRecord;
use crate::patient::Patient;
use crate::transaction::Transaction;
use crate::user::User;
use crate::visit::{Visit, VisitStatus};
use crate::workflow::is_visit_paid;
use crate::{SimrsError, SimrsResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use simrs_types::RecordId;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

#[derive(Clone, Debug, Default)]
struct Tables {
    patients: Vec<Patient>,
    visits: Vec<Visit>,
    medical_records: Vec<MedicalRecord>,
    transactions: Vec<Transaction>,
    users: Vec<User>,
}

#[derive(Debug)]
pub struct TableStore {
    tables: RwLock<Tables>,
    dir: Option<PathBuf>,
}

impl TableStore {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            dir: None,
        }
    }

    /// Opens (creating if needed) a file-backed store rooted at `dir`, loading any existing
    /// table files.
    ///
    /// # Errors
    ///
    /// Returns a `SimrsError` if the directory cannot be created or a table file cannot be
    /// read or parsed.
    pub fn open(dir: &Path) -> SimrsResult<Self> {
        fs::create_dir_all(dir).map_err(SimrsError::DataDirCreation)?;

        let tables = Tables {
            patients: load_table(dir, PATIENTS_TABLE)?,
            visits: load_table(dir, VISITS_TABLE)?,
            medical_records: load_table(dir, MEDICAL_RECORDS_TABLE)?,
            transactions: load_table(dir, TRANSACTIONS_TABLE)?,
            users: load_table(dir, USERS_TABLE)?,
        };

        tracing::info!(
            "opened store at {} ({} patients, {} visits, {} users)",
            dir.display(),
            tables.patients.len(),
            tables.visits.len(),
            tables.users.len()
        );

        Ok(Self {
            tables: RwLock::new(tables),
            dir: Some(dir.to_path_buf()),
        })
    }

    /// Builds the store selected by `cfg`.
    pub fn from_config(cfg: &CoreConfig) -> SimrsResult<Self> {
        match cfg.store_kind() {
            StoreKind::Memory => Ok(Self::in_memory()),
            StoreKind::File => Self::open(cfg.data_dir()),
        }
    }

    fn read(&self) -> SimrsResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| SimrsError::StoreLock)
    }

    /// Applies `f` under the write lock and persists `tables` afterwards.
    ///
    /// `f` must not leave partial changes behind when it returns an error.
    fn mutate<R>(
        &self,
        tables: &[&'static str],
        f: impl FnOnce(&mut Tables) -> SimrsResult<R>,
    ) -> SimrsResult<R> {
        let mut guard = self.tables.write().map_err(|_| SimrsError::StoreLock)?;
        let snapshot = self.dir.as_ref().map(|_| (*guard).clone());

        let out = f(&mut guard)?;

        if let Some(dir) = &self.dir {
            if let Err(e) = persist_tables(dir, tables, &guard) {
                tracing::error!("rolling back {:?} after failed write: {}", tables, e);
                if let Some(snapshot) = snapshot {
                    *guard = snapshot;
                }
                return Err(e);
            }
        }

        Ok(out)
    }
}

fn table_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.{TABLE_FILE_EXTENSION}"))
}

fn load_table<T: DeserializeOwned>(dir: &Path, table: &'static str) -> SimrsResult<Vec<T>> {
    let path = table_path(dir, table);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(&path).map_err(|source| SimrsError::StoreRead { table, source })?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(&raw).map_err(|source| SimrsError::YamlDeserialization { table, source })
}

fn tmp_path(dir: &Path, table: &str) -> PathBuf {
    table_path(dir, table).with_extension(format!("{TABLE_FILE_EXTENSION}.tmp"))
}

/// Writes `rows` to the table's `.tmp` sibling.
fn stage_rows<T: Serialize>(dir: &Path, table: &'static str, rows: &[T]) -> SimrsResult<()> {
    let yaml = serde_yaml::to_string(rows).map_err(SimrsError::YamlSerialization)?;
    fs::write(tmp_path(dir, table), yaml).map_err(|source| SimrsError::StoreWrite { table, source })
}

fn stage_table(dir: &Path, table: &'static str, tables: &Tables) -> SimrsResult<()> {
    match table {
        PATIENTS_TABLE => stage_rows(dir, table, &tables.patients),
        VISITS_TABLE => stage_rows(dir, table, &tables.visits),
        MEDICAL_RECORDS_TABLE => stage_rows(dir, table, &tables.medical_records),
        TRANSACTIONS_TABLE => stage_rows(dir, table, &tables.transactions),
        USERS_TABLE => stage_rows(dir, table, &tables.users),
        other => unreachable!("unknown table {other}"),
    }
}

/// Stages every table, then renames them into place. Nothing is renamed unless all staged.
fn persist_tables(dir: &Path, names: &[&'static str], tables: &Tables) -> SimrsResult<()> {
    for (i, &table) in names.iter().enumerate() {
        if let Err(e) = stage_table(dir, table, tables) {
            for &staged in &names[..i] {
                let _ = fs::remove_file(tmp_path(dir, staged));
            }
            return Err(e);
        }
    }
    for &table in names {
        fs::rename(tmp_path(dir, table), table_path(dir, table))
            .map_err(|source| SimrsError::StoreWrite { table, source })?;
    }
    Ok(())
}

impl Store for TableStore {
    fn insert_patient(&self, patient: Patient) -> SimrsResult<Patient> {
        self.mutate(&[PATIENTS_TABLE], |t| {
            t.patients.push(patient.clone());
            Ok(patient)
        })
    }

    fn patients(&self) -> SimrsResult<Vec<Patient>> {
        Ok(self.read()?.patients.clone())
    }

    fn patient(&self, id: RecordId) -> SimrsResult<Option<Patient>> {
        Ok(self.read()?.patients.iter().find(|p| p.id == id).cloned())
    }

    fn insert_visit(&self, visit: Visit) -> SimrsResult<Visit> {
        self.mutate(&[VISITS_TABLE], |t| {
            if !t.patients.iter().any(|p| p.id == visit.patient_id) {
                return Err(SimrsError::not_found("patient", visit.patient_id));
            }
            t.visits.push(visit.clone());
            Ok(visit)
        })
    }

    fn visits(&self) -> SimrsResult<Vec<Visit>> {
        Ok(self.read()?.visits.clone())
    }

    fn visit(&self, id: RecordId) -> SimrsResult<Option<Visit>> {
        Ok(self.read()?.visits.iter().find(|v| v.id == id).cloned())
    }

    fn insert_medical_record(&self, record: MedicalRecord) -> SimrsResult<MedicalRecord> {
        self.mutate(&[MEDICAL_RECORDS_TABLE], |t| {
            if !t.visits.iter().any(|v| v.id == record.visit_id) {
                return Err(SimrsError::not_found("visit", record.visit_id));
            }
            t.medical_records.push(record.clone());
            Ok(record)
        })
    }

    fn medical_records(&self) -> SimrsResult<Vec<MedicalRecord>> {
        Ok(self.read()?.medical_records.clone())
    }

    fn insert_payment(
        &self,
        transaction: Transaction,
        visit_status: Option<VisitStatus>,
    ) -> SimrsResult<(Transaction, Visit)> {
        self.mutate(&[TRANSACTIONS_TABLE, VISITS_TABLE], |t| {
            let visit_id = transaction.visit_id;
            let visit = t
                .visits
                .iter_mut()
                .find(|v| v.id == visit_id)
                .ok_or_else(|| SimrsError::not_found("visit", visit_id))?;

            if is_visit_paid(visit_id, &t.transactions) {
                tracing::warn!("rejected payment on already paid visit {}", visit_id);
                return Err(SimrsError::Validation(format!(
                    "visit {visit_id} has already been paid"
                )));
            }
            if let Some(next) = visit_status {
                visit.status = visit.status.advance(next)?;
            }

            let visit = visit.clone();
            t.transactions.push(transaction.clone());
            Ok((transaction, visit))
        })
    }

    fn transactions(&self) -> SimrsResult<Vec<Transaction>> {
        Ok(self.read()?.transactions.clone())
    }

    fn insert_user(&self, user: User) -> SimrsResult<User> {
        self.mutate(&[USERS_TABLE], |t| {
            t.users.push(user.clone());
            Ok(user)
        })
    }

    fn users(&self) -> SimrsResult<Vec<User>> {
        Ok(self.read()?.users.clone())
    }

    fn user_by_username(&self, username: &str) -> SimrsResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.username.as_str() == username)
            .cloned())
    }

    fn delete_user(&self, id: RecordId) -> SimrsResult<bool> {
        self.mutate(&[USERS_TABLE], |t| {
            let before = t.users.len();
            t.users.retain(|u| u.id != id);
            Ok(t.users.len() != before)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::auth::PasswordHash;
    use crate::transaction::TransactionStatus;
    use chrono::Utc;
    use simrs_types::NonEmptyText;
    use tempfile::TempDir;

    fn patient(name: &str) -> Patient {
        Patient {
            id: RecordId::new(),
            name: NonEmptyText::new(name).unwrap(),
            nik: Some("3174012304560001".into()),
            phone: None,
            address: None,
            created_at: Utc::now(),
        }
    }

    fn visit_for(patient_id: RecordId) -> Visit {
        Visit {
            id: RecordId::new(),
            patient_id,
            doctor: NonEmptyText::new("Poli Umum").unwrap(),
            status: VisitStatus::Registered,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn visit_requires_existing_patient() {
        let store = TableStore::in_memory();
        let err = store.insert_visit(visit_for(RecordId::new())).unwrap_err();
        assert!(matches!(err, SimrsError::NotFound { entity: "patient", .. }));
        assert!(store.visits().unwrap().is_empty());
    }

    fn paid(visit_id: RecordId, amount: u64) -> Transaction {
        Transaction {
            id: RecordId::new(),
            visit_id,
            amount,
            status: TransactionStatus::Paid,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn transaction_and_record_require_existing_visit() {
        let store = TableStore::in_memory();
        assert!(matches!(
            store
                .insert_payment(paid(RecordId::new(), 10_000), Some(VisitStatus::Closed))
                .unwrap_err(),
            SimrsError::NotFound { entity: "visit", .. }
        ));

        let record = MedicalRecord {
            id: RecordId::new(),
            visit_id: RecordId::new(),
            diagnosis: NonEmptyText::new("J00").unwrap(),
            notes: NonEmptyText::new("rest").unwrap(),
            created_at: Utc::now(),
        };
        assert!(store.insert_medical_record(record).is_err());
    }

    #[test]
    fn second_paid_payment_leaves_tables_untouched() {
        let store = TableStore::in_memory();
        let p = patient("Budi Santoso");
        let v = visit_for(p.id);
        store.insert_patient(p).unwrap();
        store.insert_visit(v.clone()).unwrap();

        let (_, visit) = store
            .insert_payment(paid(v.id, 150_000), Some(VisitStatus::Closed))
            .unwrap();
        assert_eq!(visit.status, VisitStatus::Closed);

        let err = store
            .insert_payment(paid(v.id, 150_000), Some(VisitStatus::Closed))
            .unwrap_err();
        assert!(matches!(err, SimrsError::Validation(msg) if msg.contains("already been paid")));
        assert_eq!(store.transactions().unwrap().len(), 1);
    }

    #[test]
    fn failed_payment_write_keeps_memory_and_disk_unchanged() {
        let tmp = TempDir::new().unwrap();
        let store = TableStore::open(tmp.path()).unwrap();
        let p = patient("Budi Santoso");
        let v = visit_for(p.id);
        store.insert_patient(p).unwrap();
        store.insert_visit(v.clone()).unwrap();

        // A directory squatting on the staging path makes the visits write fail.
        let blocker = tmp.path().join("visits.yaml.tmp");
        fs::create_dir(&blocker).unwrap();

        let err = store
            .insert_payment(paid(v.id, 150_000), Some(VisitStatus::Closed))
            .unwrap_err();
        assert!(matches!(err, SimrsError::StoreWrite { table: "visits", .. }));
        assert!(store.transactions().unwrap().is_empty());
        assert_eq!(store.visit(v.id).unwrap().unwrap().status, VisitStatus::Registered);
        assert!(!tmp.path().join("transactions.yaml").exists());
        assert!(!tmp.path().join("transactions.yaml.tmp").exists());

        fs::remove_dir(&blocker).unwrap();
        store
            .insert_payment(paid(v.id, 150_000), Some(VisitStatus::Closed))
            .unwrap();

        let reopened = TableStore::open(tmp.path()).unwrap();
        assert_eq!(reopened.transactions().unwrap().len(), 1);
        assert_eq!(
            reopened.visit(v.id).unwrap().unwrap().status,
            VisitStatus::Closed
        );
    }

    #[test]
    fn file_store_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let p = patient("Siti Aminah");
        let v = visit_for(p.id);

        {
            let store = TableStore::open(tmp.path()).unwrap();
            store.insert_patient(p.clone()).unwrap();
            store.insert_visit(v.clone()).unwrap();
            store
                .insert_payment(paid(v.id, 50_000), Some(VisitStatus::Closed))
                .unwrap();
        }

        assert!(tmp.path().join("patients.yaml").is_file());
        assert!(tmp.path().join("visits.yaml").is_file());
        assert!(tmp.path().join("transactions.yaml").is_file());

        let reopened = TableStore::open(tmp.path()).unwrap();
        assert_eq!(reopened.patients().unwrap(), vec![p]);
        let visit = reopened.visit(v.id).unwrap().unwrap();
        assert_eq!(visit.status, VisitStatus::Closed);
    }

    #[test]
    fn delete_user_reports_whether_a_row_went() {
        let tmp = TempDir::new().unwrap();
        let store = TableStore::open(tmp.path()).unwrap();
        let user = User {
            id: RecordId::new(),
            username: NonEmptyText::new("kasir1").unwrap(),
            password_hash: PasswordHash::create("rahasia").unwrap(),
            name: NonEmptyText::new("Staff Billing").unwrap(),
            role: Role::Kasir,
            created_at: Utc::now(),
        };
        store.insert_user(user.clone()).unwrap();
        assert!(store.user_by_username("kasir1").unwrap().is_some());

        assert!(store.delete_user(user.id).unwrap());
        assert!(!store.delete_user(user.id).unwrap());

        let reopened = TableStore::open(tmp.path()).unwrap();
        assert!(reopened.users().unwrap().is_empty());
    }

    #[test]
    fn corrupt_table_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("visits.yaml"), "- not: [a visit").unwrap();
        let err = TableStore::open(tmp.path()).unwrap_err();
        assert!(err.is_store_error());
        assert!(matches!(
            err,
            SimrsError::YamlDeserialization { table: "visits", .. }
        ));
    }
}
