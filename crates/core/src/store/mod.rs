//! Data store contract.
//!
//! Services talk to persistence only through [`Store`]. The contract mirrors what a managed
//! relational store offers the application: insert, list, fetch by id, user deletion and one
//! transactional write for payments, with foreign keys checked on insert.
//!
//! List methods return rows in insertion order; ordering for display is the caller's concern.

mod table_store;

pub use table_store::TableStore;

use crate::medical_record::MedicalRecord;
use crate::patient::Patient;
use crate::transaction::Transaction;
use crate::user::User;
use crate::visit::{Visit, VisitStatus};
use crate::SimrsResult;
use simrs_types::RecordId;

pub trait Store: Send + Sync {
    fn insert_patient(&self, patient: Patient) -> SimrsResult<Patient>;
    fn patients(&self) -> SimrsResult<Vec<Patient>>;
    fn patient(&self, id: RecordId) -> SimrsResult<Option<Patient>>;

    /// Fails with `NotFound` if the referenced patient does not exist.
    fn insert_visit(&self, visit: Visit) -> SimrsResult<Visit>;
    fn visits(&self) -> SimrsResult<Vec<Visit>>;
    fn visit(&self, id: RecordId) -> SimrsResult<Option<Visit>>;

    /// Fails with `NotFound` if the referenced visit does not exist.
    fn insert_medical_record(&self, record: MedicalRecord) -> SimrsResult<MedicalRecord>;
    fn medical_records(&self) -> SimrsResult<Vec<MedicalRecord>>;

    /// Appends `transaction` and, if `visit_status` is given, advances its visit to that
    /// status. Both land or neither does.
    ///
    /// Fails with `NotFound` if the visit does not exist, and with `Validation` if the visit
    /// already has a paid transaction or cannot advance to `visit_status`.
    fn insert_payment(
        &self,
        transaction: Transaction,
        visit_status: Option<VisitStatus>,
    ) -> SimrsResult<(Transaction, Visit)>;
    fn transactions(&self) -> SimrsResult<Vec<Transaction>>;

    fn insert_user(&self, user: User) -> SimrsResult<User>;
    fn users(&self) -> SimrsResult<Vec<User>>;
    fn user_by_username(&self, username: &str) -> SimrsResult<Option<User>>;
    /// Returns `false` if no user had that id.
    fn delete_user(&self, id: RecordId) -> SimrsResult<bool>;
}
