//! # SIMRS Core
//!
//! Core business logic for the SIMRS hospital front desk.
//!
//! This crate contains pure data operations over the five front-desk tables:
//! - Patient registration, visits, consultation notes and payments
//! - The visit status engine and the billing gate
//! - Role-based page access, users and sessions
//!
//! **No API concerns**: HTTP servers and wire formats belong in `api-rest` or `api-shared`.

pub mod access;
pub mod auth;
pub mod billing;
pub mod config;
pub mod constants;
pub mod error;
pub mod medical_record;
pub mod patient;
pub mod reports;
pub mod store;
pub mod transaction;
pub mod user;
pub mod validation;
pub mod visit;
pub mod workflow;

pub use access::{Access, Operation, Page, Role};
pub use auth::{Session, SessionRegistry, SessionUser};
pub use billing::BillingService;
pub use config::{BootstrapAdmin, CoreConfig, StoreKind};
pub use error::{SimrsError, SimrsResult};
pub use patient::{NewPatient, PatientService};
pub use reports::ReportService;
pub use store::{Store, TableStore};
pub use user::{NewUser, UserService};
pub use workflow::VisitService;

pub use simrs_types::{NonEmptyText, RecordId};
