//! JSON request and response bodies.
//!
//! Field names follow the front-end's expectations: nested relations appear under the table
//! name (`patients`, `visits`, `transactions`), timestamps are RFC 3339 strings and ids are
//! 32-character hex.
//!
//! Request fields default to empty so that a missing field surfaces as a validation message
//! from the core rather than a deserialisation failure.

use serde::{Deserialize, Serialize};
use simrs_core::auth::SessionUser;
use simrs_core::billing::TodayBilling;
use simrs_core::medical_record::MedicalRecord;
use simrs_core::patient::Patient;
use simrs_core::reports::{ReportSummary, StatusCounts};
use simrs_core::transaction::Transaction;
use simrs_core::user::User;
use simrs_core::visit::Visit;
use simrs_core::workflow::{MedicalHistoryEntry, TransactionView, VisitOverview};
use simrs_core::{Access, Page, Session};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    /// Page the caller should be sent to instead, on 403 only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Free-text search; required.
    pub q: Option<String>,
}

// Patients

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nik: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub name: String,
    pub nik: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
}

impl From<Patient> for PatientRes {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.into_inner(),
            nik: p.nik,
            phone: p.phone,
            address: p.address,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// A patient reference reduced to the name, as nested under visits.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientNameRes {
    pub name: String,
}

// Visits

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateVisitReq {
    #[serde(default)]
    pub patient_id: String,
    /// Department or doctor label, e.g. "Poli Anak".
    #[serde(default)]
    pub doctor: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VisitRes {
    pub id: String,
    pub patient_id: String,
    pub doctor: String,
    pub status: String,
    pub created_at: String,
}

impl From<Visit> for VisitRes {
    fn from(v: Visit) -> Self {
        Self {
            id: v.id.to_string(),
            patient_id: v.patient_id.to_string(),
            doctor: v.doctor.into_inner(),
            status: v.status.to_string(),
            created_at: v.created_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionSummaryRes {
    pub id: String,
    pub amount: u64,
    pub status: String,
    pub created_at: String,
}

impl From<Transaction> for TransactionSummaryRes {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id.to_string(),
            amount: t.amount,
            status: t.status.to_string(),
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

/// A visit with its patient's name and its transactions.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VisitOverviewRes {
    pub id: String,
    pub patient_id: String,
    pub doctor: String,
    pub status: String,
    pub created_at: String,
    pub patients: PatientNameRes,
    pub transactions: Vec<TransactionSummaryRes>,
}

impl From<VisitOverview> for VisitOverviewRes {
    fn from(o: VisitOverview) -> Self {
        let visit = VisitRes::from(o.visit);
        Self {
            id: visit.id,
            patient_id: visit.patient_id,
            doctor: visit.doctor,
            status: visit.status,
            created_at: visit.created_at,
            patients: PatientNameRes {
                name: o.patient_name,
            },
            transactions: o.transactions.into_iter().map(Into::into).collect(),
        }
    }
}

// Medical records

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateMedicalRecordReq {
    #[serde(default)]
    pub visit_id: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MedicalRecordRes {
    pub id: String,
    pub visit_id: String,
    pub diagnosis: String,
    pub notes: String,
    pub created_at: String,
}

impl From<MedicalRecord> for MedicalRecordRes {
    fn from(r: MedicalRecord) -> Self {
        Self {
            id: r.id.to_string(),
            visit_id: r.visit_id.to_string(),
            diagnosis: r.diagnosis.into_inner(),
            notes: r.notes.into_inner(),
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryVisitRes {
    pub doctor: String,
    pub created_at: String,
    pub patients: PatientNameRes,
}

/// One consultation with the visit it belongs to.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MedicalHistoryRes {
    pub id: String,
    pub visit_id: String,
    pub diagnosis: String,
    pub notes: String,
    pub created_at: String,
    pub visits: HistoryVisitRes,
}

impl From<MedicalHistoryEntry> for MedicalHistoryRes {
    fn from(entry: MedicalHistoryEntry) -> Self {
        let record = MedicalRecordRes::from(entry.record);
        Self {
            id: record.id,
            visit_id: record.visit_id,
            diagnosis: record.diagnosis,
            notes: record.notes,
            created_at: record.created_at,
            visits: HistoryVisitRes {
                doctor: entry.doctor.into_inner(),
                created_at: entry.visit_created_at.to_rfc3339(),
                patients: PatientNameRes {
                    name: entry.patient_name,
                },
            },
        }
    }
}

// Transactions

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateTransactionReq {
    #[serde(default)]
    pub visit_id: String,
    /// Whole rupiah, as a JSON number or numeric string.
    #[serde(default)]
    #[schema(value_type = f64)]
    pub amount: serde_json::Value,
    /// `pending` (default) or `paid`.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionVisitRes {
    pub id: String,
    pub patient_id: String,
    pub doctor: String,
    pub status: String,
    pub created_at: String,
    pub patients: PatientNameRes,
}

/// A transaction with the visit it pays for and that visit's patient name.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionRes {
    pub id: String,
    pub visit_id: String,
    pub amount: u64,
    pub status: String,
    pub created_at: String,
    pub visits: TransactionVisitRes,
}

impl From<TransactionView> for TransactionRes {
    fn from(view: TransactionView) -> Self {
        let t = TransactionSummaryRes::from(view.transaction);
        let v = VisitRes::from(view.visit);
        Self {
            id: t.id,
            visit_id: v.id.clone(),
            amount: t.amount,
            status: t.status,
            created_at: t.created_at,
            visits: TransactionVisitRes {
                id: v.id,
                patient_id: v.patient_id,
                doctor: v.doctor,
                status: v.status,
                created_at: v.created_at,
                patients: PatientNameRes {
                    name: view.patient_name,
                },
            },
        }
    }
}

// Billing and reports

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TodayBillingRes {
    pub date: String,
    pub transaction_count: usize,
    /// Every transaction created today, pending ones included.
    pub revenue: u64,
}

impl From<TodayBilling> for TodayBillingRes {
    fn from(t: TodayBilling) -> Self {
        Self {
            date: t.date.to_string(),
            transaction_count: t.transaction_count,
            revenue: t.revenue,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusCountsRes {
    pub registered: usize,
    pub in_consultation: usize,
    pub closed: usize,
    pub paid: usize,
}

impl From<StatusCounts> for StatusCountsRes {
    fn from(c: StatusCounts) -> Self {
        Self {
            registered: c.registered,
            in_consultation: c.in_consultation,
            closed: c.closed,
            paid: c.paid,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportSummaryRes {
    pub date: String,
    pub total_patients: usize,
    pub total_visits: usize,
    pub visits_today: usize,
    /// Paid transactions only.
    pub total_revenue: u64,
    pub revenue_today: u64,
    pub status_counts: StatusCountsRes,
}

impl From<ReportSummary> for ReportSummaryRes {
    fn from(s: ReportSummary) -> Self {
        Self {
            date: s.date.to_string(),
            total_patients: s.total_patients,
            total_visits: s.total_visits,
            visits_today: s.visits_today,
            total_revenue: s.total_revenue,
            revenue_today: s.revenue_today,
            status_counts: s.status_counts.into(),
        }
    }
}

// Sessions and users

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionUserRes {
    pub id: String,
    pub username: String,
    pub role: String,
    pub name: String,
}

impl From<SessionUser> for SessionUserRes {
    fn from(u: SessionUser) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username,
            role: u.role.to_string(),
            name: u.name,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub token: String,
    pub user: SessionUserRes,
    /// Where the front end should land after login.
    pub home: String,
}

impl From<Session> for LoginRes {
    fn from(s: Session) -> Self {
        let home = s.role().default_page().path().to_string();
        Self {
            token: s.token,
            user: s.user.into(),
            home,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// An account as listed to administrators. Never carries the credential.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserRes {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserRes {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username.into_inner(),
            name: u.name.into_inner(),
            role: u.role.to_string(),
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessRes {
    pub page: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl AccessRes {
    pub fn new(page: Page, access: Access) -> Self {
        Self {
            page: page.path().to_string(),
            allowed: access.is_allowed(),
            redirect: match access {
                Access::Allow => None,
                Access::Redirect(to) => Some(to.path().to_string()),
            },
        }
    }
}
