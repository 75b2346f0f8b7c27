//! Request handlers.
//!
//! Each handler checks the caller's role against the operation it performs, hands the
//! validated input to a core service and converts the result into a wire type. Nothing here
//! decides business rules.

use crate::error::{ApiJson, ApiResult};
use crate::session::CurrentSession;
use crate::AppState;
use api_shared::{
    AccessRes, BANNER, CreateMedicalRecordReq, CreatePatientReq, CreateTransactionReq,
    CreateUserReq, CreateVisitReq, ErrorRes, HealthRes, HealthService, LoginReq, LoginRes,
    MedicalHistoryRes, MedicalRecordRes, MessageRes, PatientRes, ReportSummaryRes, SearchParams,
    TodayBillingRes, TransactionRes, UserRes, VisitOverviewRes, VisitRes,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;
use simrs_core::transaction::AmountInput;
use simrs_core::validation::required_id;
use simrs_core::{NewPatient, NewUser, Operation, Page, SimrsError, SimrsResult};

fn amount_input(value: Value) -> SimrsResult<AmountInput> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(AmountInput::Number)
            .ok_or_else(|| SimrsError::Validation("amount must be a number".into())),
        Value::String(s) => Ok(AmountInput::Text(s)),
        Value::Null => Err(SimrsError::Validation("amount is required".into())),
        other => Err(SimrsError::Validation(format!(
            "amount must be a number, got {other}"
        ))),
    }
}

fn search_text(params: &SearchParams) -> &str {
    params.q.as_deref().unwrap_or("")
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Banner", body = String))
)]
pub async fn root() -> &'static str {
    BANNER
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

// Sessions

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Session opened", body = LoginRes),
        (status = 401, description = "Unknown username or wrong password", body = ErrorRes)
    )
)]
/// Verify credentials and open a session.
///
/// The returned token is sent back as `Authorization: Bearer <token>` on every other call.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginReq>,
) -> ApiResult<Json<LoginRes>> {
    let session = state
        .sessions
        .login(&state.users(), &req.username, &req.password)?;
    Ok(Json(session.into()))
}

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "The caller's session", body = LoginRes),
        (status = 401, description = "No session", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Restore the session belonging to the presented token.
pub async fn current_session(CurrentSession(session): CurrentSession) -> Json<LoginRes> {
    Json(session.into())
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session ended", body = MessageRes),
        (status = 401, description = "No session", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<MessageRes>> {
    state.sessions.logout(&session.token)?;
    Ok(Json(MessageRes {
        message: "logged out".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/access/{page}",
    params(("page" = String, Path, description = "Page name or path, e.g. `billing` or `/billing`")),
    responses(
        (status = 200, description = "Access decision for the caller's role", body = AccessRes),
        (status = 400, description = "Unknown page", body = ErrorRes),
        (status = 401, description = "No session", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Whether the caller may open `page`, and where to go instead if not.
pub async fn access(
    CurrentSession(session): CurrentSession,
    Path(page): Path<String>,
) -> ApiResult<Json<AccessRes>> {
    let page: Page = page
        .parse()
        .map_err(|e: simrs_core::access::UnknownName| SimrsError::Validation(e.to_string()))?;
    Ok(Json(AccessRes::new(page, session.authorize_page(page))))
}

// Patients

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Patients, newest first", body = Vec<PatientRes>),
        (status = 401, description = "No session", body = ErrorRes),
        (status = 403, description = "Role may not list patients", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<PatientRes>>> {
    session.require(Operation::ListPatients)?;
    let patients = state.patients().list()?;
    Ok(Json(patients.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/patients/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching patients", body = Vec<PatientRes>),
        (status = 400, description = "Missing query", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Case-insensitive match on name, NIK, phone or address.
#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<PatientRes>>> {
    session.require(Operation::ListPatients)?;
    let patients = state.patients().search(search_text(&params))?;
    Ok(Json(patients.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient registered", body = PatientRes),
        (status = 400, description = "Missing name", body = ErrorRes),
        (status = 403, description = "Role may not register patients", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiJson(req): ApiJson<CreatePatientReq>,
) -> ApiResult<(StatusCode, Json<PatientRes>)> {
    session.require(Operation::RegisterPatient)?;
    let patient = state.patients().register(NewPatient {
        name: req.name,
        nik: req.nik,
        phone: req.phone,
        address: req.address,
    })?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

// Visits

#[utoipa::path(
    get,
    path = "/visits",
    responses(
        (status = 200, description = "Visits with patient name and transactions, newest first", body = Vec<VisitOverviewRes>),
        (status = 403, description = "Role may not list visits", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_visits(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<VisitOverviewRes>>> {
    session.require(Operation::ListVisits)?;
    let visits = state.visits().overviews()?;
    Ok(Json(visits.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/visits/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching visits", body = Vec<VisitOverviewRes>),
        (status = 400, description = "Missing query", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Match on patient name, doctor label or visit id.
#[axum::debug_handler]
pub async fn search_visits(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<VisitOverviewRes>>> {
    session.require(Operation::ListVisits)?;
    let visits = state.visits().search(search_text(&params))?;
    Ok(Json(visits.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/visits/candidates",
    responses(
        (status = 200, description = "Patients without a visit today", body = Vec<PatientRes>),
        (status = 403, description = "Role may not create visits", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Patients who may still be given a visit today.
#[axum::debug_handler]
pub async fn visit_candidates(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<PatientRes>>> {
    session.require(Operation::CreateVisit)?;
    let patients = state.visits().candidates()?;
    Ok(Json(patients.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/visits",
    request_body = CreateVisitReq,
    responses(
        (status = 201, description = "Visit opened with status registered", body = VisitRes),
        (status = 400, description = "Missing patient or doctor", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_visit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiJson(req): ApiJson<CreateVisitReq>,
) -> ApiResult<(StatusCode, Json<VisitRes>)> {
    session.require(Operation::CreateVisit)?;
    let visit = state.visits().create_visit(&req.patient_id, &req.doctor)?;
    Ok((StatusCode::CREATED, Json(visit.into())))
}

// Medical records

#[utoipa::path(
    post,
    path = "/medical-records",
    request_body = CreateMedicalRecordReq,
    responses(
        (status = 201, description = "Consultation recorded", body = MedicalRecordRes),
        (status = 400, description = "Missing diagnosis or notes", body = ErrorRes),
        (status = 404, description = "Unknown visit", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_medical_record(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiJson(req): ApiJson<CreateMedicalRecordReq>,
) -> ApiResult<(StatusCode, Json<MedicalRecordRes>)> {
    session.require(Operation::RecordConsultation)?;
    let record = state
        .visits()
        .record_consultation(&req.visit_id, &req.diagnosis, &req.notes)?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    get,
    path = "/medical-records/{patient_id}",
    params(("patient_id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Consultations across the patient's visits, newest first", body = Vec<MedicalHistoryRes>),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn medical_history(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Vec<MedicalHistoryRes>>> {
    session.require(Operation::ReadMedicalHistory)?;
    let history = state.visits().medical_history(&patient_id)?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

// Transactions

#[utoipa::path(
    post,
    path = "/transactions",
    request_body = CreateTransactionReq,
    responses(
        (status = 201, description = "Payment recorded", body = TransactionRes),
        (status = 400, description = "Bad amount or status, or visit already paid", body = ErrorRes),
        (status = 404, description = "Unknown visit", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Record a payment. A `paid` payment closes the visit.
#[axum::debug_handler]
pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiJson(req): ApiJson<CreateTransactionReq>,
) -> ApiResult<(StatusCode, Json<TransactionRes>)> {
    session.require(Operation::RecordPayment)?;
    let amount = amount_input(req.amount)?;
    let view = state
        .visits()
        .record_payment(&req.visit_id, &amount, req.status.as_deref())?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

#[utoipa::path(
    get,
    path = "/transactions",
    responses(
        (status = 200, description = "Transactions, newest first", body = Vec<TransactionRes>),
        (status = 403, description = "Role may not list transactions", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<TransactionRes>>> {
    session.require(Operation::ListTransactions)?;
    let transactions = state.visits().transactions()?;
    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/transactions/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching transactions", body = Vec<TransactionRes>),
        (status = 400, description = "Missing query", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Match on patient name, amount or status.
#[axum::debug_handler]
pub async fn search_transactions(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<TransactionRes>>> {
    session.require(Operation::ListTransactions)?;
    let transactions = state.visits().search_transactions(search_text(&params))?;
    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

// Billing and reports

#[utoipa::path(
    get,
    path = "/billing/pending",
    responses(
        (status = 200, description = "Visits with no paid transaction", body = Vec<VisitOverviewRes>),
        (status = 403, description = "Role may not take payments", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn pending_billing(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<VisitOverviewRes>>> {
    session.require(Operation::RecordPayment)?;
    let visits = state.billing().pending()?;
    Ok(Json(visits.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/billing/today",
    responses(
        (status = 200, description = "Today's transaction count and revenue, all statuses", body = TodayBillingRes),
        (status = 403, description = "Role may not take payments", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn today_billing(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<TodayBillingRes>> {
    session.require(Operation::RecordPayment)?;
    Ok(Json(state.billing().today()?.into()))
}

#[utoipa::path(
    get,
    path = "/reports/summary",
    responses(
        (status = 200, description = "Management summary", body = ReportSummaryRes),
        (status = 403, description = "Role may not view reports", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn report_summary(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<ReportSummaryRes>> {
    session.require(Operation::ViewReports)?;
    Ok(Json(state.reports().summary()?.into()))
}

// Users

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Accounts, newest first", body = Vec<UserRes>),
        (status = 403, description = "Role may not manage users", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<UserRes>>> {
    session.require(Operation::ManageUsers)?;
    let users = state.users().list()?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "Account created", body = UserRes),
        (status = 400, description = "Missing field, unknown role or username taken", body = ErrorRes),
        (status = 403, description = "Role may not manage users", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiJson(req): ApiJson<CreateUserReq>,
) -> ApiResult<(StatusCode, Json<UserRes>)> {
    session.require(Operation::ManageUsers)?;
    let user = state.users().create(NewUser {
        username: req.username,
        password: req.password,
        name: req.name,
        role: req.role,
    })?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Account deleted and its sessions ended", body = MessageRes),
        (status = 400, description = "Malformed id or own account", body = ErrorRes),
        (status = 404, description = "Unknown user", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Delete an account. Its open sessions end with it.
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageRes>> {
    session.require(Operation::ManageUsers)?;
    let id = required_id("id", &id)?;
    if id == session.user.id {
        return Err(SimrsError::Validation("cannot delete your own account".into()).into());
    }

    state.users().delete(id)?;
    let revoked = state.sessions.revoke_user(id)?;
    tracing::info!("ended {} session(s) of deleted user {}", revoked, id);
    Ok(Json(MessageRes {
        message: "user deleted".into(),
    }))
}
