//! # API REST
//!
//! REST API implementation for SIMRS.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Bearer-token sessions and role gating at the request boundary
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, error rendering)
//!
//! Uses `api-shared` for wire types and `simrs-core` for everything else.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;
pub mod session;


use api_shared::*;
use axum::{
    routing::{delete, get, post},
    Router,
};
use simrs_core::{
    BillingService, CoreConfig, PatientService, ReportService, SessionRegistry, Store,
    UserService, VisitService,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared by every handler.
///
/// Services are cheap to build, so handlers construct the one they need per request from the
/// shared config and store.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn Store>) -> Self {
        Self {
            cfg,
            store,
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn patients(&self) -> PatientService {
        PatientService::new(self.store.clone())
    }

    pub fn visits(&self) -> VisitService {
        VisitService::new(self.cfg.clone(), self.store.clone())
    }

    pub fn billing(&self) -> BillingService {
        BillingService::new(self.cfg.clone(), self.store.clone())
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(self.cfg.clone(), self.store.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.store.clone())
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::health,
        handlers::login,
        handlers::current_session,
        handlers::logout,
        handlers::access,
        handlers::list_patients,
        handlers::search_patients,
        handlers::create_patient,
        handlers::list_visits,
        handlers::search_visits,
        handlers::visit_candidates,
        handlers::create_visit,
        handlers::create_medical_record,
        handlers::medical_history,
        handlers::create_transaction,
        handlers::list_transactions,
        handlers::search_transactions,
        handlers::pending_billing,
        handlers::today_billing,
        handlers::report_summary,
        handlers::list_users,
        handlers::create_user,
        handlers::delete_user,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        MessageRes,
        CreatePatientReq,
        PatientRes,
        PatientNameRes,
        CreateVisitReq,
        VisitRes,
        TransactionSummaryRes,
        VisitOverviewRes,
        CreateMedicalRecordReq,
        MedicalRecordRes,
        HistoryVisitRes,
        MedicalHistoryRes,
        CreateTransactionReq,
        TransactionVisitRes,
        TransactionRes,
        TodayBillingRes,
        StatusCountsRes,
        ReportSummaryRes,
        LoginReq,
        SessionUserRes,
        LoginRes,
        CreateUserReq,
        UserRes,
        AccessRes,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Builds the full application: routes, Swagger UI and CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login))
        .route("/session", get(handlers::current_session))
        .route("/logout", post(handlers::logout))
        .route("/access/:page", get(handlers::access))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route("/patients/search", get(handlers::search_patients))
        .route(
            "/visits",
            get(handlers::list_visits).post(handlers::create_visit),
        )
        .route("/visits/search", get(handlers::search_visits))
        .route("/visits/candidates", get(handlers::visit_candidates))
        .route("/medical-records", post(handlers::create_medical_record))
        .route("/medical-records/:patient_id", get(handlers::medical_history))
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/transactions/search", get(handlers::search_transactions))
        .route("/billing/pending", get(handlers::pending_billing))
        .route("/billing/today", get(handlers::today_billing))
        .route("/reports/summary", get(handlers::report_summary))
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/users/:id", delete(handlers::delete_user))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
