use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use api_shared::BANNER;
use simrs_core::config::{
    bootstrap_admin_from_env_values, clinic_offset_from_env_value,
    payment_ceiling_from_env_value, store_kind_from_env_value,
};
use simrs_core::constants::DEFAULT_DATA_DIR;
use simrs_core::{CoreConfig, TableStore};

/// Main entry point for the SIMRS front desk server
///
/// Resolves configuration once, opens the store, creates the bootstrap super_admin if the
/// users table is empty, and serves the REST API with Swagger UI at `/swagger-ui`.
///
/// # Environment Variables
/// - `SIMRS_REST_ADDR`: REST server address (default: "0.0.0.0:3001")
/// - `SIMRS_DATA_DIR`: Directory for table files (default: "simrs_data")
/// - `SIMRS_STORE`: `file` or `memory` (default: "file")
/// - `SIMRS_PAYMENT_CEILING`: Largest single payment in rupiah (default: 100000000)
/// - `SIMRS_UTC_OFFSET`: Clinic time zone for "today" (default: "+07:00")
/// - `SIMRS_BOOTSTRAP_ADMIN_USERNAME` / `SIMRS_BOOTSTRAP_ADMIN_PASSWORD`: Optional first account
///
/// # Errors
/// Returns an error if configuration is invalid, the store cannot be opened, or the server
/// address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simrs_run=info".parse()?)
                .add_directive("simrs_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("SIMRS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let data_dir = std::env::var("SIMRS_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());

    let cfg = CoreConfig::new(
        data_dir.into(),
        store_kind_from_env_value(std::env::var("SIMRS_STORE").ok())?,
        payment_ceiling_from_env_value(std::env::var("SIMRS_PAYMENT_CEILING").ok())?,
        clinic_offset_from_env_value(std::env::var("SIMRS_UTC_OFFSET").ok())?,
    )?
    .with_bootstrap_admin(bootstrap_admin_from_env_values(
        std::env::var("SIMRS_BOOTSTRAP_ADMIN_USERNAME").ok(),
        std::env::var("SIMRS_BOOTSTRAP_ADMIN_PASSWORD").ok(),
    )?);
    let cfg = Arc::new(cfg);

    let store = Arc::new(TableStore::from_config(&cfg)?);
    let state = AppState::new(cfg.clone(), store);

    if let Some(admin) = cfg.bootstrap_admin() {
        if let Some(user) = state.users().ensure_bootstrap_admin(admin)? {
            tracing::info!("++ Created bootstrap super_admin {}", user.username);
        }
    }

    tracing::info!(
        "++ {} on {} ({:?} store, clinic offset {})",
        BANNER,
        rest_addr,
        cfg.store_kind(),
        cfg.clinic_offset()
    );

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
