//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Request handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_PAYMENT_CEILING, DEFAULT_UTC_OFFSET};
use crate::{SimrsError, SimrsResult};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::path::{Path, PathBuf};

/// Which store backs the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    /// Tables persisted as YAML files under the data directory.
    File,
    /// Tables held in memory only; lost on exit.
    Memory,
}

/// Credentials for the super_admin created when the users table is empty.
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    store_kind: StoreKind,
    payment_ceiling: u64,
    clinic_offset: FixedOffset,
    bootstrap_admin: Option<BootstrapAdmin>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `SimrsError::InvalidConfig` if the payment ceiling is zero.
    pub fn new(
        data_dir: PathBuf,
        store_kind: StoreKind,
        payment_ceiling: u64,
        clinic_offset: FixedOffset,
    ) -> SimrsResult<Self> {
        if payment_ceiling == 0 {
            return Err(SimrsError::InvalidConfig(
                "payment ceiling must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_dir,
            store_kind,
            payment_ceiling,
            clinic_offset,
            bootstrap_admin: None,
        })
    }

    /// In-memory configuration with every default applied. Used by tests and tooling.
    pub fn in_memory() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            store_kind: StoreKind::Memory,
            payment_ceiling: DEFAULT_PAYMENT_CEILING,
            clinic_offset: default_clinic_offset(),
            bootstrap_admin: None,
        }
    }

    pub fn with_bootstrap_admin(mut self, admin: Option<BootstrapAdmin>) -> Self {
        self.bootstrap_admin = admin;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store_kind
    }

    pub fn payment_ceiling(&self) -> u64 {
        self.payment_ceiling
    }

    pub fn clinic_offset(&self) -> FixedOffset {
        self.clinic_offset
    }

    pub fn bootstrap_admin(&self) -> Option<&BootstrapAdmin> {
        self.bootstrap_admin.as_ref()
    }

    /// Current instant in the clinic's time zone.
    pub fn clinic_now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.clinic_offset)
    }

    /// Calendar date of `instant` in the clinic's time zone.
    pub fn clinic_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.clinic_offset).date_naive()
    }

    pub fn clinic_today(&self) -> NaiveDate {
        self.clinic_now().date_naive()
    }
}

fn default_clinic_offset() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap_or_else(|| Utc.fix())
}

/// Parse the store kind from an optional string value. Defaults to [`StoreKind::File`].
pub fn store_kind_from_env_value(value: Option<String>) -> SimrsResult<StoreKind> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None | Some("file") => Ok(StoreKind::File),
        Some("memory") => Ok(StoreKind::Memory),
        Some(other) => Err(SimrsError::InvalidConfig(format!(
            "SIMRS_STORE must be 'file' or 'memory', got '{other}'"
        ))),
    }
}

/// Parse the payment ceiling from an optional string value.
///
/// If `value` is `None` or blank, returns [`DEFAULT_PAYMENT_CEILING`].
pub fn payment_ceiling_from_env_value(value: Option<String>) -> SimrsResult<u64> {
    let value = value
        .map(|v| v.trim().replace('_', ""))
        .filter(|v| !v.is_empty());
    match value {
        None => Ok(DEFAULT_PAYMENT_CEILING),
        Some(v) => match v.parse::<u64>() {
            Ok(0) | Err(_) => Err(SimrsError::InvalidConfig(format!(
                "SIMRS_PAYMENT_CEILING must be a positive whole number, got '{v}'"
            ))),
            Ok(n) => Ok(n),
        },
    }
}

/// Parse the clinic UTC offset (`+07:00`, `-03:30`, `Z`) from an optional string value.
///
/// If `value` is `None` or blank, returns the offset for [`DEFAULT_UTC_OFFSET`].
pub fn clinic_offset_from_env_value(value: Option<String>) -> SimrsResult<FixedOffset> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string());
    parse_utc_offset(&value).ok_or_else(|| {
        SimrsError::InvalidConfig(format!(
            "SIMRS_UTC_OFFSET must look like '+07:00', got '{value}'"
        ))
    })
}

fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    value.parse::<FixedOffset>().ok()
}

/// Build bootstrap admin credentials when both values are present and non-blank.
pub fn bootstrap_admin_from_env_values(
    username: Option<String>,
    password: Option<String>,
) -> SimrsResult<Option<BootstrapAdmin>> {
    let username = username.filter(|v| !v.trim().is_empty());
    let password = password.filter(|v| !v.is_empty());
    match (username, password) {
        (Some(username), Some(password)) => Ok(Some(BootstrapAdmin {
            username: username.trim().to_string(),
            password,
        })),
        (None, None) => Ok(None),
        _ => Err(SimrsError::InvalidConfig(
            "SIMRS_BOOTSTRAP_ADMIN_USERNAME and SIMRS_BOOTSTRAP_ADMIN_PASSWORD must be set together"
                .into(),
        )),
    }
}
