//! Constants used throughout the SIMRS core crate.

/// Default directory for the file-backed store when none is configured.
pub const DEFAULT_DATA_DIR: &str = "simrs_data";

/// Largest single payment accepted unless overridden, in whole rupiah.
///
/// Catches fat-fingered input such as an extra pair of zeros.
pub const DEFAULT_PAYMENT_CEILING: u64 = 100_000_000;

/// Clinic time zone used for "today" questions unless overridden (WIB).
pub const DEFAULT_UTC_OFFSET: &str = "+07:00";

/// Table file names for the file-backed store.
pub const PATIENTS_TABLE: &str = "patients";
pub const VISITS_TABLE: &str = "visits";
pub const MEDICAL_RECORDS_TABLE: &str = "medical_records";
pub const TRANSACTIONS_TABLE: &str = "transactions";
pub const USERS_TABLE: &str = "users";

/// Extension for persisted table files.
pub const TABLE_FILE_EXTENSION: &str = "yaml";

/// Session token length, in alphanumeric characters.
pub const SESSION_TOKEN_LEN: usize = 48;
