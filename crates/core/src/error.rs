use crate::access::{Page, Role};
use simrs_types::{RecordIdError, TextError};

/// Message returned for every failed login, whichever of username or password was wrong.
pub const BAD_CREDENTIALS_MESSAGE: &str = "username or password incorrect";

#[derive(Debug, thiserror::Error)]
pub enum SimrsError {
    #[error("{0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{}", BAD_CREDENTIALS_MESSAGE)]
    BadCredentials,
    #[error("session is missing or has expired")]
    SessionRequired,
    #[error("role {role} may not access {page}")]
    Forbidden {
        role: Role,
        page: Page,
        redirect: Page,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to hash password: {0}")]
    PasswordHashing(String),

    #[error("failed to create data directory: {0}")]
    DataDirCreation(std::io::Error),
    #[error("failed to read store table {table}: {source}")]
    StoreRead {
        table: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write store table {table}: {source}")]
    StoreWrite {
        table: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize store table {table}: {source}")]
    YamlDeserialization {
        table: &'static str,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("store lock poisoned")]
    StoreLock,
}

impl SimrsError {
    /// Failures of the underlying data store, surfaced to users as a generic message.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            SimrsError::DataDirCreation(_)
                | SimrsError::StoreRead { .. }
                | SimrsError::StoreWrite { .. }
                | SimrsError::YamlSerialization(_)
                | SimrsError::YamlDeserialization { .. }
                | SimrsError::StoreLock
        )
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        SimrsError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<RecordIdError> for SimrsError {
    fn from(e: RecordIdError) -> Self {
        SimrsError::Validation(e.to_string())
    }
}

impl From<TextError> for SimrsError {
    fn from(e: TextError) -> Self {
        SimrsError::Validation(e.to_string())
    }
}

pub type SimrsResult<T> = std::result::Result<T, SimrsError>;
