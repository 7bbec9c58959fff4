//! Errores de persistencia y de configuración.
//! Mapea errores de Diesel / conexión a variantes semánticas y éstas al error
//! del contrato `ClaimStore`.

use cmdclaim_core::ClaimStoreError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")] 
    UniqueViolation(String),
    #[error("check violation: {0}")] 
    CheckViolation(String),
    #[error("not found")] 
    NotFound,
    #[error("serialization conflict (retryable)")] 
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")] 
    TransientIo(String),
    #[error("invalid row: {0}")] 
    InvalidRow(String),
    #[error("unknown database error: {0}")] 
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                DatabaseErrorKind::ClosedConnection => Self::TransientIo(info.message().to_string()),
                other => Self::Unknown(format!("db error kind {:?}: {}", other, info.message())),
            },
            DieselError::DeserializationError(e) => Self::InvalidRow(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::RollbackErrorOnCommit { rollback_error, commit_error } => {
                Self::Unknown(format!("rollback={rollback_error}; commit={commit_error}"))
            }
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<PersistenceError> for ClaimStoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::TransientIo(msg) => ClaimStoreError::Unavailable(msg),
            PersistenceError::SerializationConflict => ClaimStoreError::Unavailable("serialization conflict".into()),
            PersistenceError::InvalidRow(msg) => ClaimStoreError::InvalidRecord(msg),
            PersistenceError::CheckViolation(msg) => ClaimStoreError::InvalidRecord(msg),
            other => ClaimStoreError::Backend(other.to_string()),
        }
    }
}

/// Errores de configuración. Fatales al arrancar: la instancia no se activa.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in the bot configuration")]
    MissingEndpoint(&'static str),
    #[error("{var} must specify both database and claims table, e.g. /<db>.<table> (got '{got}')")]
    MissingNamespace { var: &'static str, got: String },
    #[error("invalid store endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("invalid identifier '{0}': only [A-Za-z0-9_] allowed, not starting with a digit")]
    InvalidIdentifier(String),
    #[error("{var} must be a positive integer (got '{got}')")]
    InvalidNumber { var: &'static str, got: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_map_to_unavailable() {
        let e: ClaimStoreError = PersistenceError::TransientIo("pool timeout".into()).into();
        assert_eq!(e, ClaimStoreError::Unavailable("pool timeout".into()));
    }

    #[test]
    fn config_error_names_the_variable() {
        let e = ConfigError::MissingEndpoint("BOT_MULTI_INSTANCE_STORE_URI");
        assert_eq!(e.to_string(), "BOT_MULTI_INSTANCE_STORE_URI must be set in the bot configuration");
    }
}
