//! Errores del core.

use thiserror::Error;

/// Fallos del store de claims.
///
/// Un conflicto de clave NO es un error: se expresa como
/// `ClaimOutcome::AlreadyExists`. Todo lo que llega aquí es una falla real
/// del backend y el coordinador la resuelve suprimiendo (fail closed).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimStoreError {
    #[error("claim store unavailable: {0}")] Unavailable(String),
    #[error("claim store backend error: {0}")] Backend(String),
    #[error("invalid claim record: {0}")] InvalidRecord(String),
    #[error("invalid retention: {0}")] InvalidRetention(String),
}
