use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{ClaimKey, ClaimKind, ClaimOutcome, ClaimRecord};
use crate::errors::ClaimStoreError;
use crate::retention::{RetentionChange, RetentionPolicy};

/// Store compartido de claims.
///
/// Contrato:
/// - `create_if_absent` es linealizable entre todas las instancias que
///   comparten el store: ante llamadas concurrentes con la misma clave
///   exactamente una observa `Claimed` y el registro ganador es visible para
///   cualquier lectura posterior. Un registro ya expirado cuenta como ausente.
/// - `get` nunca devuelve registros expirados.
/// - La retención es por tipo (`plain`, `flow`). Un registro no se elimina
///   antes de su umbral; después, la eliminación física es best-effort
///   (`purge_expired`).
/// - Cambiar un umbral (`ensure_retention`) reemplaza la política vigente sin
///   tocar los registros existentes.
pub trait ClaimStore: Send + Sync + 'static {
    /// Inserta el registro si su clave no tiene uno vivo.
    fn create_if_absent(&self, record: ClaimRecord) -> Result<ClaimOutcome, ClaimStoreError>;

    /// Lee el registro vivo de una clave.
    fn get(&self, key: &ClaimKey) -> Result<Option<ClaimRecord>, ClaimStoreError>;

    /// Reconcilia el umbral de retención de un tipo.
    fn ensure_retention(&self, kind: ClaimKind, ttl: Duration) -> Result<RetentionChange, ClaimStoreError>;

    /// Política vigente.
    fn retention(&self) -> Result<RetentionPolicy, ClaimStoreError>;

    /// Elimina los registros expirados a `now` y devuelve cuántos. Un backend
    /// con reloj propio puede acotar `now` a ese reloj.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ClaimStoreError>;
}

impl<S: ClaimStore + ?Sized> ClaimStore for Arc<S> {
    fn create_if_absent(&self, record: ClaimRecord) -> Result<ClaimOutcome, ClaimStoreError> {
        (**self).create_if_absent(record)
    }
    fn get(&self, key: &ClaimKey) -> Result<Option<ClaimRecord>, ClaimStoreError> {
        (**self).get(key)
    }
    fn ensure_retention(&self, kind: ClaimKind, ttl: Duration) -> Result<RetentionChange, ClaimStoreError> {
        (**self).ensure_retention(kind, ttl)
    }
    fn retention(&self) -> Result<RetentionPolicy, ClaimStoreError> {
        (**self).retention()
    }
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ClaimStoreError> {
        (**self).purge_expired(now)
    }
}

/// Valida un umbral antes de aplicarlo: cero haría expirar cada claim en el
/// momento de crearlo y desactivaría la deduplicación.
pub(crate) fn validate_ttl(kind: ClaimKind, ttl: Duration) -> Result<(), ClaimStoreError> {
    if ttl.is_zero() {
        return Err(ClaimStoreError::InvalidRetention(format!("{kind} ttl must be greater than zero")));
    }
    Ok(())
}
