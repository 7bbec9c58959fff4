//! Política de retención de claims.
//!
//! Cada tipo de claim tiene su propio umbral. Un registro expira cuando su
//! edad alcanza el umbral de su tipo; antes de eso nunca se borra. El umbral
//! se evalúa contra la política vigente, así que cambiarla en caliente no
//! exige migrar registros.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::{ClaimKind, ClaimRecord};
use crate::constants::{DEFAULT_FLOW_TTL_SECS, DEFAULT_PLAIN_TTL_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub plain: Duration,
    pub flow: Duration,
}

impl RetentionPolicy {
    pub fn new(plain: Duration, flow: Duration) -> Self {
        Self { plain, flow }
    }

    pub fn ttl_for(&self, kind: ClaimKind) -> Duration {
        match kind {
            ClaimKind::Plain => self.plain,
            ClaimKind::Flow => self.flow,
        }
    }

    pub fn set(&mut self, kind: ClaimKind, ttl: Duration) {
        match kind {
            ClaimKind::Plain => self.plain = ttl,
            ClaimKind::Flow => self.flow = ttl,
        }
    }

    /// Instante a partir del cual el registro puede eliminarse. `None` si el
    /// umbral no cabe en el rango de fechas (nunca expira).
    pub fn expires_at(&self, record: &ClaimRecord) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.ttl_for(record.kind)).ok()?;
        record.created_at.checked_add_signed(ttl)
    }

    pub fn is_expired(&self, record: &ClaimRecord, now: DateTime<Utc>) -> bool {
        self.expires_at(record).is_some_and(|at| now >= at)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { plain: Duration::from_secs(DEFAULT_PLAIN_TTL_SECS),
               flow: Duration::from_secs(DEFAULT_FLOW_TTL_SECS) }
    }
}

/// Resultado de reconciliar un umbral contra el store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionChange {
    /// No existía política para ese tipo; se creó.
    Created,
    /// Existía con otro umbral; se reemplazó.
    Updated { previous: Duration },
    /// Ya tenía el umbral pedido.
    Unchanged,
}
