//! Resultados del filtrado.
use serde::{Deserialize, Serialize};

use crate::event::CommandInvocation;
use crate::instance::InstanceId;

/// Por qué se permitió ejecutar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllowReason {
    /// Evaluación simulada; el store no se tocó.
    DryRun,
    /// Esta instancia creó el claim `plain` del fingerprint.
    ClaimedCommand,
    /// Esta instancia creó el claim de ownership del flow.
    ClaimedFlow,
    /// El flow ya era de esta instancia.
    FlowOwner,
}

/// Por qué se suprimió. Ninguna variante es un error para el usuario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressReason {
    /// Otra instancia ya reclamó este fingerprint.
    DuplicateCommand,
    /// El flow tiene dueño vivo y no es esta instancia.
    FlowOwnedElsewhere { owner: InstanceId },
    /// El flow estaba libre al leer pero otra instancia lo reclamó antes del
    /// insert.
    FlowClaimLost,
    /// El store no respondió; se suprime para no duplicar efectos.
    StoreUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow(AllowReason),
    Suppress(SuppressReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Respuesta al host: la tripleta intacta o el centinela de supresión.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Proceed(CommandInvocation),
    Suppressed(SuppressReason),
}

impl Verdict {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Verdict::Proceed(_))
    }

    /// Tripleta a ejecutar, si corresponde.
    pub fn into_invocation(self) -> Option<CommandInvocation> {
        match self {
            Verdict::Proceed(inv) => Some(inv),
            Verdict::Suppressed(_) => None,
        }
    }
}
