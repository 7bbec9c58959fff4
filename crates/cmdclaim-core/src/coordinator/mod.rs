//! Coordinador: decide si esta instancia ejecuta un comando.
//!
//! Algoritmo:
//! 1. `dry_run` → permitir sin tocar el store.
//! 2. Calcular el fingerprint.
//! 3. Clasificar: raíz ya adjunta al mensaje, flow en curso del remitente, o
//!    raíz derivada del comando si este arrancaría un flow.
//! 4. Con raíz: leer el ownership. Propio → permitir; ajeno → suprimir;
//!    ausente → insert-if-absent del claim `flow`.
//! 5. Sin raíz: insert-if-absent del claim `plain` del fingerprint.
//!
//! La única sincronización entre instancias es el insert-if-absent del store.
//! Ninguna decisión se reintenta: si el store falla, el error sale una vez y
//! `filter` lo resuelve suprimiendo (fail closed).

mod decision;

use std::sync::Arc;

use log::{debug, error};

pub use decision::{AllowReason, Decision, SuppressReason, Verdict};

use crate::claim::{ClaimKey, ClaimKind, ClaimOutcome, ClaimRecord, ClaimStore};
use crate::clock::{Clock, SystemClock};
use crate::errors::ClaimStoreError;
use crate::event::{CommandInvocation, InboundMessage};
use crate::fingerprint::fingerprint;
use crate::flow::{FlowResolver, FlowRoot};
use crate::instance::InstanceId;

pub struct Coordinator<S, F>
    where S: ClaimStore,
          F: FlowResolver
{
    store: S,
    flows: F,
    clock: Arc<dyn Clock>,
    instance: InstanceId,
}

impl<S, F> Coordinator<S, F>
    where S: ClaimStore,
          F: FlowResolver
{
    pub fn new(store: S, flows: F, instance: InstanceId) -> Self {
        Self::with_clock(store, flows, instance, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, flows: F, instance: InstanceId, clock: Arc<dyn Clock>) -> Self {
        Self { store,
               flows,
               clock,
               instance }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Punto de entrada del host. Devuelve la tripleta sin cambios si esta
    /// instancia debe ejecutar, o el centinela de supresión.
    pub fn filter(&self, message: InboundMessage, command: String, args: Vec<String>, dry_run: bool) -> Verdict {
        let decision = self.decide(&message, &command, &args, dry_run)
                           .unwrap_or_else(|e| fail_closed(&command, &e));
        match decision {
            Decision::Allow(_) => Verdict::Proceed(CommandInvocation { message, command, args }),
            Decision::Suppress(reason) => Verdict::Suppressed(reason),
        }
    }

    /// Decide sin aplicar la política de fallo: los errores del store se
    /// devuelven al llamador.
    pub fn decide(&self,
                  message: &InboundMessage,
                  command: &str,
                  args: &[String],
                  dry_run: bool)
                  -> Result<Decision, ClaimStoreError> {
        if dry_run {
            return Ok(Decision::Allow(AllowReason::DryRun));
        }
        let fp = fingerprint(message, command, args);
        let decision = match self.classify(message, command) {
            Some(root) => self.claim_flow(&root)?,
            None => {
                let record = ClaimRecord::plain(&fp, self.instance, self.clock.now());
                match self.store.create_if_absent(record)? {
                    ClaimOutcome::Claimed => Decision::Allow(AllowReason::ClaimedCommand),
                    ClaimOutcome::AlreadyExists => Decision::Suppress(SuppressReason::DuplicateCommand),
                }
            }
        };
        debug!("decide:done cmd={command} fingerprint={fp} instance={} decision={decision:?}",
               self.instance);
        Ok(decision)
    }

    /// Raíz de flow aplicable al comando, si la hay.
    pub fn classify(&self, message: &InboundMessage, command: &str) -> Option<FlowRoot> {
        if let Some(root) = &message.flow_root {
            return Some(root.clone());
        }
        if let Some(root) = self.flows.in_flight_flow_for(command, &message.from) {
            return Some(root);
        }
        self.flows
            .would_start_flow(command)
            .then(|| FlowRoot::for_command(command))
    }

    fn claim_flow(&self, root: &FlowRoot) -> Result<Decision, ClaimStoreError> {
        if let Some(existing) = self.store.get(&ClaimKey::for_flow(root))? {
            if existing.kind != ClaimKind::Flow {
                return Err(ClaimStoreError::InvalidRecord(format!("{} holds a {} claim, expected flow",
                                                                  existing.key, existing.kind)));
            }
            return Ok(if existing.owner == self.instance {
                          Decision::Allow(AllowReason::FlowOwner)
                      } else {
                          Decision::Suppress(SuppressReason::FlowOwnedElsewhere { owner: existing.owner })
                      });
        }
        let record = ClaimRecord::flow(root, self.instance, self.clock.now());
        Ok(match self.store.create_if_absent(record)? {
               ClaimOutcome::Claimed => Decision::Allow(AllowReason::ClaimedFlow),
               ClaimOutcome::AlreadyExists => Decision::Suppress(SuppressReason::FlowClaimLost),
           })
    }
}

/// Política ante fallas del store: suprimir. Perder un comando cuesta menos
/// que ejecutar dos veces sus efectos.
pub fn fail_closed(command: &str, err: &ClaimStoreError) -> Decision {
    error!("decide:store_error cmd={command} err={err} -> suppress");
    Decision::Suppress(SuppressReason::StoreUnavailable)
}
