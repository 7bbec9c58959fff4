//! Ciclo de vida del filtro multi-instancia dentro del host.
//!
//! `activate` deja todo listo antes del primer evento: pool migrado, tabla de
//! claims del namespace, políticas de retención reconciliadas y barrido en
//! marcha. Si algo falla la activación se aborta; una instancia sin
//! coordinación no debe ejecutar comandos.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};

use cmdclaim_core::{ClaimKind, ClaimStore, Clock, Coordinator, FlowResolver, InboundMessage, InstanceId,
                    RetentionChange, RetentionPolicy, RetentionSweeper, SuppressReason, SystemClock, Verdict};
use cmdclaim_persistence::{open_store, PgClaimStore, PoolProvider};

use crate::config::FilterSettings;
use crate::errors::ActivationError;

/// Gancho de preprocesamiento que el host llama por cada comando.
#[async_trait]
pub trait PreprocessHook: Send + Sync {
    async fn preprocess(&self, message: InboundMessage, command: String, args: Vec<String>, dry_run: bool)
                        -> Verdict;
}

pub struct MultiInstanceFilter<S, F>
    where S: ClaimStore,
          F: FlowResolver
{
    coordinator: Arc<Coordinator<Arc<S>, F>>,
    sweeper: Option<RetentionSweeper>,
    retention: RetentionPolicy,
}

/// Filtro respaldado por Postgres, el que usa el host en producción.
pub type PgMultiInstanceFilter<F> = MultiInstanceFilter<PgClaimStore<PoolProvider>, F>;

impl<F: FlowResolver> MultiInstanceFilter<PgClaimStore<PoolProvider>, F> {
    pub fn activate(settings: &FilterSettings, flows: F) -> Result<Self, ActivationError> {
        let db = &settings.database;
        info!("activate:store db={} table={}", db.endpoint.database, db.endpoint.table.as_str());
        let store = open_store(db)?;
        Self::with_store(store, flows, settings.retention, settings.sweep_interval)
    }
}

impl<S, F> MultiInstanceFilter<S, F>
    where S: ClaimStore,
          F: FlowResolver
{
    /// Activa el filtro sobre un store ya construido.
    pub fn with_store(store: S,
                      flows: F,
                      retention: RetentionPolicy,
                      sweep_interval: Duration)
                      -> Result<Self, ActivationError> {
        Self::with_clock(store, flows, retention, sweep_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S,
                      flows: F,
                      retention: RetentionPolicy,
                      sweep_interval: Duration,
                      clock: Arc<dyn Clock>)
                      -> Result<Self, ActivationError> {
        for kind in ClaimKind::ALL {
            let ttl = retention.ttl_for(kind);
            match store.ensure_retention(kind, ttl)? {
                RetentionChange::Created => info!("retention:create kind={kind} ttl={}s", ttl.as_secs()),
                RetentionChange::Updated { previous } => {
                    info!("retention:update kind={kind} ttl={}s previous={}s", ttl.as_secs(), previous.as_secs())
                }
                RetentionChange::Unchanged => {}
            }
        }
        let store = Arc::new(store);
        let sweeper = RetentionSweeper::spawn(store.clone(), clock.clone(), sweep_interval)?;
        let instance = InstanceId::generate();
        info!("activate:ok instance={instance}");
        Ok(Self { coordinator: Arc::new(Coordinator::with_clock(store, flows, instance, clock)),
                  sweeper: Some(sweeper),
                  retention })
    }

    /// Filtrado síncrono; útil cuando el host no corre sobre tokio.
    pub fn filter(&self, message: InboundMessage, command: String, args: Vec<String>, dry_run: bool) -> Verdict {
        self.coordinator.filter(message, command, args, dry_run)
    }

    pub fn instance_id(&self) -> InstanceId {
        self.coordinator.instance_id()
    }

    pub fn show_instance_id(&self) -> String {
        format!("Instance ID: {}", self.instance_id())
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    pub fn store(&self) -> &S {
        self.coordinator.store()
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.as_ref().is_some_and(RetentionSweeper::is_running)
    }

    /// Detiene el barrido y suelta el store (y con él el pool). Las llamadas
    /// en vuelo conservan su propia referencia hasta terminar.
    pub fn deactivate(mut self) {
        if let Some(mut sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
        info!("deactivate instance={}", self.instance_id());
    }
}

#[async_trait]
impl<S, F> PreprocessHook for MultiInstanceFilter<S, F>
    where S: ClaimStore,
          F: FlowResolver
{
    async fn preprocess(&self, message: InboundMessage, command: String, args: Vec<String>, dry_run: bool)
                        -> Verdict {
        let coordinator = self.coordinator.clone();
        let label = command.clone();
        match tokio::task::spawn_blocking(move || coordinator.filter(message, command, args, dry_run)).await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!("preprocess:join command={label} err={e}");
                Verdict::Suppressed(SuppressReason::StoreUnavailable)
            }
        }
    }
}
