//! Configuración del filtro multi-instancia.
//!
//! Junta la conexión al store (`DbConfig`, del crate de persistencia) con los
//! umbrales de retención y el intervalo del barrido. Todo se lee del entorno
//! (con `.env` cargado una sola vez); cualquier valor inválido es un error de
//! arranque.
use std::env;
use std::time::Duration;

use cmdclaim_core::RetentionPolicy;
use cmdclaim_persistence::config::parse_positive;
use cmdclaim_persistence::{init_dotenv, ConfigError, DbConfig};

pub const INDEX_TTL_VAR: &str = "BOT_MULTI_INSTANCE_INDEX_TTL";
pub const INDEX_FLOW_TTL_VAR: &str = "BOT_MULTI_INSTANCE_INDEX_FLOW_TTL";
pub const SWEEP_INTERVAL_VAR: &str = "BOT_MULTI_INSTANCE_SWEEP_INTERVAL";

/// Intervalo por defecto del barrido de retención (segundos).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct FilterSettings {
    /// Conexión al store compartido.
    pub database: DbConfig,
    /// Umbrales a reconciliar al activar.
    pub retention: RetentionPolicy,
    /// Cada cuánto se purgan claims expirados.
    pub sweep_interval: Duration,
}

impl FilterSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        init_dotenv();
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let database = DbConfig::from_lookup(&lookup)?;
        let defaults = RetentionPolicy::default();
        let plain = parse_positive::<_, u64>(&lookup, INDEX_TTL_VAR)?.map(Duration::from_secs)
                                                                      .unwrap_or(defaults.plain);
        let flow = parse_positive::<_, u64>(&lookup, INDEX_FLOW_TTL_VAR)?.map(Duration::from_secs)
                                                                          .unwrap_or(defaults.flow);
        let sweep = parse_positive::<_, u64>(&lookup, SWEEP_INTERVAL_VAR)?.unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        Ok(Self { database,
                  retention: RetentionPolicy::new(plain, flow),
                  sweep_interval: Duration::from_secs(sweep) })
    }
}
