//! cmdclaim-persistence
//!
//! Store de claims sobre Postgres (Diesel + r2d2) más utilidades de conexión,
//! configuración y migraciones.
//!
//! Módulos:
//! - `pg`: `PgClaimStore`, pool y proveedor de conexiones.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: endpoint del store y tamaños de pool desde el entorno.
//! - `schema`: tablas Diesel fijas.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, ClaimTable, DbConfig, StoreEndpoint};
pub use error::{ConfigError, PersistenceError};
pub use pg::{build_pool, build_store_from_env, open_store, ConnectionProvider, PgClaimStore, PgPool, PoolProvider};

/// Falla al preparar el store: configuración inválida o base inaccesible.
#[derive(Debug, thiserror::Error)]
pub enum StoreSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
