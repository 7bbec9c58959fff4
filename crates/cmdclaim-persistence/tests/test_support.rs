use cmdclaim_persistence::config::{DbConfig, STORE_URI_VAR};
use cmdclaim_persistence::pg::{build_pool, PgClaimStore, PgPool, PoolProvider};
use cmdclaim_persistence::ClaimTable;
use once_cell::sync::Lazy;

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    if std::env::var(STORE_URI_VAR).is_err() {
        return None;
    }
    let cfg = match DbConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuración de test inválida: {e}");
            return None;
        }
    };
    match build_pool(&cfg.endpoint.connection_url, 1, 4) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("No se pudo construir pool de test: {e}");
            None
        }
    }
});

/// Store sobre una tabla fresca (nombre aleatorio) para aislar cada test.
pub fn fresh_store() -> Option<PgClaimStore<PoolProvider>> {
    let pool = TEST_POOL.as_ref()?.clone();
    let table = ClaimTable::parse(&format!("claims_test_{}", uuid::Uuid::new_v4().simple())).expect("table name");
    let store = PgClaimStore::new(PoolProvider { pool }, table);
    store.ensure_schema().expect("schema");
    Some(store)
}
