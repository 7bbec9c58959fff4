use cmdclaim_persistence::config::{DbConfig, STORE_URI_VAR};
use cmdclaim_persistence::pg::build_pool;
use diesel::RunQueryDsl;

// Crea y descarta el pool varias veces; las migraciones deben ser idempotentes.
#[test]
fn pool_create_drop_loop() {
    if std::env::var(STORE_URI_VAR).is_err() {
        eprintln!("skip (no {STORE_URI_VAR})");
        return;
    }
    let cfg = DbConfig::from_env().expect("config");
    for i in 0..10 {
        let pool = build_pool(&cfg.endpoint.connection_url, 1, 1).expect("pool");
        let mut conn = pool.get().expect("conn");
        let _ = diesel::sql_query("SELECT 1").execute(&mut conn);
        drop(conn);
        drop(pool);
        if i % 5 == 0 {
            eprintln!("pool_smoke iteration={i}");
        }
    }
}
