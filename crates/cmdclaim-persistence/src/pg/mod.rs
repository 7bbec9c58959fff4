//! Implementación Postgres (Diesel) del contrato `ClaimStore`.
//!
//! Objetivo general del módulo:
//! - Proveer el insert-if-absent linealizable que necesita el coordinador,
//!   apoyado en la PRIMARY KEY de la tabla de claims: de dos inserts
//!   concurrentes con la misma clave, Postgres deja pasar uno y al otro le
//!   devuelve `unique_violation`, que aquí se traduce a
//!   `ClaimOutcome::AlreadyExists`.
//! - Mantener paridad 1:1 con `InMemoryClaimStore`: un registro expirado es
//!   invisible para `get` y reclamable por `create_if_absent` aunque el
//!   barrido todavía no lo haya borrado.
//! - Guardar los umbrales de retención en `claim_retention`, por namespace
//!   (la tabla de claims) y tipo, para que cambiarlos afecte a todas las
//!   instancias sin reinicio.
//!
//! Las operaciones de claim no se reintentan: una falla llega una sola vez al
//! coordinador, que suprime. Solo las operaciones idempotentes de
//! mantenimiento (esquema, retención, purge) usan `with_retry`.
//!
//! El único reloj que decide expiración es el de la base: `created_at` se
//! sella con `now()` en el insert y el purge nunca mira más allá de `now()`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sql_types::{BigInt, Nullable, Text, Timestamptz};
use log::{debug, warn};

use cmdclaim_core::constants::{DEFAULT_FLOW_TTL_SECS, DEFAULT_PLAIN_TTL_SECS};
use cmdclaim_core::{ClaimKey, ClaimKind, ClaimOutcome, ClaimRecord, ClaimStore, ClaimStoreError, FlowRoot, InstanceId,
                    RetentionChange, RetentionPolicy};

use crate::config::ClaimTable;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::claim_retention;

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o
/// simularlo en tests unitarios sin acoplar a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Obtiene una conexión lista para ejecutar consultas Diesel.
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila leída de la tabla de claims.
#[derive(QueryableByName, Debug)]
pub struct ClaimRow {
    #[diesel(sql_type = Text)]
    pub claim_key: String,
    #[diesel(sql_type = Text)]
    pub instance_id: String,
    #[diesel(sql_type = Text)]
    pub kind: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub flow_root: Option<String>,
    #[diesel(sql_type = Timestamptz)]
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ClaimRow> for ClaimRecord {
    type Error = PersistenceError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        let owner: InstanceId = row.instance_id
                                   .parse()
                                   .map_err(|e| PersistenceError::InvalidRow(format!("instance_id '{}': {e}", row.instance_id)))?;
        let kind: ClaimKind = row.kind.parse().map_err(PersistenceError::InvalidRow)?;
        Ok(ClaimRecord { key: ClaimKey::new(row.claim_key),
                         owner,
                         kind,
                         flow_root: row.flow_root.map(FlowRoot::new),
                         created_at: row.created_at })
    }
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Retry simple con backoff lineal muy pequeño (hasta 3 reintentos: 15ms,
/// 30ms, 45ms). Solo para unidades de trabajo idempotentes.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

fn default_ttl_secs(kind: ClaimKind) -> i64 {
    match kind {
        ClaimKind::Plain => DEFAULT_PLAIN_TTL_SECS as i64,
        ClaimKind::Flow => DEFAULT_FLOW_TTL_SECS as i64,
    }
}

fn ttl_secs(kind: ClaimKind, ttl: Duration) -> Result<i64, ClaimStoreError> {
    match i64::try_from(ttl.as_secs()) {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ClaimStoreError::InvalidRetention(format!("{kind} ttl must be between 1s and {}s", i64::MAX))),
    }
}

/// Implementación Postgres de `ClaimStore`.
pub struct PgClaimStore<P: ConnectionProvider> {
    provider: P,
    table: ClaimTable,
}

impl<P: ConnectionProvider> PgClaimStore<P> {
    /// Crea el store sobre la tabla indicada. No toca la base: llamar
    /// `ensure_schema` antes del primer uso.
    pub fn new(provider: P, table: ClaimTable) -> Self {
        Self { provider, table }
    }

    pub fn table(&self) -> &ClaimTable {
        &self.table
    }

    /// Crea la tabla de claims del namespace si no existe.
    pub fn ensure_schema(&self) -> Result<(), PersistenceError> {
        let t = self.table.as_str();
        let ddl = format!("CREATE TABLE IF NOT EXISTS {t} (
                               claim_key   TEXT PRIMARY KEY,
                               instance_id TEXT NOT NULL,
                               kind        TEXT NOT NULL CHECK (kind IN ('plain', 'flow')),
                               flow_root   TEXT NULL,
                               created_at  TIMESTAMPTZ NOT NULL
                           );
                           CREATE INDEX IF NOT EXISTS {t}_kind_created_idx ON {t} (kind, created_at);");
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.batch_execute(&ddl).map_err(PersistenceError::from)
        })?;
        debug!("ensure_schema:done table={t}");
        Ok(())
    }

    /// Predicado SQL "el claim `c` expiró a `{now}`". Usa el umbral de
    /// `claim_retention` o, si no hay fila, el default del tipo. Enlaza el
    /// namespace en `$ns` y los defaults en `$plain`/`$flow`.
    fn expired_sql(now: &str, ns: usize, plain: usize, flow: usize) -> String {
        format!("c.created_at + make_interval(secs => COALESCE(
                    (SELECT r.ttl_seconds FROM claim_retention r WHERE r.namespace = ${ns} AND r.kind = c.kind),
                    CASE c.kind WHEN 'plain' THEN ${plain} ELSE ${flow} END)::double precision) <= {now}")
    }

    fn try_create(&self, record: &ClaimRecord) -> Result<(), PersistenceError> {
        let t = self.table.as_str();
        let reclaim = format!("DELETE FROM {t} c WHERE c.claim_key = $1 AND {}",
                              Self::expired_sql("now()", 2, 3, 4));
        let insert =
            format!("INSERT INTO {t} (claim_key, instance_id, kind, flow_root, created_at) VALUES ($1, $2, $3, $4, now())");
        let mut conn = self.provider.connection()?;
        conn.build_transaction()
            .read_write()
            .run(|tx| {
                // Paso 1: liberar la clave si su registro ya expiró.
                let reclaimed = diesel::sql_query(&reclaim).bind::<Text, _>(record.key.as_str())
                                                           .bind::<Text, _>(t)
                                                           .bind::<BigInt, _>(default_ttl_secs(ClaimKind::Plain))
                                                           .bind::<BigInt, _>(default_ttl_secs(ClaimKind::Flow))
                                                           .execute(tx)?;
                if reclaimed > 0 {
                    debug!("create_if_absent:reclaimed key={}", record.key);
                }
                // Paso 2: insert plano; la PK decide quién gana. `created_at`
                // sale del reloj de la base, no del de la instancia.
                diesel::sql_query(&insert).bind::<Text, _>(record.key.as_str())
                                          .bind::<Text, _>(record.owner.to_string())
                                          .bind::<Text, _>(record.kind.as_str())
                                          .bind::<Nullable<Text>, _>(record.flow_root.as_ref().map(|r| r.as_str()))
                                          .execute(tx)?;
                Ok::<(), diesel::result::Error>(())
            })
            .map_err(PersistenceError::from)
    }

    fn reconcile(&self, kind: ClaimKind, secs: i64) -> Result<RetentionChange, PersistenceError> {
        let ns = self.table.as_str();
        let mut conn = self.provider.connection()?;
        conn.build_transaction()
            .read_write()
            .run(|tx| -> Result<RetentionChange, diesel::result::Error> {
                let current = |tx: &mut PgConnection| {
                    claim_retention::table.filter(claim_retention::namespace.eq(ns))
                                          .filter(claim_retention::kind.eq(kind.as_str()))
                                          .select(claim_retention::ttl_seconds)
                                          .for_update()
                                          .first::<i64>(tx)
                                          .optional()
                };
                let previous = match current(&mut *tx)? {
                    Some(prev) => prev,
                    None => {
                        let inserted = diesel::insert_into(claim_retention::table)
                            .values((claim_retention::namespace.eq(ns),
                                     claim_retention::kind.eq(kind.as_str()),
                                     claim_retention::ttl_seconds.eq(secs),
                                     claim_retention::updated_at.eq(Utc::now())))
                            .on_conflict_do_nothing()
                            .execute(tx)?;
                        if inserted == 1 {
                            return Ok(RetentionChange::Created);
                        }
                        // Otra instancia la creó en paralelo; releer ya committeado.
                        current(&mut *tx)?.ok_or(diesel::result::Error::NotFound)?
                    }
                };
                if previous == secs {
                    return Ok(RetentionChange::Unchanged);
                }
                diesel::update(claim_retention::table.filter(claim_retention::namespace.eq(ns))
                                                     .filter(claim_retention::kind.eq(kind.as_str())))
                    .set((claim_retention::ttl_seconds.eq(secs), claim_retention::updated_at.eq(Utc::now())))
                    .execute(tx)?;
                Ok(RetentionChange::Updated { previous: Duration::from_secs(previous.max(0) as u64) })
            })
            .map_err(PersistenceError::from)
    }
}

impl<P: ConnectionProvider> ClaimStore for PgClaimStore<P> {
    fn create_if_absent(&self, record: ClaimRecord) -> Result<ClaimOutcome, ClaimStoreError> {
        debug!("create_if_absent:start key={} kind={}", record.key, record.kind);
        match self.try_create(&record) {
            Ok(()) => Ok(ClaimOutcome::Claimed),
            Err(PersistenceError::UniqueViolation(_)) => {
                debug!("create_if_absent:conflict key={}", record.key);
                Ok(ClaimOutcome::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, key: &ClaimKey) -> Result<Option<ClaimRecord>, ClaimStoreError> {
        let t = self.table.as_str();
        let query = format!("SELECT c.claim_key, c.instance_id, c.kind, c.flow_root, c.created_at FROM {t} c
                             WHERE c.claim_key = $1 AND NOT ({})",
                            Self::expired_sql("now()", 2, 3, 4));
        let mut conn = self.provider.connection()?;
        let row: Option<ClaimRow> = diesel::sql_query(query).bind::<Text, _>(key.as_str())
                                                            .bind::<Text, _>(t)
                                                            .bind::<BigInt, _>(default_ttl_secs(ClaimKind::Plain))
                                                            .bind::<BigInt, _>(default_ttl_secs(ClaimKind::Flow))
                                                            .get_result(&mut conn)
                                                            .optional()
                                                            .map_err(PersistenceError::from)?;
        Ok(row.map(ClaimRecord::try_from).transpose()?)
    }

    fn ensure_retention(&self, kind: ClaimKind, ttl: Duration) -> Result<RetentionChange, ClaimStoreError> {
        let secs = ttl_secs(kind, ttl)?;
        let change = with_retry(|| self.reconcile(kind, secs))?;
        debug!("ensure_retention:done table={} kind={kind} ttl={secs}s change={change:?}", self.table.as_str());
        Ok(change)
    }

    fn retention(&self) -> Result<RetentionPolicy, ClaimStoreError> {
        let ns = self.table.as_str();
        let rows: Vec<(String, i64)> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            claim_retention::table.filter(claim_retention::namespace.eq(ns))
                                  .select((claim_retention::kind, claim_retention::ttl_seconds))
                                  .load(&mut conn)
                                  .map_err(PersistenceError::from)
        })?;
        let mut policy = RetentionPolicy::default();
        for (kind, secs) in rows {
            let kind: ClaimKind = kind.parse().map_err(ClaimStoreError::InvalidRecord)?;
            policy.set(kind, Duration::from_secs(secs.max(1) as u64));
        }
        Ok(policy)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ClaimStoreError> {
        let t = self.table.as_str();
        // Nunca más adelante que el reloj de la base: una instancia adelantada
        // no puede borrar claims que aún no cumplieron su umbral.
        let query = format!("DELETE FROM {t} c WHERE {}", Self::expired_sql("LEAST($4, now())", 1, 2, 3));
        let removed = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::sql_query(&query).bind::<Text, _>(t)
                                     .bind::<BigInt, _>(default_ttl_secs(ClaimKind::Plain))
                                     .bind::<BigInt, _>(default_ttl_secs(ClaimKind::Flow))
                                     .bind::<Timestamptz, _>(now)
                                     .execute(&mut conn)
                                     .map_err(PersistenceError::from)
        })?;
        if removed > 0 {
            debug!("purge_expired:done table={t} removed={removed}");
        }
        Ok(removed)
    }
}

/// Construye un pool Postgres r2d2 a partir de URL.
///
/// Comportamiento:
/// - Valida y ajusta tamaños (si `min_size > max_size`, usa `min_size =
///   max_size`).
/// - Ejecuta migraciones inmediatamente tras el primer `get()`.
/// - Devuelve `PersistenceError::TransientIo` ante errores del pool/manager.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper: carga `.env`, lee la configuración del store, construye el pool
/// migrado y deja lista la tabla de claims.
pub fn build_store_from_env() -> Result<PgClaimStore<PoolProvider>, crate::StoreSetupError> {
    let cfg = crate::config::DbConfig::from_env()?;
    Ok(open_store(&cfg)?)
}

/// Pool migrado más tabla de claims lista para el namespace configurado.
pub fn open_store(cfg: &crate::config::DbConfig) -> Result<PgClaimStore<PoolProvider>, PersistenceError> {
    let pool = build_pool(&cfg.endpoint.connection_url, cfg.min_connections, cfg.max_connections)?;
    let store = PgClaimStore::new(PoolProvider { pool }, cfg.endpoint.table.clone());
    store.ensure_schema()?;
    Ok(store)
}
