//! Store de claims en memoria.
//!
//! Pensado para tests y para hosts de una sola máquina. La atomicidad del
//! insert-if-absent la da el lock de shard de `DashMap::entry`: dos hilos
//! que compiten por la misma clave se serializan sobre la misma entrada.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;

use super::store::validate_ttl;
use super::{ClaimKey, ClaimKind, ClaimOutcome, ClaimRecord, ClaimStore};
use crate::clock::{Clock, SystemClock};
use crate::errors::ClaimStoreError;
use crate::retention::{RetentionChange, RetentionPolicy};

pub struct InMemoryClaimStore {
    records: DashMap<ClaimKey, ClaimRecord>,
    /// `None` por tipo hasta que alguien reconcilia la política; mientras
    /// tanto rige el default.
    configured: RwLock<[Option<Duration>; 2]>,
    clock: Arc<dyn Clock>,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store que evalúa expiraciones con el reloj dado.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { records: DashMap::new(),
               configured: RwLock::new([None, None]),
               clock }
    }

    /// Cantidad de registros almacenados, expirados incluidos.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn slot(kind: ClaimKind) -> usize {
        match kind {
            ClaimKind::Plain => 0,
            ClaimKind::Flow => 1,
        }
    }

    fn policy(&self) -> RetentionPolicy {
        let configured = self.configured.read().unwrap_or_else(PoisonError::into_inner);
        let mut policy = RetentionPolicy::default();
        for kind in ClaimKind::ALL {
            if let Some(ttl) = configured[Self::slot(kind)] {
                policy.set(kind, ttl);
            }
        }
        policy
    }
}

impl Default for InMemoryClaimStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimStore for InMemoryClaimStore {
    fn create_if_absent(&self, record: ClaimRecord) -> Result<ClaimOutcome, ClaimStoreError> {
        let policy = self.policy();
        let now = self.clock.now();
        match self.records.entry(record.key.clone()) {
            Entry::Occupied(mut slot) => {
                if policy.is_expired(slot.get(), now) {
                    debug!("create_if_absent:reclaim key={} kind={}", record.key, record.kind);
                    slot.insert(record);
                    Ok(ClaimOutcome::Claimed)
                } else {
                    Ok(ClaimOutcome::AlreadyExists)
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(ClaimOutcome::Claimed)
            }
        }
    }

    fn get(&self, key: &ClaimKey) -> Result<Option<ClaimRecord>, ClaimStoreError> {
        let policy = self.policy();
        let now = self.clock.now();
        Ok(self.records
               .get(key)
               .map(|r| r.value().clone())
               .filter(|r| !policy.is_expired(r, now)))
    }

    fn ensure_retention(&self, kind: ClaimKind, ttl: Duration) -> Result<RetentionChange, ClaimStoreError> {
        validate_ttl(kind, ttl)?;
        let mut configured = self.configured.write().unwrap_or_else(PoisonError::into_inner);
        let slot = &mut configured[Self::slot(kind)];
        let change = match *slot {
            None => RetentionChange::Created,
            Some(previous) if previous != ttl => RetentionChange::Updated { previous },
            Some(_) => RetentionChange::Unchanged,
        };
        *slot = Some(ttl);
        Ok(change)
    }

    fn retention(&self) -> Result<RetentionPolicy, ClaimStoreError> {
        Ok(self.policy())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ClaimStoreError> {
        let policy = self.policy();
        let before = self.records.len();
        self.records.retain(|_, r| !policy.is_expired(r, now));
        // `retain` no reporta cuántos quitó; la diferencia puede quedar corta
        // si otro hilo inserta en paralelo, lo cual solo afecta al log.
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!("purge_expired:done removed={removed}");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fingerprint::fingerprint;
    use crate::flow::FlowRoot;
    use crate::instance::InstanceId;
    use crate::InboundMessage;

    fn store_at(clock: &Arc<ManualClock>) -> InMemoryClaimStore {
        InMemoryClaimStore::with_clock(clock.clone())
    }

    fn plain_record(clock: &ManualClock, owner: InstanceId) -> ClaimRecord {
        let fp = fingerprint(&InboundMessage::new("ping", "u1", "room1"), "ping", &[]);
        ClaimRecord::plain(&fp, owner, clock.now())
    }

    #[test]
    fn second_create_reports_already_exists() {
        let clock = Arc::new(ManualClock::default());
        let store = store_at(&clock);
        let a = InstanceId::generate();
        let b = InstanceId::generate();
        assert_eq!(store.create_if_absent(plain_record(&clock, a)), Ok(ClaimOutcome::Claimed));
        assert_eq!(store.create_if_absent(plain_record(&clock, b)), Ok(ClaimOutcome::AlreadyExists));
        let key = plain_record(&clock, a).key;
        assert_eq!(store.get(&key).expect("get").map(|r| r.owner), Some(a), "el primer escritor conserva el registro");
    }

    #[test]
    fn expired_record_is_invisible_and_reclaimable() {
        let clock = Arc::new(ManualClock::default());
        let store = store_at(&clock);
        let a = InstanceId::generate();
        let b = InstanceId::generate();
        let rec = plain_record(&clock, a);
        let key = rec.key.clone();
        store.create_if_absent(rec).expect("create");

        clock.advance(Duration::from_secs(29));
        assert!(store.get(&key).expect("get").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(store.get(&key).expect("get").is_none());
        assert_eq!(store.create_if_absent(plain_record(&clock, b)), Ok(ClaimOutcome::Claimed));
        assert_eq!(store.get(&key).expect("get").map(|r| r.owner), Some(b));
    }

    #[test]
    fn purge_removes_only_expired_records() {
        let clock = Arc::new(ManualClock::default());
        let store = store_at(&clock);
        let owner = InstanceId::generate();
        store.create_if_absent(plain_record(&clock, owner)).expect("plain");
        store.create_if_absent(ClaimRecord::flow(&FlowRoot::new("deploy"), owner, clock.now()))
             .expect("flow");

        clock.advance(Duration::from_secs(60));
        assert_eq!(store.purge_expired(clock.now()), Ok(1));
        assert_eq!(store.len(), 1);

        clock.advance(Duration::from_secs(240));
        assert_eq!(store.purge_expired(clock.now()), Ok(1));
        assert!(store.is_empty());
    }

    #[test]
    fn ensure_retention_reconciles() {
        let store = InMemoryClaimStore::new();
        let ttl = Duration::from_secs(45);
        assert_eq!(store.ensure_retention(ClaimKind::Plain, ttl), Ok(RetentionChange::Created));
        assert_eq!(store.ensure_retention(ClaimKind::Plain, ttl), Ok(RetentionChange::Unchanged));
        assert_eq!(store.ensure_retention(ClaimKind::Plain, Duration::from_secs(10)),
                   Ok(RetentionChange::Updated { previous: ttl }));
        let policy = store.retention().expect("policy");
        assert_eq!(policy.plain, Duration::from_secs(10));
        assert_eq!(policy.flow, Duration::from_secs(300));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let store = InMemoryClaimStore::new();
        assert!(matches!(store.ensure_retention(ClaimKind::Flow, Duration::ZERO),
                         Err(ClaimStoreError::InvalidRetention(_))));
    }

    #[test]
    fn retention_change_keeps_existing_claims() {
        let clock = Arc::new(ManualClock::default());
        let store = store_at(&clock);
        let rec = plain_record(&clock, InstanceId::generate());
        let key = rec.key.clone();
        store.create_if_absent(rec).expect("create");
        store.ensure_retention(ClaimKind::Plain, Duration::from_secs(120)).expect("retention");
        clock.advance(Duration::from_secs(60));
        assert!(store.get(&key).expect("get").is_some(), "el umbral ampliado aplica al registro vivo");
    }
}
