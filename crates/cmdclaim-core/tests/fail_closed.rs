use std::time::Duration;

use chrono::{DateTime, Utc};
use cmdclaim_core::{fail_closed, ClaimKey, ClaimKind, ClaimOutcome, ClaimRecord, ClaimStore, ClaimStoreError,
                    Coordinator, Decision, FlowTable, InboundMessage, InstanceId, NoFlows, RetentionChange,
                    RetentionPolicy, SuppressReason, Verdict};

/// Store que nunca responde.
struct UnreachableStore;

fn down() -> ClaimStoreError {
    ClaimStoreError::Unavailable("connection refused".into())
}

impl ClaimStore for UnreachableStore {
    fn create_if_absent(&self, _record: ClaimRecord) -> Result<ClaimOutcome, ClaimStoreError> {
        Err(down())
    }
    fn get(&self, _key: &ClaimKey) -> Result<Option<ClaimRecord>, ClaimStoreError> {
        Err(down())
    }
    fn ensure_retention(&self, _kind: ClaimKind, _ttl: Duration) -> Result<RetentionChange, ClaimStoreError> {
        Err(down())
    }
    fn retention(&self) -> Result<RetentionPolicy, ClaimStoreError> {
        Err(down())
    }
    fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, ClaimStoreError> {
        Err(down())
    }
}

#[test]
fn store_failure_suppresses_plain_commands() {
    let coord = Coordinator::new(UnreachableStore, NoFlows, InstanceId::generate());
    let msg = InboundMessage::new("ping", "u1", "room1");
    assert_eq!(coord.decide(&msg, "ping", &[], false), Err(down()));
    assert_eq!(coord.filter(msg, "ping".into(), vec![], false),
               Verdict::Suppressed(SuppressReason::StoreUnavailable));
}

#[test]
fn store_failure_suppresses_flow_commands() {
    let coord = Coordinator::new(UnreachableStore, FlowTable::new().with_root("deploy"), InstanceId::generate());
    let msg = InboundMessage::new("deploy", "u1", "room1");
    assert_eq!(coord.filter(msg, "deploy".into(), vec![], false),
               Verdict::Suppressed(SuppressReason::StoreUnavailable));
}

#[test]
fn dry_run_does_not_need_the_store() {
    let coord = Coordinator::new(UnreachableStore, NoFlows, InstanceId::generate());
    let msg = InboundMessage::new("help", "u1", "room1");
    assert!(coord.filter(msg, "help".into(), vec![], true).is_proceed());
}

#[test]
fn fail_closed_policy_is_suppression() {
    assert_eq!(fail_closed("ping", &down()), Decision::Suppress(SuppressReason::StoreUnavailable));
}
