use std::sync::Arc;
use std::time::Duration;

use cmdclaim_core::{ClaimKind, ClaimStore, Coordinator, InMemoryClaimStore, InboundMessage, InstanceId, ManualClock,
                    NoFlows, RetentionChange};

fn setup() -> (Arc<ManualClock>, Arc<InMemoryClaimStore>) {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(InMemoryClaimStore::with_clock(clock.clone()));
    (clock, store)
}

fn ping() -> InboundMessage {
    InboundMessage::new("ping", "u1", "room1")
}

#[test]
fn replay_inside_window_suppressed_after_window_allowed() {
    let (clock, store) = setup();
    let a = Coordinator::with_clock(store.clone(), NoFlows, InstanceId::generate(), clock.clone());
    let b = Coordinator::with_clock(store, NoFlows, InstanceId::generate(), clock.clone());

    assert!(a.filter(ping(), "ping".into(), vec![], false).is_proceed());
    clock.advance(Duration::from_secs(10));
    assert!(!a.filter(ping(), "ping".into(), vec![], false).is_proceed());
    assert!(!b.filter(ping(), "ping".into(), vec![], false).is_proceed());

    clock.advance(Duration::from_secs(20));
    assert!(b.filter(ping(), "ping".into(), vec![], false).is_proceed(),
            "pasada la ventana de 30s el comando vuelve a ejecutarse");
    assert!(!a.filter(ping(), "ping".into(), vec![], false).is_proceed());
}

#[test]
fn dry_run_never_mutates_and_always_allows() {
    let (clock, store) = setup();
    let a = Coordinator::with_clock(store.clone(), NoFlows, InstanceId::generate(), clock.clone());
    let b = Coordinator::with_clock(store.clone(), NoFlows, InstanceId::generate(), clock);

    assert!(b.filter(ping(), "other".into(), vec![], true).is_proceed());
    assert!(store.is_empty());

    assert!(a.filter(ping(), "ping".into(), vec![], false).is_proceed());
    let before = store.len();
    assert!(b.filter(ping(), "ping".into(), vec![], true).is_proceed(),
            "dry-run permite aunque haya un claim previo");
    assert_eq!(store.len(), before);
    assert!(!b.filter(ping(), "ping".into(), vec![], false).is_proceed());
}

#[test]
fn runtime_threshold_change_applies_without_losing_claims() {
    let (clock, store) = setup();
    let a = Coordinator::with_clock(store.clone(), NoFlows, InstanceId::generate(), clock.clone());

    assert!(a.filter(ping(), "ping".into(), vec![], false).is_proceed());
    assert_eq!(store.ensure_retention(ClaimKind::Plain, Duration::from_secs(5)),
               Ok(RetentionChange::Created));

    // El claim existente sigue ahí tras el cambio.
    assert!(!a.filter(ping(), "ping".into(), vec![], false).is_proceed());

    clock.advance(Duration::from_secs(5));
    assert!(a.filter(ping(), "ping".into(), vec![], false).is_proceed(),
            "el nuevo umbral de 5s rige sin reinicio");
    clock.advance(Duration::from_secs(4));
    assert!(!a.filter(ping(), "ping".into(), vec![], false).is_proceed());
}

#[test]
fn purge_is_lazy_but_never_early() {
    let (clock, store) = setup();
    let a = Coordinator::with_clock(store.clone(), NoFlows, InstanceId::generate(), clock.clone());
    a.filter(ping(), "ping".into(), vec![], false);

    clock.advance(Duration::from_secs(29));
    assert_eq!(store.purge_expired(cmdclaim_core::Clock::now(&*clock)), Ok(0));
    clock.advance(Duration::from_secs(1));
    assert_eq!(store.purge_expired(cmdclaim_core::Clock::now(&*clock)), Ok(1));
}
