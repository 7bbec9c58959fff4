use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use cmdclaim_core::{AllowReason, Coordinator, Decision, FlowRoot, FlowTable, InMemoryClaimStore, InboundMessage,
                    InstanceId, ManualClock, SuppressReason};

type Coord = Coordinator<Arc<InMemoryClaimStore>, Arc<FlowTable>>;

fn cluster(n: usize) -> (Arc<ManualClock>, Arc<FlowTable>, Vec<Coord>) {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(InMemoryClaimStore::with_clock(clock.clone()));
    let flows = Arc::new(FlowTable::new().with_root("deploy"));
    let coords = (0..n).map(|_| {
                           Coordinator::with_clock(store.clone(), flows.clone(), InstanceId::generate(), clock.clone())
                       })
                       .collect();
    (clock, flows, coords)
}

fn step(i: usize) -> InboundMessage {
    InboundMessage::new(format!("confirm {i}"), "u1", "room1").with_message_id(format!("step-{i}"))
}

// A reclama deploy-42; los 10 pasos siguientes solo corren en A hasta que la
// ventana de flow (300s) vence.
#[test]
fn flow_steps_stay_pinned_to_owner() {
    let (clock, flows, coords) = cluster(3);
    let (a, b, c) = (&coords[0], &coords[1], &coords[2]);
    let root = FlowRoot::new("deploy-42");
    flows.advance("u1", root.clone(), &["confirm"]);

    let first = InboundMessage::new("confirm", "u1", "room1").with_message_id("step-0");
    assert_eq!(a.decide(&first, "confirm", &[], false), Ok(Decision::Allow(AllowReason::ClaimedFlow)));

    for i in 1..=10 {
        clock.advance(Duration::from_secs(20));
        let msg = step(i);
        assert_eq!(a.decide(&msg, "confirm", &[], false), Ok(Decision::Allow(AllowReason::FlowOwner)));
        for other in [b, c] {
            assert_eq!(other.decide(&msg, "confirm", &[], false),
                       Ok(Decision::Suppress(SuppressReason::FlowOwnedElsewhere { owner: a.instance_id() })));
        }
    }

    // 200s transcurridos; al llegar a 300s el ownership expira.
    clock.advance(Duration::from_secs(100));
    assert_eq!(b.decide(&step(11), "confirm", &[], false), Ok(Decision::Allow(AllowReason::ClaimedFlow)));
    assert_eq!(a.decide(&step(12), "confirm", &[], false),
               Ok(Decision::Suppress(SuppressReason::FlowOwnedElsewhere { owner: b.instance_id() })));
}

#[test]
fn flow_start_is_claimed_once_across_racing_instances() {
    const N: usize = 8;
    let (_clock, _flows, coords) = cluster(N);
    let coords: Vec<Arc<Coord>> = coords.into_iter().map(Arc::new).collect();
    let barrier = Arc::new(Barrier::new(N));
    let handles: Vec<_> = coords.iter()
                                .enumerate()
                                .map(|(i, coord)| {
                                    let coord = coord.clone();
                                    let barrier = barrier.clone();
                                    thread::spawn(move || {
                                        // Cada instancia ve un mensaje distinto: la raíz es lo que comparten.
                                        let msg = InboundMessage::new("deploy", "u1", "room1").with_message_id(format!("m{i}"));
                                        barrier.wait();
                                        coord.decide(&msg, "deploy", &[], false).expect("decide")
                                    })
                                })
                                .collect();
    let decisions: Vec<Decision> = handles.into_iter().map(|h| h.join().expect("join")).collect();
    assert_eq!(decisions.iter().filter(|d| d.is_allow()).count(), 1, "decisions={decisions:?}");
    for d in decisions.iter().filter(|d| !d.is_allow()) {
        assert!(matches!(d,
                         Decision::Suppress(SuppressReason::FlowOwnedElsewhere { .. })
                         | Decision::Suppress(SuppressReason::FlowClaimLost)));
    }
}

#[test]
fn plain_commands_are_unaffected_by_flows() {
    let (_clock, _flows, coords) = cluster(2);
    let msg = InboundMessage::new("status", "u1", "room1");
    assert_eq!(coords[0].decide(&msg, "status", &[], false), Ok(Decision::Allow(AllowReason::ClaimedCommand)));
    assert_eq!(coords[1].decide(&msg, "status", &[], false),
               Ok(Decision::Suppress(SuppressReason::DuplicateCommand)));
}
