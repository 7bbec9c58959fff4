//! cmdclaim-core: deduplicación de comandos entre instancias.
//!
//! Varias instancias idénticas del bot reciben el mismo evento; solo una debe
//! ejecutarlo. Este crate define el fingerprint del evento, el contrato del
//! store de claims (insert-if-absent linealizable + retención por tipo), la
//! clasificación de flows y el coordinador que combina todo.
pub mod claim;
pub mod clock;
pub mod constants;
pub mod coordinator;
pub mod errors;
pub mod event;
pub mod fingerprint;
pub mod flow;
pub mod hashing;
pub mod instance;
pub mod retention;
pub mod sweeper;

pub use claim::{ClaimKey, ClaimKind, ClaimOutcome, ClaimRecord, ClaimStore, InMemoryClaimStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{fail_closed, AllowReason, Coordinator, Decision, SuppressReason, Verdict};
pub use errors::ClaimStoreError;
pub use event::{CommandInvocation, InboundMessage};
pub use fingerprint::{fingerprint, Fingerprint, FingerprintSource};
pub use flow::{FlowResolver, FlowRoot, FlowTable, NoFlows};
pub use instance::InstanceId;
pub use retention::{RetentionChange, RetentionPolicy};
pub use sweeper::RetentionSweeper;
