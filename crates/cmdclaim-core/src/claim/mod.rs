//! Claims: modelo, contrato del store e implementación en memoria.

mod memory;
mod store;
mod types;

pub use memory::InMemoryClaimStore;
pub use store::ClaimStore;
pub use types::{ClaimKey, ClaimKind, ClaimOutcome, ClaimRecord};
