//! Definiciones del evento entrante.

mod types;

pub use types::{CommandInvocation, InboundMessage};
