//! cmdclaim
//!
//! Filtro de preprocesamiento para bots desplegados en varias instancias:
//! cada comando entrante se ejecuta en una sola instancia, y los flows
//! multi-paso quedan fijados a la instancia que los arrancó.
//!
//! - `config`: lectura de `FilterSettings` desde el entorno.
//! - `errors`: fallas de activación.
//! - `plugin`: `MultiInstanceFilter` y el gancho asíncrono del host.

pub mod config;
pub mod errors;
pub mod plugin;

pub use config::FilterSettings;
pub use errors::ActivationError;
pub use plugin::{MultiInstanceFilter, PgMultiInstanceFilter, PreprocessHook};

pub use cmdclaim_core::{CommandInvocation, FlowRoot, FlowTable, InboundMessage, InstanceId, SuppressReason, Verdict};
