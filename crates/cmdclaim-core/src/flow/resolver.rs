use std::sync::Arc;

use super::FlowRoot;

/// Consultas de solo lectura expuestas por el motor de flows del host.
///
/// Son orientativas: el motor adjunta la raíz real al mensaje recién después
/// del filtrado, por lo que la fuente de verdad es el claim de ownership, no
/// esta clasificación.
pub trait FlowResolver: Send + Sync + 'static {
    /// ¿El remitente está a mitad de un flow que este comando continúa?
    fn in_flight_flow_for(&self, command: &str, sender: &str) -> Option<FlowRoot>;

    /// ¿Ejecutar este comando arrancaría un flow nuevo?
    fn would_start_flow(&self, command: &str) -> bool;
}

impl<R: FlowResolver + ?Sized> FlowResolver for Arc<R> {
    fn in_flight_flow_for(&self, command: &str, sender: &str) -> Option<FlowRoot> {
        (**self).in_flight_flow_for(command, sender)
    }
    fn would_start_flow(&self, command: &str) -> bool {
        (**self).would_start_flow(command)
    }
}

/// Resolver para hosts sin motor de flows: todo comando es `plain`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFlows;

impl FlowResolver for NoFlows {
    fn in_flight_flow_for(&self, _command: &str, _sender: &str) -> Option<FlowRoot> {
        None
    }
    fn would_start_flow(&self, _command: &str) -> bool {
        false
    }
}
