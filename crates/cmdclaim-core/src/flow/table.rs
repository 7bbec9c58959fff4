//! Tabla de flows en memoria.
//!
//! Registra qué comandos arrancan un flow y, por remitente, qué flows están en
//! curso junto con los comandos que los continúan.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use super::{FlowResolver, FlowRoot};

struct InFlight {
    root: FlowRoot,
    next: HashSet<String>,
}

#[derive(Default)]
pub struct FlowTable {
    roots: HashSet<String>,
    in_flight: RwLock<HashMap<String, Vec<InFlight>>>,
}

impl FlowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declara `command` como comando que arranca un flow.
    pub fn with_root(mut self, command: impl Into<String>) -> Self {
        self.roots.insert(command.into());
        self
    }

    /// Marca (o actualiza) el flow `root` como en curso para `sender`, con los
    /// comandos que pueden continuarlo.
    pub fn advance(&self, sender: &str, root: FlowRoot, next: &[&str]) {
        let mut map = self.in_flight.write().unwrap_or_else(PoisonError::into_inner);
        let flows = map.entry(sender.to_string()).or_default();
        let next: HashSet<String> = next.iter().map(|s| s.to_string()).collect();
        match flows.iter_mut().find(|f| f.root == root) {
            Some(existing) => existing.next = next,
            None => flows.push(InFlight { root, next }),
        }
    }

    /// Da por terminado el flow `root` de `sender`.
    pub fn finish(&self, sender: &str, root: &FlowRoot) {
        let mut map = self.in_flight.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(flows) = map.get_mut(sender) {
            flows.retain(|f| &f.root != root);
            if flows.is_empty() {
                map.remove(sender);
            }
        }
    }
}

impl FlowResolver for FlowTable {
    fn in_flight_flow_for(&self, command: &str, sender: &str) -> Option<FlowRoot> {
        let map = self.in_flight.read().unwrap_or_else(PoisonError::into_inner);
        map.get(sender)?
           .iter()
           .find(|f| f.next.contains(command))
           .map(|f| f.root.clone())
    }

    fn would_start_flow(&self, command: &str) -> bool {
        self.roots.contains(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_and_in_flight_steps_are_reported() {
        let table = FlowTable::new().with_root("deploy");
        assert!(table.would_start_flow("deploy"));
        assert!(!table.would_start_flow("confirm"));
        assert_eq!(table.in_flight_flow_for("confirm", "u1"), None);

        table.advance("u1", FlowRoot::new("deploy-42"), &["confirm", "abort"]);
        assert_eq!(table.in_flight_flow_for("confirm", "u1"), Some(FlowRoot::new("deploy-42")));
        assert_eq!(table.in_flight_flow_for("confirm", "u2"), None, "el flow es del remitente u1");
        assert_eq!(table.in_flight_flow_for("status", "u1"), None);

        table.finish("u1", &FlowRoot::new("deploy-42"));
        assert_eq!(table.in_flight_flow_for("confirm", "u1"), None);
    }
}
