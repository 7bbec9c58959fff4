//! Clasificación de flows.
//!
//! El motor de flows vive en el host; aquí solo se consumen sus dos consultas
//! de lectura (`FlowResolver`). `FlowTable` es una implementación en memoria
//! para hosts simples y tests.

mod resolver;
mod table;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use resolver::{FlowResolver, NoFlows};
pub use table::FlowTable;

/// Identificador de una secuencia de pasos; compartido por todos sus pasos.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowRoot(String);

impl FlowRoot {
    pub fn new(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    /// Raíz candidata para un comando que arrancaría un flow nuevo. Todo
    /// evento que arranque el mismo tipo de flow cae en la misma raíz.
    pub fn for_command(command: &str) -> Self {
        Self(command.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
