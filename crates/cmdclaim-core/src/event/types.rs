//! Mensaje entrante tal como lo entrega el host y la invocación de comando
//! que se filtra.
//!
//! Estos tipos son efímeros: no se persisten. Lo único que llega al store es
//! el fingerprint (o la raíz del flow) derivado de ellos.
use serde::{Deserialize, Serialize};

use crate::flow::FlowRoot;

/// Mensaje entrante recibido por la instancia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub body: String,
    /// Remitente (representación textual del transporte).
    pub from: String,
    /// Destinatario: sala, canal o usuario.
    pub to: String,
    /// Id único inyectado por el transporte, si lo hay.
    #[serde(default)]
    pub message_id: Option<String>,
    /// Raíz del flow, una vez que el motor de flows la adjuntó al mensaje.
    #[serde(default)]
    pub flow_root: Option<FlowRoot>,
}

impl InboundMessage {
    pub fn new(body: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { body: body.into(),
               from: from.into(),
               to: to.into(),
               message_id: None,
               flow_root: None }
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn with_flow_root(mut self, root: FlowRoot) -> Self {
        self.flow_root = Some(root);
        self
    }

    /// Id de transporte utilizable. Un id vacío cuenta como ausente.
    pub fn transport_id(&self) -> Option<&str> {
        self.message_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Tripleta que el host entrega al filtro y recibe de vuelta sin cambios
/// cuando la instancia puede ejecutar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInvocation {
    pub message: InboundMessage,
    pub command: String,
    pub args: Vec<String>,
}

impl CommandInvocation {
    pub fn new(message: InboundMessage, command: impl Into<String>, args: Vec<String>) -> Self {
        Self { message,
               command: command.into(),
               args }
    }
}
