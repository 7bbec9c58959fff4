//! Fingerprint: clave determinista de deduplicación de un evento.
//!
//! - Con id de transporte, el fingerprint ES ese id.
//! - Sin él, se hashea el JSON canónico de la tupla ordenada
//!   (body, from, to, command, args). Dos comandos idénticos dentro de la
//!   ventana de retención se consideran el mismo evento; es una limitación
//!   conocida cuando el transporte no aporta ids.
//!
//! Función pura: sin sal local, sin aleatoriedad, sin reloj. De eso depende
//! que todas las instancias calculen la misma clave.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::constants::FINGERPRINT_SCHEME;
use crate::event::InboundMessage;
use crate::hashing::{hash_str, to_canonical_json};

/// Origen del fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerprintSource {
    Transport,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    value: String,
    source: FingerprintSource,
}

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> FingerprintSource {
        self.source
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Calcula el fingerprint de un comando entrante.
pub fn fingerprint(message: &InboundMessage, command: &str, args: &[String]) -> Fingerprint {
    if let Some(id) = message.transport_id() {
        return Fingerprint { value: id.to_string(),
                             source: FingerprintSource::Transport };
    }
    let tuple = json!([FINGERPRINT_SCHEME, message.body, message.from, message.to, command, args]);
    Fingerprint { value: hash_str(&to_canonical_json(&tuple)),
                  source: FingerprintSource::Content }
}
