//! Modelo de claims persistidos.
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{COMMAND_KEY_PREFIX, FLOW_KEY_PREFIX};
use crate::fingerprint::Fingerprint;
use crate::flow::FlowRoot;
use crate::instance::InstanceId;

/// Tipo de claim; determina su umbral de retención.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimKind {
    Plain,
    Flow,
}

impl ClaimKind {
    pub const ALL: [ClaimKind; 2] = [ClaimKind::Plain, ClaimKind::Flow];

    /// Nombre estable, usado como valor de columna.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimKind::Plain => "plain",
            ClaimKind::Flow => "flow",
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(ClaimKind::Plain),
            "flow" => Ok(ClaimKind::Flow),
            other => Err(format!("unknown claim kind '{other}'")),
        }
    }
}

/// Clave única en el store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimKey(String);

impl ClaimKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Clave de un comando: `cmd:<fingerprint>`.
    pub fn for_fingerprint(fp: &Fingerprint) -> Self {
        Self(format!("{COMMAND_KEY_PREFIX}{}", fp.as_str()))
    }

    /// Clave de ownership de un flow: `flow:<raíz>`.
    pub fn for_flow(root: &FlowRoot) -> Self {
        Self(format!("{FLOW_KEY_PREFIX}{}", root.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registro de claim. Inmutable una vez creado; solo desaparece por
/// expiración.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub key: ClaimKey,
    pub owner: InstanceId,
    pub kind: ClaimKind,
    /// Solo presente en claims de tipo `flow`.
    pub flow_root: Option<FlowRoot>,
    pub created_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn plain(fp: &Fingerprint, owner: InstanceId, created_at: DateTime<Utc>) -> Self {
        Self { key: ClaimKey::for_fingerprint(fp),
               owner,
               kind: ClaimKind::Plain,
               flow_root: None,
               created_at }
    }

    pub fn flow(root: &FlowRoot, owner: InstanceId, created_at: DateTime<Utc>) -> Self {
        Self { key: ClaimKey::for_flow(root),
               owner,
               kind: ClaimKind::Flow,
               flow_root: Some(root.clone()),
               created_at }
    }
}

/// Resultado del insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Esta llamada creó el registro.
    Claimed,
    /// La clave ya tenía un registro vivo.
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_roundtrip() {
        for kind in ClaimKind::ALL {
            assert_eq!(kind.as_str().parse::<ClaimKind>(), Ok(kind));
        }
        assert!("other".parse::<ClaimKind>().is_err());
    }

    #[test]
    fn flow_key_is_prefixed() {
        let key = ClaimKey::for_flow(&FlowRoot::new("deploy-42"));
        assert_eq!(key.as_str(), "flow:deploy-42");
    }

    #[test]
    fn transport_ids_cannot_reach_the_flow_namespace() {
        let msg = crate::event::InboundMessage::new("status", "u1", "room1").with_message_id("flow:deploy");
        let fp = crate::fingerprint::fingerprint(&msg, "status", &[]);
        let plain = ClaimKey::for_fingerprint(&fp);
        assert_eq!(plain.as_str(), "cmd:flow:deploy");
        assert_ne!(plain, ClaimKey::for_flow(&FlowRoot::new("deploy")));
    }
}
