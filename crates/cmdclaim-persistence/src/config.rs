//! Configuración de conexión al store desde variables de entorno.
//!
//! El endpoint es una URL Postgres cuyo path codifica base de datos y tabla de
//! claims: `postgres://user:pw@host:5432/<db>.<tabla>`. Sin alguno de los dos
//! la configuración es inválida y la instancia no debe activarse.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::ConfigError;

pub const STORE_URI_VAR: &str = "BOT_MULTI_INSTANCE_STORE_URI";
pub const MIN_CONNECTIONS_VAR: &str = "DATABASE_MIN_CONNECTIONS";
pub const MAX_CONNECTIONS_VAR: &str = "DATABASE_MAX_CONNECTIONS";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

/// Nombre de tabla validado para interpolarse en SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTable(String);

impl ClaimTable {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let mut chars = name.chars();
        let valid_head = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_head || !valid_tail || name.len() > 63 {
            return Err(ConfigError::InvalidIdentifier(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Endpoint del store ya descompuesto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEndpoint {
    /// URL para el driver: la original con el path reducido a `/<db>`.
    pub connection_url: String,
    pub database: String,
    pub table: ClaimTable,
}

impl StoreEndpoint {
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let (scheme, rest) = uri.split_once("://")
                                .ok_or_else(|| ConfigError::InvalidEndpoint(format!("missing scheme in '{uri}'")))?;
        if scheme != "postgres" && scheme != "postgresql" {
            return Err(ConfigError::InvalidEndpoint(format!("unsupported scheme '{scheme}'")));
        }
        let (location, query) = match rest.split_once('?') {
            Some((loc, q)) => (loc, Some(q)),
            None => (rest, None),
        };
        let missing = || ConfigError::MissingNamespace { var: STORE_URI_VAR,
                                                         got: uri.to_string() };
        let (authority, path) = location.split_once('/').ok_or_else(missing)?;
        if authority.is_empty() {
            return Err(ConfigError::InvalidEndpoint(format!("missing host in '{uri}'")));
        }
        let (database, table) = path.split_once('.').ok_or_else(missing)?;
        if database.is_empty() || table.is_empty() {
            return Err(missing());
        }
        let table = ClaimTable::parse(table)?;
        let mut connection_url = format!("{scheme}://{authority}/{database}");
        if let Some(q) = query {
            connection_url.push('?');
            connection_url.push_str(q);
        }
        Ok(Self { connection_url,
                  database: database.to_string(),
                  table })
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: StoreEndpoint,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // asegura que .env se haya cargado
        init_dotenv();
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables inyectable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let uri = lookup(STORE_URI_VAR).filter(|v| !v.trim().is_empty())
                                       .ok_or(ConfigError::MissingEndpoint(STORE_URI_VAR))?;
        let endpoint = StoreEndpoint::parse(uri.trim())?;
        let min_connections = parse_positive(&lookup, MIN_CONNECTIONS_VAR)?.unwrap_or(1);
        let max_connections = parse_positive(&lookup, MAX_CONNECTIONS_VAR)?.unwrap_or(8);
        Ok(Self { endpoint,
                  min_connections,
                  max_connections })
    }
}

/// Lee una variable numérica positiva; `None` si no está definida.
pub fn parse_positive<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
    where F: Fn(&str) -> Option<String>,
          T: std::str::FromStr + PartialEq + Default
{
    let Some(raw) = lookup(var) else { return Ok(None) };
    let invalid = || ConfigError::InvalidNumber { var, got: raw.clone() };
    let value: T = raw.trim().parse().map_err(|_| invalid())?;
    if value == T::default() {
        return Err(invalid());
    }
    Ok(Some(value))
}
