//! Constantes del core.
//!
//! `FINGERPRINT_SCHEME` forma parte del input del hash por contenido: todas
//! las instancias que comparten store deben usar el mismo valor o dejarán de
//! reconocer los duplicados entre ellas.

/// Versión lógica de la codificación del fingerprint por contenido.
pub const FINGERPRINT_SCHEME: &str = "cmdclaim/v1";

/// Retención por defecto de los claims `plain` (segundos).
pub const DEFAULT_PLAIN_TTL_SECS: u64 = 30;

/// Retención por defecto de los claims `flow` (segundos).
pub const DEFAULT_FLOW_TTL_SECS: u64 = 300;

/// Prefijo de las claves de comandos. El id de transporte es opaco y puede
/// contener cualquier texto, así que cada espacio lleva su propio prefijo.
pub const COMMAND_KEY_PREFIX: &str = "cmd:";

/// Prefijo de las claves de ownership de flows.
pub const FLOW_KEY_PREFIX: &str = "flow:";
