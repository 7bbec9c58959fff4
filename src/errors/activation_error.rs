use cmdclaim_core::ClaimStoreError;
use cmdclaim_persistence::{ConfigError, PersistenceError, StoreSetupError};
use thiserror::Error;

/// Fallas al activar el filtro. Todas son fatales: la instancia no debe
/// procesar eventos sin coordinación.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("Error de configuración: {0}")]
    Config(#[from] ConfigError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Error del store de claims: {0}")]
    Store(#[from] ClaimStoreError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreSetupError> for ActivationError {
    fn from(err: StoreSetupError) -> Self {
        match err {
            StoreSetupError::Config(e) => Self::Config(e),
            StoreSetupError::Persistence(e) => Self::Persistence(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_variant_format() {
        let err: ActivationError = ConfigError::MissingEndpoint("BOT_MULTI_INSTANCE_STORE_URI").into();
        assert_eq!(err.to_string(),
                   "Error de configuración: BOT_MULTI_INSTANCE_STORE_URI must be set in the bot configuration");
    }

    #[test]
    fn test_store_variant_format() {
        let err: ActivationError = ClaimStoreError::Unavailable("down".into()).into();
        assert_eq!(err.to_string(), "Error del store de claims: claim store unavailable: down");
    }

    #[test]
    fn test_io_variant_from() {
        let io_err = std::io::Error::other("falló IO");
        let err: ActivationError = io_err.into();
        assert_eq!(err.to_string(), "Error en IO: falló IO");
    }
}
