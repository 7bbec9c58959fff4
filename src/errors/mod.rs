pub mod activation_error;

pub use activation_error::ActivationError;
