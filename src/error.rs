use thiserror::Error;

use crate::client::TransportError;
use crate::{crypto, soap, token::TokenError};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a call.
///
/// A digest mismatch or a SOAP fault is not an error here: both come back
/// as an unsuccessful [`Outcome`](crate::response::Outcome).
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Invalid key material: {0}")]
    KeyMaterial(#[from] crypto::Error),

    #[error("Security processing failed: {0}")]
    Security(#[from] soap::Error),

    #[error("Invalid token: {0}")]
    Token(#[from] TokenError),

    #[error("Missing field '{field}' for operation {operation}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
