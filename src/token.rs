//! Caller-facing token that carries the server-issued user id together with
//! the username it was registered under.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE as BASE64_URL};
use thiserror::Error;

/// Separator between the opaque id and the encoded username.
/// The URL-safe base64 alphabet never produces it.
pub const SEPARATOR: char = '|';

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has no '{SEPARATOR}' separator")]
    MissingSeparator,

    #[error("Opaque identifier must not contain '{SEPARATOR}'")]
    SeparatorInIdentifier,

    #[error("Username is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Username is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A server-issued opaque identifier and the caller's username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub opaque: String,
    pub username: String,
}

impl Token {
    pub fn new(opaque: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            opaque: opaque.into(),
            username: username.into(),
        }
    }

    /// Serialize as `<opaque>|<base64url(username)>`
    pub fn encode(&self) -> Result<String, TokenError> {
        if self.opaque.contains(SEPARATOR) {
            return Err(TokenError::SeparatorInIdentifier);
        }
        Ok(format!(
            "{}{SEPARATOR}{}",
            self.opaque,
            BASE64_URL.encode(self.username.as_bytes())
        ))
    }

    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let (opaque, username) = token
            .split_once(SEPARATOR)
            .ok_or(TokenError::MissingSeparator)?;
        let username = String::from_utf8(BASE64_URL.decode(username)?)?;
        Ok(Self::new(opaque, username))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // username stays out of logs
        write!(f, "{}{SEPARATOR}…", self.opaque)
    }
}
