//! Votectl Error Types

use thiserror::Error;

/// Result type alias for votectl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Votectl error types
///
/// The enum is `Clone` because a single refresh outcome is handed to every
/// request waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Session errors
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Refresh token no longer valid: {0}")]
    RefreshExpired(String),

    #[error("Session expired, please log in again")]
    SessionExpired,

    // Election errors
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Verification errors
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    // Request validation
    #[error("Validation failed: {0}")]
    Validation(String),

    // Transport errors
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // Persistence errors
    #[error("Token store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map a non-success HTTP status and its message onto the taxonomy
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Error::NotFound(message),
            _ => Error::ServerError { status, message },
        }
    }

    /// Check if this error means the user has to log in again
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Error::RefreshExpired(_) | Error::SessionExpired
        )
    }

    /// Check if this error came from a rejected credential of any kind
    pub fn is_auth_failure(&self) -> bool {
        self.requires_login() || matches!(self, Error::InvalidCredentials(_))
    }

    /// Backend or local message carried by the error, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Error::InvalidCredentials(m)
            | Error::RefreshExpired(m)
            | Error::InvalidTransition(m)
            | Error::NotFound(m)
            | Error::MalformedToken(m)
            | Error::Validation(m)
            | Error::NetworkFailure(m)
            | Error::ServerError { message: m, .. } => Some(m),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::ConfigParse(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert_eq!(
            Error::from_status(404, "Election not found"),
            Error::NotFound("Election not found".into())
        );
        assert_eq!(
            Error::from_status(503, "down"),
            Error::ServerError { status: 503, message: "down".into() }
        );
    }

    #[test]
    fn test_classification() {
        assert!(Error::SessionExpired.requires_login());
        assert!(Error::RefreshExpired("x".into()).requires_login());
        assert!(!Error::InvalidCredentials("x".into()).requires_login());
        assert!(Error::InvalidCredentials("x".into()).is_auth_failure());
        assert!(!Error::NetworkFailure("x".into()).is_auth_failure());

        assert_eq!(Error::InvalidTransition("nope".into()).message(), Some("nope"));
        assert_eq!(Error::SessionExpired.message(), None);
    }
}
