//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by dispatcher construction and `send`.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested provider is not in the registry.
    #[error("Invalid provider {0}!")]
    UnknownProvider(String),

    /// Provider configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sender or recipient does not match the address grammar.
    #[error("invalid email \"{0}\"")]
    InvalidEmail(String),

    /// Server rejected the credentials.
    #[error("SMTP authentication failed ({code}): {message}")]
    SmtpAuth {
        /// Reply code from the server.
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// Connection, TLS, protocol or transmission failure.
    #[error("SMTP transport error: {0}")]
    SmtpTransport(#[source] mailpost_smtp::Error),
}

impl From<mailpost_smtp::Error> for Error {
    fn from(err: mailpost_smtp::Error) -> Self {
        match err {
            mailpost_smtp::Error::AuthFailed { code, message } => Self::SmtpAuth { code, message },
            other => Self::SmtpTransport(other),
        }
    }
}

/// Errors raised while loading the provider registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Provider file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Provider file is not valid YAML of the expected shape.
    #[error("malformed provider configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Entry lacks `server` or `port`.
    #[error("There are not all required fields for \"{provider}\": missing `{field}`")]
    MissingField {
        /// Provider whose entry is incomplete.
        provider: String,
        /// Name of the absent field.
        field: &'static str,
    },

    /// Entry has a port that cannot be connected to.
    #[error("provider \"{0}\" has port 0")]
    InvalidPort(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
