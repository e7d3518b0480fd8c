//! Error types for SMTP operations.

use std::io;

use crate::types::{Reply, ReplyCode};

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Server rejected a command.
    #[error("SMTP error {code}: {message}")]
    Rejected {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Server rejected the supplied credentials.
    #[error("authentication failed ({code}): {message}")]
    AuthFailed {
        /// Reply code (usually 535).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected or malformed response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server closed the connection mid-exchange.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// Envelope address cannot be sent on the wire.
    #[error("Invalid envelope address: {0}")]
    InvalidAddress(String),

    /// Message too large for the server's advertised SIZE.
    #[error("Message exceeds size limit: {size} bytes (server accepts {limit})")]
    MessageTooLarge {
        /// Size of the message.
        size: usize,
        /// Limit advertised by the server.
        limit: usize,
    },

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates a rejection error from a server reply.
    #[must_use]
    pub fn rejected(reply: &Reply) -> Self {
        Self::Rejected {
            code: reply.code.as_u16(),
            message: reply.message_text(),
        }
    }

    /// Creates an authentication error from a server reply.
    #[must_use]
    pub fn auth_failed(reply: &Reply) -> Self {
        Self::AuthFailed {
            code: reply.code.as_u16(),
            message: reply.message_text(),
        }
    }

    /// Returns true if the server refused the credentials.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed { .. })
    }

    /// Reply code behind a rejection, if the error carries one.
    #[must_use]
    pub const fn reply_code(&self) -> Option<ReplyCode> {
        match self {
            Self::Rejected { code, .. } | Self::AuthFailed { code, .. } => {
                Some(ReplyCode::new(*code))
            }
            _ => None,
        }
    }

    /// Returns true for a 5yz rejection.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.reply_code(), Some(code) if code.is_permanent())
    }

    /// Returns true for a 4yz rejection.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.reply_code(), Some(code) if code.is_transient())
    }
}
