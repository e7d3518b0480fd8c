//! Client commands and their wire form.

use std::fmt;

use crate::types::{Address, AuthMechanism};

/// One client command line.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// `HELO <host>`, the RFC 821 greeting.
    Helo {
        /// Name the client announces.
        hostname: String,
    },
    /// `EHLO <host>`, asking for the extension list.
    Ehlo {
        /// Name the client announces.
        hostname: String,
    },
    /// `STARTTLS`
    StartTls,
    /// `AUTH <mechanism> [initial-response]`
    Auth {
        /// SASL mechanism.
        mechanism: AuthMechanism,
        /// Base64 initial response (RFC 4954 section 4).
        initial_response: Option<String>,
    },
    /// Base64 line answering a 334 challenge.
    AuthResponse(String),
    /// `MAIL FROM:<path>`
    MailFrom {
        /// Reverse path.
        from: Address,
    },
    /// `RCPT TO:<path>`
    RcptTo {
        /// Forward path.
        to: Address,
    },
    /// `DATA`
    Data,
    /// `QUIT`
    Quit,
}

impl Command {
    /// Wire bytes, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        format!("{}\r\n", Line { command: self, redact: false }).into_bytes()
    }
}

/// Renders a command, optionally with its SASL payload masked.
struct Line<'a> {
    command: &'a Command,
    redact: bool,
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.command {
            Command::Helo { hostname } => write!(f, "HELO {hostname}"),
            Command::Ehlo { hostname } => write!(f, "EHLO {hostname}"),
            Command::StartTls => f.write_str("STARTTLS"),
            Command::Auth {
                mechanism,
                initial_response,
            } => {
                write!(f, "AUTH {}", mechanism.as_str())?;
                match initial_response {
                    Some(_) if self.redact => Ok(()),
                    Some(response) => write!(f, " {response}"),
                    None => Ok(()),
                }
            }
            Command::AuthResponse(_) if self.redact => f.write_str("<auth response>"),
            Command::AuthResponse(response) => f.write_str(response),
            Command::MailFrom { from } => write!(f, "MAIL FROM:<{from}>"),
            Command::RcptTo { to } => write!(f, "RCPT TO:<{to}>"),
            Command::Data => f.write_str("DATA"),
            Command::Quit => f.write_str("QUIT"),
        }
    }
}

// AUTH payloads carry credentials
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(
            &Line {
                command: self,
                redact: true,
            },
            f,
        )
    }
}
