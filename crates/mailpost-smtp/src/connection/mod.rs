//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, SmtpConnection,
};
pub use stream::{SmtpStream, connect, connect_tls};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from the greeting and EHLO reply.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions. Empty after a HELO fallback.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the maximum message size, if advertised.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(Some(size)) if *size > 0 => Some(*size),
            _ => None,
        })
    }

    /// Usable mechanisms from the AUTH extension, or `None` if the server
    /// did not advertise AUTH at all.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Option<Vec<AuthMechanism>> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Auth(mechanisms) => Some(mechanisms.clone()),
            _ => None,
        })
    }

    fn replace_extensions<'a>(&mut self, lines: impl Iterator<Item = &'a String>) {
        self.extensions = lines.map(|line| Extension::parse(line)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        let lines: Vec<String> = lines.iter().map(ToString::to_string).collect();
        let mut info = ServerInfo::default();
        info.replace_extensions(lines.iter());
        info
    }

    #[test]
    fn reads_capabilities() {
        let info = info(&["SIZE 1000", "AUTH PLAIN LOGIN", "STARTTLS"]);
        assert!(info.supports_starttls());
        assert_eq!(info.max_message_size(), Some(1000));
        assert_eq!(
            info.auth_mechanisms(),
            Some(vec![AuthMechanism::Plain, AuthMechanism::Login])
        );
    }

    #[test]
    fn auth_without_usable_mechanisms() {
        assert_eq!(info(&["AUTH CRAM-MD5 XOAUTH2"]).auth_mechanisms(), Some(Vec::new()));
    }

    #[test]
    fn size_zero_means_no_limit() {
        assert_eq!(info(&["SIZE 0"]).max_message_size(), None);
        assert_eq!(info(&["SIZE"]).max_message_size(), None);
    }

    #[test]
    fn empty_after_helo() {
        let info = ServerInfo::default();
        assert!(!info.supports_starttls());
        assert_eq!(info.auth_mechanisms(), None);
    }
}
