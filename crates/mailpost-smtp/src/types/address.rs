//! Envelope paths for `MAIL FROM` and `RCPT TO`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Characters that would end the path or the command line early.
const FORBIDDEN: [char; 4] = ['\r', '\n', '<', '>'];

/// Reverse or forward path, sent between angle brackets.
///
/// Only wire safety is checked: the path is non-empty, has an `@` and
/// cannot break out of `<...>` or the command line. Grammar checks are the
/// caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Wraps `addr` after checking it is safe to put on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `addr` is empty, lacks an `@`
    /// or contains CR, LF, `<` or `>`.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();

        if addr.is_empty() {
            return Err(Error::InvalidAddress("empty path".into()));
        }
        if !addr.contains('@') {
            return Err(Error::InvalidAddress(format!("no @ in {addr:?}")));
        }
        if let Some(c) = addr.chars().find(|c| FORBIDDEN.contains(c)) {
            return Err(Error::InvalidAddress(format!(
                "{c:?} not allowed in {addr:?}"
            )));
        }

        Ok(Self(addr))
    }

    /// The path without brackets.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_path_verbatim() {
        let addr: Address = "user@example.com".parse().unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.to_string(), "user@example.com");

        let quoted = Address::new(r#""john doe"@example.com"#).unwrap();
        assert_eq!(quoted.as_ref(), r#""john doe"@example.com"#);
    }

    #[test]
    fn rejects_paths_without_at() {
        assert!(matches!(Address::new(""), Err(Error::InvalidAddress(_))));
        assert!(matches!(
            Address::new("userexample.com"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn rejects_command_injection() {
        for addr in [
            "a@example.com>\r\nRCPT TO:<b@example.com",
            "a@example.com\n",
            "<a@example.com>",
            "user@\r\n example.com",
        ] {
            assert!(Address::new(addr).is_err(), "{addr:?} should be rejected");
        }
    }
}
