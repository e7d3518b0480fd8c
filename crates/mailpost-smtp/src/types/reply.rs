//! Server replies and their codes (RFC 5321 section 4.2).

use std::fmt;

/// A complete, possibly multi-line, server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit code shared by every line.
    pub code: ReplyCode,
    /// Text after the code, one entry per line.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// True for a 2yz reply.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code.class(), ReplyClass::Completion)
    }

    /// Reply lines joined with newlines, as shown to users.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }
}

/// First digit of a reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// 2yz: the action completed.
    Completion,
    /// 3yz: the server waits for more input.
    Intermediate,
    /// 4yz: failed, may succeed if retried.
    Transient,
    /// 5yz: failed for good.
    Permanent,
    /// Anything outside 200..=599.
    Other,
}

/// Three-digit SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 closing channel
    pub const CLOSING: Self = Self(221);
    /// 235 authentication succeeded
    pub const AUTH_SUCCEEDED: Self = Self(235);
    /// 250 completed
    pub const OK: Self = Self(250);
    /// 334 send the next authentication step
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 send the message, end with `.`
    pub const START_DATA: Self = Self(354);
    /// 500 command unrecognized
    pub const SYNTAX_ERROR: Self = Self(500);
    /// 502 command not implemented
    pub const NOT_IMPLEMENTED: Self = Self(502);
    /// 535 credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 mailbox unavailable
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Class given by the first digit.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 / 100 {
            2 => ReplyClass::Completion,
            3 => ReplyClass::Intermediate,
            4 => ReplyClass::Transient,
            5 => ReplyClass::Permanent,
            _ => ReplyClass::Other,
        }
    }

    /// True for 2yz.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.class(), ReplyClass::Completion)
    }

    /// True for 3yz.
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        matches!(self.class(), ReplyClass::Intermediate)
    }

    /// True for 4yz.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self.class(), ReplyClass::Transient)
    }

    /// True for 5yz.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self.class(), ReplyClass::Permanent)
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}
