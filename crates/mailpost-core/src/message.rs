//! Request, message and result types.

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use mailpost_smtp::Address;
use secrecy::SecretString;

use crate::error::{Error, Result};

/// Longest encoded line in the body, per RFC 2045.
const BODY_LINE_LENGTH: usize = 76;

/// Raw bytes per RFC 2047 encoded word, keeping each word within 75 chars.
const ENCODED_WORD_BYTES: usize = 45;

/// One recipient or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// A single address.
    One(String),
    /// Several addresses, in the order they were given.
    Many(Vec<String>),
}

impl Recipients {
    /// Splits a comma-separated list, ignoring commas inside quoted
    /// strings, comments and domain literals. Empty items are dropped.
    #[must_use]
    pub fn parse_list(list: &str) -> Self {
        let mut items = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut escaped = false;
        let mut depth = 0usize;

        for c in list.chars() {
            if escaped {
                escaped = false;
                current.push(c);
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' => in_quotes = !in_quotes,
                '(' | '[' if !in_quotes => depth += 1,
                ')' | ']' if !in_quotes => depth = depth.saturating_sub(1),
                ',' if !in_quotes && depth == 0 => {
                    items.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            }
            current.push(c);
        }
        items.push(current);

        let mut items: Vec<String> = items
            .into_iter()
            .filter(|item| !item.trim().is_empty())
            .collect();

        if items.len() == 1 {
            Self::One(items.remove(0))
        } else {
            Self::Many(items)
        }
    }

    /// Number of addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(list) => list.len(),
        }
    }

    /// Returns true for an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts into an ordered list; a single address becomes a list of one.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(addr) => vec![addr],
            Self::Many(list) => list,
        }
    }
}

impl From<&str> for Recipients {
    fn from(addr: &str) -> Self {
        Self::One(addr.to_string())
    }
}

impl From<String> for Recipients {
    fn from(addr: String) -> Self {
        Self::One(addr)
    }
}

impl From<Vec<String>> for Recipients {
    fn from(list: Vec<String>) -> Self {
        Self::Many(list)
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(list: Vec<&str>) -> Self {
        Self::Many(list.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Recipients {
    fn from(list: &[&str]) -> Self {
        Self::Many(list.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Recipients {
    fn from(list: [&str; N]) -> Self {
        Self::Many(list.iter().map(|s| (*s).to_string()).collect())
    }
}

/// Everything the caller supplies for one send.
///
/// `Debug` output redacts the password.
#[derive(Debug)]
pub struct EmailRequest {
    /// Sender address, also used as the login name.
    pub sender_email: String,
    /// Sender password.
    pub sender_password: SecretString,
    /// Recipient address(es).
    pub recipients: Recipients,
    /// Subject line.
    pub subject: String,
    /// Markdown message body.
    pub message: String,
}

impl EmailRequest {
    /// Creates a new request.
    pub fn new(
        sender_email: impl Into<String>,
        sender_password: impl Into<String>,
        recipients: impl Into<Recipients>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sender_email: sender_email.into(),
            sender_password: SecretString::from(sender_password.into()),
            recipients: recipients.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// A validated, rendered message ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    subject: String,
    from: String,
    to: Vec<String>,
    body_html: String,
    date: DateTime<Utc>,
    envelope_from: Address,
    envelope_to: Vec<Address>,
}

impl EmailMessage {
    /// MIME subtype of the body.
    pub const CONTENT_TYPE: &'static str = "html";
    /// Charset of the body.
    pub const CHARSET: &'static str = "utf-8";

    /// Builds a message from already-validated parts.
    ///
    /// The envelope paths are the addresses with comments and folding
    /// whitespace removed; the headers keep them as given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmail`] for an address that matches the
    /// grammar but cannot be carried in an SMTP envelope (for example a
    /// quoted local part holding `<`).
    pub fn new(
        subject: impl Into<String>,
        from: impl Into<String>,
        to: Vec<String>,
        body_html: impl Into<String>,
    ) -> Result<Self> {
        let from = from.into();
        let envelope_from = envelope_address(&from)?;
        let envelope_to = to
            .iter()
            .map(|addr| envelope_address(addr))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            subject: subject.into(),
            from,
            to,
            body_html: body_html.into(),
            date: Utc::now(),
            envelope_from,
            envelope_to,
        })
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sender address.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Recipient addresses.
    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// Value of the `To` header.
    #[must_use]
    pub fn to_header(&self) -> String {
        self.to.join(", ")
    }

    /// Rendered HTML body.
    #[must_use]
    pub fn body_html(&self) -> &str {
        &self.body_html
    }

    /// Reverse path for `MAIL FROM`.
    #[must_use]
    pub const fn envelope_from(&self) -> &Address {
        &self.envelope_from
    }

    /// Forward paths for `RCPT TO`, one per recipient.
    #[must_use]
    pub fn envelope_to(&self) -> &[Address] {
        &self.envelope_to
    }

    /// Serializes the message as an RFC 5322 / MIME document with a
    /// base64-encoded `text/html` body.
    #[must_use]
    pub fn to_rfc5322(&self) -> String {
        let mut message = String::new();

        let _ = write!(
            message,
            "Content-Type: text/{}; charset=\"{}\"\r\n",
            Self::CONTENT_TYPE,
            Self::CHARSET
        );
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Transfer-Encoding: base64\r\n");
        let _ = write!(message, "Subject: {}\r\n", encode_header(&self.subject));
        let _ = write!(message, "From: {}\r\n", self.from);
        let _ = write!(message, "To: {}\r\n", self.to_header());
        let _ = write!(message, "Date: {}\r\n", self.date.to_rfc2822());

        // Empty line between headers and body
        message.push_str("\r\n");

        let encoded = BASE64.encode(self.body_html.as_bytes());
        for chunk in encoded.as_bytes().chunks(BODY_LINE_LENGTH) {
            // base64 output is ASCII, so every chunk is valid UTF-8
            message.push_str(&String::from_utf8_lossy(chunk));
            message.push_str("\r\n");
        }

        message
    }
}

/// What `send` hands back: the subject and rendered body, never the password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Trimmed subject.
    pub subject: String,
    /// Rendered HTML body.
    pub body: String,
}

fn envelope_address(addr: &str) -> Result<Address> {
    Address::new(bare_path(addr)).map_err(|_| Error::InvalidEmail(addr.to_string()))
}

/// Drops comments and folding whitespace (RFC 5322 CFWS), leaving the
/// `local@domain` path SMTP expects. Quoted strings keep their spaces and
/// are only unfolded.
fn bare_path(addr: &str) -> String {
    let mut path = String::with_capacity(addr.len());
    let mut in_quotes = false;
    let mut comment_depth = 0usize;
    let mut chars = addr.chars();

    while let Some(c) = chars.next() {
        if comment_depth > 0 {
            match c {
                '\\' => {
                    chars.next();
                }
                '(' => comment_depth += 1,
                ')' => comment_depth -= 1,
                _ => {}
            }
            continue;
        }
        if in_quotes {
            match c {
                '\r' | '\n' => {}
                '\\' => {
                    path.push(c);
                    if let Some(escaped) = chars.next() {
                        path.push(escaped);
                    }
                }
                '"' => {
                    in_quotes = false;
                    path.push(c);
                }
                _ => path.push(c),
            }
            continue;
        }
        match c {
            '(' => comment_depth = 1,
            '"' => {
                in_quotes = true;
                path.push(c);
            }
            c if c.is_whitespace() => {}
            _ => path.push(c),
        }
    }

    path
}

/// Encodes a header value as RFC 2047 encoded words unless it is plain
/// printable ASCII.
fn encode_header(value: &str) -> String {
    let plain = value.chars().all(|c| matches!(c, ' '..='~')) && !value.contains("=?");
    if plain {
        return value.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_BYTES {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }

    words.join("\r\n ")
}

fn encoded_word(text: &str) -> String {
    format!("=?utf-8?b?{}?=", BASE64.encode(text.as_bytes()))
}
