//! Email address validation.
//!
//! Addresses are checked against the RFC 5322 `addr-spec` production,
//! including folding whitespace, parenthesized comments, quoted local parts
//! and bracketed domain literals. The grammar is assembled from its
//! productions once and compiled into a single regex shared by the process.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

const WSP: &str = r"[\s]";
const CRLF: &str = r"(?:\r\n)";
const NO_WS_CTL: &str = r"\x01-\x08\x0b\x0c\x0f-\x1f\x7f";
const QUOTED_PAIR: &str = r"(?:\\.)";
const ATEXT: &str = r"[\w!#$%&'*+\-/=?^`{|}~]";

static ADDR_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    // The pattern is built from constants above; a failure here is a
    // programming error caught by the unit tests.
    #[allow(clippy::expect_used)]
    RegexBuilder::new(&format!(r"\A{}\z", addr_spec()))
        .size_limit(32 * (1 << 20))
        .build()
        .expect("addr-spec grammar compiles")
});

fn addr_spec() -> String {
    let fws = format!(r"(?:(?:{WSP}*{CRLF})?{WSP}+)");
    let ctext = format!(r"[{NO_WS_CTL}\x21-\x27\x2a-\x5b\x5d-\x7e]");
    let ccontent = format!(r"(?:{ctext}|{QUOTED_PAIR})");
    let comment = format!(r"\((?:{fws}?{ccontent})*{fws}?\)");
    let cfws = format!(r"(?:{fws}?{comment})*(?:{fws}?{comment}|{fws})");

    let dot_atom_text = format!(r"{ATEXT}+(?:\.{ATEXT}+)*");
    let dot_atom = format!(r"{cfws}?{dot_atom_text}{cfws}?");

    let qtext = format!(r"[{NO_WS_CTL}\x21\x23-\x5b\x5d-\x7e]");
    let qcontent = format!(r"(?:{qtext}|{QUOTED_PAIR})");
    let quoted_string = format!(r#"{cfws}?"(?:{fws}?{qcontent})*{fws}?"{cfws}?"#);
    let local_part = format!(r"(?:{dot_atom}|{quoted_string})");

    let dtext = format!(r"[{NO_WS_CTL}\x21-\x5a\x5e-\x7e]");
    let dcontent = format!(r"(?:{dtext}|{QUOTED_PAIR})");
    let domain_literal = format!(r"{cfws}?\[(?:{fws}?{dcontent})*{fws}?\]{cfws}?");
    let domain = format!(r"(?:{dot_atom}|{domain_literal})");

    format!("{local_part}@{domain}")
}

/// Strips leading and trailing whitespace.
///
/// Applied to every piece of user text before it is used: addresses,
/// subject and message body alike.
#[must_use]
pub fn normalize_text(text: &str) -> &str {
    text.trim()
}

/// Validates an email address and returns it trimmed.
///
/// # Errors
///
/// Returns [`Error::InvalidEmail`] carrying the candidate if the trimmed
/// string is not an `addr-spec` in its entirety.
pub fn validate_email(candidate: &str) -> Result<&str> {
    let trimmed = normalize_text(candidate);
    if ADDR_SPEC.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(Error::InvalidEmail(candidate.to_string()))
    }
}
