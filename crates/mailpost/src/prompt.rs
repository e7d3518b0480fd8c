//! Interactive prompts for values not given on the command line.

use std::io::{self, BufRead, Write};

/// Returns `given`, or asks for it on the terminal.
pub fn value_or_prompt(given: Option<String>, label: &str) -> io::Result<String> {
    match given {
        Some(value) => Ok(value),
        None => read_value(&mut io::stdin().lock(), &mut io::stderr(), label),
    }
}

/// Returns `given`, or asks for it without echoing input.
pub fn secret_or_prompt(given: Option<String>, label: &str) -> io::Result<String> {
    match given {
        Some(value) => Ok(value),
        None => rpassword::prompt_password(format!("{label}: ")),
    }
}

fn read_value(input: &mut impl BufRead, output: &mut impl Write, label: &str) -> io::Result<String> {
    write!(output, "{label}: ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("no input for {label}"),
        ));
    }

    let len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(len);
    Ok(line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_one_line_without_its_newline() {
        let mut input = Cursor::new("Hello there\r\nnext\n");
        let mut output = Vec::new();
        let value = read_value(&mut input, &mut output, "Subject").unwrap();
        assert_eq!(value, "Hello there");
        assert_eq!(output, b"Subject: ");
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut input = Cursor::new("");
        let err = read_value(&mut input, &mut Vec::new(), "Message").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn given_value_skips_the_prompt() {
        assert_eq!(
            value_or_prompt(Some("me@gmail.com".into()), "Your email").unwrap(),
            "me@gmail.com"
        );
        assert_eq!(
            secret_or_prompt(Some("pw".into()), "Your password").unwrap(),
            "pw"
        );
    }
}
