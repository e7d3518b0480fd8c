//! `mailpost` - send a markdown email from the command line.
//!
//! Renders the message to HTML and delivers it through one of the
//! configured SMTP providers.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod prompt;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mailpost_core::{Dispatcher, EmailRequest, ProviderRegistry, Recipients};
use secrecy::SecretString;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use prompt::{secret_or_prompt, value_or_prompt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpost=info,mailpost_core=info,mailpost_smtp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let outcome = run(Cli::parse()).await;
    report(&outcome, &mut io::stdout(), &mut io::stderr())
}

/// Prints the outcome once: the confirmation on `out`, or the error on `err`.
fn report(outcome: &anyhow::Result<()>, out: &mut impl Write, err: &mut impl Write) -> ExitCode {
    match outcome {
        Ok(()) => {
            let _ = writeln!(out, "Message was sent!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!(error = ?e, "send failed");
            let _ = writeln!(err, "Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let registry = match &cli.providers {
        Some(path) => ProviderRegistry::load(path)?,
        None => ProviderRegistry::builtin()?,
    };
    debug!(providers = registry.len(), "provider registry loaded");

    // Fail on an unknown provider before asking for anything
    let dispatcher = Dispatcher::new(Arc::new(registry), &cli.provider)?;

    let sender_email = value_or_prompt(cli.email, "Your email")?;
    let sender_password = SecretString::from(secret_or_prompt(cli.password, "Your password")?);
    let to = value_or_prompt(cli.to, "Receiver(s)")?;
    let subject = value_or_prompt(cli.subject, "Subject")?;
    let message = value_or_prompt(cli.message, "Message")?;

    let request = EmailRequest {
        sender_email,
        sender_password,
        recipients: Recipients::parse_list(&to),
        subject,
        message,
    };

    dispatcher.send_request(request).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn success_prints_confirmation_only() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        report(&Ok(()), &mut out, &mut err);
        assert_eq!(String::from_utf8(out).unwrap(), "Message was sent!\n");
        assert!(err.is_empty());
    }

    #[test]
    fn failure_is_printed_once() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let failure = Err(anyhow::anyhow!("invalid email \"wrong\""));
        report(&failure, &mut out, &mut err);
        assert!(out.is_empty());
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "Error: invalid email \"wrong\"\n"
        );
    }
}
