//! Validates, renders and sends one message per call.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument};

use crate::address::{normalize_text, validate_email};
use crate::body::render;
use crate::error::{Error, Result};
use crate::message::{DispatchResult, EmailMessage, EmailRequest, Recipients};
use crate::provider::{ProviderConfig, ProviderRegistry};
use crate::transport::{Credentials, SmtpTransport, Transport};

/// Sends messages through one provider.
///
/// The provider name is checked against the registry at construction and
/// resolved again on every send. Each `send` opens and closes its own
/// session, so a dispatcher can be reused and shared.
#[derive(Debug, Clone)]
pub struct Dispatcher<T = SmtpTransport> {
    registry: Arc<ProviderRegistry>,
    provider: String,
    transport: T,
}

impl Dispatcher<SmtpTransport> {
    /// Creates a dispatcher for the named provider using SMTP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProvider`] if the registry has no such name.
    pub fn new(registry: Arc<ProviderRegistry>, provider: &str) -> Result<Self> {
        Self::with_transport(registry, provider, SmtpTransport::default())
    }
}

impl<T: Transport> Dispatcher<T> {
    /// Creates a dispatcher that delivers through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProvider`] if the registry has no such name.
    pub fn with_transport(
        registry: Arc<ProviderRegistry>,
        provider: &str,
        transport: T,
    ) -> Result<Self> {
        let config = registry.lookup(provider)?;
        debug!(provider, server = %config.server, port = config.port, "dispatcher ready");
        Ok(Self {
            provider: provider.to_string(),
            registry,
            transport,
        })
    }

    /// Name of the provider this dispatcher sends through.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Connection parameters of the bound provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProvider`] if the name is no longer present,
    /// which cannot happen with an immutable registry.
    pub fn provider_config(&self) -> Result<&ProviderConfig> {
        self.registry.lookup(&self.provider)
    }

    /// Transport messages are delivered through.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Normalizes and validates a request and renders its body.
    ///
    /// No network I/O happens here, so a request that fails validation
    /// never opens a connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmail`] for the first address, sender first,
    /// that does not match the grammar.
    pub fn prepare(&self, request: &EmailRequest) -> Result<EmailMessage> {
        let from = validate_email(&request.sender_email)?;

        let recipients = request.recipients.clone().into_vec();
        if recipients.is_empty() {
            return Err(Error::InvalidEmail(String::new()));
        }
        let to = recipients
            .iter()
            .map(|addr| validate_email(addr).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        let subject = normalize_text(&request.subject);
        let body = render(normalize_text(&request.message));

        EmailMessage::new(subject, from, to, body)
    }

    /// Sends a message.
    ///
    /// `recipients` may be a single address or a list; a single address
    /// behaves exactly like a list of one.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::send_request`].
    pub async fn send(
        &self,
        sender_email: &str,
        sender_password: &str,
        recipients: impl Into<Recipients>,
        subject: &str,
        message: &str,
    ) -> Result<DispatchResult> {
        self.send_request(EmailRequest::new(
            sender_email,
            sender_password,
            recipients,
            subject,
            message,
        ))
        .await
    }

    /// Validates, renders and delivers a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmail`] before any connection is made if an
    /// address is malformed, [`Error::SmtpAuth`] if the provider rejects
    /// the login, and [`Error::SmtpTransport`] for any other SMTP failure.
    #[instrument(skip_all, fields(provider = %self.provider))]
    pub async fn send_request(&self, request: EmailRequest) -> Result<DispatchResult> {
        let message = self.prepare(&request)?;

        info!(
            from = %message.from(),
            to = %message.to_header(),
            subject = %message.subject(),
            "sending"
        );
        debug!(body = %message.body_html(), "rendered body");

        let provider = self.provider_config()?;
        let credentials = Credentials::new(message.from(), clone_secret(&request.sender_password));
        self.transport
            .deliver(provider, &credentials, &message)
            .await?;

        info!("sent");
        Ok(DispatchResult {
            subject: message.subject().to_string(),
            body: message.body_html().to_string(),
        })
    }
}

fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
