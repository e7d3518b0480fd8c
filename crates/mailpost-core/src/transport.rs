//! Delivery of prepared messages.
//!
//! [`Transport`] is the seam between the dispatcher and the network.
//! [`SmtpTransport`] runs one full SMTP session per message; tests plug in
//! their own implementation to observe what would have been sent.

use std::future::Future;
use std::io;
use std::time::Duration;

use mailpost_smtp::connection::{SmtpStream, connect, connect_tls};
use mailpost_smtp::{Client, SmtpConnection};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::message::EmailMessage;
use crate::provider::{ProviderConfig, Security};

/// Default limit for establishing the connection, TLS included.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Name announced in EHLO/HELO.
const DEFAULT_CLIENT_HOSTNAME: &str = "localhost";

/// Login for the provider. `Debug` output redacts the password.
#[derive(Debug)]
pub struct Credentials {
    /// Login name, the sender address.
    pub username: String,
    /// Login password.
    pub password: SecretString,
}

impl Credentials {
    /// Creates a new credential pair.
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Delivers a prepared message through a provider.
pub trait Transport {
    /// Opens a session to `provider`, authenticates and transmits `message`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SmtpAuth`] if the credentials are rejected and
    /// [`crate::Error::SmtpTransport`] for any other failure.
    fn deliver(
        &self,
        provider: &ProviderConfig,
        credentials: &Credentials,
        message: &EmailMessage,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Sends over SMTP with the security mode the provider asks for.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    client_hostname: String,
    connect_timeout: Duration,
}

impl Default for SmtpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtpTransport {
    /// Creates a transport with the default timeout and client hostname.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client_hostname: DEFAULT_CLIENT_HOSTNAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the name announced in EHLO.
    #[must_use]
    pub fn with_client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }

    /// Connect timeout in use.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    async fn open(&self, provider: &ProviderConfig) -> mailpost_smtp::Result<SmtpStream> {
        let connecting = async {
            match provider.security() {
                Security::Tls => connect_tls(&provider.server, provider.port).await,
                Security::StartTls | Security::None => {
                    connect(&provider.server, provider.port).await
                }
            }
        };

        tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!(
                        "connecting to {}:{} timed out after {:?}",
                        provider.server, provider.port, self.connect_timeout
                    ),
                )
            })?
    }
}

impl Transport for SmtpTransport {
    async fn deliver(
        &self,
        provider: &ProviderConfig,
        credentials: &Credentials,
        message: &EmailMessage,
    ) -> Result<()> {
        info!(
            server = %provider.server,
            port = provider.port,
            security = ?provider.security(),
            "connecting"
        );
        let stream = self.open(provider).await?;

        let client = Client::from_stream(stream).await?;
        let client = client.hello(&self.client_hostname).await?;

        let client = if provider.security() == Security::StartTls {
            debug!("upgrading with STARTTLS");
            client
                .starttls(&provider.server, &self.client_hostname)
                .await?
        } else {
            client
        };

        info!(
            username = %credentials.username,
            encrypted = client.is_encrypted(),
            "authenticating"
        );
        let client = client
            .authenticate(&credentials.username, credentials.password.expose_secret())
            .await?;

        let raw = message.to_rfc5322();
        let client = client
            .send_mail(
                message.envelope_from().clone(),
                message.envelope_to(),
                raw.as_bytes(),
            )
            .await?;
        info!(recipients = message.envelope_to().len(), "message accepted");

        // The message is already accepted; a failed QUIT does not undo that
        if let Err(e) = client.quit().await {
            warn!(error = %e, "QUIT failed after delivery");
        }

        Ok(())
    }
}
