//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Type-state marker for a greeted, unauthenticated session.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;

    /// Returns true once the session runs over TLS.
    fn is_encrypted(&self) -> bool;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn is_encrypted(&self) -> bool {
        self.stream.is_tls()
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server
    /// refuses service.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        let client = Self {
            stream,
            server_info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
            _state: PhantomData,
        };

        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(client.abort(Error::rejected(&greeting)).await);
        }

        debug!(server = %client.server_info.hostname, "received greeting");
        Ok(client)
    }

    /// Greets the server with EHLO, falling back to HELO when the server
    /// does not understand EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if both greetings are rejected.
    pub async fn hello(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        if reply.is_success() {
            self.server_info
                .replace_extensions(reply.message.iter().skip(1));
            return Ok(self);
        }

        if !reply.code.is_permanent() {
            return Err(self.abort(Error::rejected(&reply)).await);
        }

        debug!(code = %reply.code, "EHLO refused, falling back to HELO");
        let reply = self
            .send_command(Command::Helo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        if !reply.is_success() {
            return Err(self.abort(Error::rejected(&reply)).await);
        }

        self.server_info.extensions.clear();
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS, then greets again.
    ///
    /// `hostname` is the server name checked against its certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised or if the upgrade fails.
    pub async fn starttls(mut self, hostname: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(self.abort(Error::NotSupported("STARTTLS".into())).await);
        }

        let reply = self.send_command(Command::StartTls).await?;
        if !reply.is_success() {
            return Err(self.abort(Error::rejected(&reply)).await);
        }

        self.stream = self.stream.upgrade_to_tls(hostname).await?;
        debug!(host = hostname, "TLS established");

        // Capabilities learned before the upgrade must be discarded (RFC 3207)
        self.server_info.extensions.clear();
        self.hello(client_hostname).await
    }

    /// Authenticates with the best mechanism both sides support.
    ///
    /// PLAIN is preferred, then LOGIN. A server that advertises no AUTH
    /// extension at all is tried with PLAIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthFailed`] if the credentials are rejected, or
    /// [`Error::NotSupported`] if the server offers neither mechanism.
    pub async fn authenticate(
        self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        match self.server_info.auth_mechanisms() {
            None => self.auth_plain(username, password).await,
            Some(offered) if offered.contains(&AuthMechanism::Plain) => {
                self.auth_plain(username, password).await
            }
            Some(offered) if offered.contains(&AuthMechanism::Login) => {
                self.auth_login(username, password).await
            }
            Some(_) => Err(self
                .abort(Error::NotSupported("AUTH PLAIN or AUTH LOGIN".into()))
                .await),
        }
    }

    /// Authenticates using the PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthFailed`] if the server rejects the credentials.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        // \0username\0password
        let credentials = format!("\0{username}\0{password}");

        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(BASE64.encode(credentials.as_bytes())),
            })
            .await?;

        if !reply.is_success() {
            return Err(self.abort(Error::auth_failed(&reply)).await);
        }

        Ok(self.transition())
    }

    /// Authenticates using the LOGIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthFailed`] if the server rejects the credentials.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            })
            .await?;

        let reply = if reply.code == ReplyCode::AUTH_CONTINUE {
            self.send_command(Command::AuthResponse(BASE64.encode(username)))
                .await?
        } else {
            reply
        };

        let reply = if reply.code == ReplyCode::AUTH_CONTINUE {
            self.send_command(Command::AuthResponse(BASE64.encode(password)))
                .await?
        } else {
            reply
        };

        if !reply.is_success() {
            return Err(self.abort(Error::auth_failed(&reply)).await);
        }

        Ok(self.transition())
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(mut self, from: Address) -> Result<Client<MailTransaction>> {
        let reply = self.send_command(Command::MailFrom { from }).await?;

        if !reply.is_success() {
            return Err(self.abort(Error::rejected(&reply)).await);
        }

        Ok(self.transition())
    }

    /// Runs a whole transaction: MAIL FROM, one RCPT TO per recipient, DATA
    /// and the message itself.
    ///
    /// # Errors
    ///
    /// Returns an error if `to` is empty, the message exceeds the advertised
    /// SIZE, or the server rejects any step.
    pub async fn send_mail(self, from: Address, to: &[Address], message: &[u8]) -> Result<Self> {
        let Some((first, rest)) = to.split_first() else {
            return Err(self
                .abort(Error::InvalidAddress("no recipients".into()))
                .await);
        };

        if let Some(limit) = self.server_info.max_message_size()
            && message.len() > limit
        {
            return Err(self
                .abort(Error::MessageTooLarge {
                    size: message.len(),
                    limit,
                })
                .await);
        }

        let mut client = self.mail_from(from).await?.rcpt_to(first.clone()).await?;
        for recipient in rest {
            client = client.rcpt_to(recipient.clone()).await?;
        }

        client.data().await?.send_message(message).await
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        let reply = self.send_command(Command::RcptTo { to }).await?;

        if !reply.is_success() {
            return Err(self.abort(Error::rejected(&reply)).await);
        }

        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        let reply = self.send_command(Command::RcptTo { to }).await?;

        if !reply.is_success() {
            return Err(self.abort(Error::rejected(&reply)).await);
        }

        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(Command::Data).await?;

        if reply.code != ReplyCode::START_DATA {
            return Err(self.abort(Error::rejected(&reply)).await);
        }

        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or the server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Authenticated>> {
        self.stream.write_all(&encode_data(message)).await?;

        let reply = read_reply(&mut self.stream).await?;
        if !reply.is_success() {
            return Err(self.abort(Error::rejected(&reply)).await);
        }

        debug!(bytes = message.len(), "message accepted");
        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S> Client<S> {
    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        debug!(command = ?cmd, "C:");
        self.stream.write_all(&cmd.serialize()).await?;
        read_reply(&mut self.stream).await
    }

    /// Sends a best-effort QUIT after a failure and returns the original
    /// error. Dropping `self` releases the connection either way.
    async fn abort(mut self, error: Error) -> Error {
        if let Err(quit_error) = self.send_command(Command::Quit).await {
            debug!(%quit_error, "QUIT after failure did not complete");
        }
        error
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;

        if !reply.is_success() {
            return Err(Error::rejected(&reply));
        }

        Ok(())
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    let reply = parse_reply(&lines)?;
    debug!(code = %reply.code, "S:");
    trace!(text = %reply.message_text(), "S:");
    Ok(reply)
}

/// Frames a message for the DATA phase.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let body = message
        .strip_suffix(b"\n")
        .map_or(message, |m| m.strip_suffix(b"\r").unwrap_or(m));

    let mut out = Vec::with_capacity(body.len() + body.len() / 32 + 5);
    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }
    out.extend_from_slice(b".\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_data_normalizes_line_endings() {
        assert_eq!(encode_data(b"a\nb\r\nc"), b"a\r\nb\r\nc\r\n.\r\n");
    }

    #[test]
    fn encode_data_does_not_add_blank_line_for_trailing_newline() {
        assert_eq!(encode_data(b"Subject: x\r\n\r\nbody\r\n"), b"Subject: x\r\n\r\nbody\r\n.\r\n");
    }

    #[test]
    fn encode_data_dot_stuffs() {
        assert_eq!(encode_data(b".hidden\n..\nok"), b"..hidden\r\n...\r\nok\r\n.\r\n");
    }

    #[test]
    fn encode_data_empty_message() {
        assert_eq!(encode_data(b""), b".\r\n");
    }
}
