//! End-to-end dispatch tests.
//!
//! The first group swaps in a recording transport to observe exactly what
//! the dispatcher hands over. The second drives the real SMTP transport
//! against a scripted server on a loopback socket.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use mailpost_core::{
    Credentials, Dispatcher, EmailMessage, EmailRequest, Error, ProviderConfig, ProviderRegistry,
    SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct Delivery {
    provider: String,
    username: String,
    password: String,
    to_header: String,
    envelope_to: Vec<String>,
    raw: String,
}

#[derive(Debug, Default)]
struct RecordingTransport {
    deliveries: Mutex<Vec<Delivery>>,
    reject_auth: bool,
}

impl RecordingTransport {
    fn rejecting() -> Self {
        Self {
            reject_auth: true,
            ..Self::default()
        }
    }

    fn count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

impl Transport for RecordingTransport {
    async fn deliver(
        &self,
        provider: &ProviderConfig,
        credentials: &Credentials,
        message: &EmailMessage,
    ) -> mailpost_core::Result<()> {
        self.deliveries.lock().unwrap().push(Delivery {
            provider: provider.name.clone(),
            username: credentials.username.clone(),
            password: credentials.password.expose_secret().to_string(),
            to_header: message.to_header(),
            envelope_to: message
                .envelope_to()
                .iter()
                .map(ToString::to_string)
                .collect(),
            raw: message.to_rfc5322(),
        });

        if self.reject_auth {
            return Err(Error::SmtpAuth {
                code: 535,
                message: "Invalid user or password!".into(),
            });
        }
        Ok(())
    }
}

fn recording(transport: RecordingTransport) -> Dispatcher<RecordingTransport> {
    let registry = Arc::new(ProviderRegistry::builtin().unwrap());
    Dispatcher::with_transport(registry, "gmail", transport).unwrap()
}

#[tokio::test]
async fn sends_through_the_chosen_provider() {
    let dispatcher = recording(RecordingTransport::default());

    let result = dispatcher
        .send(
            "user@gmail.com",
            "app-password",
            "friend@example.com",
            " From test run! ",
            "# Title\n\ntext `code`",
        )
        .await
        .unwrap();

    assert_eq!(result.subject, "From test run!");
    assert_eq!(result.body, "<h1>Title</h1>\n<p>text <code>code</code></p>");

    let deliveries = dispatcher.transport().deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert_eq!(delivery.provider, "gmail");
    assert_eq!(delivery.username, "user@gmail.com");
    assert_eq!(delivery.password, "app-password");
    assert!(delivery.raw.contains("Subject: From test run!\r\n"));
}

#[tokio::test]
async fn multiple_recipients_share_one_message() {
    let dispatcher = recording(RecordingTransport::default());

    dispatcher
        .send(
            "user@gmail.com",
            "pw",
            vec!["a@example.com", "b@example.com"],
            "s",
            "m",
        )
        .await
        .unwrap();

    let deliveries = dispatcher.transport().deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].to_header, "a@example.com, b@example.com");
    assert_eq!(deliveries[0].envelope_to, ["a@example.com", "b@example.com"]);
}

#[tokio::test]
async fn single_recipient_matches_list_of_one() {
    let dispatcher = recording(RecordingTransport::default());

    dispatcher
        .send("user@gmail.com", "pw", "a@example.com", "s", "m")
        .await
        .unwrap();
    dispatcher
        .send("user@gmail.com", "pw", vec!["a@example.com"], "s", "m")
        .await
        .unwrap();

    let deliveries = dispatcher.transport().deliveries.lock().unwrap();
    assert_eq!(deliveries[0].to_header, deliveries[1].to_header);
    assert_eq!(deliveries[0].envelope_to, deliveries[1].envelope_to);
}

#[tokio::test]
async fn invalid_addresses_never_reach_the_transport() {
    let dispatcher = recording(RecordingTransport::default());

    let err = dispatcher
        .send("wrong", "pw", "a@example.com", "s", "m")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid email \"wrong\"");

    let err = dispatcher
        .send("user@gmail.com", "pw", vec!["a@example.com", "wrong"], "s", "m")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidEmail(addr) if addr == "wrong"));

    assert_eq!(dispatcher.transport().count(), 0);
}

#[tokio::test]
async fn auth_rejection_is_reported() {
    let dispatcher = recording(RecordingTransport::rejecting());

    let err = dispatcher
        .send("user@gmail.com", "bad", "a@example.com", "s", "m")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SmtpAuth { code: 535, .. }));
}

#[tokio::test]
async fn request_debug_hides_password() {
    let request = EmailRequest::new("user@gmail.com", "hunter2", "a@example.com", "s", "m");
    assert!(!format!("{request:?}").contains("hunter2"));
}

/// Marks a step that consumes a DATA payload up to the lone `.` line.
const PAYLOAD: &str = "<payload>";

async fn scripted_server(
    steps: Vec<(&'static str, &'static str)>,
) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);
        let mut transcript = Vec::new();

        write.write_all(b"220 mx.test ESMTP\r\n").await.unwrap();

        for (expected, reply) in steps {
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    return transcript;
                }
                let line = line.trim_end_matches("\r\n").to_string();
                let done = expected != PAYLOAD || line == ".";
                if expected != PAYLOAD {
                    assert!(line.starts_with(expected), "expected {expected:?}, got {line:?}");
                }
                transcript.push(line);
                if done {
                    break;
                }
            }
            write.write_all(reply.as_bytes()).await.unwrap();
        }

        transcript
    });

    (port, handle)
}

fn loopback(port: u16) -> Dispatcher {
    loopback_with(port, false, false)
}

fn loopback_with(port: u16, ssl: bool, tls: bool) -> Dispatcher {
    let registry = ProviderRegistry::from_providers([ProviderConfig {
        name: "loopback".into(),
        server: "127.0.0.1".into(),
        port,
        ssl,
        tls,
    }]);
    Dispatcher::new(Arc::new(registry), "loopback").unwrap()
}

#[tokio::test]
async fn smtp_session_over_loopback() {
    let (port, server) = scripted_server(vec![
        ("EHLO localhost", "250-mx.test\r\n250 AUTH PLAIN LOGIN\r\n"),
        ("AUTH PLAIN AHNlbmRlckBleGFtcGxlLmNvbQBzZWNyZXQ=", "235 ok\r\n"),
        ("MAIL FROM:<sender@example.com>", "250 ok\r\n"),
        ("RCPT TO:<a@example.com>", "250 ok\r\n"),
        ("RCPT TO:<b@example.com>", "250 ok\r\n"),
        ("DATA", "354 go ahead\r\n"),
        (PAYLOAD, "250 queued\r\n"),
        ("QUIT", "221 bye\r\n"),
    ])
    .await;

    let result = loopback(port)
        .send(
            "sender@example.com",
            "secret",
            vec!["a@example.com", "b@example.com"],
            "Hello",
            "**hi**",
        )
        .await
        .unwrap();
    assert_eq!(result.body, "<p><strong>hi</strong></p>");

    let transcript = server.await.unwrap();
    assert!(transcript.contains(&"To: a@example.com, b@example.com".to_string()));
    assert!(transcript.contains(&"Subject: Hello".to_string()));
    assert!(transcript.contains(&"Content-Transfer-Encoding: base64".to_string()));

    let start = transcript.iter().position(String::is_empty).unwrap() + 1;
    let end = transcript.iter().position(|line| line == ".").unwrap();
    let body = BASE64.decode(transcript[start..end].concat()).unwrap();
    assert_eq!(body, b"<p><strong>hi</strong></p>");
}

#[tokio::test]
async fn smtp_auth_rejection_over_loopback() {
    let (port, server) = scripted_server(vec![
        ("EHLO localhost", "250-mx.test\r\n250 AUTH PLAIN\r\n"),
        ("AUTH PLAIN", "535 5.7.8 Invalid user or password!\r\n"),
        ("QUIT", "221 bye\r\n"),
    ])
    .await;

    let err = loopback(port)
        .send("sender@example.com", "wrong", "a@example.com", "s", "m")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SmtpAuth { code: 535, .. }));

    let transcript = server.await.unwrap();
    assert!(!transcript.iter().any(|line| line.starts_with("MAIL")));
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = loopback(port)
        .send("sender@example.com", "pw", "a@example.com", "s", "m")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SmtpTransport(_)));
}

#[tokio::test]
async fn starttls_provider_upgrades_after_greeting() {
    // The server agrees to STARTTLS and then hangs up mid-handshake
    let (port, server) = scripted_server(vec![
        ("EHLO localhost", "250-mx.test\r\n250 STARTTLS\r\n"),
        ("STARTTLS", "220 ready to start TLS\r\n"),
    ])
    .await;

    let err = loopback_with(port, false, true)
        .send("sender@example.com", "pw", "a@example.com", "s", "m")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SmtpTransport(_)), "{err:?}");

    let transcript = server.await.unwrap();
    assert_eq!(transcript, ["EHLO localhost", "STARTTLS"]);
}

#[tokio::test]
async fn ssl_provider_starts_with_a_tls_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut first = [0u8; 1];
        socket.read_exact(&mut first).await.unwrap();
        first[0]
    });

    let err = loopback_with(port, true, false)
        .send("sender@example.com", "pw", "a@example.com", "s", "m")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SmtpTransport(_)), "{err:?}");

    // 0x16 is the TLS handshake record type carrying the ClientHello
    assert_eq!(server.await.unwrap(), 0x16);
}

#[test]
fn transport_defaults_to_smtp() {
    let dispatcher: Dispatcher<SmtpTransport> =
        Dispatcher::new(Arc::new(ProviderRegistry::builtin().unwrap()), "yandex").unwrap();
    assert_eq!(dispatcher.provider(), "yandex");
    assert_eq!(dispatcher.provider_config().unwrap().port, 465);
}
