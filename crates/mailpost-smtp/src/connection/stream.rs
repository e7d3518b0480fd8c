//! Byte stream under the SMTP session, plain or TLS.

use std::sync::{Arc, LazyLock};

use rustls::pki_types::ServerName;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::debug;

use crate::error::{Error, Result};

/// Longest reply line accepted before the server is considered broken.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Client TLS configuration trusting the bundled webpki roots, built once.
static TLS_CONFIG: LazyLock<Arc<ClientConfig>> = LazyLock::new(|| {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
});

/// Buffered connection to the server.
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP.
    Tcp(BufReader<TcpStream>),
    /// TLS, either implicit or after STARTTLS.
    Tls(Box<BufReader<TlsStream<TcpStream>>>),
}

impl SmtpStream {
    fn reader(&mut self) -> &mut (dyn AsyncBufRead + Send + Unpin) {
        match self {
            Self::Tcp(reader) => reader,
            Self::Tls(reader) => reader.as_mut(),
        }
    }

    fn writer(&mut self) -> &mut (dyn AsyncWrite + Send + Unpin) {
        match self {
            Self::Tcp(reader) => reader.get_mut(),
            Self::Tls(reader) => reader.get_mut(),
        }
    }

    /// Reads one line with the trailing CRLF stripped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] at end of stream, a protocol
    /// error for an oversized line, or an I/O error.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        // One byte past the cap is enough to tell an oversized line apart
        let mut bounded = self.reader().take(MAX_LINE_LENGTH as u64 + 1);
        if bounded.read_line(&mut line).await? == 0 {
            return Err(Error::ConnectionClosed);
        }
        if line.len() > MAX_LINE_LENGTH {
            return Err(Error::Protocol("reply line too long".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes `data` and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let writer = self.writer();
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    /// True once the session runs over TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Performs the TLS handshake on a plain stream (STARTTLS).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already TLS or the handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let Self::Tcp(reader) = self else {
            return Err(Error::Protocol("stream is already TLS".into()));
        };
        secure(hostname, reader.into_inner()).await
    }
}

/// Opens a plain TCP connection.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(hostname: &str, port: u16) -> Result<SmtpStream> {
    debug!(host = hostname, port, "connecting");
    let tcp = TcpStream::connect((hostname, port)).await?;
    Ok(SmtpStream::Tcp(BufReader::new(tcp)))
}

/// Opens a connection with implicit TLS (usually port 465).
///
/// # Errors
///
/// Returns an error if the connection or the TLS handshake fails.
pub async fn connect_tls(hostname: &str, port: u16) -> Result<SmtpStream> {
    debug!(host = hostname, port, "connecting with implicit TLS");
    let tcp = TcpStream::connect((hostname, port)).await?;
    secure(hostname, tcp).await
}

async fn secure(hostname: &str, tcp: TcpStream) -> Result<SmtpStream> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("invalid TLS server name: {hostname}")))?;

    let tls = TlsConnector::from(Arc::clone(&TLS_CONFIG))
        .connect(server_name, tcp)
        .await?;
    Ok(SmtpStream::Tls(Box::new(BufReader::new(tls))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn read_line_strips_crlf_and_detects_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"220 ready\r\n").await.unwrap();
        });

        let mut stream = connect("127.0.0.1", port).await.unwrap();
        assert!(!stream.is_tls());
        assert_eq!(stream.read_line().await.unwrap(), "220 ready");
        server.await.unwrap();
        assert!(matches!(
            stream.read_line().await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn endless_line_is_cut_off_at_the_cap() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // No newline ever arrives; the server keeps the socket open
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let chunk = vec![b'x'; 8 * 1024];
            while socket.write_all(&chunk).await.is_ok() {}
        });

        let mut stream = connect("127.0.0.1", port).await.unwrap();
        let err = stream.read_line().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(msg) if msg == "reply line too long"));

        drop(stream);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn invalid_hostname_is_rejected_before_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        let stream = connect("127.0.0.1", port).await.unwrap();
        let err = stream.upgrade_to_tls("not a hostname!").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        server.await.unwrap().unwrap();
    }
}
