//! # mailpost-smtp
//!
//! A small SMTP submission client (RFC 5321) used by `mailpost` to hand a
//! finished message to a provider's relay.
//!
//! ## Features
//!
//! - **Type-state connection management**: the compiler rejects out-of-order
//!   commands such as `DATA` before `RCPT TO`
//! - **TLS support**: implicit TLS (port 465) and STARTTLS upgrade
//! - **Authentication**: PLAIN and LOGIN, picked from what the server advertises
//! - **Greeting**: EHLO with HELO fallback for servers without ESMTP
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost_smtp::{Address, Client};
//! use mailpost_smtp::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> mailpost_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587).await?;
//!     let client = Client::from_stream(stream).await?;
//!
//!     let client = client.hello("client.example.com").await?;
//!     let client = client
//!         .starttls("smtp.example.com", "client.example.com")
//!         .await?;
//!     let client = client.authenticate("user@example.com", "password").await?;
//!
//!     let client = client.mail_from(Address::new("user@example.com")?).await?;
//!     let client = client.rcpt_to(Address::new("friend@example.com")?).await?;
//!     let client = client.data().await?;
//!     let client = client
//!         .send_message(b"Subject: Test\r\n\r\nHello, World!\r\n")
//!         .await?;
//!
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── authenticate() ──→ Authenticated ── mail_from() ──→ MailTransaction
//!                                                                       │
//!        Authenticated ←── send_message() ── Data ←── data() ── RecipientAdded
//! ```
//!
//! Any state can `quit()`. When the server rejects a command the client
//! sends a best-effort `QUIT` before handing back the error.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo,
    SmtpConnection,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyClass, ReplyCode};
