//! # mailpost-core
//!
//! The sending pipeline behind `mailpost`:
//!
//! - **Address validation** against the RFC 5322 `addr-spec` grammar
//! - **Body rendering** from markdown to HTML
//! - **Provider registry** loaded once from YAML
//! - **Dispatcher** that validates, renders, builds the MIME message and
//!   drives one SMTP session against the chosen provider
//!
//! ```ignore
//! use std::sync::Arc;
//! use mailpost_core::{Dispatcher, ProviderRegistry};
//!
//! let registry = Arc::new(ProviderRegistry::builtin()?);
//! let dispatcher = Dispatcher::new(registry, "gmail")?;
//! let result = dispatcher
//!     .send("me@gmail.com", "app-password", "you@example.com", "Hi", "# Hello")
//!     .await?;
//! assert_eq!(result.body, "<h1>Hello</h1>");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod address;
pub mod body;
mod dispatcher;
mod error;
pub mod message;
pub mod provider;
pub mod transport;

pub use address::{normalize_text, validate_email};
pub use body::render;
pub use dispatcher::Dispatcher;
pub use error::{ConfigError, Error, Result};
pub use message::{DispatchResult, EmailMessage, EmailRequest, Recipients};
pub use provider::{ProviderConfig, ProviderRegistry, Security};
pub use transport::{Credentials, SmtpTransport, Transport};
