//! SMTP provider registry.
//!
//! Providers are described in YAML, keyed by name:
//!
//! ```yaml
//! gmail:
//!   server: smtp.gmail.com
//!   port: 587
//!   tls: true
//! ```
//!
//! `server` and `port` are required; `ssl` and `tls` default to `false`.
//! Incomplete entries fail when the registry is loaded, not when it is used.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, Error, Result};

/// Provider file shipped with the crate.
const BUILTIN_PROVIDERS: &str = include_str!("../providers.yml");

/// How the session to a provider is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// TLS from the first byte (`ssl: true`).
    Tls,
    /// Plain connection upgraded with STARTTLS (`tls: true`).
    StartTls,
    /// No encryption.
    None,
}

/// Connection parameters for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Registry key.
    pub name: String,
    /// SMTP server hostname.
    pub server: String,
    /// SMTP server port.
    pub port: u16,
    /// Connect with implicit TLS.
    pub ssl: bool,
    /// Upgrade a plain connection with STARTTLS.
    pub tls: bool,
}

impl ProviderConfig {
    /// Returns the effective security mode. `ssl` wins over `tls`.
    #[must_use]
    pub const fn security(&self) -> Security {
        match (self.ssl, self.tls) {
            (true, _) => Security::Tls,
            (false, true) => Security::StartTls,
            (false, false) => Security::None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderEntry {
    server: Option<String>,
    port: Option<u16>,
    #[serde(default)]
    ssl: bool,
    #[serde(default)]
    tls: bool,
}

impl ProviderEntry {
    fn into_config(self, name: String) -> std::result::Result<ProviderConfig, ConfigError> {
        let missing = |field| ConfigError::MissingField {
            provider: name.clone(),
            field,
        };

        let server = self.server.ok_or_else(|| missing("server"))?;
        let port = self.port.ok_or_else(|| missing("port"))?;
        if port == 0 {
            return Err(ConfigError::InvalidPort(name));
        }

        Ok(ProviderConfig {
            name,
            server,
            port,
            ssl: self.ssl,
            tls: self.tls,
        })
    }
}

/// Immutable set of providers, loaded once and shared between dispatchers.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    /// Loads the providers bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled file is malformed.
    pub fn builtin() -> std::result::Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_PROVIDERS)
    }

    /// Loads providers from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or any entry is incomplete.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading provider file");
        Self::from_yaml_str(&text)
    }

    /// Parses providers from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a mapping of provider entries or
    /// any entry lacks `server` or `port`.
    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        // `~` or a document of only comments is null rather than a mapping
        let entries: Option<BTreeMap<String, ProviderEntry>> = serde_yaml::from_str(text)?;

        let providers = entries
            .unwrap_or_default()
            .into_iter()
            .map(|(name, entry)| Ok((name.clone(), entry.into_config(name)?)))
            .collect::<std::result::Result<_, ConfigError>>()?;

        Ok(Self { providers })
    }

    /// Builds a registry from already-validated configurations.
    #[must_use]
    pub fn from_providers(providers: impl IntoIterator<Item = ProviderConfig>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|provider| (provider.name.clone(), provider))
                .collect(),
        }
    }

    /// Looks up a provider by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProvider`] if no provider has that name.
    pub fn lookup(&self, name: &str) -> Result<&ProviderConfig> {
        self.providers
            .get(name)
            .ok_or_else(|| Error::UnknownProvider(name.to_string()))
    }

    /// Checks whether a provider is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Provider names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Number of providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
