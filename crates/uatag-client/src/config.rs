// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client configuration.
//!
//! A [`ClientConfig`] describes the application identity, the four certificate
//! trust lists, the transport timeouts and the auto-accept flag. It is built
//! once, validated, and then shared read-only by every connection attempt.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use uatag_client::config::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .application_name("Line 4 collector")
//!     .pki_root("/var/lib/uatag/pki")
//!     .operation_timeout(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//!
//! assert!(config.security.auto_accept_untrusted_certificates);
//! assert_eq!(config.security.trusted_peer_certificates.path, "/var/lib/uatag/pki/trusted");
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, UaResult};

/// Minimum nonce length accepted for secure channels.
pub const MIN_NONCE_LENGTH: u32 = 32;

// =============================================================================
// ApplicationType
// =============================================================================

/// Role the application announces to servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    /// Server.
    Server,
    /// Client.
    #[default]
    Client,
    /// Client and server.
    ClientAndServer,
    /// Discovery server.
    DiscoveryServer,
}

// =============================================================================
// CertificateStoreIdentifier
// =============================================================================

/// Kind of backing store for a certificate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStoreType {
    /// A directory of DER/PEM files.
    #[default]
    Directory,
    /// The operating system certificate store.
    System,
}

impl fmt::Display for CertificateStoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => write!(f, "Directory"),
            Self::System => write!(f, "System"),
        }
    }
}

/// Location of one certificate list.
///
/// The client never opens the store itself; the identifier is handed to the
/// secure channel provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateStoreIdentifier {
    /// Store type.
    #[serde(default)]
    pub store_type: CertificateStoreType,
    /// Store path.
    pub path: String,
}

impl CertificateStoreIdentifier {
    /// Creates a directory store identifier.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            store_type: CertificateStoreType::Directory,
            path: path.into(),
        }
    }
}

impl fmt::Display for CertificateStoreIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.store_type, self.path)
    }
}

// =============================================================================
// SecurityConfig
// =============================================================================

/// Certificate stores and trust settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Store holding the application's own certificate.
    #[serde(default = "default_own_store")]
    pub application_certificate: CertificateStoreIdentifier,

    /// Trusted peer certificates.
    #[serde(default = "default_trusted_store")]
    pub trusted_peer_certificates: CertificateStoreIdentifier,

    /// Trusted issuer (CA) certificates.
    #[serde(default = "default_issuer_store")]
    pub trusted_issuer_certificates: CertificateStoreIdentifier,

    /// Where rejected server certificates are written.
    #[serde(default = "default_rejected_store")]
    pub rejected_certificate_store: CertificateStoreIdentifier,

    /// Nonce length for secure channel handshakes.
    #[serde(default = "default_nonce_length")]
    pub nonce_length: u32,

    /// Accept server certificates whose only failure is being untrusted.
    #[serde(default = "default_auto_accept")]
    pub auto_accept_untrusted_certificates: bool,
}

fn default_own_store() -> CertificateStoreIdentifier {
    CertificateStoreIdentifier::directory("./pki/own")
}

fn default_trusted_store() -> CertificateStoreIdentifier {
    CertificateStoreIdentifier::directory("./pki/trusted")
}

fn default_issuer_store() -> CertificateStoreIdentifier {
    CertificateStoreIdentifier::directory("./pki/issuers")
}

fn default_rejected_store() -> CertificateStoreIdentifier {
    CertificateStoreIdentifier::directory("./pki/rejected")
}

fn default_nonce_length() -> u32 {
    MIN_NONCE_LENGTH
}

fn default_auto_accept() -> bool {
    true
}

impl SecurityConfig {
    /// Places all four stores under a common root directory.
    pub fn under_root(root: impl AsRef<str>) -> Self {
        let root = root.as_ref().trim_end_matches('/');
        Self {
            application_certificate: CertificateStoreIdentifier::directory(format!("{root}/own")),
            trusted_peer_certificates: CertificateStoreIdentifier::directory(format!(
                "{root}/trusted"
            )),
            trusted_issuer_certificates: CertificateStoreIdentifier::directory(format!(
                "{root}/issuers"
            )),
            rejected_certificate_store: CertificateStoreIdentifier::directory(format!(
                "{root}/rejected"
            )),
            ..Self::default()
        }
    }

    fn stores(&self) -> [(&'static str, &CertificateStoreIdentifier); 4] {
        [
            ("application_certificate", &self.application_certificate),
            ("trusted_peer_certificates", &self.trusted_peer_certificates),
            ("trusted_issuer_certificates", &self.trusted_issuer_certificates),
            ("rejected_certificate_store", &self.rejected_certificate_store),
        ]
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            application_certificate: default_own_store(),
            trusted_peer_certificates: default_trusted_store(),
            trusted_issuer_certificates: default_issuer_store(),
            rejected_certificate_store: default_rejected_store(),
            nonce_length: default_nonce_length(),
            auto_accept_untrusted_certificates: default_auto_accept(),
        }
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Client application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Application name.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Application URI.
    #[serde(default = "default_application_uri")]
    pub application_uri: String,

    /// Product URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_uri: Option<String>,

    /// Host name used in the certificate subject. Taken from the environment
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,

    /// Application type.
    #[serde(default)]
    pub application_type: ApplicationType,

    /// Session name presented to the server.
    #[serde(default = "default_session_name")]
    pub session_name: String,

    /// Certificate stores and trust settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Timeout for each service call.
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// Requested session timeout.
    #[serde(default = "default_session_timeout", with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Timeout for the discovery call made by `connect`.
    #[serde(default = "default_discovery_timeout", with = "humantime_serde")]
    pub discovery_timeout: Duration,

    /// Publishing interval of the default subscription.
    #[serde(default = "default_publishing_interval", with = "humantime_serde")]
    pub publishing_interval: Duration,
}

fn default_application_name() -> String {
    "uatag client".to_string()
}

fn default_application_uri() -> String {
    "urn:localhost:uatag:client".to_string()
}

fn default_session_name() -> String {
    "uatag client".to_string()
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_discovery_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_publishing_interval() -> Duration {
    Duration::from_millis(1000)
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Loads a configuration file. `.toml` files are parsed as TOML, anything
    /// else as YAML. The result is validated.
    pub fn from_file(path: impl AsRef<Path>) -> UaResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(content: &str) -> UaResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ConfigurationError::parse("YAML", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> UaResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigurationError::parse("TOML", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates this configuration.
    pub fn validate(&self) -> UaResult<()> {
        if self.application_name.trim().is_empty() {
            return Err(ConfigurationError::invalid_identity("Application name is empty").into());
        }

        match self.application_uri.split_once(':') {
            Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {}
            _ => {
                return Err(ConfigurationError::invalid_identity(format!(
                    "Application URI '{}' has no scheme",
                    self.application_uri
                ))
                .into());
            }
        }

        if self.session_name.trim().is_empty() {
            return Err(ConfigurationError::missing_field("session_name").into());
        }

        for (name, store) in self.security.stores() {
            if store.path.trim().is_empty() {
                return Err(ConfigurationError::invalid_store(name, "Store path is empty").into());
            }
        }

        if self.security.nonce_length < MIN_NONCE_LENGTH {
            return Err(ConfigurationError::invalid_security(format!(
                "Nonce length {} is below the minimum of {}",
                self.security.nonce_length, MIN_NONCE_LENGTH
            ))
            .into());
        }

        let timeouts = [
            ("operation_timeout", self.operation_timeout),
            ("session_timeout", self.session_timeout),
            ("discovery_timeout", self.discovery_timeout),
            ("publishing_interval", self.publishing_interval),
        ];
        for (field, duration) in timeouts {
            if duration.is_zero() {
                return Err(ConfigurationError::invalid_timeout(
                    field,
                    duration,
                    "must be greater than 0",
                )
                .into());
            }
        }

        Ok(())
    }

    /// Returns the host name used for the certificate subject.
    ///
    /// Falls back to the machine name, and to `localhost` only when the
    /// machine name is unavailable.
    pub fn effective_host_name(&self) -> String {
        self.host_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(machine_host_name)
            .unwrap_or_else(|| "localhost".to_string())
    }

    /// Returns the application certificate subject name.
    pub fn subject_name(&self) -> String {
        format!(
            "CN={}, DC={}",
            self.application_name,
            self.effective_host_name()
        )
    }
}

fn machine_host_name() -> Option<String> {
    match gethostname::gethostname().into_string() {
        Ok(name) if !name.trim().is_empty() => Some(name),
        Ok(_) => None,
        Err(raw) => {
            tracing::warn!(host_name = ?raw, "Machine host name is not valid UTF-8");
            None
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application_name: default_application_name(),
            application_uri: default_application_uri(),
            product_uri: None,
            host_name: None,
            application_type: ApplicationType::default(),
            session_name: default_session_name(),
            security: SecurityConfig::default(),
            operation_timeout: default_operation_timeout(),
            session_timeout: default_session_timeout(),
            discovery_timeout: default_discovery_timeout(),
            publishing_interval: default_publishing_interval(),
        }
    }
}

// =============================================================================
// ClientConfigBuilder
// =============================================================================

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.config.application_name = name.into();
        self
    }

    /// Sets the application URI.
    pub fn application_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.application_uri = uri.into();
        self
    }

    /// Sets the product URI.
    pub fn product_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.product_uri = Some(uri.into());
        self
    }

    /// Sets the host name used in the certificate subject.
    pub fn host_name(mut self, host: impl Into<String>) -> Self {
        self.config.host_name = Some(host.into());
        self
    }

    /// Sets the session name.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.config.session_name = name.into();
        self
    }

    /// Places all certificate stores under `root`.
    pub fn pki_root(mut self, root: impl AsRef<str>) -> Self {
        let SecurityConfig {
            nonce_length,
            auto_accept_untrusted_certificates,
            ..
        } = self.config.security;
        self.config.security = SecurityConfig {
            nonce_length,
            auto_accept_untrusted_certificates,
            ..SecurityConfig::under_root(root)
        };
        self
    }

    /// Replaces the security section.
    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// Sets whether untrusted server certificates are accepted.
    pub fn auto_accept_untrusted(mut self, accept: bool) -> Self {
        self.config.security.auto_accept_untrusted_certificates = accept;
        self
    }

    /// Sets the nonce length.
    pub fn nonce_length(mut self, length: u32) -> Self {
        self.config.security.nonce_length = length;
        self
    }

    /// Sets the operation timeout.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    /// Sets the session timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout = timeout;
        self
    }

    /// Sets the discovery timeout.
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.discovery_timeout = timeout;
        self
    }

    /// Sets the publishing interval.
    pub fn publishing_interval(mut self, interval: Duration) -> Self {
        self.config.publishing_interval = interval;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> UaResult<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// Tests
// =============================================================================
