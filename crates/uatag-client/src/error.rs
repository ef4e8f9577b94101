// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the OPC UA tag client.
//!
//! Errors are grouped by the lifecycle step that produced them, so callers can
//! tell a misconfiguration apart from an unreachable server or a rejected
//! certificate without string matching.
//!
//! # Error Categories
//!
//! ```text
//! UaClientError
//! ├── Configuration - Invalid identity, store or timeout settings
//! ├── Discovery     - Endpoint discovery failed or timed out
//! ├── Endpoint      - No endpoint matches the supported transport profile
//! ├── Session       - Session establishment failed (incl. certificate rejection)
//! ├── Security      - Certificate trust decisions
//! ├── Operation     - Read/write failures
//! ├── Subscription  - Subscription and monitored item failures
//! ├── Timeout       - Per-operation timeouts
//! └── NotConnected  - Operation attempted before a session exists
//! ```
//!
//! Failures reported by the [`SecureChannelProvider`](crate::provider::SecureChannelProvider)
//! are carried as [`ProviderError`] and kept as the `source` of the wrapping
//! error, so the original cause is never discarded.
//!
//! # Examples
//!
//! ```
//! use uatag_client::error::{DiscoveryError, ProviderError, UaClientError};
//!
//! let error = UaClientError::from(DiscoveryError::failed(
//!     "opc.tcp://10.0.0.5:4840",
//!     ProviderError::unreachable("connection refused"),
//! ));
//!
//! assert_eq!(error.category(), "discovery");
//! assert!(std::error::Error::source(&error).is_some());
//! ```

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::types::StatusCode;

// =============================================================================
// UaClientError - Main Error Type
// =============================================================================

/// The main error type for client operations.
#[derive(Debug, Error)]
pub enum UaClientError {
    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Endpoint discovery errors.
    #[error("{0}")]
    Discovery(#[from] DiscoveryError),

    /// Endpoint selection errors.
    #[error("{0}")]
    Endpoint(#[from] EndpointError),

    /// Session establishment errors.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Certificate trust errors.
    #[error("{0}")]
    Security(#[from] SecurityError),

    /// Read/write operation errors.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Subscription errors.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Per-operation timeouts.
    #[error("{0}")]
    Timeout(#[from] TimeoutError),

    /// An operation needed a live session but none exists.
    #[error("Not connected to an OPC UA server")]
    NotConnected,
}

impl UaClientError {
    /// Creates a not connected error.
    #[inline]
    pub fn not_connected() -> Self {
        Self::NotConnected
    }

    /// Returns `true` if retrying the whole operation may succeed.
    ///
    /// The client never retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Discovery(_) | Self::Timeout(_) | Self::NotConnected => true,
            Self::Session(e) => e.is_retryable(),
            Self::Operation(e) => e.is_retryable(),
            Self::Subscription(e) => e.is_retryable(),
            Self::Configuration(_) | Self::Endpoint(_) | Self::Security(_) => false,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Configuration(_) | Self::Endpoint(_) => ErrorSeverity::Critical,
            Self::Discovery(_) | Self::Session(_) | Self::Security(_) => ErrorSeverity::Error,
            Self::Operation(_) | Self::Subscription(_) => ErrorSeverity::Error,
            Self::Timeout(_) | Self::NotConnected => ErrorSeverity::Warning,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Discovery(_) => "discovery",
            Self::Endpoint(_) => "endpoint",
            Self::Session(_) => "session",
            Self::Security(_) => "security",
            Self::Operation(_) => "operation",
            Self::Subscription(_) => "subscription",
            Self::Timeout(_) => "timeout",
            Self::NotConnected => "connection",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Configuration(e) => e.error_code(),
            Self::Discovery(e) => e.error_code(),
            Self::Endpoint(e) => e.error_code(),
            Self::Session(e) => e.error_code(),
            Self::Security(e) => e.error_code(),
            Self::Operation(e) => e.error_code(),
            Self::Subscription(e) => e.error_code(),
            Self::Timeout(e) => e.error_code(),
            Self::NotConnected => ErrorCode::new(1, 1),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
        }
    }
}

// =============================================================================
// ProviderError
// =============================================================================

/// Failure reported by the secure channel provider.
///
/// The provider owns the wire protocol, so these errors describe what went
/// wrong below the session layer. The client wraps them into the lifecycle
/// error for the step that was running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The remote host could not be reached.
    #[error("unreachable: {message}")]
    Unreachable {
        /// Transport message.
        message: String,
    },

    /// The server answered with something the provider could not handle.
    #[error("protocol error: {message}")]
    Protocol {
        /// Protocol message.
        message: String,
    },

    /// The server certificate was rejected by the trust policy.
    #[error("server certificate rejected: {subject}")]
    CertificateRejected {
        /// Subject of the rejected certificate.
        subject: String,
        /// Validation status that caused the rejection.
        status: StatusCode,
    },

    /// The server rejected the client's identity.
    #[error("authentication rejected: {message}")]
    AuthenticationRejected {
        /// Server message.
        message: String,
    },

    /// A service call returned a bad service result.
    #[error("service fault: {status}")]
    ServiceFault {
        /// Service result.
        status: StatusCode,
    },

    /// The channel was closed while a request was in flight.
    #[error("channel closed")]
    Closed,

    /// Certificate store access failed.
    #[error("certificate store '{store}': {message}")]
    Store {
        /// Store path.
        store: String,
        /// Failure message.
        message: String,
    },
}

impl ProviderError {
    /// Creates an unreachable error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a certificate rejection.
    pub fn certificate_rejected(subject: impl Into<String>, status: StatusCode) -> Self {
        Self::CertificateRejected {
            subject: subject.into(),
            status,
        }
    }

    /// Creates an authentication rejection.
    pub fn authentication_rejected(message: impl Into<String>) -> Self {
        Self::AuthenticationRejected {
            message: message.into(),
        }
    }

    /// Creates a service fault.
    pub fn service_fault(status: StatusCode) -> Self {
        Self::ServiceFault { status }
    }

    /// Creates a certificate store error.
    pub fn store(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the failure is likely transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Closed)
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration errors. Never retryable.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid endpoint or discovery URL.
    #[error("Invalid endpoint URL: '{url}' - {reason}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// Invalid node ID.
    #[error("Invalid node ID format: '{node_id}' - {reason}")]
    InvalidNodeId {
        /// The invalid node ID.
        node_id: String,
        /// Reason.
        reason: String,
    },

    /// Invalid application identity.
    #[error("Invalid application identity: {reason}")]
    InvalidIdentity {
        /// Reason.
        reason: String,
    },

    /// Invalid certificate store location.
    #[error("Invalid certificate store '{store}': {reason}")]
    InvalidStore {
        /// Logical store name.
        store: String,
        /// Reason.
        reason: String,
    },

    /// Invalid timeout or interval.
    #[error("Invalid {field}: {duration:?} ({reason})")]
    InvalidTimeout {
        /// Setting name.
        field: String,
        /// Offending value.
        duration: Duration,
        /// Reason.
        reason: String,
    },

    /// Invalid security setting.
    #[error("Invalid security configuration: {message}")]
    InvalidSecurity {
        /// Description.
        message: String,
    },

    /// Missing required field.
    #[error("Missing required configuration: {field}")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// The application certificate store could not be read.
    #[error("Application certificate lookup failed: {source}")]
    CertificateStore {
        /// Provider failure.
        #[source]
        source: ProviderError,
    },

    /// Configuration file could not be read.
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// I/O error.
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        /// File format.
        format: &'static str,
        /// Parser message.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid node ID error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid identity error.
    pub fn invalid_identity(reason: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            reason: reason.into(),
        }
    }

    /// Creates an invalid store error.
    pub fn invalid_store(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStore {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid timeout error.
    pub fn invalid_timeout(
        field: impl Into<String>,
        duration: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTimeout {
            field: field.into(),
            duration,
            reason: reason.into(),
        }
    }

    /// Creates an invalid security error.
    pub fn invalid_security(message: impl Into<String>) -> Self {
        Self::InvalidSecurity {
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidEndpoint { .. } => ErrorCode::new(8, 1),
            Self::InvalidNodeId { .. } => ErrorCode::new(8, 2),
            Self::InvalidIdentity { .. } => ErrorCode::new(8, 3),
            Self::InvalidStore { .. } => ErrorCode::new(8, 4),
            Self::InvalidTimeout { .. } => ErrorCode::new(8, 5),
            Self::InvalidSecurity { .. } => ErrorCode::new(8, 6),
            Self::MissingField { .. } => ErrorCode::new(8, 7),
            Self::CertificateStore { .. } => ErrorCode::new(8, 8),
            Self::Io { .. } => ErrorCode::new(8, 9),
            Self::Parse { .. } => ErrorCode::new(8, 10),
        }
    }
}

// =============================================================================
// DiscoveryError
// =============================================================================

/// Endpoint discovery errors.
///
/// Fatal for the current connect attempt; the caller may retry `connect`.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The discovery call failed.
    #[error("Endpoint discovery failed at '{address}': {source}")]
    Failed {
        /// Discovery address.
        address: String,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },

    /// The discovery call did not finish in time.
    #[error("Endpoint discovery at '{address}' timed out after {duration:?}")]
    TimedOut {
        /// Discovery address.
        address: String,
        /// Configured timeout.
        duration: Duration,
    },
}

impl DiscoveryError {
    /// Creates a discovery failure.
    pub fn failed(address: impl Into<String>, source: ProviderError) -> Self {
        Self::Failed {
            address: address.into(),
            source,
        }
    }

    /// Creates a discovery timeout.
    pub fn timed_out(address: impl Into<String>, duration: Duration) -> Self {
        Self::TimedOut {
            address: address.into(),
            duration,
        }
    }

    /// Returns the discovery address.
    pub fn address(&self) -> &str {
        match self {
            Self::Failed { address, .. } | Self::TimedOut { address, .. } => address,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Failed { .. } => ErrorCode::new(2, 1),
            Self::TimedOut { .. } => ErrorCode::new(2, 2),
        }
    }
}

// =============================================================================
// EndpointError
// =============================================================================

/// Endpoint selection errors.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// None of the discovered endpoints uses the supported transport profile.
    #[error(
        "No compatible endpoint at '{address}': {candidates} endpoint(s) offered, none uses '{transport_profile}'"
    )]
    NoCompatibleEndpoint {
        /// Discovery address.
        address: String,
        /// Required transport profile URI.
        transport_profile: String,
        /// Number of endpoints the server offered.
        candidates: usize,
    },
}

impl EndpointError {
    /// Creates a no compatible endpoint error.
    pub fn no_compatible(
        address: impl Into<String>,
        transport_profile: impl Into<String>,
        candidates: usize,
    ) -> Self {
        Self::NoCompatibleEndpoint {
            address: address.into(),
            transport_profile: transport_profile.into(),
            candidates,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NoCompatibleEndpoint { .. } => ErrorCode::new(3, 1),
        }
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Session establishment errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session creation failed in the transport or on the server.
    #[error("Failed to establish session with '{endpoint}': {source}")]
    EstablishmentFailed {
        /// Selected endpoint URL.
        endpoint: String,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },

    /// The handshake was aborted because the server certificate was not accepted.
    #[error("Failed to establish session with '{endpoint}': {source}")]
    CertificateRejected {
        /// Selected endpoint URL.
        endpoint: String,
        /// Trust failure.
        #[source]
        source: SecurityError,
    },

    /// Session creation did not finish in time.
    #[error("Session creation with '{endpoint}' timed out after {duration:?}")]
    TimedOut {
        /// Selected endpoint URL.
        endpoint: String,
        /// Operation timeout.
        duration: Duration,
    },
}

impl SessionError {
    /// Creates an establishment failure.
    pub fn establishment_failed(endpoint: impl Into<String>, source: ProviderError) -> Self {
        Self::EstablishmentFailed {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates a certificate rejection failure.
    pub fn certificate_rejected(endpoint: impl Into<String>, source: SecurityError) -> Self {
        Self::CertificateRejected {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates a session timeout.
    pub fn timed_out(endpoint: impl Into<String>, duration: Duration) -> Self {
        Self::TimedOut {
            endpoint: endpoint.into(),
            duration,
        }
    }

    /// Returns `true` if the failure may be transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EstablishmentFailed { source, .. } => source.is_transient(),
            Self::CertificateRejected { .. } => false,
            Self::TimedOut { .. } => true,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::EstablishmentFailed { .. } => ErrorCode::new(4, 1),
            Self::CertificateRejected { .. } => ErrorCode::new(4, 2),
            Self::TimedOut { .. } => ErrorCode::new(4, 3),
        }
    }
}

// =============================================================================
// SecurityError
// =============================================================================

/// Certificate trust errors.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// The trust policy refused the server certificate.
    #[error("Server certificate '{subject}' rejected ({status})")]
    CertificateRejected {
        /// Certificate subject.
        subject: String,
        /// Validation status.
        status: StatusCode,
    },
}

impl SecurityError {
    /// Creates a certificate rejected error.
    pub fn certificate_rejected(subject: impl Into<String>, status: StatusCode) -> Self {
        Self::CertificateRejected {
            subject: subject.into(),
            status,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CertificateRejected { .. } => ErrorCode::new(5, 1),
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Read/write operation errors.
///
/// A write the server rejects with a non-Good status is not an error; it is
/// reported as `false` by `write_value`.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The read request failed.
    #[error("Read failed for node '{node_id}': {source}")]
    ReadFailed {
        /// Node ID.
        node_id: String,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },

    /// The write request failed before the server produced a status.
    #[error("Write failed for node '{node_id}': {source}")]
    WriteFailed {
        /// Node ID.
        node_id: String,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },

    /// The server returned no result for the written item.
    #[error("Write for node '{node_id}' returned no status")]
    MissingWriteResult {
        /// Node ID.
        node_id: String,
    },
}

impl OperationError {
    /// Creates a read failure.
    pub fn read_failed(node_id: impl Into<String>, source: ProviderError) -> Self {
        Self::ReadFailed {
            node_id: node_id.into(),
            source,
        }
    }

    /// Creates a write failure.
    pub fn write_failed(node_id: impl Into<String>, source: ProviderError) -> Self {
        Self::WriteFailed {
            node_id: node_id.into(),
            source,
        }
    }

    /// Returns `true` if the failure may be transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ReadFailed { source, .. } | Self::WriteFailed { source, .. } => {
                source.is_transient()
            }
            Self::MissingWriteResult { .. } => false,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ReadFailed { .. } => ErrorCode::new(6, 1),
            Self::WriteFailed { .. } => ErrorCode::new(6, 2),
            Self::MissingWriteResult { .. } => ErrorCode::new(6, 3),
        }
    }
}

// =============================================================================
// SubscriptionError
// =============================================================================

/// Subscription errors.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Subscription creation failed on the server.
    #[error("Failed to create subscription: {source}")]
    CreationFailed {
        /// Provider failure.
        #[source]
        source: ProviderError,
    },

    /// Monitored item creation failed on the server.
    #[error("Failed to create {count} monitored item(s): {source}")]
    MonitoredItemsFailed {
        /// Number of items submitted.
        count: usize,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },
}

impl SubscriptionError {
    /// Creates a subscription creation failure.
    pub fn creation_failed(source: ProviderError) -> Self {
        Self::CreationFailed { source }
    }

    /// Creates a monitored item failure.
    pub fn monitored_items_failed(count: usize, source: ProviderError) -> Self {
        Self::MonitoredItemsFailed { count, source }
    }

    /// Returns `true` if the failure may be transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CreationFailed { source } | Self::MonitoredItemsFailed { source, .. } => {
                source.is_transient()
            }
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CreationFailed { .. } => ErrorCode::new(7, 1),
            Self::MonitoredItemsFailed { .. } => ErrorCode::new(7, 2),
        }
    }
}

// =============================================================================
// TimeoutError
// =============================================================================

/// Per-operation timeouts on an established session.
#[derive(Debug, Error)]
pub enum TimeoutError {
    /// Read timed out.
    #[error("Read operation timed out after {duration:?}")]
    Read {
        /// Timeout duration.
        duration: Duration,
    },

    /// Write timed out.
    #[error("Write operation timed out after {duration:?}")]
    Write {
        /// Timeout duration.
        duration: Duration,
    },

    /// Subscription call timed out.
    #[error("Subscription request timed out after {duration:?}")]
    Subscription {
        /// Timeout duration.
        duration: Duration,
    },
}

impl TimeoutError {
    /// Returns the timeout duration.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Read { duration } | Self::Write { duration } | Self::Subscription { duration } => {
                *duration
            }
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::new(9, 1),
            Self::Write { .. } => ErrorCode::new(9, 2),
            Self::Subscription { .. } => ErrorCode::new(9, 3),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code.
///
/// Format: `UA-XXYY` where XX is the category and YY the specific error.
///
/// Categories:
/// - 1: Connection
/// - 2: Discovery
/// - 3: Endpoint
/// - 4: Session
/// - 5: Security
/// - 6: Operation
/// - 7: Subscription
/// - 8: Configuration
/// - 9: Timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category.
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with [`UaClientError`].
pub type UaResult<T> = Result<T, UaClientError>;

// =============================================================================
// Tests
// =============================================================================
