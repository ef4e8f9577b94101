// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session lifecycle.
//!
//! [`SessionManager`] owns the single live session of a client. `connect`
//! runs the whole establishment pipeline as one unit:
//!
//! 1. validate the configuration
//! 2. look up the application certificate
//! 3. discover and select an endpoint
//! 4. create the session, with the trust policy installed when active
//! 5. attach the subscription shell to the new session
//!
//! A failure at any step leaves no session behind. Concurrent `connect` and
//! `disconnect` calls are serialized by a connection lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::endpoint::{EndpointDescription, EndpointResolver};
use crate::error::{
    ConfigurationError, OperationError, ProviderError, SecurityError, SessionError, TimeoutError,
    UaClientError, UaResult,
};
use crate::provider::{SecureChannelProvider, SessionChannel, SessionRequest, SubscriptionParameters};
use crate::subscription::SubscriptionManager;
use crate::trust::CertificateTrustPolicy;
use crate::types::{DataValue, NodeId, Variant};

// =============================================================================
// SessionState
// =============================================================================

/// State of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session.
    #[default]
    Disconnected,

    /// `connect` is running.
    Connecting,

    /// A session is open.
    Connected,

    /// The session is being closed.
    Closing,

    /// The last `connect` failed.
    Failed,
}

impl SessionState {
    /// Returns `true` if a session is open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if the state is transitional.
    #[inline]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Closing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Closing => write!(f, "Closing"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// ActiveSession
// =============================================================================

/// An open session.
pub struct ActiveSession {
    /// Server-assigned session ID.
    pub session_id: String,
    /// Endpoint the session runs on.
    pub endpoint: EndpointDescription,
    /// Whether the application certificate was available.
    pub have_application_certificate: bool,
    /// When the session was opened.
    pub connected_at: DateTime<Utc>,
    channel: Arc<dyn SessionChannel>,
}

impl ActiveSession {
    /// Returns the service channel of this session.
    pub fn channel(&self) -> &Arc<dyn SessionChannel> {
        &self.channel
    }
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("session_id", &self.session_id)
            .field("endpoint", &self.endpoint.endpoint_url)
            .field("security_level", &self.endpoint.security_level)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

// =============================================================================
// SessionManager
// =============================================================================

/// Owns the client's session.
pub struct SessionManager<P: SecureChannelProvider> {
    config: Arc<ClientConfig>,
    provider: Arc<P>,
    resolver: EndpointResolver<P>,
    subscriptions: Arc<SubscriptionManager>,
    connect_lock: Mutex<()>,
    state: RwLock<SessionState>,
    session: RwLock<Option<Arc<ActiveSession>>>,
    stats: SessionStats,
}

impl<P: SecureChannelProvider> SessionManager<P> {
    /// Creates a manager with no session.
    pub fn new(
        config: Arc<ClientConfig>,
        provider: Arc<P>,
        subscriptions: Arc<SubscriptionManager>,
    ) -> Self {
        Self {
            config,
            resolver: EndpointResolver::new(Arc::clone(&provider)),
            provider,
            subscriptions,
            connect_lock: Mutex::new(()),
            state: RwLock::new(SessionState::Disconnected),
            session: RwLock::new(None),
            stats: SessionStats::new(),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Returns the open session, if any.
    pub fn session(&self) -> Option<Arc<ActiveSession>> {
        self.session.read().clone()
    }

    /// Returns `true` if a session is open.
    pub fn is_connected(&self) -> bool {
        self.session.read().is_some()
    }

    /// Returns the session statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Connects to the server at `address`.
    ///
    /// An existing session is closed first. On failure the error is logged
    /// and returned, and no session is retained.
    ///
    /// # Cancellation
    ///
    /// Dropping the returned future before it completes leaves no session
    /// and moves the state to [`SessionState::Failed`]. A channel that was
    /// already opened is dropped without a `close` call; the next `connect`
    /// or `disconnect` detaches any subscription left on it.
    pub async fn connect(&self, address: &str) -> UaResult<Arc<ActiveSession>> {
        let _guard = self.connect_lock.lock().await;
        self.stats.record_attempt();

        self.teardown().await;
        self.set_state(SessionState::Connecting);
        let mut attempt = ConnectAttempt::new(self, address);

        match self.establish(address).await {
            Ok(session) => {
                self.subscriptions
                    .attach(
                        Arc::clone(&session.channel),
                        SubscriptionParameters {
                            publishing_interval: self.config.publishing_interval,
                        },
                        self.config.operation_timeout,
                    )
                    .await;

                *self.session.write() = Some(Arc::clone(&session));
                attempt.finish();
                self.stats.record_connect();
                self.set_state(SessionState::Connected);

                tracing::info!(
                    address = %address,
                    endpoint = %session.endpoint.endpoint_url,
                    session_id = %session.session_id,
                    security_policy = %session.endpoint.security_policy,
                    "Connected to OPC UA server"
                );
                Ok(session)
            }
            Err(e) => {
                attempt.finish();
                self.stats.record_failure();
                self.set_state(SessionState::Failed);
                e.log("connect");
                Err(e)
            }
        }
    }

    /// Closes the session, deleting the server subscription first.
    ///
    /// Close failures are logged; the session is dropped regardless.
    pub async fn disconnect(&self) {
        let _guard = self.connect_lock.lock().await;
        self.teardown().await;
        self.set_state(SessionState::Disconnected);
    }

    /// Reads the value of a node.
    pub async fn read_value(&self, node_address: &str) -> UaResult<DataValue> {
        let session = self.session().ok_or(UaClientError::NotConnected)?;
        let node_id: NodeId = node_address.parse()?;
        let timeout = self.config.operation_timeout;

        match tokio::time::timeout(timeout, session.channel.read_value(&node_id)).await {
            Ok(Ok(value)) => {
                tracing::trace!(node_id = %node_id, status = %value.status, "Read value");
                Ok(value)
            }
            Ok(Err(e)) => Err(OperationError::read_failed(node_id.to_string(), e).into()),
            Err(_) => Err(TimeoutError::Read { duration: timeout }.into()),
        }
    }

    /// Writes the value of a node.
    ///
    /// Returns `true` iff the server reports a Good status for the write.
    /// A non-Good status is logged and reported as `false`.
    pub async fn write_value(&self, node_address: &str, value: Variant) -> UaResult<bool> {
        let session = self.session().ok_or(UaClientError::NotConnected)?;
        let node_id: NodeId = node_address.parse()?;
        let timeout = self.config.operation_timeout;
        let request = [(node_id.clone(), value)];

        let statuses = match tokio::time::timeout(timeout, session.channel.write_values(&request))
            .await
        {
            Ok(Ok(statuses)) => statuses,
            Ok(Err(e)) => {
                return Err(OperationError::write_failed(node_id.to_string(), e).into());
            }
            Err(_) => return Err(TimeoutError::Write { duration: timeout }.into()),
        };

        let status = statuses.first().copied().ok_or_else(|| {
            OperationError::MissingWriteResult {
                node_id: node_id.to_string(),
            }
        })?;

        if status.is_good() {
            tracing::debug!(node_id = %node_id, "Write accepted");
        } else {
            tracing::warn!(node_id = %node_id, status = %status, "Write rejected");
        }
        Ok(status.is_good())
    }

    async fn establish(&self, address: &str) -> UaResult<Arc<ActiveSession>> {
        self.config.validate()?;

        let have_certificate = self
            .provider
            .find_application_certificate(&self.config)
            .await
            .map_err(|source| ConfigurationError::CertificateStore { source })?;

        if !have_certificate {
            tracing::warn!(
                subject = %self.config.subject_name(),
                store = %self.config.security.application_certificate,
                "Application certificate not found, preferring the least secure endpoint"
            );
        }

        let policy = CertificateTrustPolicy::new(&self.config, have_certificate);
        let endpoint = self
            .resolver
            .resolve(&self.config, address, have_certificate)
            .await?;

        let request = SessionRequest {
            config: Arc::clone(&self.config),
            endpoint: endpoint.clone(),
            session_name: self.config.session_name.clone(),
            session_timeout: self.config.session_timeout,
            operation_timeout: self.config.operation_timeout,
            validator: policy.validator(),
        };

        let timeout = self.config.operation_timeout;
        let url = endpoint.endpoint_url.clone();
        let channel = match tokio::time::timeout(timeout, self.provider.create_session(request))
            .await
        {
            Ok(Ok(channel)) => channel,
            Ok(Err(ProviderError::CertificateRejected { subject, status })) => {
                return Err(SessionError::certificate_rejected(
                    url,
                    SecurityError::certificate_rejected(subject, status),
                )
                .into());
            }
            Ok(Err(e)) => {
                tracing::error!(endpoint = %url, error = %e, "Session creation failed");
                return Err(SessionError::establishment_failed(url, e).into());
            }
            Err(_) => return Err(SessionError::timed_out(url, timeout).into()),
        };

        Ok(Arc::new(ActiveSession {
            session_id: channel.session_id(),
            endpoint,
            have_application_certificate: have_certificate,
            connected_at: Utc::now(),
            channel,
        }))
    }

    async fn teardown(&self) {
        let previous = self.session.write().take();
        if previous.is_some() {
            self.set_state(SessionState::Closing);
        }

        // A cancelled connect can leave the subscriptions attached to a
        // channel that was never stored.
        self.subscriptions.detach().await;

        let Some(session) = previous else {
            return;
        };

        let timeout = self.config.operation_timeout;
        match tokio::time::timeout(timeout, session.channel.close()).await {
            Ok(Ok(())) => {
                tracing::info!(session_id = %session.session_id, "Session closed");
            }
            Ok(Err(e)) => {
                tracing::warn!(session_id = %session.session_id, error = %e, "Session close failed");
            }
            Err(_) => {
                tracing::warn!(session_id = %session.session_id, "Session close timed out");
            }
        }
        self.stats.record_disconnect();
    }

    fn set_state(&self, new_state: SessionState) {
        let old_state = std::mem::replace(&mut *self.state.write(), new_state);
        if old_state != new_state {
            tracing::trace!(
                old_state = %old_state,
                new_state = %new_state,
                "Session state changed"
            );
        }
    }
}

/// Marks a `connect` that was dropped mid-flight as failed.
struct ConnectAttempt<'a, P: SecureChannelProvider> {
    manager: &'a SessionManager<P>,
    address: &'a str,
    finished: bool,
}

impl<'a, P: SecureChannelProvider> ConnectAttempt<'a, P> {
    fn new(manager: &'a SessionManager<P>, address: &'a str) -> Self {
        Self {
            manager,
            address,
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl<P: SecureChannelProvider> Drop for ConnectAttempt<'_, P> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.manager.stats.record_failure();
        self.manager.set_state(SessionState::Failed);
        tracing::warn!(address = %self.address, "Connect cancelled before completion");
    }
}

impl<P: SecureChannelProvider> fmt::Debug for SessionManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("session", &self.session())
            .finish()
    }
}

// =============================================================================
// SessionStats
// =============================================================================

/// Counters for session operations.
#[derive(Debug, Default)]
pub struct SessionStats {
    connect_attempts: AtomicU64,
    connects: AtomicU64,
    failures: AtomicU64,
    disconnects: AtomicU64,
}

impl SessionStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a connect attempt.
    pub fn record_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful connect.
    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed connect.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a closed session.
    pub fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of connect attempts.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    /// Returns the number of successful connects.
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Returns the number of failed connects.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the number of closed sessions.
    pub fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================
