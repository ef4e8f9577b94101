// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Secure channel provider abstraction.
//!
//! The client core never touches sockets, message encoding or certificate
//! files. Everything below the session lifecycle goes through
//! [`SecureChannelProvider`] (discovery, handshake, certificate stores) and
//! the [`SessionChannel`] it returns (service calls on one open session).
//!
//! This seam lets the lifecycle be tested against an in-memory provider and
//! lets applications plug in whichever OPC UA stack they deploy with.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::dispatch::{MonitoredItem, NotificationSink};
use crate::endpoint::EndpointDescription;
use crate::error::ProviderError;
use crate::trust::CertificateValidator;
use crate::types::{DataValue, NodeId, StatusCode, Variant};

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

// =============================================================================
// Requests
// =============================================================================

/// Arguments of a discovery call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    /// Discovery URL to query.
    pub discovery_url: String,
    /// Application URI of this client.
    pub application_uri: String,
    /// Timeout the provider should apply to the call.
    pub timeout: Duration,
}

/// Arguments of a session creation call.
#[derive(Clone)]
pub struct SessionRequest {
    /// Client configuration.
    pub config: Arc<ClientConfig>,
    /// Endpoint picked by the resolver.
    pub endpoint: EndpointDescription,
    /// Session name presented to the server.
    pub session_name: String,
    /// Requested session timeout.
    pub session_timeout: Duration,
    /// Timeout for each service call on the session.
    pub operation_timeout: Duration,
    /// Validator to consult when the server certificate fails validation.
    /// `None` means every failure is fatal.
    pub validator: Option<Arc<dyn CertificateValidator>>,
}

impl fmt::Debug for SessionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("endpoint", &self.endpoint.endpoint_url)
            .field("session_name", &self.session_name)
            .field("session_timeout", &self.session_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .field("validator", &self.validator)
            .finish()
    }
}

/// Parameters of the server-side subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionParameters {
    /// Requested publishing interval.
    pub publishing_interval: Duration,
}

/// A subscription created on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedSubscription {
    /// Server-assigned subscription ID.
    pub subscription_id: u32,
    /// Publishing interval the server granted.
    pub revised_publishing_interval: Duration,
}

// =============================================================================
// SecureChannelProvider
// =============================================================================

/// Discovery, handshake and certificate store access.
#[async_trait]
pub trait SecureChannelProvider: Send + Sync + 'static {
    /// Returns `true` if the application instance certificate exists in the
    /// configured own-certificate store.
    async fn find_application_certificate(&self, config: &ClientConfig) -> ProviderResult<bool>;

    /// Queries a discovery service for its endpoints, in server order.
    async fn get_endpoints(
        &self,
        request: &DiscoveryRequest,
    ) -> ProviderResult<Vec<EndpointDescription>>;

    /// Opens a secure channel to the endpoint and activates a session on it.
    ///
    /// When the server certificate fails validation the provider must ask
    /// `request.validator` and fail with
    /// [`ProviderError::CertificateRejected`] unless it accepts.
    async fn create_session(&self, request: SessionRequest)
        -> ProviderResult<Arc<dyn SessionChannel>>;
}

// =============================================================================
// SessionChannel
// =============================================================================

/// Service calls on one open session.
#[async_trait]
pub trait SessionChannel: Send + Sync {
    /// Server-assigned session identifier, for logging.
    fn session_id(&self) -> String;

    /// Reads the value attribute of a node.
    async fn read_value(&self, node_id: &NodeId) -> ProviderResult<DataValue>;

    /// Writes value attributes. Returns one status per written node, in
    /// request order.
    async fn write_values(&self, values: &[(NodeId, Variant)]) -> ProviderResult<Vec<StatusCode>>;

    /// Creates a subscription on the server.
    async fn create_subscription(
        &self,
        parameters: SubscriptionParameters,
    ) -> ProviderResult<CreatedSubscription>;

    /// Creates monitored items in a subscription. Data changes for each item
    /// must be delivered to `sink` under the item's client handle.
    async fn create_monitored_items(
        &self,
        subscription_id: u32,
        items: &[MonitoredItem],
        sink: Arc<dyn NotificationSink>,
    ) -> ProviderResult<()>;

    /// Deletes a subscription and its monitored items.
    async fn delete_subscription(&self, subscription_id: u32) -> ProviderResult<()>;

    /// Closes the session and its secure channel.
    async fn close(&self) -> ProviderResult<()>;
}
