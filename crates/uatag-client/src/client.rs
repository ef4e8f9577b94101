// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application-facing client.
//!
//! [`UaClient`] bundles a [`SessionManager`] and a [`SubscriptionManager`]
//! behind the small surface an application needs: connect, register tags,
//! read, write and subscribe.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use uatag_client::{ClientConfig, UaClient};
//!
//! let client = UaClient::new(ClientConfig::default(), provider)?;
//! client.connect("opc.tcp://192.168.11.90:49320").await?;
//!
//! client.add_item("Oven temperature", "ns=2;s=Oven.Temperature")?;
//! client
//!     .subs_on_new_data(Arc::new(|item: &MonitoredItem, event: &DataChangeEvent| {
//!         println!("{} = {}", item.display_name, event.value.value);
//!     }))
//!     .await?;
//!
//! let written = client.write_value("ns=2;s=Oven.Setpoint", 180.0f32).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::dispatch::{MonitoredItem, NotificationCallback};
use crate::error::UaResult;
use crate::provider::SecureChannelProvider;
use crate::session::{ActiveSession, SessionManager, SessionState};
use crate::subscription::{SubscriptionManager, SubscriptionState, SubscriptionStats};
use crate::types::{DataValue, Variant};

/// OPC UA tag client.
pub struct UaClient<P: SecureChannelProvider> {
    config: Arc<ClientConfig>,
    sessions: SessionManager<P>,
    subscriptions: Arc<SubscriptionManager>,
}

impl<P: SecureChannelProvider> UaClient<P> {
    /// Creates a client. The configuration is validated here and again on
    /// every `connect`.
    pub fn new(config: ClientConfig, provider: P) -> UaResult<Self> {
        Self::with_provider(config, Arc::new(provider))
    }

    /// Creates a client around a shared provider.
    pub fn with_provider(config: ClientConfig, provider: Arc<P>) -> UaResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let subscriptions = Arc::new(SubscriptionManager::new());
        let sessions =
            SessionManager::new(Arc::clone(&config), provider, Arc::clone(&subscriptions));

        Ok(Self {
            config,
            sessions,
            subscriptions,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the session manager.
    pub fn sessions(&self) -> &SessionManager<P> {
        &self.sessions
    }

    /// Returns the subscription manager.
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }

    /// Discovers endpoints at `address`, selects one and opens a session.
    ///
    /// Any previous session is closed first and registered items return to
    /// pending; call [`subs_on_new_data`](Self::subs_on_new_data) again to
    /// resubmit them.
    pub async fn connect(&self, address: &str) -> UaResult<Arc<ActiveSession>> {
        self.sessions.connect(address).await
    }

    /// Closes the session.
    pub async fn disconnect(&self) {
        self.sessions.disconnect().await
    }

    /// Returns `true` if a session is open.
    pub fn is_connected(&self) -> bool {
        self.sessions.is_connected()
    }

    /// Returns the session state.
    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    /// Returns the subscription state.
    pub fn subscription_state(&self) -> SubscriptionState {
        self.subscriptions.state()
    }

    /// Registers a tag for change notifications.
    pub fn add_item(
        &self,
        display_name: impl Into<String>,
        node_address: &str,
    ) -> UaResult<MonitoredItem> {
        self.subscriptions.add_item(display_name, node_address)
    }

    /// Reads the current value of a tag.
    pub async fn read_value(&self, node_address: &str) -> UaResult<DataValue> {
        self.sessions.read_value(node_address).await
    }

    /// Writes a tag. Returns `false` if the server rejected the value.
    pub async fn write_value(&self, node_address: &str, value: impl Into<Variant>) -> UaResult<bool> {
        self.sessions.write_value(node_address, value.into()).await
    }

    /// Binds `callback` and activates the subscription.
    ///
    /// Same as [`activate`](Self::activate).
    pub async fn subs_on_new_data(&self, callback: Arc<dyn NotificationCallback>) -> UaResult<usize> {
        self.activate(callback).await
    }

    /// Binds `callback`, replacing any previous one, and submits pending
    /// items. Returns the number of items submitted.
    pub async fn activate(&self, callback: Arc<dyn NotificationCallback>) -> UaResult<usize> {
        self.subscriptions.activate(callback).await
    }

    /// Removes the bound callback.
    pub fn unregister_callback(&self) -> bool {
        self.subscriptions.unregister_callback()
    }

    /// Returns a snapshot of client counters.
    pub fn stats(&self) -> ClientStats {
        let session = self.sessions.stats();
        ClientStats {
            connect_attempts: session.connect_attempts(),
            connects: session.connects(),
            connect_failures: session.failures(),
            disconnects: session.disconnects(),
            subscription: self.subscriptions.stats(),
        }
    }
}

impl<P: SecureChannelProvider> fmt::Debug for UaClient<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UaClient")
            .field("application_name", &self.config.application_name)
            .field("sessions", &self.sessions)
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

/// Snapshot of client counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    /// Connect calls made.
    pub connect_attempts: u64,
    /// Connect calls that opened a session.
    pub connects: u64,
    /// Connect calls that failed.
    pub connect_failures: u64,
    /// Sessions closed.
    pub disconnects: u64,
    /// Subscription counters.
    pub subscription: SubscriptionStats,
}
