// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription and monitored item bookkeeping.
//!
//! Items are registered with [`SubscriptionManager::add_item`] at any time and
//! stay pending until [`SubscriptionManager::activate`] submits them. The
//! manager tracks which items are already wired, so calling `activate` again
//! only submits items added since the previous call and rebinds the callback.
//!
//! # Lifecycle
//!
//! ```text
//! Detached --attach--> Ready --activate--> Active
//!    ^                   |                   |
//!    +------detach-------+-------detach------+
//! ```
//!
//! `attach` is called by the session manager after each successful connect;
//! `detach` before a session is closed. Both reset every item to pending.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::dispatch::{
    ClientHandle, MonitoredItem, NotificationCallback, NotificationDispatcher, NotificationSink,
};
use crate::error::{SubscriptionError, TimeoutError, UaClientError, UaResult};
use crate::provider::{CreatedSubscription, SessionChannel, SubscriptionParameters};
use crate::types::NodeId;

// =============================================================================
// SubscriptionState
// =============================================================================

/// State of the client's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// No session to create the subscription on.
    #[default]
    Detached,

    /// A session exists; the subscription has not been created on the server.
    Ready,

    /// The subscription exists on the server.
    Active,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => write!(f, "Detached"),
            Self::Ready => write!(f, "Ready"),
            Self::Active => write!(f, "Active"),
        }
    }
}

// =============================================================================
// SubscriptionStats
// =============================================================================

/// Snapshot of subscription counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStats {
    /// Server subscription ID, once created.
    pub subscription_id: Option<u32>,
    /// Items waiting for the next activation.
    pub pending_items: usize,
    /// Items submitted to the server.
    pub active_items: usize,
    /// Notifications handed to the callback.
    pub notifications_dispatched: u64,
    /// Notifications dropped.
    pub notifications_dropped: u64,
    /// Callback invocations that panicked.
    pub callback_failures: u64,
}

// =============================================================================
// SubscriptionManager
// =============================================================================

#[derive(Debug, Clone)]
struct ItemEntry {
    item: MonitoredItem,
    wired: bool,
}

struct Attachment {
    channel: Arc<dyn SessionChannel>,
    parameters: SubscriptionParameters,
    operation_timeout: Duration,
    created: Option<CreatedSubscription>,
}

/// Owns the subscription, its monitored items and the notification dispatcher.
pub struct SubscriptionManager {
    dispatcher: Arc<NotificationDispatcher>,
    items: Mutex<Vec<ItemEntry>>,
    next_handle: AtomicU32,
    attachment: tokio::sync::Mutex<Option<Attachment>>,
    state: RwLock<SubscriptionState>,
    subscription_id: RwLock<Option<u32>>,
}

impl SubscriptionManager {
    /// Creates a detached manager with no items.
    pub fn new() -> Self {
        Self {
            dispatcher: Arc::new(NotificationDispatcher::new()),
            items: Mutex::new(Vec::new()),
            next_handle: AtomicU32::new(1),
            attachment: tokio::sync::Mutex::new(None),
            state: RwLock::new(SubscriptionState::Detached),
            subscription_id: RwLock::new(None),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SubscriptionState {
        *self.state.read()
    }

    /// Returns the dispatcher that receives this subscription's notifications.
    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    /// Registers a tag for change notifications.
    ///
    /// The item stays pending until the next [`activate`](Self::activate).
    /// Duplicate names and addresses are allowed; each call creates a
    /// distinct item.
    pub fn add_item(
        &self,
        display_name: impl Into<String>,
        node_address: &str,
    ) -> UaResult<MonitoredItem> {
        let node_id: NodeId = node_address.parse()?;
        let item = MonitoredItem {
            display_name: display_name.into(),
            node_id,
            client_handle: ClientHandle(self.next_handle.fetch_add(1, Ordering::Relaxed)),
        };

        tracing::debug!(
            item = %item.display_name,
            node_id = %item.node_id,
            client_handle = %item.client_handle,
            "Monitored item added"
        );

        self.items.lock().push(ItemEntry {
            item: item.clone(),
            wired: false,
        });
        Ok(item)
    }

    /// Returns every registered item in insertion order.
    pub fn items(&self) -> Vec<MonitoredItem> {
        self.items.lock().iter().map(|e| e.item.clone()).collect()
    }

    /// Returns the items not yet submitted to the server.
    pub fn pending_items(&self) -> Vec<MonitoredItem> {
        self.items
            .lock()
            .iter()
            .filter(|e| !e.wired)
            .map(|e| e.item.clone())
            .collect()
    }

    /// Binds `callback` and submits every pending item.
    ///
    /// The first call creates the subscription on the server. Later calls
    /// replace the callback and submit only items added since. Returns the
    /// number of items submitted by this call.
    pub async fn activate(&self, callback: Arc<dyn NotificationCallback>) -> UaResult<usize> {
        let mut guard = self.attachment.lock().await;
        let attachment = guard.as_mut().ok_or(UaClientError::NotConnected)?;

        self.dispatcher.bind(callback);

        let pending = self.pending_items();
        for item in &pending {
            self.dispatcher.wire(item.clone());
        }

        let subscription_id = match attachment.created {
            Some(created) => created.subscription_id,
            None => {
                let created = match self.create_on_server(attachment).await {
                    Ok(created) => created,
                    Err(e) => {
                        self.unwire(&pending);
                        return Err(e);
                    }
                };
                attachment.created = Some(created);
                *self.subscription_id.write() = Some(created.subscription_id);
                *self.state.write() = SubscriptionState::Active;
                created.subscription_id
            }
        };

        if pending.is_empty() {
            return Ok(0);
        }

        let sink = Arc::clone(&self.dispatcher) as Arc<dyn NotificationSink>;
        let result = tokio::time::timeout(
            attachment.operation_timeout,
            attachment
                .channel
                .create_monitored_items(subscription_id, &pending, sink),
        )
        .await;

        match result {
            Ok(Ok(())) => {
                self.mark_wired(&pending);
                tracing::info!(
                    subscription_id,
                    items = pending.len(),
                    "Monitored items submitted"
                );
                Ok(pending.len())
            }
            Ok(Err(e)) => {
                self.unwire(&pending);
                tracing::error!(subscription_id, error = %e, "Failed to create monitored items");
                Err(SubscriptionError::monitored_items_failed(pending.len(), e).into())
            }
            Err(_) => {
                self.unwire(&pending);
                Err(TimeoutError::Subscription {
                    duration: attachment.operation_timeout,
                }
                .into())
            }
        }
    }

    /// Removes the bound callback. Notifications are dropped until the next
    /// activation.
    pub fn unregister_callback(&self) -> bool {
        self.dispatcher.unbind()
    }

    /// Attaches the subscription shell to a freshly opened session.
    ///
    /// Nothing is sent to the server until [`activate`](Self::activate).
    pub async fn attach(
        &self,
        channel: Arc<dyn SessionChannel>,
        parameters: SubscriptionParameters,
        operation_timeout: Duration,
    ) {
        let mut guard = self.attachment.lock().await;
        *guard = Some(Attachment {
            channel,
            parameters,
            operation_timeout,
            created: None,
        });
        self.reset_wiring();
        *self.state.write() = SubscriptionState::Ready;

        tracing::debug!(
            publishing_interval = ?parameters.publishing_interval,
            "Subscription attached to session"
        );
    }

    /// Deletes the server subscription (best effort) and resets every item to
    /// pending.
    pub async fn detach(&self) {
        let mut guard = self.attachment.lock().await;
        let Some(attachment) = guard.take() else {
            return;
        };

        if let Some(created) = attachment.created {
            let result = tokio::time::timeout(
                attachment.operation_timeout,
                attachment.channel.delete_subscription(created.subscription_id),
            )
            .await;
            match result {
                Ok(Ok(())) => {
                    tracing::debug!(subscription_id = created.subscription_id, "Subscription deleted");
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        subscription_id = created.subscription_id,
                        error = %e,
                        "Failed to delete subscription"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        subscription_id = created.subscription_id,
                        "Timed out deleting subscription"
                    );
                }
            }
        }

        self.reset_wiring();
        *self.subscription_id.write() = None;
        *self.state.write() = SubscriptionState::Detached;
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> SubscriptionStats {
        let (pending_items, active_items) = {
            let items = self.items.lock();
            let active = items.iter().filter(|e| e.wired).count();
            (items.len() - active, active)
        };
        let dispatch = self.dispatcher.stats();
        SubscriptionStats {
            subscription_id: *self.subscription_id.read(),
            pending_items,
            active_items,
            notifications_dispatched: dispatch.dispatched,
            notifications_dropped: dispatch.dropped,
            callback_failures: dispatch.callback_failures,
        }
    }

    async fn create_on_server(&self, attachment: &Attachment) -> UaResult<CreatedSubscription> {
        let result = tokio::time::timeout(
            attachment.operation_timeout,
            attachment.channel.create_subscription(attachment.parameters),
        )
        .await;

        match result {
            Ok(Ok(created)) => {
                tracing::info!(
                    subscription_id = created.subscription_id,
                    publishing_interval = ?created.revised_publishing_interval,
                    "Subscription created"
                );
                Ok(created)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to create subscription");
                Err(SubscriptionError::creation_failed(e).into())
            }
            Err(_) => Err(TimeoutError::Subscription {
                duration: attachment.operation_timeout,
            }
            .into()),
        }
    }

    fn mark_wired(&self, submitted: &[MonitoredItem]) {
        let mut items = self.items.lock();
        for entry in items.iter_mut() {
            if submitted.iter().any(|s| s.client_handle == entry.item.client_handle) {
                entry.wired = true;
            }
        }
    }

    fn unwire(&self, submitted: &[MonitoredItem]) {
        for item in submitted {
            self.dispatcher.unwire(item.client_handle);
        }
    }

    fn reset_wiring(&self) {
        for entry in self.items.lock().iter_mut() {
            entry.wired = false;
        }
        self.dispatcher.unwire_all();
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("state", &self.state())
            .field("items", &self.items.lock().len())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
