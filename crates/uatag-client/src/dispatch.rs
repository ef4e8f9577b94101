// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Notification fan-in.
//!
//! The provider pushes every data change it receives into a
//! [`NotificationSink`]. The [`NotificationDispatcher`] implements that sink:
//! it resolves the client handle to the [`MonitoredItem`] that produced the
//! change and hands both to the single bound [`NotificationCallback`].
//!
//! Delivery is synchronous on the provider's thread, which keeps events in
//! the order the provider produced them. Locks are released before the
//! callback runs, so a callback may rebind or unbind the dispatcher.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{DataValue, NodeId};

// =============================================================================
// Identifiers and events
// =============================================================================

/// Client-assigned handle that ties server notifications to a monitored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientHandle(pub u32);

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tag registered for change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitoredItem {
    /// Name shown to the application.
    pub display_name: String,
    /// Server-side node address.
    pub node_id: NodeId,
    /// Handle used to route notifications back to this item.
    pub client_handle: ClientHandle,
}

/// A single value change reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataChangeEvent {
    /// Handle of the item that changed.
    pub client_handle: ClientHandle,
    /// The new value.
    pub value: DataValue,
    /// When the client received the change.
    pub received_at: DateTime<Utc>,
}

// =============================================================================
// Callback and sink traits
// =============================================================================

/// Application callback for data changes.
///
/// Runs on the provider's notification path; it should return quickly.
pub trait NotificationCallback: Send + Sync {
    /// Called once per data change.
    fn on_data_change(&self, item: &MonitoredItem, event: &DataChangeEvent);
}

impl<F> NotificationCallback for F
where
    F: Fn(&MonitoredItem, &DataChangeEvent) + Send + Sync,
{
    fn on_data_change(&self, item: &MonitoredItem, event: &DataChangeEvent) {
        self(item, event)
    }
}

/// Receives raw notifications from the provider.
pub trait NotificationSink: Send + Sync {
    /// Delivers one data change for `client_handle`.
    fn deliver(&self, client_handle: ClientHandle, value: DataValue);
}

// =============================================================================
// ChannelCallback
// =============================================================================

/// Forwards notifications into a bounded channel.
///
/// Events are dropped when the channel is full or closed.
#[derive(Debug, Clone)]
pub struct ChannelCallback {
    sender: mpsc::Sender<(MonitoredItem, DataChangeEvent)>,
}

impl ChannelCallback {
    /// Creates a new channel callback.
    pub fn new(sender: mpsc::Sender<(MonitoredItem, DataChangeEvent)>) -> Self {
        Self { sender }
    }

    /// Creates a new channel callback with its receiver.
    pub fn with_channel(
        capacity: usize,
    ) -> (Self, mpsc::Receiver<(MonitoredItem, DataChangeEvent)>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl NotificationCallback for ChannelCallback {
    fn on_data_change(&self, item: &MonitoredItem, event: &DataChangeEvent) {
        if let Err(e) = self.sender.try_send((item.clone(), event.clone())) {
            tracing::debug!(item = %item.display_name, error = %e, "Notification channel rejected event");
        }
    }
}

// =============================================================================
// NotificationDispatcher
// =============================================================================

/// Routes provider notifications to the bound application callback.
pub struct NotificationDispatcher {
    callback: RwLock<Option<Arc<dyn NotificationCallback>>>,
    items: RwLock<HashMap<ClientHandle, MonitoredItem>>,
    dispatched: AtomicU64,
    dropped: AtomicU64,
    callback_failures: AtomicU64,
}

impl NotificationDispatcher {
    /// Creates a dispatcher with no callback and no items.
    pub fn new() -> Self {
        Self {
            callback: RwLock::new(None),
            items: RwLock::new(HashMap::new()),
            dispatched: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
        }
    }

    /// Binds `callback`, replacing any previous one.
    ///
    /// Returns `true` if a previous callback was replaced.
    pub fn bind(&self, callback: Arc<dyn NotificationCallback>) -> bool {
        let replaced = self.callback.write().replace(callback).is_some();
        tracing::debug!(replaced, "Notification callback bound");
        replaced
    }

    /// Removes the bound callback. Later notifications are dropped.
    ///
    /// Returns `true` if a callback was bound.
    pub fn unbind(&self) -> bool {
        let removed = self.callback.write().take().is_some();
        if removed {
            tracing::debug!("Notification callback unbound");
        }
        removed
    }

    /// Returns `true` if a callback is bound.
    pub fn has_callback(&self) -> bool {
        self.callback.read().is_some()
    }

    /// Routes notifications for `item` through this dispatcher.
    ///
    /// Returns `false` if the item's handle was already wired.
    pub fn wire(&self, item: MonitoredItem) -> bool {
        let mut items = self.items.write();
        if items.contains_key(&item.client_handle) {
            return false;
        }
        items.insert(item.client_handle, item);
        true
    }

    /// Returns `true` if `handle` is wired.
    pub fn is_wired(&self, handle: ClientHandle) -> bool {
        self.items.read().contains_key(&handle)
    }

    /// Number of wired items.
    pub fn wired_count(&self) -> usize {
        self.items.read().len()
    }

    /// Stops routing notifications for `handle`.
    pub fn unwire(&self, handle: ClientHandle) -> bool {
        self.items.write().remove(&handle).is_some()
    }

    /// Forgets every wired item.
    pub fn unwire_all(&self) {
        self.items.write().clear();
    }

    /// Returns a snapshot of the delivery counters.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
        }
    }

    fn dispatch(&self, event: DataChangeEvent) {
        let Some(item) = self.items.read().get(&event.client_handle).cloned() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(client_handle = %event.client_handle, "Dropped notification for unknown item");
            return;
        };

        let Some(callback) = self.callback.read().clone() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(item = %item.display_name, "Dropped notification, no callback bound");
            return;
        };

        tracing::trace!(
            item = %item.display_name,
            node_id = %item.node_id,
            status = %event.value.status,
            "Dispatching notification"
        );

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            callback.on_data_change(&item, &event);
        }));

        match result {
            Ok(()) => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                self.callback_failures.fetch_add(1, Ordering::Relaxed);
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    item = %item.display_name,
                    node_id = %item.node_id,
                    panic = %message,
                    "Notification callback panicked"
                );
            }
        }
    }
}

impl NotificationSink for NotificationDispatcher {
    fn deliver(&self, client_handle: ClientHandle, value: DataValue) {
        self.dispatch(DataChangeEvent {
            client_handle,
            value,
            received_at: Utc::now(),
        });
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("has_callback", &self.has_callback())
            .field("wired_items", &self.wired_count())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Events handed to the callback.
    pub dispatched: u64,
    /// Events dropped because no callback was bound or the item was unknown.
    pub dropped: u64,
    /// Callback invocations that panicked.
    pub callback_failures: u64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::types::Variant;

    fn item(handle: u32, name: &str) -> MonitoredItem {
        MonitoredItem {
            display_name: name.to_string(),
            node_id: NodeId::string(2, name),
            client_handle: ClientHandle(handle),
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<(String, Variant)>>>, Arc<dyn NotificationCallback>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback = move |item: &MonitoredItem, event: &DataChangeEvent| {
            sink.lock().push((item.display_name.clone(), event.value.value.clone()));
        };
        (seen, Arc::new(callback))
    }

    #[test]
    fn test_drops_without_callback() {
        let dispatcher = NotificationDispatcher::new();
        dispatcher.wire(item(1, "Speed"));

        dispatcher.deliver(ClientHandle(1), DataValue::new(1.0f64));

        assert_eq!(dispatcher.stats().dropped, 1);
        assert_eq!(dispatcher.stats().dispatched, 0);
    }

    #[test]
    fn test_forwards_in_order() {
        let dispatcher = NotificationDispatcher::new();
        dispatcher.wire(item(1, "Speed"));
        dispatcher.wire(item(2, "Torque"));
        let (seen, callback) = recorder();
        dispatcher.bind(callback);

        dispatcher.deliver(ClientHandle(2), DataValue::new(10i32));
        dispatcher.deliver(ClientHandle(1), DataValue::new(20i32));
        dispatcher.deliver(ClientHandle(2), DataValue::new(30i32));

        assert_eq!(
            *seen.lock(),
            vec![
                ("Torque".to_string(), Variant::Int32(10)),
                ("Speed".to_string(), Variant::Int32(20)),
                ("Torque".to_string(), Variant::Int32(30)),
            ]
        );
        assert_eq!(dispatcher.stats().dispatched, 3);
    }

    #[test]
    fn test_unknown_handle_dropped() {
        let dispatcher = NotificationDispatcher::new();
        let (seen, callback) = recorder();
        dispatcher.bind(callback);

        dispatcher.deliver(ClientHandle(99), DataValue::new(true));

        assert!(seen.lock().is_empty());
        assert_eq!(dispatcher.stats().dropped, 1);
    }

    #[test]
    fn test_rebind_replaces_callback() {
        let dispatcher = NotificationDispatcher::new();
        dispatcher.wire(item(1, "Level"));
        let (first, cb1) = recorder();
        let (second, cb2) = recorder();

        assert!(!dispatcher.bind(cb1));
        dispatcher.deliver(ClientHandle(1), DataValue::new(1u8));
        assert!(dispatcher.bind(cb2));
        dispatcher.deliver(ClientHandle(1), DataValue::new(2u8));

        assert_eq!(first.lock().len(), 1);
        assert_eq!(second.lock().len(), 1);
        assert_eq!(second.lock()[0].1, Variant::Byte(2));
    }

    #[test]
    fn test_wire_is_exactly_once() {
        let dispatcher = NotificationDispatcher::new();
        assert!(dispatcher.wire(item(1, "A")));
        assert!(!dispatcher.wire(item(1, "A")));
        assert_eq!(dispatcher.wired_count(), 1);

        dispatcher.unwire_all();
        assert!(!dispatcher.is_wired(ClientHandle(1)));
    }

    #[test]
    fn test_callback_panic_is_isolated() {
        let dispatcher = NotificationDispatcher::new();
        dispatcher.wire(item(1, "Pressure"));
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        dispatcher.bind(Arc::new(move |_: &MonitoredItem, event: &DataChangeEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            if event.value.value == Variant::Boolean(false) {
                panic!("sensor offline");
            }
        }));

        dispatcher.deliver(ClientHandle(1), DataValue::new(false));
        dispatcher.deliver(ClientHandle(1), DataValue::new(true));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let stats = dispatcher.stats();
        assert_eq!(stats.callback_failures, 1);
        assert_eq!(stats.dispatched, 1);
    }

    #[tokio::test]
    async fn test_channel_callback() {
        let dispatcher = NotificationDispatcher::new();
        dispatcher.wire(item(7, "Flow"));
        let (callback, mut rx) = ChannelCallback::with_channel(4);
        dispatcher.bind(Arc::new(callback));

        dispatcher.deliver(ClientHandle(7), DataValue::new(3.5f32));

        let (item, event) = rx.recv().await.unwrap();
        assert_eq!(item.display_name, "Flow");
        assert_eq!(event.value.value, Variant::Float(3.5));
    }
}
