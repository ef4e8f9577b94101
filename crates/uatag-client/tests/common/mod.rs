// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared helpers for integration tests: logging setup and an in-memory
//! secure channel provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use uatag_client::{
    ClientConfig, ClientHandle, CertificateValidationEvent, CreatedSubscription, DataValue,
    DiscoveryRequest, EndpointDescription, MonitoredItem, NodeId, NotificationSink, ProviderError,
    ProviderResult, SecureChannelProvider, SecurityMode, SecurityPolicy, SessionChannel,
    SessionRequest, StatusCode, SubscriptionParameters, Variant,
};

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of each test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,uatag_client=debug")),
            )
            .with_test_writer()
            .init();
    });
}

/// Configuration with short timeouts for tests.
pub fn test_config() -> ClientConfig {
    ClientConfig::builder()
        .application_name("uatag test client")
        .host_name("test-host")
        .pki_root("./target/test-pki")
        .operation_timeout(Duration::from_secs(2))
        .discovery_timeout(Duration::from_secs(2))
        .build()
        .expect("test configuration is valid")
}

/// A UA TCP endpoint.
pub fn tcp_endpoint(url: &str, level: u8) -> EndpointDescription {
    let (mode, policy) = if level == 0 {
        (SecurityMode::None, SecurityPolicy::None)
    } else {
        (SecurityMode::SignAndEncrypt, SecurityPolicy::Basic256Sha256)
    };
    EndpointDescription::ua_tcp(url, mode, policy, level)
}

/// An endpoint with a transport profile the client does not support.
pub fn other_endpoint(url: &str, level: u8) -> EndpointDescription {
    tcp_endpoint(url, level).with_transport_profile("A")
}

// =============================================================================
// MockProvider
// =============================================================================

/// What the mock server presents during the handshake.
#[derive(Debug, Clone, Copy)]
pub enum ServerCertificate {
    /// Certificate passes validation.
    Trusted,
    /// Certificate fails validation with this status.
    Failing(StatusCode),
}

/// In-memory secure channel provider.
pub struct MockProvider {
    pub endpoints: Mutex<Vec<EndpointDescription>>,
    pub have_certificate: AtomicBool,
    pub discovery_failure: Mutex<Option<ProviderError>>,
    pub discovery_delay: Mutex<Option<Duration>>,
    pub session_failure: Mutex<Option<ProviderError>>,
    pub session_delay: Mutex<Option<Duration>>,
    pub server_certificate: Mutex<ServerCertificate>,
    pub discovery_requests: Mutex<Vec<DiscoveryRequest>>,
    pub session_requests: Mutex<Vec<SessionRequest>>,
    pub sessions: Mutex<Vec<Arc<MockSession>>>,
    next_session: AtomicU32,
}

impl MockProvider {
    pub fn new(endpoints: Vec<EndpointDescription>) -> Self {
        Self {
            endpoints: Mutex::new(endpoints),
            have_certificate: AtomicBool::new(true),
            discovery_failure: Mutex::new(None),
            discovery_delay: Mutex::new(None),
            session_failure: Mutex::new(None),
            session_delay: Mutex::new(None),
            server_certificate: Mutex::new(ServerCertificate::Trusted),
            discovery_requests: Mutex::new(Vec::new()),
            session_requests: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
            next_session: AtomicU32::new(1),
        }
    }

    /// A provider offering one unsecured and one secured UA TCP endpoint.
    pub fn with_default_endpoints() -> Self {
        Self::new(vec![
            tcp_endpoint("opc.tcp://localhost:4840", 0),
            tcp_endpoint("opc.tcp://localhost:4840", 100),
        ])
    }

    pub fn without_certificate(self) -> Self {
        self.have_certificate.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_discovery_failure(&self, error: ProviderError) {
        *self.discovery_failure.lock() = Some(error);
    }

    pub fn set_discovery_delay(&self, delay: Duration) {
        *self.discovery_delay.lock() = Some(delay);
    }

    pub fn clear_discovery_delay(&self) {
        *self.discovery_delay.lock() = None;
    }

    /// Delays `create_session` after the session has been opened.
    pub fn set_session_delay(&self, delay: Duration) {
        *self.session_delay.lock() = Some(delay);
    }

    pub fn clear_session_delay(&self) {
        *self.session_delay.lock() = None;
    }

    pub fn set_session_failure(&self, error: ProviderError) {
        *self.session_failure.lock() = Some(error);
    }

    pub fn set_server_certificate(&self, certificate: ServerCertificate) {
        *self.server_certificate.lock() = certificate;
    }

    /// The most recently created session.
    pub fn last_session(&self) -> Arc<MockSession> {
        self.sessions
            .lock()
            .last()
            .cloned()
            .expect("a session was created")
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[async_trait]
impl SecureChannelProvider for MockProvider {
    async fn find_application_certificate(&self, _config: &ClientConfig) -> ProviderResult<bool> {
        Ok(self.have_certificate.load(Ordering::SeqCst))
    }

    async fn get_endpoints(
        &self,
        request: &DiscoveryRequest,
    ) -> ProviderResult<Vec<EndpointDescription>> {
        self.discovery_requests.lock().push(request.clone());

        let delay = *self.discovery_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.discovery_failure.lock().clone() {
            return Err(error);
        }
        Ok(self.endpoints.lock().clone())
    }

    async fn create_session(
        &self,
        request: SessionRequest,
    ) -> ProviderResult<Arc<dyn SessionChannel>> {
        self.session_requests.lock().push(request.clone());

        if let Some(error) = self.session_failure.lock().clone() {
            return Err(error);
        }

        let certificate = *self.server_certificate.lock();
        if let ServerCertificate::Failing(status) = certificate {
            let event = CertificateValidationEvent::new("CN=mock-server", "00FF00FF", status);
            let accepted = request
                .validator
                .as_ref()
                .is_some_and(|validator| validator.validate(&event).is_accept());
            if !accepted {
                return Err(ProviderError::certificate_rejected(event.subject, status));
            }
        }

        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(MockSession::new(format!("ns=1;i={}", 1000 + id)));
        self.sessions.lock().push(Arc::clone(&session));

        let delay = *self.session_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(session)
    }
}

// =============================================================================
// MockSession
// =============================================================================

/// In-memory session.
pub struct MockSession {
    pub id: String,
    pub values: Mutex<HashMap<NodeId, DataValue>>,
    pub write_status: Mutex<Option<StatusCode>>,
    pub writes: Mutex<Vec<(NodeId, Variant)>>,
    pub subscriptions_created: AtomicU32,
    pub deleted_subscriptions: Mutex<Vec<u32>>,
    pub submissions: Mutex<Vec<Vec<MonitoredItem>>>,
    pub sink: Mutex<Option<Arc<dyn NotificationSink>>>,
    pub closed: AtomicBool,
}

impl MockSession {
    fn new(id: String) -> Self {
        Self {
            id,
            values: Mutex::new(HashMap::new()),
            write_status: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            subscriptions_created: AtomicU32::new(0),
            deleted_subscriptions: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn set_value(&self, address: &str, value: DataValue) {
        let node_id: NodeId = address.parse().expect("valid node address");
        self.values.lock().insert(node_id, value);
    }

    pub fn set_write_status(&self, status: StatusCode) {
        *self.write_status.lock() = Some(status);
    }

    /// Every item submitted so far, in submission order.
    pub fn monitored_items(&self) -> Vec<MonitoredItem> {
        self.submissions.lock().iter().flatten().cloned().collect()
    }

    /// Pushes a data change for `handle` as the server would.
    pub fn push(&self, handle: ClientHandle, value: impl Into<Variant>) {
        let sink = self.sink.lock().clone().expect("monitored items were created");
        sink.deliver(handle, DataValue::new(value));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionChannel for MockSession {
    fn session_id(&self) -> String {
        self.id.clone()
    }

    async fn read_value(&self, node_id: &NodeId) -> ProviderResult<DataValue> {
        Ok(self
            .values
            .lock()
            .get(node_id)
            .cloned()
            .unwrap_or_else(|| DataValue::default().with_status(StatusCode::BAD_NODE_ID_UNKNOWN)))
    }

    async fn write_values(&self, values: &[(NodeId, Variant)]) -> ProviderResult<Vec<StatusCode>> {
        self.writes.lock().extend(values.iter().cloned());
        let status = self.write_status.lock().unwrap_or(StatusCode::GOOD);
        Ok(vec![status; values.len()])
    }

    async fn create_subscription(
        &self,
        parameters: SubscriptionParameters,
    ) -> ProviderResult<CreatedSubscription> {
        let id = self.subscriptions_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CreatedSubscription {
            subscription_id: id,
            revised_publishing_interval: parameters.publishing_interval,
        })
    }

    async fn create_monitored_items(
        &self,
        _subscription_id: u32,
        items: &[MonitoredItem],
        sink: Arc<dyn NotificationSink>,
    ) -> ProviderResult<()> {
        self.submissions.lock().push(items.to_vec());
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    async fn delete_subscription(&self, subscription_id: u32) -> ProviderResult<()> {
        self.deleted_subscriptions.lock().push(subscription_id);
        Ok(())
    }

    async fn close(&self) -> ProviderResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
