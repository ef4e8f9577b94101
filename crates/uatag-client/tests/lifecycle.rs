// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection and subscription lifecycle tests against the in-memory provider.

mod common;

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use common::{
    init_test_logging, other_endpoint, tcp_endpoint, test_config, MockProvider, ServerCertificate,
};
use uatag_client::{
    ClientConfig, DataChangeEvent, DataValue, DiscoveryError, EndpointError, MonitoredItem,
    NotificationCallback, ProviderError, SessionError, SessionState, StatusCode,
    SubscriptionState, UaClient, UaClientError, Variant,
};

const ADDRESS: &str = "opc.tcp://plc-07.plant.local:4840";

fn client(provider: MockProvider) -> (UaClient<MockProvider>, Arc<MockProvider>) {
    client_with(test_config(), provider)
}

fn client_with(
    config: ClientConfig,
    provider: MockProvider,
) -> (UaClient<MockProvider>, Arc<MockProvider>) {
    init_test_logging();
    let provider = Arc::new(provider);
    let client = UaClient::with_provider(config, Arc::clone(&provider)).expect("valid config");
    (client, provider)
}

type Seen = Arc<Mutex<Vec<(String, Variant)>>>;

fn recorder() -> (Seen, Arc<dyn NotificationCallback>) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback = move |item: &MonitoredItem, event: &DataChangeEvent| {
        sink.lock()
            .push((item.display_name.clone(), event.value.value.clone()));
    };
    (seen, Arc::new(callback))
}

// =============================================================================
// Endpoint selection
// =============================================================================

#[tokio::test]
async fn test_without_certificate_selects_least_secure_tcp_endpoint() {
    let provider = MockProvider::new(vec![
        other_endpoint("opc.tcp://plc:4840", 5),
        tcp_endpoint("opc.tcp://plc:4840", 3),
    ])
    .without_certificate();
    let (client, provider) = client(provider);

    let session = client.connect(ADDRESS).await.unwrap();

    assert_eq!(session.endpoint.security_level, 3);
    assert!(session.endpoint.is_ua_tcp());
    assert!(!session.have_application_certificate);
    assert!(provider.session_requests.lock()[0].validator.is_none());
}

#[tokio::test]
async fn test_with_certificate_selects_most_secure_endpoint() {
    let provider = MockProvider::new(vec![
        tcp_endpoint("opc.tcp://plc:4840", 0),
        other_endpoint("opc.tcp://plc:4843", 250),
        tcp_endpoint("opc.tcp://plc:4840", 110),
        tcp_endpoint("opc.tcp://plc:4840", 60),
    ]);
    let (client, provider) = client(provider);

    let session = client.connect(ADDRESS).await.unwrap();

    assert_eq!(session.endpoint.security_level, 110);
    assert!(provider.session_requests.lock()[0].validator.is_some());
}

#[tokio::test]
async fn test_localhost_is_rewritten_to_discovery_host() {
    let (client, _provider) = client(MockProvider::with_default_endpoints());

    let session = client.connect(ADDRESS).await.unwrap();

    assert_eq!(session.endpoint.endpoint_url, "opc.tcp://plc-07.plant.local:4840");
}

#[tokio::test]
async fn test_session_request_carries_configured_timeouts() {
    let (client, provider) = client(MockProvider::with_default_endpoints());

    client.connect(ADDRESS).await.unwrap();

    let requests = provider.session_requests.lock();
    assert_eq!(requests[0].session_timeout, Duration::from_secs(60));
    assert_eq!(requests[0].operation_timeout, Duration::from_secs(2));
    assert_eq!(requests[0].session_name, "uatag client");

    let discovery = provider.discovery_requests.lock();
    assert_eq!(discovery[0].discovery_url, ADDRESS);
    assert_eq!(discovery[0].application_uri, "urn:localhost:uatag:client");
}

#[tokio::test]
async fn test_no_compatible_endpoint() {
    let provider = MockProvider::new(vec![other_endpoint("https://plc:443", 5)]);
    let (client, provider) = client(provider);

    let err = client.connect(ADDRESS).await.unwrap_err();

    assert!(matches!(
        err,
        UaClientError::Endpoint(EndpointError::NoCompatibleEndpoint { candidates: 1, .. })
    ));
    assert_eq!(provider.session_count(), 0);
    assert!(!client.is_connected());
}

// =============================================================================
// Discovery failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_discovery_timeout_is_bounded_and_leaves_no_session() {
    let config = ClientConfig::builder()
        .discovery_timeout(Duration::from_millis(10))
        .build()
        .unwrap();
    let provider = MockProvider::with_default_endpoints();
    provider.set_discovery_delay(Duration::from_secs(30));
    let (client, provider) = client_with(config, provider);

    let started = tokio::time::Instant::now();
    let err = client.connect("opc.tcp://10.255.255.1:4840").await.unwrap_err();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(10), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
    assert!(matches!(
        err,
        UaClientError::Discovery(DiscoveryError::TimedOut { .. })
    ));
    assert!(!client.is_connected());
    assert_eq!(client.session_state(), SessionState::Failed);
    assert_eq!(provider.session_count(), 0);
    assert!(matches!(
        client.read_value("ns=2;s=Any").await.unwrap_err(),
        UaClientError::NotConnected
    ));
}

#[tokio::test]
async fn test_discovery_failure_keeps_cause() {
    let provider = MockProvider::with_default_endpoints();
    provider.set_discovery_failure(ProviderError::unreachable("connection refused"));
    let (client, _provider) = client(provider);

    let err = client.connect(ADDRESS).await.unwrap_err();

    match &err {
        UaClientError::Discovery(DiscoveryError::Failed { address, source }) => {
            assert_eq!(address, ADDRESS);
            assert_eq!(source, &ProviderError::unreachable("connection refused"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
    assert!(err.source().is_some());
    assert_eq!(client.stats().connect_failures, 1);
}

#[tokio::test]
async fn test_invalid_address_is_configuration_error() {
    let (client, provider) = client(MockProvider::with_default_endpoints());

    let err = client.connect("not-a-url").await.unwrap_err();

    assert_eq!(err.category(), "configuration");
    assert!(provider.discovery_requests.lock().is_empty());
}

// =============================================================================
// Certificate trust
// =============================================================================

#[tokio::test]
async fn test_untrusted_server_certificate_is_auto_accepted() {
    let provider = MockProvider::with_default_endpoints();
    provider.set_server_certificate(ServerCertificate::Failing(StatusCode::BAD_CERTIFICATE_UNTRUSTED));
    let (client, _provider) = client(provider);

    assert!(client.connect(ADDRESS).await.is_ok());
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_expired_server_certificate_is_rejected() {
    let provider = MockProvider::with_default_endpoints();
    provider.set_server_certificate(ServerCertificate::Failing(
        StatusCode::BAD_CERTIFICATE_TIME_INVALID,
    ));
    let (client, _provider) = client(provider);

    let err = client.connect(ADDRESS).await.unwrap_err();

    match err {
        UaClientError::Session(SessionError::CertificateRejected { source, .. }) => {
            assert!(source.to_string().contains("BadCertificateTimeInvalid"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_untrusted_rejected_without_application_certificate() {
    let provider = MockProvider::with_default_endpoints().without_certificate();
    provider.set_server_certificate(ServerCertificate::Failing(StatusCode::BAD_CERTIFICATE_UNTRUSTED));
    let (client, _provider) = client(provider);

    let err = client.connect(ADDRESS).await.unwrap_err();

    assert!(matches!(
        err,
        UaClientError::Session(SessionError::CertificateRejected { .. })
    ));
}

#[tokio::test]
async fn test_untrusted_rejected_when_auto_accept_disabled() {
    let config = ClientConfig::builder().auto_accept_untrusted(false).build().unwrap();
    let provider = MockProvider::with_default_endpoints();
    provider.set_server_certificate(ServerCertificate::Failing(StatusCode::BAD_CERTIFICATE_UNTRUSTED));
    let (client, provider) = client_with(config, provider);

    assert!(client.connect(ADDRESS).await.is_err());
    assert!(provider.session_requests.lock()[0].validator.is_none());
}

#[tokio::test]
async fn test_session_failure_is_establishment_error() {
    let provider = MockProvider::with_default_endpoints();
    provider.set_session_failure(ProviderError::authentication_rejected("anonymous not allowed"));
    let (client, _provider) = client(provider);

    let err = client.connect(ADDRESS).await.unwrap_err();

    assert!(matches!(
        err,
        UaClientError::Session(SessionError::EstablishmentFailed { .. })
    ));
    assert!(!err.is_retryable());
}

// =============================================================================
// Read / write
// =============================================================================

#[tokio::test]
async fn test_read_and_write_before_connect_fail_fast() {
    let (client, _provider) = client(MockProvider::with_default_endpoints());

    assert!(matches!(
        client.read_value("ns=2;s=Speed").await.unwrap_err(),
        UaClientError::NotConnected
    ));
    assert!(matches!(
        client.write_value("ns=2;s=Speed", 1.5f32).await.unwrap_err(),
        UaClientError::NotConnected
    ));
}

#[tokio::test]
async fn test_read_value_returns_data_value() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    provider
        .last_session()
        .set_value("ns=2;s=Line1.Speed", DataValue::new(42.5f64));

    let value = client.read_value("ns=2;s=Line1.Speed").await.unwrap();
    assert_eq!(value.value, Variant::Double(42.5));
    assert!(value.is_good());

    let missing = client.read_value("ns=2;s=Nope").await.unwrap();
    assert_eq!(missing.status, StatusCode::BAD_NODE_ID_UNKNOWN);
}

#[tokio::test]
async fn test_write_value_reports_status() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    let session = provider.last_session();

    assert!(client.write_value("ns=2;s=Setpoint", 180.0f32).await.unwrap());

    session.set_write_status(StatusCode::BAD_NOT_WRITABLE);
    assert!(!client.write_value("ns=2;s=Setpoint", 181.0f32).await.unwrap());

    session.set_write_status(StatusCode::UNCERTAIN);
    assert!(!client.write_value("ns=2;s=Setpoint", 182.0f32).await.unwrap());

    let writes = session.writes.lock();
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[0].1, Variant::Float(180.0));
}

// =============================================================================
// Subscription
// =============================================================================

#[tokio::test]
async fn test_every_item_wired_exactly_once() {
    for count in 0..5usize {
        let (client, provider) = client(MockProvider::with_default_endpoints());
        client.connect(ADDRESS).await.unwrap();
        for i in 0..count {
            client.add_item(format!("Tag{i}"), &format!("ns=2;i={i}")).unwrap();
        }

        let (_seen, callback) = recorder();
        let submitted = client.subs_on_new_data(callback).await.unwrap();

        let session = provider.last_session();
        assert_eq!(submitted, count);
        assert_eq!(session.monitored_items().len(), count);
        assert_eq!(session.subscriptions_created.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(client.subscription_state(), SubscriptionState::Active);
        assert_eq!(client.stats().subscription.active_items, count);
    }
}

#[tokio::test]
async fn test_notifications_reach_callback_in_order() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    let speed = client.add_item("Speed", "ns=2;s=Speed").unwrap();
    let level = client.add_item("Level", "ns=2;s=Level").unwrap();
    let (seen, callback) = recorder();
    client.subs_on_new_data(callback).await.unwrap();

    let session = provider.last_session();
    session.push(speed.client_handle, 1.0f64);
    session.push(level.client_handle, 7i32);
    session.push(speed.client_handle, 2.0f64);

    assert_eq!(
        *seen.lock(),
        vec![
            ("Speed".to_string(), Variant::Double(1.0)),
            ("Level".to_string(), Variant::Int32(7)),
            ("Speed".to_string(), Variant::Double(2.0)),
        ]
    );
}

#[tokio::test]
async fn test_second_activation_replaces_callback() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    let item = client.add_item("Temp", "ns=2;s=Temp").unwrap();

    let (first, cb1) = recorder();
    let (second, cb2) = recorder();
    client.activate(cb1).await.unwrap();
    client.activate(cb2).await.unwrap();

    provider.last_session().push(item.client_handle, 21.5f32);

    assert!(first.lock().is_empty());
    assert_eq!(*second.lock(), vec![("Temp".to_string(), Variant::Float(21.5))]);
    assert_eq!(provider.last_session().monitored_items().len(), 1);
}

#[tokio::test]
async fn test_incremental_add_after_activation() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    client.add_item("A", "ns=2;s=A").unwrap();
    let (seen, callback) = recorder();
    client.activate(Arc::clone(&callback)).await.unwrap();

    let b = client.add_item("B", "ns=2;s=B").unwrap();
    assert_eq!(client.activate(callback).await.unwrap(), 1);

    let session = provider.last_session();
    let submissions = session.submissions.lock().clone();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1], vec![b.clone()]);

    session.push(b.client_handle, true);
    assert_eq!(*seen.lock(), vec![("B".to_string(), Variant::Boolean(true))]);
}

#[tokio::test]
async fn test_unregistered_callback_drops_notifications() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    let item = client.add_item("Temp", "ns=2;s=Temp").unwrap();
    let (seen, callback) = recorder();
    client.activate(callback).await.unwrap();

    assert!(client.unregister_callback());
    provider.last_session().push(item.client_handle, 1u16);

    assert!(seen.lock().is_empty());
    assert_eq!(client.stats().subscription.notifications_dropped, 1);
}

#[tokio::test]
async fn test_panicking_callback_does_not_stop_delivery() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    let item = client.add_item("Temp", "ns=2;s=Temp").unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client
        .activate(Arc::new(move |_: &MonitoredItem, event: &DataChangeEvent| {
            if event.value.value == Variant::Int32(0) {
                panic!("division by zero in user code");
            }
            sink.lock().push(event.value.value.clone());
        }))
        .await
        .unwrap();

    let session = provider.last_session();
    session.push(item.client_handle, 0i32);
    session.push(item.client_handle, 5i32);

    assert_eq!(*seen.lock(), vec![Variant::Int32(5)]);
    assert_eq!(client.stats().subscription.callback_failures, 1);
}

// =============================================================================
// Reconnect / disconnect
// =============================================================================

#[tokio::test]
async fn test_reconnect_closes_previous_session_and_resubmits() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    client.add_item("A", "ns=2;s=A").unwrap();
    let (_seen, callback) = recorder();
    client.activate(Arc::clone(&callback)).await.unwrap();
    let first = provider.last_session();

    client.connect(ADDRESS).await.unwrap();
    let second = provider.last_session();

    assert!(first.is_closed());
    assert_eq!(*first.deleted_subscriptions.lock(), vec![1]);
    assert!(!second.is_closed());
    assert_eq!(client.subscription_state(), SubscriptionState::Ready);
    assert_eq!(client.stats().subscription.pending_items, 1);

    assert_eq!(client.activate(callback).await.unwrap(), 1);
    assert_eq!(second.monitored_items().len(), 1);
}

#[tokio::test]
async fn test_disconnect_tears_down() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    client.add_item("A", "ns=2;s=A").unwrap();
    let (_seen, callback) = recorder();
    client.activate(Arc::clone(&callback)).await.unwrap();

    client.disconnect().await;

    let session = provider.last_session();
    assert!(session.is_closed());
    assert!(!client.is_connected());
    assert_eq!(client.session_state(), SessionState::Disconnected);
    assert_eq!(client.subscription_state(), SubscriptionState::Detached);
    assert!(matches!(
        client.activate(callback).await.unwrap_err(),
        UaClientError::NotConnected
    ));

    let stats = client.stats();
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.disconnects, 1);
}

#[tokio::test]
async fn test_failed_reconnect_drops_previous_session() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    client.connect(ADDRESS).await.unwrap();
    let first = provider.last_session();

    provider.set_discovery_failure(ProviderError::unreachable("host down"));
    assert!(client.connect(ADDRESS).await.is_err());

    assert!(first.is_closed());
    assert!(!client.is_connected());
    assert_eq!(client.session_state(), SessionState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_connect_during_discovery_is_failed() {
    let provider = MockProvider::with_default_endpoints();
    provider.set_discovery_delay(Duration::from_secs(1));
    let (client, provider) = client(provider);

    let cancelled =
        tokio::time::timeout(Duration::from_millis(100), client.connect(ADDRESS)).await;

    assert!(cancelled.is_err());
    assert!(!client.is_connected());
    assert_eq!(client.session_state(), SessionState::Failed);
    assert_eq!(client.stats().connect_failures, 1);

    provider.clear_discovery_delay();
    client.connect(ADDRESS).await.unwrap();
    assert_eq!(client.session_state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_connect_after_session_opened_keeps_no_session() {
    let provider = MockProvider::with_default_endpoints();
    provider.set_session_delay(Duration::from_secs(1));
    let (client, provider) = client(provider);
    client.add_item("A", "ns=2;s=A").unwrap();

    let cancelled =
        tokio::time::timeout(Duration::from_millis(100), client.connect(ADDRESS)).await;

    assert!(cancelled.is_err());
    assert_eq!(provider.session_count(), 1);
    assert!(!client.is_connected());
    assert_eq!(client.session_state(), SessionState::Failed);
    assert_eq!(client.subscription_state(), SubscriptionState::Detached);
    let (_seen, callback) = recorder();
    assert!(matches!(
        client.activate(Arc::clone(&callback)).await.unwrap_err(),
        UaClientError::NotConnected
    ));

    provider.clear_session_delay();
    client.connect(ADDRESS).await.unwrap();
    assert_eq!(client.activate(callback).await.unwrap(), 1);
    assert_eq!(provider.last_session().monitored_items().len(), 1);
}

#[tokio::test]
async fn test_concurrent_connects_are_serialized() {
    let (client, provider) = client(MockProvider::with_default_endpoints());
    let client = Arc::new(client);

    let a = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.connect(ADDRESS).await.map(|_| ()) }
    });
    let b = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.connect(ADDRESS).await.map(|_| ()) }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let sessions = provider.sessions.lock().clone();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions.iter().filter(|s| s.is_closed()).count(), 1);
    assert!(client.is_connected());
    assert_eq!(client.stats().connects, 2);
}
