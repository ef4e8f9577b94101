// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA tag subscription client.
//!
//! This crate manages the client side of an OPC UA connection: it discovers a
//! server's endpoints, picks one, negotiates certificate trust, opens a
//! session, and keeps a subscription that pushes tag value changes to
//! application code.
//!
//! The wire protocol, the secure channel handshake and certificate store
//! access live behind the [`SecureChannelProvider`] trait.
//!
//! # Components
//!
//! - [`trust`] - accept or reject server certificates during the handshake
//! - [`endpoint`] - endpoint discovery, `localhost` rewriting and selection
//! - [`session`] - the single live session and its read/write calls
//! - [`subscription`] - monitored items and activation
//! - [`dispatch`] - fan-in of data changes to the application callback
//!
//! # Error Handling
//!
//! ```text
//! UaClientError
//! ├── Configuration - Invalid identity, store or timeout settings
//! ├── Discovery     - Endpoint discovery failed or timed out
//! ├── Endpoint      - No UA TCP endpoint offered
//! ├── Session       - Session establishment failed
//! ├── Security      - Certificate rejected
//! ├── Operation     - Read/write failures
//! ├── Subscription  - Subscription failures
//! ├── Timeout       - Per-operation timeouts
//! └── NotConnected  - No session
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use uatag_client::{ClientConfig, DataChangeEvent, MonitoredItem, UaClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = UaClient::new(ClientConfig::from_file("uatag.yaml")?, MyProvider::new())?;
//!     client.connect("opc.tcp://192.168.11.90:49320").await?;
//!
//!     client.add_item("Line speed", "ns=2;s=Line1.Speed")?;
//!     client
//!         .subs_on_new_data(Arc::new(|item: &MonitoredItem, event: &DataChangeEvent| {
//!             println!("{}: {}", item.display_name, event.value.value);
//!         }))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod provider;
pub mod session;
pub mod subscription;
pub mod trust;
pub mod types;

pub use error::{
    ConfigurationError, DiscoveryError, EndpointError, ErrorCode, ErrorSeverity, OperationError,
    ProviderError, SecurityError, SessionError, SubscriptionError, TimeoutError, UaClientError,
    UaResult,
};

pub use types::{DataValue, NodeId, NodeIdentifier, SecurityMode, SecurityPolicy, StatusCode, Variant};

pub use config::{
    ApplicationType, CertificateStoreIdentifier, CertificateStoreType, ClientConfig,
    ClientConfigBuilder, SecurityConfig,
};

pub use trust::{
    AutoAcceptUntrusted, CertificateTrustPolicy, CertificateValidationEvent, CertificateValidator,
    TrustDecision,
};

pub use endpoint::{
    rewrite_local_host, replace_localhost, select_endpoint, ApplicationDescription,
    EndpointDescription, EndpointResolver, UA_TCP_TRANSPORT_PROFILE,
};

pub use provider::{
    CreatedSubscription, DiscoveryRequest, ProviderResult, SecureChannelProvider, SessionChannel,
    SessionRequest, SubscriptionParameters,
};

pub use dispatch::{
    ChannelCallback, ClientHandle, DataChangeEvent, DispatchStats, MonitoredItem,
    NotificationCallback, NotificationDispatcher, NotificationSink,
};

pub use session::{ActiveSession, SessionManager, SessionState, SessionStats};

pub use subscription::{SubscriptionManager, SubscriptionState, SubscriptionStats};

pub use client::{ClientStats, UaClient};
