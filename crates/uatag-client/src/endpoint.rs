// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Endpoint discovery and selection.
//!
//! [`EndpointResolver`] asks the server's discovery service for its endpoint
//! list, rewrites `localhost` placeholders to the host that was actually
//! dialled, and picks one endpoint with [`select_endpoint`].
//!
//! Selection only considers the UA TCP binary transport. With an application
//! certificate the most secure endpoint wins; without one the least secure
//! endpoint wins, because a secured channel could not be opened anyway.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ConfigurationError, DiscoveryError, EndpointError, UaResult};
use crate::provider::{DiscoveryRequest, SecureChannelProvider};
use crate::types::{SecurityMode, SecurityPolicy};

/// Transport profile URI of the UA TCP binary transport.
pub const UA_TCP_TRANSPORT_PROFILE: &str =
    "http://opcfoundation.org/UA-Profile/Transport/uatcp-uasc-uabinary";

const LOCALHOST: &str = "localhost";

// =============================================================================
// Endpoint descriptors
// =============================================================================

/// Server application record attached to each endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationDescription {
    /// Server application URI.
    pub application_uri: String,
    /// Server application name.
    pub application_name: String,
    /// Discovery URLs advertised by the server.
    #[serde(default)]
    pub discovery_urls: Vec<String>,
}

/// One endpoint offered by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescription {
    /// Endpoint URL.
    pub endpoint_url: String,
    /// Message security mode.
    pub security_mode: SecurityMode,
    /// Security policy.
    pub security_policy: SecurityPolicy,
    /// Server-assigned security ranking; higher is stronger.
    pub security_level: u8,
    /// Transport profile URI.
    pub transport_profile_uri: String,
    /// Server application description.
    #[serde(default)]
    pub server: ApplicationDescription,
}

impl EndpointDescription {
    /// Creates a UA TCP binary endpoint.
    pub fn ua_tcp(
        endpoint_url: impl Into<String>,
        security_mode: SecurityMode,
        security_policy: SecurityPolicy,
        security_level: u8,
    ) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            security_mode,
            security_policy,
            security_level,
            transport_profile_uri: UA_TCP_TRANSPORT_PROFILE.to_string(),
            server: ApplicationDescription::default(),
        }
    }

    /// Sets the transport profile URI.
    pub fn with_transport_profile(mut self, uri: impl Into<String>) -> Self {
        self.transport_profile_uri = uri.into();
        self
    }

    /// Sets the server description.
    pub fn with_server(mut self, server: ApplicationDescription) -> Self {
        self.server = server;
        self
    }

    /// Returns `true` if this endpoint uses the UA TCP binary transport.
    #[inline]
    pub fn is_ua_tcp(&self) -> bool {
        self.transport_profile_uri == UA_TCP_TRANSPORT_PROFILE
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Picks the endpoint to connect to.
///
/// Only UA TCP binary endpoints are considered. The first one seeds the
/// choice; a later one replaces it only with a strictly higher security level
/// (with a certificate) or strictly lower (without), so ties keep the earliest.
///
/// # Examples
///
/// ```
/// use uatag_client::endpoint::{select_endpoint, EndpointDescription};
/// use uatag_client::types::{SecurityMode, SecurityPolicy};
///
/// let endpoints = vec![
///     EndpointDescription::ua_tcp("opc.tcp://plc:4840", SecurityMode::None, SecurityPolicy::None, 0),
///     EndpointDescription::ua_tcp(
///         "opc.tcp://plc:4840",
///         SecurityMode::SignAndEncrypt,
///         SecurityPolicy::Basic256Sha256,
///         120,
///     ),
/// ];
///
/// assert_eq!(select_endpoint(&endpoints, true).unwrap().security_level, 120);
/// assert_eq!(select_endpoint(&endpoints, false).unwrap().security_level, 0);
/// ```
pub fn select_endpoint(
    endpoints: &[EndpointDescription],
    have_certificate: bool,
) -> Option<&EndpointDescription> {
    endpoints
        .iter()
        .filter(|endpoint| endpoint.is_ua_tcp())
        .fold(None, |best: Option<&EndpointDescription>, endpoint| match best {
            None => Some(endpoint),
            Some(current) => {
                let better = if have_certificate {
                    endpoint.security_level > current.security_level
                } else {
                    endpoint.security_level < current.security_level
                };
                if better {
                    Some(endpoint)
                } else {
                    Some(current)
                }
            }
        })
}

// =============================================================================
// Localhost rewriting
// =============================================================================

/// Replaces a `localhost` host in `url` with `host`.
///
/// Only the parsed host is compared, case-insensitively. A URL that does not
/// parse, has no host, or names any other host is returned unchanged, so
/// applying the rewrite twice gives the same result as applying it once.
pub fn replace_localhost(url: &str, host: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let is_localhost = parsed
        .host_str()
        .is_some_and(|current| current.eq_ignore_ascii_case(LOCALHOST));
    if !is_localhost {
        return url.to_string();
    }

    match parsed.set_host(Some(host)) {
        Ok(()) => parsed.into(),
        Err(e) => {
            tracing::warn!(url = %url, host = %host, error = %e, "Cannot rewrite localhost");
            url.to_string()
        }
    }
}

/// Rewrites `localhost` in every endpoint URL and server discovery URL.
pub fn rewrite_local_host(endpoints: &mut [EndpointDescription], host: &str) {
    for endpoint in endpoints.iter_mut() {
        endpoint.endpoint_url = replace_localhost(&endpoint.endpoint_url, host);
        for url in endpoint.server.discovery_urls.iter_mut() {
            *url = replace_localhost(url, host);
        }
    }
}

/// Parses a discovery address and returns its DNS host.
pub fn discovery_host(address: &str) -> UaResult<String> {
    let url = Url::parse(address)
        .map_err(|e| ConfigurationError::invalid_endpoint(address, e.to_string()))?;
    url.host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigurationError::invalid_endpoint(address, "URL has no host").into())
}

// =============================================================================
// EndpointResolver
// =============================================================================

/// Discovers and selects server endpoints through a provider.
pub struct EndpointResolver<P: SecureChannelProvider> {
    provider: Arc<P>,
}

impl<P: SecureChannelProvider> EndpointResolver<P> {
    /// Creates a resolver backed by `provider`.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Queries the discovery service at `address`.
    ///
    /// The call is bounded by `timeout` and never retried. Returned endpoint
    /// and discovery URLs have `localhost` replaced by the host of `address`.
    pub async fn discover_endpoints(
        &self,
        config: &ClientConfig,
        address: &str,
        timeout: Duration,
    ) -> UaResult<Vec<EndpointDescription>> {
        let host = discovery_host(address)?;
        let request = DiscoveryRequest {
            discovery_url: address.to_string(),
            application_uri: config.application_uri.clone(),
            timeout,
        };

        tracing::debug!(address = %address, timeout = ?timeout, "Discovering endpoints");

        let mut endpoints =
            match tokio::time::timeout(timeout, self.provider.get_endpoints(&request)).await {
                Ok(Ok(endpoints)) => endpoints,
                Ok(Err(e)) => {
                    tracing::error!(address = %address, error = %e, "OPC UA server not found");
                    return Err(DiscoveryError::failed(address, e).into());
                }
                Err(_) => {
                    tracing::error!(
                        address = %address,
                        timeout = ?timeout,
                        "OPC UA server not found: discovery timed out"
                    );
                    return Err(DiscoveryError::timed_out(address, timeout).into());
                }
            };

        rewrite_local_host(&mut endpoints, &host);

        tracing::debug!(address = %address, count = endpoints.len(), "Discovered endpoints");
        Ok(endpoints)
    }

    /// Discovers endpoints at `address` and selects one.
    pub async fn resolve(
        &self,
        config: &ClientConfig,
        address: &str,
        have_certificate: bool,
    ) -> UaResult<EndpointDescription> {
        let endpoints = self
            .discover_endpoints(config, address, config.discovery_timeout)
            .await?;

        let selected = select_endpoint(&endpoints, have_certificate).ok_or_else(|| {
            tracing::error!(
                address = %address,
                candidates = endpoints.len(),
                "No endpoint uses the UA TCP binary transport"
            );
            EndpointError::no_compatible(address, UA_TCP_TRANSPORT_PROFILE, endpoints.len())
        })?;

        tracing::info!(
            endpoint = %selected.endpoint_url,
            security_mode = %selected.security_mode,
            security_policy = %selected.security_policy,
            security_level = selected.security_level,
            "Selected endpoint"
        );

        Ok(selected.clone())
    }
}

impl<P: SecureChannelProvider> Clone for EndpointResolver<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
