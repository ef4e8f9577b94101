// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server certificate trust decisions.
//!
//! During the security handshake the secure channel provider validates the
//! server certificate against the configured trust lists. When that check
//! fails it asks the registered [`CertificateValidator`] whether to accept the
//! certificate anyway. With no validator registered the certificate is
//! rejected.
//!
//! [`AutoAcceptUntrusted`] accepts exactly one failure reason,
//! `BadCertificateUntrusted`. Expired, revoked, malformed or mismatched
//! certificates are always rejected.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::SecurityError;
use crate::types::StatusCode;

// =============================================================================
// CertificateValidationEvent
// =============================================================================

/// A failed server certificate check, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateValidationEvent {
    /// Certificate subject.
    pub subject: String,
    /// SHA-1 thumbprint, hex encoded.
    pub thumbprint: String,
    /// Reason the certificate failed validation.
    pub status: StatusCode,
}

impl CertificateValidationEvent {
    /// Creates a new validation event.
    pub fn new(
        subject: impl Into<String>,
        thumbprint: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            subject: subject.into(),
            thumbprint: thumbprint.into(),
            status,
        }
    }

    /// Converts a rejection into a security error.
    pub fn rejection(&self) -> SecurityError {
        SecurityError::certificate_rejected(self.subject.clone(), self.status)
    }
}

// =============================================================================
// TrustDecision
// =============================================================================

/// Outcome of a trust check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustDecision {
    /// Continue the handshake with this certificate.
    Accept,
    /// Abort the handshake.
    Reject,
}

impl TrustDecision {
    /// Returns `true` for [`TrustDecision::Accept`].
    #[inline]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

impl fmt::Display for TrustDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

// =============================================================================
// CertificateValidator
// =============================================================================

/// Decides whether a certificate that failed validation may still be used.
///
/// Called synchronously from inside the provider's handshake, so
/// implementations must not block.
pub trait CertificateValidator: Send + Sync + fmt::Debug {
    /// Returns the decision for the given failure.
    fn validate(&self, event: &CertificateValidationEvent) -> TrustDecision;
}

/// Accepts server certificates whose only problem is not being in the trusted
/// peer list.
#[derive(Debug, Default)]
pub struct AutoAcceptUntrusted {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl AutoAcceptUntrusted {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of certificates accepted so far.
    pub fn accepted_count(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Number of certificates rejected so far.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl CertificateValidator for AutoAcceptUntrusted {
    fn validate(&self, event: &CertificateValidationEvent) -> TrustDecision {
        if event.status == StatusCode::BAD_CERTIFICATE_UNTRUSTED {
            self.accepted.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                subject = %event.subject,
                thumbprint = %event.thumbprint,
                "Accepted untrusted server certificate"
            );
            TrustDecision::Accept
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                subject = %event.subject,
                thumbprint = %event.thumbprint,
                status = %event.status,
                "Rejected server certificate"
            );
            TrustDecision::Reject
        }
    }
}

// =============================================================================
// CertificateTrustPolicy
// =============================================================================

/// Trust policy for one connection attempt.
///
/// The auto-accept validator is only installed when the configuration asks
/// for it and the application certificate exists.
#[derive(Debug, Clone)]
pub struct CertificateTrustPolicy {
    auto_accept: bool,
    have_application_certificate: bool,
}

impl CertificateTrustPolicy {
    /// Creates a policy from the configuration and the certificate lookup result.
    pub fn new(config: &ClientConfig, have_application_certificate: bool) -> Self {
        Self {
            auto_accept: config.security.auto_accept_untrusted_certificates,
            have_application_certificate,
        }
    }

    /// Returns `true` if untrusted certificates will be auto-accepted.
    pub fn is_active(&self) -> bool {
        self.auto_accept && self.have_application_certificate
    }

    /// Returns `true` if the application certificate was found.
    pub fn have_application_certificate(&self) -> bool {
        self.have_application_certificate
    }

    /// Returns the validator to register with the provider, if any.
    pub fn validator(&self) -> Option<Arc<dyn CertificateValidator>> {
        if self.is_active() {
            Some(Arc::new(AutoAcceptUntrusted::new()))
        } else {
            None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event(status: StatusCode) -> CertificateValidationEvent {
        CertificateValidationEvent::new("CN=plc-07", "A1B2C3", status)
    }

    #[test]
    fn test_accepts_only_untrusted() {
        let validator = AutoAcceptUntrusted::new();

        assert_eq!(
            validator.validate(&event(StatusCode::BAD_CERTIFICATE_UNTRUSTED)),
            TrustDecision::Accept
        );
        for status in [
            StatusCode::BAD_CERTIFICATE_TIME_INVALID,
            StatusCode::BAD_CERTIFICATE_REVOKED,
            StatusCode::BAD_CERTIFICATE_INVALID,
            StatusCode::BAD_CERTIFICATE_HOST_NAME_INVALID,
            StatusCode::GOOD,
        ] {
            assert_eq!(validator.validate(&event(status)), TrustDecision::Reject);
        }

        assert_eq!(validator.accepted_count(), 1);
        assert_eq!(validator.rejected_count(), 5);
    }

    #[test]
    fn test_policy_requires_flag_and_certificate() {
        let config = ClientConfig::default();
        assert!(CertificateTrustPolicy::new(&config, true).validator().is_some());
        assert!(CertificateTrustPolicy::new(&config, false).validator().is_none());

        let mut config = ClientConfig::default();
        config.security.auto_accept_untrusted_certificates = false;
        let policy = CertificateTrustPolicy::new(&config, true);
        assert!(!policy.is_active());
        assert!(policy.validator().is_none());
    }

    #[test]
    fn test_rejection_error() {
        let err = event(StatusCode::BAD_CERTIFICATE_REVOKED).rejection();
        assert!(err.to_string().contains("CN=plc-07"));
        assert!(err.to_string().contains("BadCertificateRevoked"));
    }
}
