// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Audit logging for security-sensitive operations.
//!
//! Authentication events, document lifecycle changes, and billing
//! transitions are appended to the record store and mirrored to the
//! structured log. Append failures are swallowed at the call site: an
//! audit miss never fails the request that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Auth events
    OtpSent,
    OtpVerified,
    MerchantRegistered,

    // Document events
    DocumentUploaded,
    DocumentDeleted,
    CustomerUploadReceived,

    // Billing events
    TrialStarted,
    PaymentVerified,
    TrialExpired,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::OtpSent => "otp_sent",
            AuditEventType::OtpVerified => "otp_verified",
            AuditEventType::MerchantRegistered => "merchant_registered",
            AuditEventType::DocumentUploaded => "document_uploaded",
            AuditEventType::DocumentDeleted => "document_deleted",
            AuditEventType::CustomerUploadReceived => "customer_upload_received",
            AuditEventType::TrialStarted => "trial_started",
            AuditEventType::PaymentVerified => "payment_verified",
            AuditEventType::TrialExpired => "trial_expired",
        }
    }
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Merchant who triggered the event (if known).
    pub merchant_id: Option<String>,
    /// Affected resource (document ID, OTP ID, payment ID).
    pub resource_id: Option<String>,
    /// Whether the operation succeeded.
    pub success: bool,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            merchant_id: None,
            resource_id: None,
            success: true,
        }
    }

    /// Set the merchant ID.
    pub fn with_merchant(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    /// Set the affected resource.
    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Mark as failed.
    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}

/// Append an audit event to the store, best effort.
///
/// The event is always emitted to the structured log; a store append
/// failure is downgraded to a warning.
#[macro_export]
macro_rules! audit_log {
    ($store:expr, $event:expr) => {{
        let event: $crate::storage::AuditEvent = $event;
        tracing::info!(
            target: "audit",
            event_type = event.event_type.as_str(),
            merchant_id = event.merchant_id.as_deref().unwrap_or("-"),
            resource_id = event.resource_id.as_deref().unwrap_or("-"),
            success = event.success,
            "audit event"
        );
        if let Err(err) = $store.append_audit(&event) {
            tracing::warn!(error = %err, "failed to persist audit event");
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_audit_event() {
        let event = AuditEvent::new(AuditEventType::DocumentUploaded)
            .with_merchant("merchant_123")
            .with_resource("doc_abc");

        assert_eq!(event.event_type, AuditEventType::DocumentUploaded);
        assert_eq!(event.merchant_id, Some("merchant_123".to_string()));
        assert_eq!(event.resource_id, Some("doc_abc".to_string()));
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::OtpVerified)
            .with_merchant("merchant_123")
            .failed();

        assert!(!event.success);
    }

    #[test]
    fn event_type_wire_names() {
        assert_eq!(AuditEventType::OtpSent.as_str(), "otp_sent");
        assert_eq!(
            AuditEventType::CustomerUploadReceived.as_str(),
            "customer_upload_received"
        );
        assert_eq!(
            serde_json::to_value(AuditEventType::TrialExpired).unwrap(),
            serde_json::json!("trial_expired")
        );
    }
}
