// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Stored record types shared by every `RecordStore` implementation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Free-tier monthly upload allowance.
pub const FREE_MONTHLY_LIMIT: u32 = 20;

/// Effectively-unbounded allowance for trial/unlimited tiers.
pub const UNLIMITED_MONTHLY_LIMIT: u32 = 999_999;

/// OTP challenges stay verifiable for this long after issuance.
pub const OTP_VALIDITY_SECONDS: i64 = 600;

/// Wrong-code attempts allowed per challenge before it is locked out.
pub const OTP_MAX_ATTEMPTS: u32 = 5;

/// Length of the one-per-lifetime unlimited trial.
pub const TRIAL_PERIOD_DAYS: i64 = 7;

/// Subscription tier of a merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Free tier with the default monthly quota
    Free,
    /// Time-boxed unlimited trial
    Trial,
    /// Paid unlimited plan
    Unlimited,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::Free
    }
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Trial => "trial",
            Self::Unlimited => "unlimited",
        }
    }
}

/// Document lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Visible to its owner and (while unexpired) via its share link
    Active,
    /// Soft-deleted; excluded from every lookup path
    Deleted,
}

impl Default for DocumentStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A merchant account, one per phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMerchant {
    /// Unique merchant identifier (UUID)
    pub merchant_id: String,
    /// Canonical phone number (`+91` + 10 digits)
    pub phone_number: String,
    /// Display name of the shop owner
    pub owner_name: String,
    /// Shop name, filled during onboarding
    pub shop_name: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub business_category: String,
    /// Public customer-upload portal key; unique and immutable
    pub merchant_code: String,
    pub subscription_status: SubscriptionStatus,
    pub monthly_upload_limit: u32,
    pub uploads_used_this_month: u32,
    /// Lifetime upload counter (merchant and customer-portal uploads)
    pub documents_uploaded: u64,
    /// Session-provider subject, when the account was linked via that path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerk_user_id: Option<String>,
    pub onboarding_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

impl StoredMerchant {
    /// New free-tier merchant for a previously-unseen phone number.
    pub fn new(phone_number: String, owner_name: String, merchant_code: String) -> Self {
        let now = Utc::now();
        Self {
            merchant_id: uuid::Uuid::new_v4().to_string(),
            phone_number,
            owner_name,
            shop_name: String::new(),
            city: String::new(),
            state: "Assam".to_string(),
            pincode: String::new(),
            business_category: "print_shop".to_string(),
            merchant_code,
            subscription_status: SubscriptionStatus::Free,
            monthly_upload_limit: FREE_MONTHLY_LIMIT,
            uploads_used_this_month: 0,
            documents_uploaded: 0,
            clerk_user_id: None,
            onboarding_completed: false,
            trial_started_at: None,
            trial_ends_at: None,
            subscription_payment_id: None,
            subscription_started_at: None,
            created_at: now,
            updated_at: now,
            last_login_at: now,
        }
    }

    /// Whether another monthly-quota upload is allowed.
    pub fn has_quota_remaining(&self) -> bool {
        self.uploads_used_this_month < self.monthly_upload_limit
    }
}

/// Onboarding profile fields applied by the register endpoint.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub owner_name: String,
    pub shop_name: String,
    pub city: String,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub business_category: Option<String>,
}

/// One OTP issuance for a phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredOtpChallenge {
    pub otp_id: String,
    pub phone_number: String,
    /// SHA-256 digest of the code, base64-encoded
    pub code_hash: String,
    /// Plaintext code, present only when dev mode is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plaintext_code: Option<String>,
    /// Failed verification attempts against this challenge
    pub attempts: u32,
    pub sent_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl StoredOtpChallenge {
    pub fn new(phone_number: String, code_hash: String, plaintext_code: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            otp_id: uuid::Uuid::new_v4().to_string(),
            phone_number,
            code_hash,
            plaintext_code,
            attempts: 0,
            sent_at: now,
            expires_at: now + Duration::seconds(OTP_VALIDITY_SECONDS),
            verified_at: None,
        }
    }

    /// Eligible for verification: unexpired and not yet consumed.
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.verified_at.is_none() && self.expires_at > now
    }
}

/// One uploaded document and its share-link lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub document_id: String,
    /// Owning merchant id
    pub owner_id: String,
    pub document_name: String,
    pub content_type: String,
    pub file_size: u64,
    /// Content-store key (`docs/{id}/{name}` or `customer-uploads/{id}/{name}`)
    pub storage_key: String,
    /// Public share token; never derived from the document id.
    /// Absent for customer-portal uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_link_expires_at: Option<DateTime<Utc>>,
    pub share_view_count: u32,
    pub one_time_view: bool,
    pub allow_download: bool,
    pub customer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub status: DocumentStatus,
    /// True when uploaded through the public portal rather than by the owner
    pub customer_uploaded: bool,
    /// Content becomes eligible for physical reaping after this instant
    pub auto_delete_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl StoredDocument {
    pub fn is_active(&self) -> bool {
        self.status == DocumentStatus::Active
    }

    /// Seconds until the share link expires, floored at zero.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        self.share_link_expires_at
            .map(|expiry| (expiry - now).num_seconds().max(0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_merchant_defaults_to_free_tier() {
        let merchant = StoredMerchant::new(
            "+919876543210".to_string(),
            "Asha".to_string(),
            "PL_32101234".to_string(),
        );
        assert_eq!(merchant.subscription_status, SubscriptionStatus::Free);
        assert_eq!(merchant.monthly_upload_limit, FREE_MONTHLY_LIMIT);
        assert_eq!(merchant.uploads_used_this_month, 0);
        assert!(!merchant.onboarding_completed);
        assert_eq!(merchant.state, "Assam");
        assert_eq!(merchant.business_category, "print_shop");
        assert!(merchant.has_quota_remaining());
    }

    #[test]
    fn quota_exhausts_at_limit() {
        let mut merchant = StoredMerchant::new(
            "+919876543210".to_string(),
            "Asha".to_string(),
            "PL_32101234".to_string(),
        );
        merchant.uploads_used_this_month = merchant.monthly_upload_limit;
        assert!(!merchant.has_quota_remaining());
    }

    #[test]
    fn otp_challenge_pending_window() {
        let otp = StoredOtpChallenge::new("+919876543210".to_string(), "hash".to_string(), None);
        let now = Utc::now();
        assert!(otp.is_pending(now));
        assert!(!otp.is_pending(now + Duration::seconds(OTP_VALIDITY_SECONDS + 1)));

        let mut verified = otp.clone();
        verified.verified_at = Some(now);
        assert!(!verified.is_pending(now));
    }

    #[test]
    fn remaining_seconds_floors_at_zero() {
        let now = Utc::now();
        let mut doc = sample_document(now);
        doc.share_link_expires_at = Some(now - Duration::seconds(30));
        assert_eq!(doc.remaining_seconds(now), 0);

        doc.share_link_expires_at = Some(now + Duration::seconds(90));
        assert_eq!(doc.remaining_seconds(now), 90);
    }

    fn sample_document(now: DateTime<Utc>) -> StoredDocument {
        StoredDocument {
            document_id: "doc-1".to_string(),
            owner_id: "merchant-1".to_string(),
            document_name: "a.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            file_size: 4,
            storage_key: "docs/doc-1/a.pdf".to_string(),
            share_link: Some("link-1".to_string()),
            share_link_expires_at: Some(now),
            share_view_count: 0,
            one_time_view: false,
            allow_download: true,
            customer_name: "Ravi".to_string(),
            customer_phone: None,
            customer_email: None,
            order_details: None,
            due_date: None,
            status: DocumentStatus::Active,
            customer_uploaded: false,
            auto_delete_at: now,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}
