// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! # API Data Models
//!
//! Response structures shared across handler modules. All types derive
//! `Serialize` and `ToSchema` for JSON handling and OpenAPI documentation;
//! request bodies and endpoint-specific responses live next to their
//! handlers.
//!
//! ## Model Categories
//!
//! - **MerchantProfile**: the `user` object returned by every
//!   verification path
//! - **PlanInfo**: the static subscription plan catalog

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::records::{
    StoredMerchant, SubscriptionStatus, FREE_MONTHLY_LIMIT, TRIAL_PERIOD_DAYS,
    UNLIMITED_MONTHLY_LIMIT,
};

/// Monthly price of the unlimited plan in rupees.
pub const UNLIMITED_PLAN_PRICE_RUPEES: u32 = 250;

// =============================================================================
// Merchant Profile
// =============================================================================

/// Public view of a merchant account.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MerchantProfile {
    pub id: String,
    pub phone_number: String,
    pub owner_name: String,
    pub shop_name: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    /// Public portal key; doubles as the referral code
    pub merchant_code: String,
    pub onboarding_completed: bool,
    pub subscription_status: SubscriptionStatus,
    pub monthly_upload_limit: u32,
    pub uploads_used_this_month: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<DateTime<Utc>>,
}

impl From<&StoredMerchant> for MerchantProfile {
    fn from(merchant: &StoredMerchant) -> Self {
        Self {
            id: merchant.merchant_id.clone(),
            phone_number: merchant.phone_number.clone(),
            owner_name: merchant.owner_name.clone(),
            shop_name: merchant.shop_name.clone(),
            city: merchant.city.clone(),
            state: merchant.state.clone(),
            pincode: merchant.pincode.clone(),
            merchant_code: merchant.merchant_code.clone(),
            onboarding_completed: merchant.onboarding_completed,
            subscription_status: merchant.subscription_status,
            monthly_upload_limit: merchant.monthly_upload_limit,
            uploads_used_this_month: merchant.uploads_used_this_month,
            trial_ends_at: merchant.trial_ends_at,
        }
    }
}

// =============================================================================
// Subscription Plans
// =============================================================================

/// One entry of the static plan catalog.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanInfo {
    pub id: String,
    pub name: String,
    /// Monthly price in rupees
    pub price: u32,
    pub monthly_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_days: Option<u32>,
    pub features: Vec<String>,
}

/// The full plan catalog, in display order.
pub fn plan_catalog() -> Vec<PlanInfo> {
    vec![free_plan(), unlimited_plan()]
}

pub fn unlimited_plan() -> PlanInfo {
    PlanInfo {
        id: "unlimited".to_string(),
        name: "Unlimited".to_string(),
        price: UNLIMITED_PLAN_PRICE_RUPEES,
        monthly_limit: UNLIMITED_MONTHLY_LIMIT,
        trial_days: Some(TRIAL_PERIOD_DAYS as u32),
        features: vec![
            "Unlimited documents".to_string(),
            "Custom auto-delete (5/10/15 min)".to_string(),
            "Advanced analytics".to_string(),
            "Priority support".to_string(),
        ],
    }
}

fn free_plan() -> PlanInfo {
    PlanInfo {
        id: "free".to_string(),
        name: "Free".to_string(),
        price: 0,
        monthly_limit: FREE_MONTHLY_LIMIT,
        trial_days: None,
        features: vec![
            "20 documents/month".to_string(),
            "5-minute auto-delete".to_string(),
            "Basic analytics".to_string(),
        ],
    }
}
