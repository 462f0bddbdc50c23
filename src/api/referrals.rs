// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Referral-shaped compatibility endpoint.
//!
//! There is no referral program; legacy clients still fetch this payload,
//! so it reuses the merchant code and reports zeroed stats.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{auth::Auth, error::ApiError, qr, state::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct ReferralCodeResponse {
    pub success: bool,
    pub referral: ReferralInfo,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralInfo {
    /// The caller's merchant code.
    pub code: String,
    /// Customer-upload portal URL for the code.
    pub referral_link: String,
    /// SVG QR code of the portal URL, as a data: URL.
    pub qr_code: String,
    pub referrals_count: u32,
    pub rewards_earned: u32,
    pub referrals: Vec<serde_json::Value>,
}

/// Return the caller's merchant code in the legacy referral shape.
#[utoipa::path(
    get,
    path = "/api/referrals/my-code",
    tag = "Referrals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Referral payload", body = ReferralCodeResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn my_referral_code(
    Auth(merchant): Auth,
    State(state): State<AppState>,
) -> Result<Json<ReferralCodeResponse>, ApiError> {
    let referral_link = state.config.portal_url(&merchant.merchant_code);
    let qr_code = qr::data_url(&referral_link)?;

    Ok(Json(ReferralCodeResponse {
        success: true,
        referral: ReferralInfo {
            code: merchant.merchant_code,
            referral_link,
            qr_code,
            referrals_count: 0,
            rewards_earned: 0,
            referrals: Vec::new(),
        },
    }))
}
