// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Merchant dashboard statistics.

use axum::{extract::State, Json};
use chrono::{Datelike, Duration, TimeZone, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{auth::Auth, error::ApiError, state::AppState};

/// Number of recent documents the rolling stats are computed over.
const STATS_WINDOW: usize = 1000;

/// Dashboard statistics response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatsResponse {
    pub success: bool,
    pub stats: DashboardStats,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub documents: DocumentStats,
    pub subscription: SubscriptionStats,
    /// Reserved for a future activity feed; always empty.
    pub recent_activity: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    /// Active documents owned by the caller.
    pub total_uploaded: usize,
    /// Uploads since the start of the current calendar month.
    pub this_month: usize,
    /// Uploads in the trailing seven days.
    pub this_week: usize,
    /// Sum of share-view counters.
    pub total_views: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStats {
    pub plan: String,
    pub monthly_limit: u32,
    pub used: u32,
    pub remaining: u32,
}

/// Aggregate upload and view statistics for the caller.
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStatsResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn dashboard_stats(
    Auth(merchant): Auth,
    State(state): State<AppState>,
) -> Result<Json<DashboardStatsResponse>, ApiError> {
    let total_uploaded = state
        .records
        .count_documents_by_owner(&merchant.merchant_id)
        .map_err(|e| ApiError::internal(format!("Failed to count documents: {e}")))?;
    let documents = state
        .records
        .list_documents_by_owner(&merchant.merchant_id, STATS_WINDOW, 0)
        .map_err(|e| ApiError::internal(format!("Failed to list documents: {e}")))?;

    let now = Utc::now();
    let month_start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let week_start = now - Duration::days(7);

    let mut this_month = 0;
    let mut this_week = 0;
    let mut total_views: u64 = 0;
    for document in &documents {
        if document.created_at >= month_start {
            this_month += 1;
        }
        if document.created_at >= week_start {
            this_week += 1;
        }
        total_views += u64::from(document.share_view_count);
    }

    Ok(Json(DashboardStatsResponse {
        success: true,
        stats: DashboardStats {
            documents: DocumentStats {
                total_uploaded,
                this_month,
                this_week,
                total_views,
            },
            subscription: SubscriptionStats {
                plan: merchant.subscription_status.as_str().to_string(),
                monthly_limit: merchant.monthly_upload_limit,
                used: merchant.uploads_used_this_month,
                remaining: merchant
                    .monthly_upload_limit
                    .saturating_sub(merchant.uploads_used_this_month),
            },
            recent_activity: Vec::new(),
        },
    }))
}
