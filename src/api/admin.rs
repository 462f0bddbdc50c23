// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Operational endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{state::AppState, sweeper};

/// Trial check response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckTrialsResponse {
    pub success: bool,
    pub downgraded_count: usize,
}

/// Manually run the trial-expiry sweep.
///
/// Idempotent with the background sweeper; re-running never downgrades a
/// merchant twice.
#[utoipa::path(
    post,
    path = "/api/admin/check-trials",
    tag = "Admin",
    responses((status = 200, description = "Sweep completed", body = CheckTrialsResponse))
)]
pub async fn check_trials(State(state): State<AppState>) -> Json<CheckTrialsResponse> {
    let downgraded_count = sweeper::run_trial_sweep(state.records.as_ref(), &state.sms).await;
    Json(CheckTrialsResponse {
        success: true,
        downgraded_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoredMerchant;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn check_trials_reports_downgrade_count() {
        let state = AppState::for_tests();
        let merchant = StoredMerchant::new(
            "+919876543210".to_string(),
            "Asha".to_string(),
            "PL_32101111".to_string(),
        );
        state.records.create_merchant(&merchant).unwrap();
        state
            .records
            .start_trial(&merchant.merchant_id, Utc::now() - Duration::days(8))
            .unwrap();

        let Json(response) = check_trials(State(state.clone())).await;
        assert!(response.success);
        assert_eq!(response.downgraded_count, 1);

        let Json(rerun) = check_trials(State(state)).await;
        assert_eq!(rerun.downgraded_count, 0);
    }
}
