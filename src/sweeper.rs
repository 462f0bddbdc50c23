// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! # Maintenance Sweeper
//!
//! Background task covering the two time-driven transitions:
//!
//! 1. Trial expiry: merchants whose trial window has passed are downgraded
//!    to the free tier and notified over SMS.
//! 2. Document reaping: content whose auto-delete instant has passed is
//!    physically removed and the record marked deleted.
//!
//! Both passes are idempotent, so the sweeper can run alongside the manual
//! `/api/admin/check-trials` trigger without double effects.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audit_log;
use crate::providers::SmsClient;
use crate::storage::{AuditEvent, AuditEventType, ContentStore, RecordStore};

/// Default interval between maintenance sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Documents reaped per storage round-trip.
const REAP_BATCH: usize = 100;

const TRIAL_ENDED_SMS: &str = "Your Paperlink trial has ended. You're now on the Free plan \
(20 docs/month). Upgrade anytime at paperlink.app/pricing";

/// Downgrade every merchant whose trial has lapsed; returns the count.
///
/// The downgrade itself is a conditional storage update, so concurrent
/// sweeps cannot downgrade the same merchant twice. SMS delivery is
/// best-effort.
pub async fn run_trial_sweep(records: &dyn RecordStore, sms: &SmsClient) -> usize {
    let expired = match records.expire_trials(Utc::now()) {
        Ok(expired) => expired,
        Err(err) => {
            warn!(error = %err, "trial sweep failed");
            return 0;
        }
    };

    for merchant in &expired {
        info!(merchant_id = %merchant.merchant_id, "trial expired, downgraded to free");
        audit_log!(
            records,
            AuditEvent::new(AuditEventType::TrialExpired).with_merchant(&merchant.merchant_id)
        );
        if let Err(err) = sms.send(&merchant.phone_number, TRIAL_ENDED_SMS).await {
            warn!(
                error = %err,
                merchant_id = %merchant.merchant_id,
                "failed to send trial expiry SMS"
            );
        }
    }

    expired.len()
}

/// Physically remove expired document content; returns the count.
///
/// The record is only marked deleted after the content delete attempt, so
/// a crash mid-pass leaves the document visible to the next sweep.
pub fn reap_expired_documents(records: &dyn RecordStore, content: &dyn ContentStore) -> usize {
    let mut reaped = 0;

    loop {
        let batch = match records.list_reapable_documents(Utc::now(), REAP_BATCH) {
            Ok(batch) => batch,
            Err(err) => {
                warn!(error = %err, "document reap listing failed");
                break;
            }
        };
        if batch.is_empty() {
            break;
        }
        let batch_len = batch.len();

        for document in batch {
            if let Err(err) = content.delete(&document.storage_key) {
                warn!(
                    error = %err,
                    key = %document.storage_key,
                    "failed to delete reaped content"
                );
            }
            match records.mark_document_deleted(&document.document_id, Utc::now()) {
                Ok(true) => reaped += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        error = %err,
                        document_id = %document.document_id,
                        "failed to mark reaped document deleted"
                    );
                }
            }
        }

        if batch_len < REAP_BATCH {
            break;
        }
    }

    reaped
}

/// Background maintenance sweeper.
pub struct Sweeper {
    records: Arc<dyn RecordStore>,
    content: Arc<dyn ContentStore>,
    sms: Arc<SmsClient>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(
        records: Arc<dyn RecordStore>,
        content: Arc<dyn ContentStore>,
        sms: Arc<SmsClient>,
    ) -> Self {
        Self {
            records,
            content,
            sms,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Override the sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Maintenance sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Maintenance sweeper shutting down");
                return;
            }

            self.sweep_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Maintenance sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep: expire trials, then reap dead documents.
    async fn sweep_step(&self) {
        let downgraded = run_trial_sweep(self.records.as_ref(), &self.sms).await;
        if downgraded > 0 {
            info!(count = downgraded, "Sweeper: downgraded expired trials");
        }

        let reaped = reap_expired_documents(self.records.as_ref(), self.content.as_ref());
        if reaped > 0 {
            info!(count = reaped, "Sweeper: reaped expired documents");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::storage::{DocumentStatus, QuotaCharge, StoredDocument, StoredMerchant};
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn seed_trial_merchant(state: &AppState, phone: &str, code: &str) -> StoredMerchant {
        let merchant =
            StoredMerchant::new(phone.to_string(), "Asha".to_string(), code.to_string());
        state.records.create_merchant(&merchant).unwrap();
        state
            .records
            .start_trial(&merchant.merchant_id, Utc::now() - ChronoDuration::days(8))
            .unwrap();
        state.records.get_merchant(&merchant.merchant_id).unwrap()
    }

    fn seed_reapable(state: &AppState, owner: &StoredMerchant, minutes_ago: i64) -> StoredDocument {
        let now = Utc::now();
        let document_id = Uuid::new_v4().to_string();
        let document = StoredDocument {
            document_id: document_id.clone(),
            owner_id: owner.merchant_id.clone(),
            document_name: "doc.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            file_size: 4,
            storage_key: format!("docs/{document_id}/doc.pdf"),
            share_link: Some(Uuid::new_v4().to_string()),
            share_link_expires_at: Some(now - ChronoDuration::minutes(minutes_ago)),
            share_view_count: 0,
            one_time_view: false,
            allow_download: true,
            customer_name: "Asha".to_string(),
            customer_phone: None,
            customer_email: None,
            order_details: None,
            due_date: None,
            status: DocumentStatus::Active,
            customer_uploaded: false,
            auto_delete_at: now - ChronoDuration::minutes(minutes_ago),
            created_at: now - ChronoDuration::minutes(minutes_ago + 5),
            updated_at: now,
            deleted_at: None,
        };
        state.content.put(&document.storage_key, b"data").unwrap();
        state
            .records
            .create_document(&document, QuotaCharge::Monthly)
            .unwrap();
        document
    }

    #[tokio::test]
    async fn trial_sweep_downgrades_and_is_idempotent() {
        let state = AppState::for_tests();
        let merchant = seed_trial_merchant(&state, "+919876543210", "PL_32101111");

        let downgraded = run_trial_sweep(state.records.as_ref(), &state.sms).await;
        assert_eq!(downgraded, 1);

        let updated = state.records.get_merchant(&merchant.merchant_id).unwrap();
        assert_eq!(updated.subscription_status.as_str(), "free");
        assert_eq!(updated.monthly_upload_limit, 20);
        // Trial usage stays recorded, blocking a second trial.
        assert!(updated.trial_started_at.is_some());

        let again = run_trial_sweep(state.records.as_ref(), &state.sms).await;
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn trial_sweep_skips_running_trials() {
        let state = AppState::for_tests();
        let merchant = StoredMerchant::new(
            "+919876543210".to_string(),
            "Asha".to_string(),
            "PL_32101111".to_string(),
        );
        state.records.create_merchant(&merchant).unwrap();
        state
            .records
            .start_trial(&merchant.merchant_id, Utc::now())
            .unwrap();

        let downgraded = run_trial_sweep(state.records.as_ref(), &state.sms).await;
        assert_eq!(downgraded, 0);

        let updated = state.records.get_merchant(&merchant.merchant_id).unwrap();
        assert_eq!(updated.subscription_status.as_str(), "trial");
    }

    #[tokio::test]
    async fn reap_removes_content_and_marks_deleted() {
        let state = AppState::for_tests();
        let merchant = StoredMerchant::new(
            "+919876543210".to_string(),
            "Asha".to_string(),
            "PL_32101111".to_string(),
        );
        state.records.create_merchant(&merchant).unwrap();
        let dead = seed_reapable(&state, &merchant, 10);
        let alive = seed_reapable(&state, &merchant, -60);

        let reaped = reap_expired_documents(state.records.as_ref(), state.content.as_ref());
        assert_eq!(reaped, 1);

        assert!(!state.content.exists(&dead.storage_key).unwrap());
        assert!(state.content.exists(&alive.storage_key).unwrap());

        let stored = state.records.get_document(&dead.document_id).unwrap();
        assert_eq!(stored.status, DocumentStatus::Deleted);
        assert!(stored.deleted_at.is_some());

        let again = reap_expired_documents(state.records.as_ref(), state.content.as_ref());
        assert_eq!(again, 0);
    }
}
