// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! In-memory record store.
//!
//! Default backend when `DATA_DIR` is unset: useful for local development
//! and tests, loses everything on restart. All maps live behind a single
//! `RwLock` so the conditional operations (quota charge, one-time-view
//! consumption, OTP consumption, trial transitions) run under one write
//! section and observe a consistent snapshot.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use super::records::{
    DocumentStatus, ProfileUpdate, StoredDocument, StoredMerchant, StoredOtpChallenge,
    SubscriptionStatus, FREE_MONTHLY_LIMIT, TRIAL_PERIOD_DAYS, UNLIMITED_MONTHLY_LIMIT,
};
use super::{
    AuditEvent, QuotaCharge, RecordStore, ShareViewOutcome, StorageError, StorageResult,
    TrialStartOutcome,
};

#[derive(Default)]
struct Inner {
    merchants: HashMap<String, StoredMerchant>,
    phone_index: HashMap<String, String>,
    code_index: HashMap<String, String>,
    otps: HashMap<String, StoredOtpChallenge>,
    documents: HashMap<String, StoredDocument>,
    share_index: HashMap<String, String>,
    audit: Vec<AuditEvent>,
}

/// Volatile [`RecordStore`] backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Lock poisoning is recovered; entries are plain owned data.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RecordStore for MemoryStore {
    fn create_merchant(&self, merchant: &StoredMerchant) -> StorageResult<()> {
        let mut inner = self.write();
        if inner.phone_index.contains_key(&merchant.phone_number) {
            return Err(StorageError::AlreadyExists(format!(
                "merchant with phone {}",
                merchant.phone_number
            )));
        }
        if inner.code_index.contains_key(&merchant.merchant_code) {
            return Err(StorageError::AlreadyExists(format!(
                "merchant code {}",
                merchant.merchant_code
            )));
        }
        inner
            .phone_index
            .insert(merchant.phone_number.clone(), merchant.merchant_id.clone());
        inner
            .code_index
            .insert(merchant.merchant_code.clone(), merchant.merchant_id.clone());
        inner
            .merchants
            .insert(merchant.merchant_id.clone(), merchant.clone());
        Ok(())
    }

    fn get_merchant(&self, merchant_id: &str) -> StorageResult<StoredMerchant> {
        self.read()
            .merchants
            .get(merchant_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("merchant {merchant_id}")))
    }

    fn find_merchant_by_phone(&self, phone: &str) -> StorageResult<Option<StoredMerchant>> {
        let inner = self.read();
        Ok(inner
            .phone_index
            .get(phone)
            .and_then(|id| inner.merchants.get(id))
            .cloned())
    }

    fn find_merchant_by_code(&self, merchant_code: &str) -> StorageResult<Option<StoredMerchant>> {
        let inner = self.read();
        Ok(inner
            .code_index
            .get(merchant_code)
            .and_then(|id| inner.merchants.get(id))
            .cloned())
    }

    fn record_login(
        &self,
        merchant_id: &str,
        now: DateTime<Utc>,
        backfill_owner_name: Option<&str>,
        clerk_user_id: Option<&str>,
    ) -> StorageResult<StoredMerchant> {
        let mut inner = self.write();
        let merchant = inner
            .merchants
            .get_mut(merchant_id)
            .ok_or_else(|| StorageError::NotFound(format!("merchant {merchant_id}")))?;
        merchant.last_login_at = now;
        merchant.updated_at = now;
        if let Some(name) = backfill_owner_name {
            if merchant.owner_name.is_empty() {
                merchant.owner_name = name.to_string();
            }
        }
        if let Some(id) = clerk_user_id {
            merchant.clerk_user_id = Some(id.to_string());
        }
        Ok(merchant.clone())
    }

    fn complete_profile(
        &self,
        merchant_id: &str,
        profile: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredMerchant> {
        let mut inner = self.write();
        let merchant = inner
            .merchants
            .get_mut(merchant_id)
            .ok_or_else(|| StorageError::NotFound(format!("merchant {merchant_id}")))?;
        merchant.owner_name = profile.owner_name.clone();
        merchant.shop_name = profile.shop_name.clone();
        merchant.city = profile.city.clone();
        if let Some(state) = &profile.state {
            merchant.state = state.clone();
        }
        if let Some(pincode) = &profile.pincode {
            merchant.pincode = pincode.clone();
        }
        if let Some(category) = &profile.business_category {
            merchant.business_category = category.clone();
        }
        merchant.onboarding_completed = true;
        merchant.updated_at = now;
        Ok(merchant.clone())
    }

    fn start_trial(
        &self,
        merchant_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<TrialStartOutcome> {
        let mut inner = self.write();
        let merchant = inner
            .merchants
            .get_mut(merchant_id)
            .ok_or_else(|| StorageError::NotFound(format!("merchant {merchant_id}")))?;
        match merchant.subscription_status {
            SubscriptionStatus::Trial | SubscriptionStatus::Unlimited => {
                return Ok(TrialStartOutcome::AlreadyEntitled);
            }
            SubscriptionStatus::Free => {}
        }
        if merchant.trial_started_at.is_some() {
            return Ok(TrialStartOutcome::AlreadyUsed);
        }
        merchant.subscription_status = SubscriptionStatus::Trial;
        merchant.monthly_upload_limit = UNLIMITED_MONTHLY_LIMIT;
        merchant.trial_started_at = Some(now);
        merchant.trial_ends_at = Some(now + Duration::days(TRIAL_PERIOD_DAYS));
        merchant.updated_at = now;
        Ok(TrialStartOutcome::Started(merchant.clone()))
    }

    fn activate_unlimited(
        &self,
        merchant_id: &str,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredMerchant> {
        let mut inner = self.write();
        let merchant = inner
            .merchants
            .get_mut(merchant_id)
            .ok_or_else(|| StorageError::NotFound(format!("merchant {merchant_id}")))?;
        merchant.subscription_status = SubscriptionStatus::Unlimited;
        merchant.monthly_upload_limit = UNLIMITED_MONTHLY_LIMIT;
        merchant.subscription_payment_id = Some(payment_id.to_string());
        merchant.subscription_started_at = Some(now);
        merchant.updated_at = now;
        Ok(merchant.clone())
    }

    fn expire_trials(&self, now: DateTime<Utc>) -> StorageResult<Vec<StoredMerchant>> {
        let mut inner = self.write();
        let mut downgraded = Vec::new();
        for merchant in inner.merchants.values_mut() {
            if merchant.subscription_status != SubscriptionStatus::Trial {
                continue;
            }
            let lapsed = merchant.trial_ends_at.map(|ends| ends < now).unwrap_or(false);
            if !lapsed {
                continue;
            }
            merchant.subscription_status = SubscriptionStatus::Free;
            merchant.monthly_upload_limit = FREE_MONTHLY_LIMIT;
            merchant.updated_at = now;
            downgraded.push(merchant.clone());
        }
        Ok(downgraded)
    }

    fn create_otp(&self, challenge: &StoredOtpChallenge) -> StorageResult<()> {
        self.write()
            .otps
            .insert(challenge.otp_id.clone(), challenge.clone());
        Ok(())
    }

    fn latest_pending_otp(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<StoredOtpChallenge>> {
        let inner = self.read();
        Ok(inner
            .otps
            .values()
            .filter(|otp| otp.phone_number == phone && otp.is_pending(now))
            .max_by_key(|otp| otp.sent_at)
            .cloned())
    }

    fn record_failed_otp_attempt(&self, otp_id: &str) -> StorageResult<u32> {
        let mut inner = self.write();
        let otp = inner
            .otps
            .get_mut(otp_id)
            .ok_or_else(|| StorageError::NotFound(format!("otp {otp_id}")))?;
        otp.attempts += 1;
        Ok(otp.attempts)
    }

    fn consume_otp(&self, otp_id: &str, now: DateTime<Utc>) -> StorageResult<bool> {
        let mut inner = self.write();
        match inner.otps.get_mut(otp_id) {
            Some(otp) if otp.verified_at.is_none() => {
                otp.verified_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn create_document(
        &self,
        document: &StoredDocument,
        charge: QuotaCharge,
    ) -> StorageResult<()> {
        let mut inner = self.write();
        let merchant = inner
            .merchants
            .get_mut(&document.owner_id)
            .ok_or_else(|| StorageError::NotFound(format!("merchant {}", document.owner_id)))?;
        match charge {
            QuotaCharge::Monthly => {
                if !merchant.has_quota_remaining() {
                    return Err(StorageError::QuotaExceeded);
                }
                merchant.uploads_used_this_month += 1;
                merchant.documents_uploaded += 1;
            }
            QuotaCharge::LifetimeOnly => {
                merchant.documents_uploaded += 1;
            }
        }
        merchant.updated_at = document.created_at;
        if let Some(link) = &document.share_link {
            inner
                .share_index
                .insert(link.clone(), document.document_id.clone());
        }
        inner
            .documents
            .insert(document.document_id.clone(), document.clone());
        Ok(())
    }

    fn get_document(&self, document_id: &str) -> StorageResult<StoredDocument> {
        self.read()
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("document {document_id}")))
    }

    fn find_document_by_share_link(
        &self,
        share_link: &str,
    ) -> StorageResult<Option<StoredDocument>> {
        let inner = self.read();
        Ok(inner
            .share_index
            .get(share_link)
            .and_then(|id| inner.documents.get(id))
            .cloned())
    }

    fn list_documents_by_owner(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<StoredDocument>> {
        let inner = self.read();
        let mut documents: Vec<StoredDocument> = inner
            .documents
            .values()
            .filter(|doc| doc.owner_id == owner_id && doc.is_active())
            .cloned()
            .collect();
        documents.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.document_id.cmp(&a.document_id))
        });
        Ok(documents.into_iter().skip(offset).take(limit).collect())
    }

    fn count_documents_by_owner(&self, owner_id: &str) -> StorageResult<usize> {
        Ok(self
            .read()
            .documents
            .values()
            .filter(|doc| doc.owner_id == owner_id && doc.is_active())
            .count())
    }

    fn consume_share_view(
        &self,
        share_link: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<ShareViewOutcome> {
        let mut inner = self.write();
        let document_id = inner
            .share_index
            .get(share_link)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("share link {share_link}")))?;
        let document = inner
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| StorageError::NotFound(format!("document {document_id}")))?;
        if !document.is_active() {
            return Err(StorageError::NotFound(format!("document {document_id}")));
        }
        if let Some(expires) = document.share_link_expires_at {
            if now >= expires {
                return Ok(ShareViewOutcome::Expired);
            }
        }
        if document.one_time_view && document.share_view_count > 0 {
            return Ok(ShareViewOutcome::AlreadyConsumed);
        }
        document.share_view_count += 1;
        document.updated_at = now;
        Ok(ShareViewOutcome::Viewed(document.clone()))
    }

    fn mark_document_deleted(
        &self,
        document_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let mut inner = self.write();
        match inner.documents.get_mut(document_id) {
            Some(document) if document.is_active() => {
                document.status = DocumentStatus::Deleted;
                document.deleted_at = Some(now);
                document.updated_at = now;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }

    fn list_reapable_documents(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StorageResult<Vec<StoredDocument>> {
        let inner = self.read();
        let mut documents: Vec<StoredDocument> = inner
            .documents
            .values()
            .filter(|doc| doc.is_active() && doc.auto_delete_at <= now)
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.auto_delete_at.cmp(&b.auto_delete_at));
        documents.truncate(limit);
        Ok(documents)
    }

    fn append_audit(&self, event: &AuditEvent) -> StorageResult<()> {
        self.write().audit.push(event.clone());
        Ok(())
    }

    fn recent_audit(&self, limit: usize) -> StorageResult<Vec<AuditEvent>> {
        let inner = self.read();
        Ok(inner.audit.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::AuditEventType;
    use super::*;

    fn sample_merchant(phone: &str, code: &str) -> StoredMerchant {
        StoredMerchant::new(phone.to_string(), "Ravi".to_string(), code.to_string())
    }

    fn sample_document(owner_id: &str, name: &str, now: DateTime<Utc>) -> StoredDocument {
        StoredDocument {
            document_id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            document_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            file_size: 1024,
            storage_key: format!("docs/{name}"),
            share_link: Some(uuid::Uuid::new_v4().to_string()),
            share_link_expires_at: Some(now + Duration::minutes(5)),
            share_view_count: 0,
            one_time_view: false,
            allow_download: true,
            customer_name: "Priya".to_string(),
            customer_phone: None,
            customer_email: None,
            order_details: None,
            due_date: None,
            status: DocumentStatus::Active,
            customer_uploaded: false,
            auto_delete_at: now + Duration::minutes(5),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn create_and_find_merchant() {
        let store = MemoryStore::new();
        let merchant = sample_merchant("+919876543210", "PL_3210_4821");
        store.create_merchant(&merchant).unwrap();

        let by_phone = store
            .find_merchant_by_phone("+919876543210")
            .unwrap()
            .unwrap();
        assert_eq!(by_phone.merchant_id, merchant.merchant_id);

        let by_code = store.find_merchant_by_code("PL_3210_4821").unwrap().unwrap();
        assert_eq!(by_code.merchant_id, merchant.merchant_id);

        let duplicate = sample_merchant("+919876543210", "PL_3210_9999");
        assert!(matches!(
            store.create_merchant(&duplicate),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn quota_charge_stops_at_limit_without_mutation() {
        let store = MemoryStore::new();
        let mut merchant = sample_merchant("+919876543210", "PL_3210_4821");
        merchant.monthly_upload_limit = 2;
        store.create_merchant(&merchant).unwrap();
        let now = Utc::now();

        for i in 0..2 {
            let doc = sample_document(&merchant.merchant_id, &format!("doc{i}.pdf"), now);
            store.create_document(&doc, QuotaCharge::Monthly).unwrap();
        }

        let third = sample_document(&merchant.merchant_id, "doc2.pdf", now);
        assert!(matches!(
            store.create_document(&third, QuotaCharge::Monthly),
            Err(StorageError::QuotaExceeded)
        ));

        // Failed charge leaves no trace: no document, no counter bump.
        assert_eq!(store.count_documents_by_owner(&merchant.merchant_id).unwrap(), 2);
        let reloaded = store.get_merchant(&merchant.merchant_id).unwrap();
        assert_eq!(reloaded.uploads_used_this_month, 2);
        assert_eq!(reloaded.documents_uploaded, 2);
    }

    #[test]
    fn lifetime_only_charge_skips_monthly_quota() {
        let store = MemoryStore::new();
        let mut merchant = sample_merchant("+919876543210", "PL_3210_4821");
        merchant.monthly_upload_limit = 1;
        merchant.uploads_used_this_month = 1;
        store.create_merchant(&merchant).unwrap();
        let now = Utc::now();

        let doc = sample_document(&merchant.merchant_id, "walkin.pdf", now);
        store.create_document(&doc, QuotaCharge::LifetimeOnly).unwrap();

        let reloaded = store.get_merchant(&merchant.merchant_id).unwrap();
        assert_eq!(reloaded.uploads_used_this_month, 1);
        assert_eq!(reloaded.documents_uploaded, 1);
    }

    #[test]
    fn one_time_view_serves_exactly_once() {
        let store = MemoryStore::new();
        let merchant = sample_merchant("+919876543210", "PL_3210_4821");
        store.create_merchant(&merchant).unwrap();
        let now = Utc::now();

        let mut doc = sample_document(&merchant.merchant_id, "invoice.pdf", now);
        doc.one_time_view = true;
        store.create_document(&doc, QuotaCharge::Monthly).unwrap();
        let link = doc.share_link.clone().unwrap();

        match store.consume_share_view(&link, now).unwrap() {
            ShareViewOutcome::Viewed(viewed) => assert_eq!(viewed.share_view_count, 1),
            other => panic!("expected Viewed, got {other:?}"),
        }
        assert!(matches!(
            store.consume_share_view(&link, now).unwrap(),
            ShareViewOutcome::AlreadyConsumed
        ));
    }

    #[test]
    fn expired_share_link_reports_expired() {
        let store = MemoryStore::new();
        let merchant = sample_merchant("+919876543210", "PL_3210_4821");
        store.create_merchant(&merchant).unwrap();
        let now = Utc::now();

        let mut doc = sample_document(&merchant.merchant_id, "quote.pdf", now);
        doc.share_link_expires_at = Some(now - Duration::seconds(1));
        store.create_document(&doc, QuotaCharge::Monthly).unwrap();
        let link = doc.share_link.clone().unwrap();

        assert!(matches!(
            store.consume_share_view(&link, now).unwrap(),
            ShareViewOutcome::Expired
        ));
        // Expired links do not accumulate views.
        assert_eq!(store.get_document(&doc.document_id).unwrap().share_view_count, 0);
    }

    #[test]
    fn unknown_share_link_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.consume_share_view("missing", Utc::now()),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn trial_runs_once_per_lifetime() {
        let store = MemoryStore::new();
        let merchant = sample_merchant("+919876543210", "PL_3210_4821");
        store.create_merchant(&merchant).unwrap();
        let now = Utc::now();

        match store.start_trial(&merchant.merchant_id, now).unwrap() {
            TrialStartOutcome::Started(started) => {
                assert_eq!(started.subscription_status, SubscriptionStatus::Trial);
                assert_eq!(started.monthly_upload_limit, UNLIMITED_MONTHLY_LIMIT);
                assert_eq!(started.trial_ends_at, Some(now + Duration::days(7)));
            }
            other => panic!("expected Started, got {other:?}"),
        }
        assert!(matches!(
            store.start_trial(&merchant.merchant_id, now).unwrap(),
            TrialStartOutcome::AlreadyEntitled
        ));

        let later = now + Duration::days(8);
        let downgraded = store.expire_trials(later).unwrap();
        assert_eq!(downgraded.len(), 1);
        assert_eq!(downgraded[0].subscription_status, SubscriptionStatus::Free);
        assert_eq!(downgraded[0].monthly_upload_limit, FREE_MONTHLY_LIMIT);

        // Re-running finds nothing left to downgrade.
        assert!(store.expire_trials(later).unwrap().is_empty());

        assert!(matches!(
            store.start_trial(&merchant.merchant_id, later).unwrap(),
            TrialStartOutcome::AlreadyUsed
        ));
    }

    #[test]
    fn otp_consume_is_single_shot() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let challenge = StoredOtpChallenge::new(
            "+919876543210".to_string(),
            "hash".to_string(),
            None,
        );
        store.create_otp(&challenge).unwrap();

        let pending = store
            .latest_pending_otp("+919876543210", now)
            .unwrap()
            .unwrap();
        assert_eq!(pending.otp_id, challenge.otp_id);

        assert_eq!(store.record_failed_otp_attempt(&challenge.otp_id).unwrap(), 1);
        assert_eq!(store.record_failed_otp_attempt(&challenge.otp_id).unwrap(), 2);

        assert!(store.consume_otp(&challenge.otp_id, now).unwrap());
        assert!(!store.consume_otp(&challenge.otp_id, now).unwrap());
        assert!(store
            .latest_pending_otp("+919876543210", now)
            .unwrap()
            .is_none());
    }

    #[test]
    fn latest_pending_prefers_newest_challenge() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut first = StoredOtpChallenge::new("+919876543210".to_string(), "h1".to_string(), None);
        first.sent_at = now - Duration::seconds(30);
        let second = StoredOtpChallenge::new("+919876543210".to_string(), "h2".to_string(), None);
        store.create_otp(&first).unwrap();
        store.create_otp(&second).unwrap();

        let pending = store
            .latest_pending_otp("+919876543210", now)
            .unwrap()
            .unwrap();
        assert_eq!(pending.otp_id, second.otp_id);
    }

    #[test]
    fn listing_is_newest_first_and_paginated() {
        let store = MemoryStore::new();
        let merchant = sample_merchant("+919876543210", "PL_3210_4821");
        store.create_merchant(&merchant).unwrap();
        let now = Utc::now();

        for i in 0..5 {
            let mut doc =
                sample_document(&merchant.merchant_id, &format!("doc{i}.pdf"), now);
            doc.created_at = now + Duration::seconds(i);
            store.create_document(&doc, QuotaCharge::Monthly).unwrap();
        }

        let page = store
            .list_documents_by_owner(&merchant.merchant_id, 2, 0)
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].document_name, "doc4.pdf");
        assert_eq!(page[1].document_name, "doc3.pdf");

        let next = store
            .list_documents_by_owner(&merchant.merchant_id, 2, 4)
            .unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].document_name, "doc0.pdf");
    }

    #[test]
    fn soft_delete_is_conditional_and_hides_document() {
        let store = MemoryStore::new();
        let merchant = sample_merchant("+919876543210", "PL_3210_4821");
        store.create_merchant(&merchant).unwrap();
        let now = Utc::now();

        let doc = sample_document(&merchant.merchant_id, "old.pdf", now);
        store.create_document(&doc, QuotaCharge::Monthly).unwrap();

        assert!(store.mark_document_deleted(&doc.document_id, now).unwrap());
        assert!(!store.mark_document_deleted(&doc.document_id, now).unwrap());
        assert_eq!(store.count_documents_by_owner(&merchant.merchant_id).unwrap(), 0);
        assert!(store
            .list_documents_by_owner(&merchant.merchant_id, 10, 0)
            .unwrap()
            .is_empty());
        // The record itself survives for direct lookups.
        let reloaded = store.get_document(&doc.document_id).unwrap();
        assert_eq!(reloaded.status, DocumentStatus::Deleted);
        assert_eq!(reloaded.deleted_at, Some(now));
    }

    #[test]
    fn reapable_selects_only_lapsed_active_documents() {
        let store = MemoryStore::new();
        let merchant = sample_merchant("+919876543210", "PL_3210_4821");
        store.create_merchant(&merchant).unwrap();
        let now = Utc::now();

        let mut lapsed = sample_document(&merchant.merchant_id, "lapsed.pdf", now);
        lapsed.auto_delete_at = now - Duration::minutes(1);
        store.create_document(&lapsed, QuotaCharge::Monthly).unwrap();

        let fresh = sample_document(&merchant.merchant_id, "fresh.pdf", now);
        store.create_document(&fresh, QuotaCharge::Monthly).unwrap();

        let mut gone = sample_document(&merchant.merchant_id, "gone.pdf", now);
        gone.auto_delete_at = now - Duration::minutes(2);
        store.create_document(&gone, QuotaCharge::Monthly).unwrap();
        store.mark_document_deleted(&gone.document_id, now).unwrap();

        let reapable = store.list_reapable_documents(now, 10).unwrap();
        assert_eq!(reapable.len(), 1);
        assert_eq!(reapable[0].document_id, lapsed.document_id);
    }

    #[test]
    fn audit_events_come_back_newest_first() {
        let store = MemoryStore::new();
        store
            .append_audit(&AuditEvent::new(AuditEventType::OtpSent))
            .unwrap();
        store
            .append_audit(&AuditEvent::new(AuditEventType::OtpVerified))
            .unwrap();
        store
            .append_audit(&AuditEvent::new(AuditEventType::DocumentUploaded))
            .unwrap();

        let recent = store.recent_audit(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_type, AuditEventType::DocumentUploaded);
        assert_eq!(recent[1].event_type, AuditEventType::OtpVerified);
    }
}
