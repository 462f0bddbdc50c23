// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Embedded record database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `merchants`: merchant_id → serialized StoredMerchant
//! - `merchant_phone_index`: phone → merchant_id
//! - `merchant_code_index`: merchant_code → merchant_id
//! - `otp_challenges`: otp_id → serialized StoredOtpChallenge
//! - `otp_phone_index`: composite key (phone|!sent_at|otp_id) → otp_id
//! - `documents`: document_id → serialized StoredDocument
//! - `document_owner_index`: composite key (owner_id|!created_at|document_id)
//!   → document_id
//! - `share_links`: share_link → document_id
//! - `audit_events`: composite key (!timestamp|event_id) → serialized event
//!
//! Composite keys invert the timestamp so a forward scan yields newest
//! first. Every conditional operation (quota charge, one-time-view
//! consumption, OTP consumption, trial transitions) runs inside a single
//! write transaction, so concurrent callers serialize at the commit and
//! partial updates never become visible.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::records::{
    DocumentStatus, ProfileUpdate, StoredDocument, StoredMerchant, StoredOtpChallenge,
    SubscriptionStatus, FREE_MONTHLY_LIMIT, TRIAL_PERIOD_DAYS, UNLIMITED_MONTHLY_LIMIT,
};
use super::{
    AuditEvent, QuotaCharge, RecordStore, ShareViewOutcome, StorageError, StorageResult,
    TrialStartOutcome,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: merchant_id → serialized StoredMerchant (JSON bytes).
const MERCHANTS: TableDefinition<&str, &[u8]> = TableDefinition::new("merchants");

/// Index: canonical phone number → merchant_id.
const MERCHANT_PHONE_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("merchant_phone_index");

/// Index: public merchant code → merchant_id.
const MERCHANT_CODE_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("merchant_code_index");

/// Primary table: otp_id → serialized StoredOtpChallenge (JSON bytes).
const OTP_CHALLENGES: TableDefinition<&str, &[u8]> = TableDefinition::new("otp_challenges");

/// Index: composite key → otp_id.
/// Key format: `phone|!sent_at_be|otp_id` for newest-first range scans.
const OTP_PHONE_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("otp_phone_index");

/// Primary table: document_id → serialized StoredDocument (JSON bytes).
const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Index: composite key → document_id.
/// Key format: `owner_id|!created_at_be|document_id` for newest-first scans.
const DOCUMENT_OWNER_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("document_owner_index");

/// Map: share link token → document_id.
const SHARE_LINKS: TableDefinition<&str, &str> = TableDefinition::new("share_links");

/// Audit log: composite key (!timestamp_be|event_id) → serialized event.
const AUDIT_EVENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("audit_events");

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for a scoped, time-ordered index.
///
/// Format: `scope | inverted_timestamp_be_bytes | id`
///
/// The inverted timestamp ensures newest-first ordering when scanning
/// forward. Timestamps are millisecond precision so bursts within one
/// second still order correctly.
fn make_index_key(scope: &str, timestamp_ms: i64, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(scope.len() + 1 + 8 + 1 + id.len());
    key.extend_from_slice(scope.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!timestamp_ms as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

/// Build a prefix key for range scanning all entries of a scope.
fn make_prefix(scope: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(scope.len() + 1);
    prefix.extend_from_slice(scope.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with all 0xFF bytes appended).
fn make_prefix_end(scope: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(scope.len() + 1 + 20);
    end.extend_from_slice(scope.as_bytes());
    end.push(b'|');
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Audit keys have no scope: `inverted_timestamp_be_bytes | event_id`.
fn make_audit_key(timestamp_ms: i64, event_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + 1 + event_id.len());
    key.extend_from_slice(&(!timestamp_ms as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(event_id.as_bytes());
    key
}

// =============================================================================
// RecordDatabase
// =============================================================================

/// Embedded ACID record database.
pub struct RecordDatabase {
    db: Database,
}

impl RecordDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MERCHANTS)?;
            let _ = write_txn.open_table(MERCHANT_PHONE_INDEX)?;
            let _ = write_txn.open_table(MERCHANT_CODE_INDEX)?;
            let _ = write_txn.open_table(OTP_CHALLENGES)?;
            let _ = write_txn.open_table(OTP_PHONE_INDEX)?;
            let _ = write_txn.open_table(DOCUMENTS)?;
            let _ = write_txn.open_table(DOCUMENT_OWNER_INDEX)?;
            let _ = write_txn.open_table(SHARE_LINKS)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Read-modify-write a merchant inside one write transaction.
    fn update_merchant<F>(&self, merchant_id: &str, mutate: F) -> StorageResult<StoredMerchant>
    where
        F: FnOnce(&mut StoredMerchant),
    {
        let write_txn = self.db.begin_write()?;
        let merchant = {
            let mut table = write_txn.open_table(MERCHANTS)?;
            let existing_bytes = {
                let existing = table
                    .get(merchant_id)?
                    .ok_or_else(|| StorageError::NotFound(format!("merchant {merchant_id}")))?;
                existing.value().to_vec()
            };
            let mut merchant: StoredMerchant = serde_json::from_slice(&existing_bytes)?;
            mutate(&mut merchant);
            let json = serde_json::to_vec(&merchant)?;
            table.insert(merchant_id, json.as_slice())?;
            merchant
        };
        write_txn.commit()?;
        Ok(merchant)
    }
}

impl RecordStore for RecordDatabase {
    fn create_merchant(&self, merchant: &StoredMerchant) -> StorageResult<()> {
        let json = serde_json::to_vec(merchant)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut phone_index = write_txn.open_table(MERCHANT_PHONE_INDEX)?;
            if phone_index.get(merchant.phone_number.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "merchant with phone {}",
                    merchant.phone_number
                )));
            }
            let mut code_index = write_txn.open_table(MERCHANT_CODE_INDEX)?;
            if code_index.get(merchant.merchant_code.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "merchant code {}",
                    merchant.merchant_code
                )));
            }
            phone_index.insert(
                merchant.phone_number.as_str(),
                merchant.merchant_id.as_str(),
            )?;
            code_index.insert(
                merchant.merchant_code.as_str(),
                merchant.merchant_id.as_str(),
            )?;
            let mut merchants = write_txn.open_table(MERCHANTS)?;
            merchants.insert(merchant.merchant_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_merchant(&self, merchant_id: &str) -> StorageResult<StoredMerchant> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MERCHANTS)?;
        match table.get(merchant_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(format!("merchant {merchant_id}"))),
        }
    }

    fn find_merchant_by_phone(&self, phone: &str) -> StorageResult<Option<StoredMerchant>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(MERCHANT_PHONE_INDEX)?;
        let merchant_id = match index.get(phone)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };
        let merchants = read_txn.open_table(MERCHANTS)?;
        match merchants.get(merchant_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn find_merchant_by_code(&self, merchant_code: &str) -> StorageResult<Option<StoredMerchant>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(MERCHANT_CODE_INDEX)?;
        let merchant_id = match index.get(merchant_code)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };
        let merchants = read_txn.open_table(MERCHANTS)?;
        match merchants.get(merchant_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn record_login(
        &self,
        merchant_id: &str,
        now: DateTime<Utc>,
        backfill_owner_name: Option<&str>,
        clerk_user_id: Option<&str>,
    ) -> StorageResult<StoredMerchant> {
        self.update_merchant(merchant_id, |merchant| {
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
        })
    }

    fn complete_profile(
        &self,
        merchant_id: &str,
        profile: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredMerchant> {
        self.update_merchant(merchant_id, |merchant| {
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
        })
    }

    fn start_trial(
        &self,
        merchant_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<TrialStartOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(MERCHANTS)?;
            let existing_bytes = {
                let existing = table
                    .get(merchant_id)?
                    .ok_or_else(|| StorageError::NotFound(format!("merchant {merchant_id}")))?;
                existing.value().to_vec()
            };
            let mut merchant: StoredMerchant = serde_json::from_slice(&existing_bytes)?;
            match merchant.subscription_status {
                SubscriptionStatus::Trial | SubscriptionStatus::Unlimited => {
                    TrialStartOutcome::AlreadyEntitled
                }
                SubscriptionStatus::Free if merchant.trial_started_at.is_some() => {
                    TrialStartOutcome::AlreadyUsed
                }
                SubscriptionStatus::Free => {
                    merchant.subscription_status = SubscriptionStatus::Trial;
                    merchant.monthly_upload_limit = UNLIMITED_MONTHLY_LIMIT;
                    merchant.trial_started_at = Some(now);
                    merchant.trial_ends_at = Some(now + Duration::days(TRIAL_PERIOD_DAYS));
                    merchant.updated_at = now;
                    let json = serde_json::to_vec(&merchant)?;
                    table.insert(merchant_id, json.as_slice())?;
                    TrialStartOutcome::Started(merchant)
                }
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    fn activate_unlimited(
        &self,
        merchant_id: &str,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredMerchant> {
        self.update_merchant(merchant_id, |merchant| {
            merchant.subscription_status = SubscriptionStatus::Unlimited;
            merchant.monthly_upload_limit = UNLIMITED_MONTHLY_LIMIT;
            merchant.subscription_payment_id = Some(payment_id.to_string());
            merchant.subscription_started_at = Some(now);
            merchant.updated_at = now;
        })
    }

    fn expire_trials(&self, now: DateTime<Utc>) -> StorageResult<Vec<StoredMerchant>> {
        let write_txn = self.db.begin_write()?;
        let downgraded = {
            let mut table = write_txn.open_table(MERCHANTS)?;

            let mut lapsed: Vec<StoredMerchant> = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                let merchant: StoredMerchant = serde_json::from_slice(value.value())?;
                if merchant.subscription_status != SubscriptionStatus::Trial {
                    continue;
                }
                if merchant.trial_ends_at.map(|ends| ends < now).unwrap_or(false) {
                    lapsed.push(merchant);
                }
            }

            let mut downgraded = Vec::with_capacity(lapsed.len());
            for mut merchant in lapsed {
                merchant.subscription_status = SubscriptionStatus::Free;
                merchant.monthly_upload_limit = FREE_MONTHLY_LIMIT;
                merchant.updated_at = now;
                let json = serde_json::to_vec(&merchant)?;
                table.insert(merchant.merchant_id.as_str(), json.as_slice())?;
                downgraded.push(merchant);
            }
            downgraded
        };
        write_txn.commit()?;
        Ok(downgraded)
    }

    fn create_otp(&self, challenge: &StoredOtpChallenge) -> StorageResult<()> {
        let json = serde_json::to_vec(challenge)?;
        let index_key = make_index_key(
            &challenge.phone_number,
            challenge.sent_at.timestamp_millis(),
            &challenge.otp_id,
        );
        let write_txn = self.db.begin_write()?;
        {
            let mut challenges = write_txn.open_table(OTP_CHALLENGES)?;
            challenges.insert(challenge.otp_id.as_str(), json.as_slice())?;
            let mut index = write_txn.open_table(OTP_PHONE_INDEX)?;
            index.insert(index_key.as_slice(), challenge.otp_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn latest_pending_otp(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<StoredOtpChallenge>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(OTP_PHONE_INDEX)?;
        let challenges = read_txn.open_table(OTP_CHALLENGES)?;

        let prefix = make_prefix(phone);
        let prefix_end = make_prefix_end(phone);

        for entry in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let otp_id = entry.1.value().to_string();
            if let Some(value) = challenges.get(otp_id.as_str())? {
                let challenge: StoredOtpChallenge = serde_json::from_slice(value.value())?;
                if challenge.is_pending(now) {
                    return Ok(Some(challenge));
                }
            }
        }
        Ok(None)
    }

    fn record_failed_otp_attempt(&self, otp_id: &str) -> StorageResult<u32> {
        let write_txn = self.db.begin_write()?;
        let attempts = {
            let mut table = write_txn.open_table(OTP_CHALLENGES)?;
            let existing_bytes = {
                let existing = table
                    .get(otp_id)?
                    .ok_or_else(|| StorageError::NotFound(format!("otp {otp_id}")))?;
                existing.value().to_vec()
            };
            let mut challenge: StoredOtpChallenge = serde_json::from_slice(&existing_bytes)?;
            challenge.attempts += 1;
            let json = serde_json::to_vec(&challenge)?;
            table.insert(otp_id, json.as_slice())?;
            challenge.attempts
        };
        write_txn.commit()?;
        Ok(attempts)
    }

    fn consume_otp(&self, otp_id: &str, now: DateTime<Utc>) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let consumed = {
            let mut table = write_txn.open_table(OTP_CHALLENGES)?;
            let existing_bytes = match table.get(otp_id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Ok(false),
            };
            let mut challenge: StoredOtpChallenge = serde_json::from_slice(&existing_bytes)?;
            if challenge.verified_at.is_some() {
                false
            } else {
                challenge.verified_at = Some(now);
                let json = serde_json::to_vec(&challenge)?;
                table.insert(otp_id, json.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(consumed)
    }

    fn create_document(
        &self,
        document: &StoredDocument,
        charge: QuotaCharge,
    ) -> StorageResult<()> {
        let json = serde_json::to_vec(document)?;
        let index_key = make_index_key(
            &document.owner_id,
            document.created_at.timestamp_millis(),
            &document.document_id,
        );

        let write_txn = self.db.begin_write()?;
        {
            let mut merchants = write_txn.open_table(MERCHANTS)?;
            let existing_bytes = {
                let existing = merchants.get(document.owner_id.as_str())?.ok_or_else(|| {
                    StorageError::NotFound(format!("merchant {}", document.owner_id))
                })?;
                existing.value().to_vec()
            };
            let mut merchant: StoredMerchant = serde_json::from_slice(&existing_bytes)?;
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
            let merchant_json = serde_json::to_vec(&merchant)?;
            merchants.insert(merchant.merchant_id.as_str(), merchant_json.as_slice())?;

            let mut documents = write_txn.open_table(DOCUMENTS)?;
            documents.insert(document.document_id.as_str(), json.as_slice())?;

            let mut owner_index = write_txn.open_table(DOCUMENT_OWNER_INDEX)?;
            owner_index.insert(index_key.as_slice(), document.document_id.as_str())?;

            if let Some(link) = &document.share_link {
                let mut share_links = write_txn.open_table(SHARE_LINKS)?;
                share_links.insert(link.as_str(), document.document_id.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_document(&self, document_id: &str) -> StorageResult<StoredDocument> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;
        match table.get(document_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(format!("document {document_id}"))),
        }
    }

    fn find_document_by_share_link(
        &self,
        share_link: &str,
    ) -> StorageResult<Option<StoredDocument>> {
        let read_txn = self.db.begin_read()?;
        let links = read_txn.open_table(SHARE_LINKS)?;
        let document_id = match links.get(share_link)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };
        let documents = read_txn.open_table(DOCUMENTS)?;
        match documents.get(document_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn list_documents_by_owner(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<StoredDocument>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(DOCUMENT_OWNER_INDEX)?;
        let documents = read_txn.open_table(DOCUMENTS)?;

        let prefix = make_prefix(owner_id);
        let prefix_end = make_prefix_end(owner_id);

        // Deleted documents stay in the index; filter before paginating.
        let mut results = Vec::with_capacity(limit);
        let mut seen_active = 0usize;
        for entry in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let document_id = entry.1.value().to_string();
            let Some(value) = documents.get(document_id.as_str())? else {
                continue;
            };
            let document: StoredDocument = serde_json::from_slice(value.value())?;
            if !document.is_active() {
                continue;
            }
            seen_active += 1;
            if seen_active <= offset {
                continue;
            }
            results.push(document);
            if results.len() >= limit {
                break;
            }
        }
        Ok(results)
    }

    fn count_documents_by_owner(&self, owner_id: &str) -> StorageResult<usize> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(DOCUMENT_OWNER_INDEX)?;
        let documents = read_txn.open_table(DOCUMENTS)?;

        let prefix = make_prefix(owner_id);
        let prefix_end = make_prefix_end(owner_id);

        let mut count = 0usize;
        for entry in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let document_id = entry.1.value().to_string();
            let Some(value) = documents.get(document_id.as_str())? else {
                continue;
            };
            let document: StoredDocument = serde_json::from_slice(value.value())?;
            if document.is_active() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn consume_share_view(
        &self,
        share_link: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<ShareViewOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let links = write_txn.open_table(SHARE_LINKS)?;
            let document_id = match links.get(share_link)? {
                Some(value) => value.value().to_string(),
                None => {
                    return Err(StorageError::NotFound(format!("share link {share_link}")))
                }
            };
            drop(links);

            let mut documents = write_txn.open_table(DOCUMENTS)?;
            let existing_bytes = {
                let existing = documents.get(document_id.as_str())?.ok_or_else(|| {
                    StorageError::NotFound(format!("document {document_id}"))
                })?;
                existing.value().to_vec()
            };
            let mut document: StoredDocument = serde_json::from_slice(&existing_bytes)?;
            if !document.is_active() {
                return Err(StorageError::NotFound(format!("document {document_id}")));
            }

            let expired = document
                .share_link_expires_at
                .map(|expires| now >= expires)
                .unwrap_or(false);
            if expired {
                ShareViewOutcome::Expired
            } else if document.one_time_view && document.share_view_count > 0 {
                ShareViewOutcome::AlreadyConsumed
            } else {
                document.share_view_count += 1;
                document.updated_at = now;
                let json = serde_json::to_vec(&document)?;
                documents.insert(document.document_id.as_str(), json.as_slice())?;
                ShareViewOutcome::Viewed(document)
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    fn mark_document_deleted(
        &self,
        document_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(DOCUMENTS)?;
            let existing_bytes = match table.get(document_id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Ok(false),
            };
            let mut document: StoredDocument = serde_json::from_slice(&existing_bytes)?;
            if !document.is_active() {
                false
            } else {
                document.status = DocumentStatus::Deleted;
                document.deleted_at = Some(now);
                document.updated_at = now;
                let json = serde_json::to_vec(&document)?;
                table.insert(document_id, json.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    fn list_reapable_documents(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StorageResult<Vec<StoredDocument>> {
        // Linear scan over the primary table; the reaper caps its batch and
        // runs on an interval, not per request.
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;

        let mut lapsed: Vec<StoredDocument> = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let document: StoredDocument = serde_json::from_slice(value.value())?;
            if document.is_active() && document.auto_delete_at <= now {
                lapsed.push(document);
            }
        }
        lapsed.sort_by(|a, b| a.auto_delete_at.cmp(&b.auto_delete_at));
        lapsed.truncate(limit);
        Ok(lapsed)
    }

    fn append_audit(&self, event: &AuditEvent) -> StorageResult<()> {
        let json = serde_json::to_vec(event)?;
        let key = make_audit_key(event.timestamp.timestamp_millis(), &event.event_id);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_EVENTS)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn recent_audit(&self, limit: usize) -> StorageResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let mut events = Vec::with_capacity(limit);
        for entry in table.iter()? {
            let (_, value) = entry?;
            let event: AuditEvent = serde_json::from_slice(value.value())?;
            events.push(event);
            if events.len() >= limit {
                break;
            }
        }
        Ok(events)
    }
}
