// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! # Storage Module
//!
//! Keyed record storage behind the [`RecordStore`] trait and file content
//! behind [`ContentStore`]. Both are injected through `AppState`, selected at
//! startup:
//!
//! - `DATA_DIR` set → [`database::RecordDatabase`] (embedded redb, ACID) and
//!   [`content::FsContentStore`] under that directory.
//! - `DATA_DIR` unset → [`memory::MemoryStore`] and
//!   [`content::MemoryContentStore`] (everything lost on restart).
//!
//! ## Storage Layout (persistent mode)
//!
//! ```text
//! {DATA_DIR}/
//!   paperlink.redb          # merchants, otp challenges, documents, audit
//!   content/
//!     docs/{document_id}/{filename}
//!     customer-uploads/{document_id}/{filename}
//! ```
//!
//! ## Atomicity
//!
//! Counter mutations (quota consumption, share views, OTP attempts) and
//! conditional state transitions (one-time-view consumption, OTP
//! consumption, trial start/expiry, soft delete) are single operations on
//! the trait so each implementation can make them atomic: one write
//! transaction in redb, one write-lock section in memory. Handlers never
//! read-modify-write shared counters.

pub mod audit;
pub mod content;
pub mod database;
pub mod memory;
pub mod records;

use chrono::{DateTime, Utc};

pub use audit::{AuditEvent, AuditEventType};
pub use content::{FsContentStore, MemoryContentStore};
pub use database::RecordDatabase;
pub use memory::MemoryStore;
pub use records::{
    DocumentStatus, ProfileUpdate, StoredDocument, StoredMerchant, StoredOtpChallenge,
    SubscriptionStatus, FREE_MONTHLY_LIMIT, OTP_MAX_ATTEMPTS, OTP_VALIDITY_SECONDS,
    TRIAL_PERIOD_DAYS, UNLIMITED_MONTHLY_LIMIT,
};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("not found: {0}")]
    NotFound(String),

    /// Content key is absolute or escapes the content root.
    #[error("invalid content key: {0}")]
    InvalidKey(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Monthly upload allowance exhausted; nothing was written.
    #[error("monthly upload quota exhausted")]
    QuotaExceeded,
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// How a document creation charges the owner's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaCharge {
    /// Merchant-initiated upload: checked against and charged to the monthly
    /// quota, and counted toward the lifetime total.
    Monthly,
    /// Customer-portal upload: lifetime total only.
    LifetimeOnly,
}

/// Result of the atomic public-view check-and-increment.
#[derive(Debug, Clone)]
pub enum ShareViewOutcome {
    /// View recorded; the returned record reflects the incremented counter.
    Viewed(StoredDocument),
    /// Share link past its expiry timestamp.
    Expired,
    /// One-time-view document that has already served its single view.
    AlreadyConsumed,
}

/// Result of the conditional trial activation.
#[derive(Debug, Clone)]
pub enum TrialStartOutcome {
    /// Trial activated; record reflects the new entitlement.
    Started(StoredMerchant),
    /// Already on trial or the paid plan.
    AlreadyEntitled,
    /// A trial was started before (even if it has since lapsed).
    AlreadyUsed,
}

/// Keyed record store used by every component above the storage layer.
///
/// Methods that mutate counters or perform conditional transitions are
/// atomic within a single call. All methods are synchronous; implementations
/// complete in approximately one lock acquisition or one embedded-database
/// transaction.
pub trait RecordStore: Send + Sync {
    // ---- merchants ----

    /// Insert a new merchant. Fails with `AlreadyExists` when a merchant
    /// with the same phone number is present.
    fn create_merchant(&self, merchant: &StoredMerchant) -> StorageResult<()>;

    fn get_merchant(&self, merchant_id: &str) -> StorageResult<StoredMerchant>;

    fn find_merchant_by_phone(&self, phone: &str) -> StorageResult<Option<StoredMerchant>>;

    fn find_merchant_by_code(&self, merchant_code: &str) -> StorageResult<Option<StoredMerchant>>;

    /// Touch last-login, optionally backfilling an empty owner name and
    /// linking a session-provider subject. Returns the updated record.
    fn record_login(
        &self,
        merchant_id: &str,
        now: DateTime<Utc>,
        backfill_owner_name: Option<&str>,
        clerk_user_id: Option<&str>,
    ) -> StorageResult<StoredMerchant>;

    /// Apply onboarding profile fields and mark onboarding complete.
    fn complete_profile(
        &self,
        merchant_id: &str,
        profile: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredMerchant>;

    /// Conditionally start the one-per-lifetime trial.
    fn start_trial(&self, merchant_id: &str, now: DateTime<Utc>)
        -> StorageResult<TrialStartOutcome>;

    /// Move the merchant to the paid unlimited tier, recording the payment.
    fn activate_unlimited(
        &self,
        merchant_id: &str,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredMerchant>;

    /// Downgrade every merchant whose trial has lapsed (status still `trial`
    /// and trial end before `now`). Conditional per record, so re-running is
    /// a no-op for already-downgraded merchants. Returns the downgraded
    /// records for best-effort notification.
    fn expire_trials(&self, now: DateTime<Utc>) -> StorageResult<Vec<StoredMerchant>>;

    // ---- otp challenges ----

    fn create_otp(&self, challenge: &StoredOtpChallenge) -> StorageResult<()>;

    /// Most recent unexpired, unverified challenge for a phone number.
    fn latest_pending_otp(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<StoredOtpChallenge>>;

    /// Atomically increment the failed-attempt counter, returning the new
    /// count.
    fn record_failed_otp_attempt(&self, otp_id: &str) -> StorageResult<u32>;

    /// Mark a challenge verified. Returns false when another call already
    /// consumed it (or it no longer exists), so a concurrent duplicate
    /// success loses deterministically.
    fn consume_otp(&self, otp_id: &str, now: DateTime<Utc>) -> StorageResult<bool>;

    // ---- documents ----

    /// Insert a document and charge the owner's counters in one atomic
    /// operation. With `QuotaCharge::Monthly` the monthly allowance is
    /// re-checked under the same transaction and `QuotaExceeded` is returned
    /// without any mutation when exhausted.
    fn create_document(&self, document: &StoredDocument, charge: QuotaCharge)
        -> StorageResult<()>;

    fn get_document(&self, document_id: &str) -> StorageResult<StoredDocument>;

    fn find_document_by_share_link(&self, share_link: &str)
        -> StorageResult<Option<StoredDocument>>;

    /// Active documents for an owner, newest first.
    fn list_documents_by_owner(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<StoredDocument>>;

    /// Count of active documents for an owner.
    fn count_documents_by_owner(&self, owner_id: &str) -> StorageResult<usize>;

    /// Atomic public-view gate: resolves the share link, applies the
    /// expiry and one-time-view checks, and increments the view counter,
    /// all as one conditional update. `NotFound` covers absent links and
    /// non-active documents.
    fn consume_share_view(
        &self,
        share_link: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<ShareViewOutcome>;

    /// Transition an active document to `deleted`. Returns false when the
    /// document was not active (already deleted or absent).
    fn mark_document_deleted(&self, document_id: &str, now: DateTime<Utc>)
        -> StorageResult<bool>;

    /// Active documents whose auto-delete instant has passed, oldest first.
    fn list_reapable_documents(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StorageResult<Vec<StoredDocument>>;

    // ---- audit ----

    fn append_audit(&self, event: &AuditEvent) -> StorageResult<()>;

    /// Most recent audit events, newest first.
    fn recent_audit(&self, limit: usize) -> StorageResult<Vec<AuditEvent>>;
}

/// File content addressed by storage key, independent of the record store.
pub trait ContentStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()>;

    fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    fn delete(&self, key: &str) -> StorageResult<()>;

    fn exists(&self, key: &str) -> StorageResult<bool>;
}
