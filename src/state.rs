// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

use std::sync::Arc;

use crate::config::AppConfig;
use crate::providers::{FirebaseVerifier, SmsClient};
use crate::storage::{ContentStore, RecordStore};

/// Shared application state injected into every handler.
///
/// Stores are trait objects so handlers are oblivious to whether records
/// live in redb or memory. The Firebase verifier is held here because its
/// JWKS cache only pays off when shared across requests; it is `None` when
/// `FIREBASE_PROJECT_ID` is unset.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub records: Arc<dyn RecordStore>,
    pub content: Arc<dyn ContentStore>,
    pub sms: Arc<SmsClient>,
    pub firebase: Option<Arc<FirebaseVerifier>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        records: Arc<dyn RecordStore>,
        content: Arc<dyn ContentStore>,
        sms: SmsClient,
        firebase: Option<FirebaseVerifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            records,
            content,
            sms: Arc::new(sms),
            firebase: firebase.map(Arc::new),
        }
    }

    /// State for handler tests: in-memory stores, console SMS, no Firebase.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        use crate::storage::{MemoryContentStore, MemoryStore};

        Self::new(
            AppConfig::for_tests(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryContentStore::new()),
            SmsClient::console(),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::records::StoredMerchant;

    #[test]
    fn test_state_wires_memory_stores() {
        let state = AppState::for_tests();

        let merchant = StoredMerchant::new(
            "+919876543210".to_string(),
            "Asha".to_string(),
            "PL_3210_1111".to_string(),
        );
        state.records.create_merchant(&merchant).unwrap();
        let found = state.records.get_merchant(&merchant.merchant_id).unwrap();
        assert_eq!(found.phone_number, "+919876543210");

        state.content.put("docs/x/a.pdf", b"bytes").unwrap();
        assert_eq!(state.content.get("docs/x/a.pdf").unwrap(), b"bytes");
    }
}
