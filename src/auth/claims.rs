// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Access token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims carried in a Paperlink access token.
///
/// The subject is the merchant ID; the phone number is embedded so
/// support tooling can attribute a token without a store lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the merchant ID.
    pub sub: String,

    /// Canonical phone number of the merchant.
    pub phone: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration (Unix timestamp).
    pub exp: i64,
}

impl AccessClaims {
    /// Build claims for a merchant, valid for `ttl_days` from `now`.
    pub fn new(merchant_id: &str, phone: &str, ttl_days: i64, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            sub: merchant_id.to_string(),
            phone: phone.to_string(),
            iat,
            exp: iat + ttl_days * 86_400,
        }
    }
}
