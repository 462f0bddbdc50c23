// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Firebase ID token verification.
//!
//! Some client builds authenticate phone numbers through Firebase instead of
//! the built-in OTP flow. The client exchanges the Firebase ID token here;
//! the server verifies it against Google's published signing keys and pins
//! issuer and audience to the configured project.
//!
//! ## Security
//!
//! - Keys are fetched via HTTPS and cached with a TTL
//! - Only RS256 tokens are accepted
//! - `iss` must be `https://securetoken.google.com/{project}`, `aud` the
//!   project id

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::env_optional;

/// Google's JWK endpoint for Firebase securetoken signing keys.
const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Signing keys rotate rarely; an hour of caching is safe.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum FirebaseError {
    #[error("Firebase configuration missing: {0}")]
    MissingConfig(String),

    #[error("failed to fetch Firebase signing keys: {0}")]
    JwksFetch(String),

    #[error("no signing key matches the token")]
    NoMatchingKey,

    #[error("invalid Firebase token: {0}")]
    InvalidToken(String),
}

/// Claims extracted from a verified Firebase ID token.
#[derive(Debug, Deserialize)]
pub struct FirebaseClaims {
    /// Firebase user ID.
    pub sub: String,
    /// Phone number in E.164 format, present for phone-auth users.
    pub phone_number: Option<String>,
}

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// Verifies Firebase ID tokens for a single project.
#[derive(Clone)]
pub struct FirebaseVerifier {
    project_id: String,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    http: reqwest::Client,
}

impl FirebaseVerifier {
    pub fn is_configured() -> bool {
        env_optional("FIREBASE_PROJECT_ID").is_some()
    }

    pub fn from_env() -> Result<Self, FirebaseError> {
        let project_id = env_optional("FIREBASE_PROJECT_ID")
            .ok_or_else(|| FirebaseError::MissingConfig("FIREBASE_PROJECT_ID".to_string()))?;
        Self::new(project_id)
    }

    pub fn new(project_id: impl Into<String>) -> Result<Self, FirebaseError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FirebaseError::JwksFetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            project_id: project_id.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            http,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Verify an ID token and return its claims.
    pub async fn verify(&self, token: &str) -> Result<FirebaseClaims, FirebaseError> {
        let header =
            decode_header(token).map_err(|e| FirebaseError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| FirebaseError::InvalidToken("token has no key id".to_string()))?;

        let key = self.get_decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);

        let data = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| FirebaseError::InvalidToken(e.to_string()))?;

        Ok(data.claims)
    }

    /// Fetch the key set (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, FirebaseError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;

        {
            let mut cache = self.cache.write().await;
            *cache = Some(CacheEntry {
                jwks: jwks.clone(),
                fetched_at: Instant::now(),
            });
        }

        Ok(jwks)
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, FirebaseError> {
        let response = self
            .http
            .get(FIREBASE_JWKS_URL)
            .send()
            .await
            .map_err(|e| FirebaseError::JwksFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FirebaseError::JwksFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| FirebaseError::JwksFetch(e.to_string()))?;

        Ok(jwks)
    }

    async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, FirebaseError> {
        let jwks = self.get_jwks().await?;

        let jwk = jwks
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .ok_or(FirebaseError::NoMatchingKey)?;

        jwk_to_decoding_key(jwk)
    }

    #[cfg(test)]
    async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => entry.fetched_at.elapsed() < self.cache_ttl,
            None => false,
        }
    }
}

/// Firebase signs with RSA keys only.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, FirebaseError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| FirebaseError::InvalidToken(format!("failed to build RSA key: {e}"))),
        _ => Err(FirebaseError::InvalidToken(
            "unsupported key type in JWKS".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_initially_empty() {
        let verifier = FirebaseVerifier::new("demo-project").unwrap();
        assert_eq!(verifier.project_id(), "demo-project");
        assert!(!verifier.is_cached().await);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_before_any_fetch() {
        let verifier = FirebaseVerifier::new("demo-project").unwrap();
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, FirebaseError::InvalidToken(_)));
    }

    #[test]
    fn claims_parse_with_and_without_phone() {
        let claims: FirebaseClaims = serde_json::from_value(serde_json::json!({
            "sub": "firebase-uid-1",
            "phone_number": "+919876543210",
        }))
        .unwrap();
        assert_eq!(claims.phone_number.as_deref(), Some("+919876543210"));

        let claims: FirebaseClaims = serde_json::from_value(serde_json::json!({
            "sub": "firebase-uid-2",
        }))
        .unwrap();
        assert!(claims.phone_number.is_none());
    }
}
