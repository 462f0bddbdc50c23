// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Axum extractor for authenticated merchants.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(merchant): Auth) -> impl IntoResponse {
//!     // merchant is the caller's StoredMerchant
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::tokens::decode_token;
use super::AuthError;
use crate::state::AppState;
use crate::storage::{StorageError, StoredMerchant};

/// Extractor for authenticated merchants.
///
/// Validates the bearer token from the Authorization header against the
/// configured signing secret, then resolves the subject to the stored
/// merchant. A token whose subject no longer exists is rejected, so
/// deleted accounts cannot keep using old tokens.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_documents(
///     Auth(merchant): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<DocumentListResponse>, ApiError> {
///     // merchant.merchant_id identifies the caller
/// }
/// ```
#[derive(Debug)]
pub struct Auth(pub StoredMerchant);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A previously resolved merchant short-circuits (test injection).
        if let Some(merchant) = parts.extensions.get::<StoredMerchant>().cloned() {
            return Ok(Auth(merchant));
        }

        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        // Extract Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let claims = decode_token(&state.config.jwt_secret, token)?;

        let merchant = state.records.get_merchant(&claims.sub).map_err(|e| match e {
            StorageError::NotFound(_) => AuthError::UserNotFound,
            other => AuthError::InternalError(other.to_string()),
        })?;

        Ok(Auth(merchant))
    }
}
