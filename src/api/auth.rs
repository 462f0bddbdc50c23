// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Authentication endpoints.
//!
//! Merchants authenticate with their phone number: request an OTP, verify
//! it, receive a bearer token. Builds that authenticate the phone through
//! Firebase or a Clerk session exchange their provider proof on the
//! corresponding verify route instead. Every verify path lands in the same
//! find-or-create and returns the same token + profile shape.

use axum::{extract::State, Json};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{claims::AccessClaims, normalize_phone, otp, same_subscriber, tokens::issue_token, Auth},
    error::ApiError,
    models::MerchantProfile,
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, ProfileUpdate, StorageError, StoredMerchant,
        StoredOtpChallenge, OTP_MAX_ATTEMPTS, OTP_VALIDITY_SECONDS,
    },
};

/// Request to send an OTP.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub phone_number: String,
    /// Display name, stored if the account is created at verification.
    #[serde(default)]
    pub name: Option<String>,
}

/// Response after an OTP was issued.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub success: bool,
    pub message: String,
    /// Seconds until the code expires.
    pub expires_in: i64,
    /// Canonical phone number the code was sent to.
    pub phone_number: String,
}

/// Request to verify an OTP.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub phone_number: String,
    pub otp_code: Option<String>,
    /// Legacy clients send the code under this name.
    pub otp: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl VerifyOtpRequest {
    fn code(&self) -> Option<&str> {
        self.otp_code.as_deref().or(self.otp.as_deref())
    }
}

/// Request to verify a Firebase ID token.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseVerifyRequest {
    pub id_token: String,
    pub phone_number: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to link a Clerk-authenticated session.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClerkVerifyRequest {
    pub phone_number: String,
    pub clerk_user_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response for every successful verification path.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    /// Bearer token for subsequent requests.
    pub token: String,
    pub is_new_user: bool,
    pub user: MerchantProfile,
}

/// Onboarding profile submission.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub shop_name: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub business_category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: RegisteredSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredSummary {
    pub id: String,
    pub owner_name: String,
    pub shop_name: String,
    pub city: String,
    pub onboarding_completed: bool,
}

/// Send a 6-digit OTP to a phone number.
///
/// The code is stored hashed and delivered through the configured SMS
/// transport. Delivery failure never fails the request; the stored code
/// stays verifiable for its full validity window.
#[utoipa::path(
    post,
    path = "/api/auth/send-otp",
    tag = "Auth",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP issued", body = SendOtpResponse),
        (status = 400, description = "Invalid phone number")
    )
)]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(request): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, ApiError> {
    let phone = normalize_phone(&request.phone_number)?;

    let code = otp::generate_code();
    let plaintext = state.config.dev_mode.then(|| code.clone());
    let challenge = StoredOtpChallenge::new(phone.clone(), otp::hash_code(&code), plaintext);

    state
        .records
        .create_otp(&challenge)
        .map_err(|e| ApiError::internal(format!("Failed to store OTP: {e}")))?;

    if state.config.dev_mode {
        tracing::warn!(phone = %phone, code = %code, "dev mode OTP issued");
    }

    let message = format!("Your Paperlink OTP: {code}. Valid for 10 minutes.");
    if let Err(err) = state.sms.send(&phone, &message).await {
        tracing::error!(error = %err, phone = %phone, "failed to deliver OTP SMS");
    }

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::OtpSent).with_resource(&challenge.otp_id)
    );

    Ok(Json(SendOtpResponse {
        success: true,
        message: format!("OTP sent to {phone}"),
        expires_in: OTP_VALIDITY_SECONDS,
        phone_number: phone,
    }))
}

/// Verify an OTP and authenticate the merchant.
///
/// A previously-unseen phone number gets a fresh free-tier account;
/// otherwise the login timestamp is touched and an empty owner name is
/// backfilled from the request.
#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    tag = "Auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Invalid, expired, or locked-out OTP")
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let phone = normalize_phone(&request.phone_number)?;
    let code = request
        .code()
        .ok_or_else(|| ApiError::bad_request("Phone number and OTP code are required"))?;

    let now = Utc::now();
    let challenge = state
        .records
        .latest_pending_otp(&phone, now)
        .map_err(|e| ApiError::internal(format!("Failed to look up OTP: {e}")))?
        .ok_or_else(|| ApiError::bad_request("OTP expired or not found"))?;

    if challenge.attempts >= OTP_MAX_ATTEMPTS {
        return Err(ApiError::bad_request("Too many attempts. Request new OTP."));
    }

    let hash_matches = otp::verify_code(code, &challenge.code_hash);
    let dev_fallback =
        state.config.dev_mode && challenge.plaintext_code.as_deref() == Some(code);
    if !hash_matches && !dev_fallback {
        state
            .records
            .record_failed_otp_attempt(&challenge.otp_id)
            .map_err(|e| ApiError::internal(format!("Failed to record OTP attempt: {e}")))?;
        audit_log!(
            state.records,
            AuditEvent::new(AuditEventType::OtpVerified)
                .with_resource(&challenge.otp_id)
                .failed()
        );
        return Err(ApiError::bad_request("Invalid OTP"));
    }

    // A concurrent duplicate success loses here and sees the not-found error.
    let consumed = state
        .records
        .consume_otp(&challenge.otp_id, now)
        .map_err(|e| ApiError::internal(format!("Failed to consume OTP: {e}")))?;
    if !consumed {
        return Err(ApiError::bad_request("OTP expired or not found"));
    }

    let (merchant, is_new_user) = upsert_merchant(&state, &phone, request.name.as_deref(), None)?;

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::OtpVerified)
            .with_merchant(&merchant.merchant_id)
            .with_resource(&challenge.otp_id)
    );

    auth_response(&state, &merchant, is_new_user)
}

/// Verify a Firebase phone-auth ID token and authenticate the merchant.
///
/// Served at both `/auth/verify-otp-firebase` and
/// `/auth/verify-firebase-token`.
#[utoipa::path(
    post,
    path = "/api/auth/verify-firebase-token",
    tag = "Auth",
    request_body = FirebaseVerifyRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Phone number mismatch"),
        (status = 401, description = "Invalid Firebase token"),
        (status = 500, description = "Firebase is not configured")
    )
)]
pub async fn verify_firebase(
    State(state): State<AppState>,
    Json(request): Json<FirebaseVerifyRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let phone = normalize_phone(&request.phone_number)?;

    let verifier = state
        .firebase
        .as_deref()
        .ok_or_else(|| ApiError::internal("Firebase authentication is not configured"))?;

    let claims = verifier.verify(&request.id_token).await.map_err(|err| {
        tracing::warn!(error = %err, "firebase token verification failed");
        ApiError::unauthorized("Invalid Firebase token")
    })?;

    let verified_phone = claims
        .phone_number
        .ok_or_else(|| ApiError::bad_request("Phone number mismatch"))?;
    if !same_subscriber(&verified_phone, &phone) {
        return Err(ApiError::bad_request("Phone number mismatch"));
    }

    let (merchant, is_new_user) = upsert_merchant(&state, &phone, request.name.as_deref(), None)?;

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::OtpVerified).with_merchant(&merchant.merchant_id)
    );

    auth_response(&state, &merchant, is_new_user)
}

/// Link a Clerk-authenticated session to a merchant account.
///
/// No outbound session verification is performed; the client exchanges its
/// already-established Clerk identity for a service token.
#[utoipa::path(
    post,
    path = "/api/auth/verify-clerk-token",
    tag = "Auth",
    request_body = ClerkVerifyRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Invalid phone number or Clerk user ID")
    )
)]
pub async fn verify_clerk(
    State(state): State<AppState>,
    Json(request): Json<ClerkVerifyRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let phone = normalize_phone(&request.phone_number)?;

    let clerk_user_id = request.clerk_user_id.trim();
    if clerk_user_id.is_empty() {
        return Err(ApiError::bad_request("Invalid Clerk user ID"));
    }

    let (merchant, is_new_user) =
        upsert_merchant(&state, &phone, request.name.as_deref(), Some(clerk_user_id))?;

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::OtpVerified).with_merchant(&merchant.merchant_id)
    );

    auth_response(&state, &merchant, is_new_user)
}

/// Complete the onboarding profile.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    security(("bearer_auth" = [])),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Profile completed", body = RegisterResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn register(
    Auth(merchant): Auth,
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let profile = ProfileUpdate {
        owner_name: request.name,
        shop_name: request.shop_name,
        city: request.city,
        state: request.state,
        pincode: request.pincode,
        business_category: request.business_category,
    };

    let updated = state
        .records
        .complete_profile(&merchant.merchant_id, &profile, Utc::now())
        .map_err(|e| ApiError::internal(format!("Failed to update profile: {e}")))?;

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::MerchantRegistered).with_merchant(&updated.merchant_id)
    );

    Ok(Json(RegisterResponse {
        success: true,
        message: "Profile completed successfully".to_string(),
        user: RegisteredSummary {
            id: updated.merchant_id,
            owner_name: updated.owner_name,
            shop_name: updated.shop_name,
            city: updated.city,
            onboarding_completed: updated.onboarding_completed,
        },
    }))
}

/// Public portal key: `PL_` + last four phone digits + four random digits.
fn generate_merchant_code(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let suffix = &digits[digits.len().saturating_sub(4)..];
    let random_part = rand::thread_rng().gen_range(1000..=9999);
    format!("PL_{suffix}{random_part}")
}

/// Find-or-create for a verified phone number.
///
/// Returns the merchant and whether this call created it. An existing
/// account gets its login touched, an empty owner name backfilled, and the
/// Clerk subject linked when provided.
fn upsert_merchant(
    state: &AppState,
    phone: &str,
    name: Option<&str>,
    clerk_user_id: Option<&str>,
) -> Result<(StoredMerchant, bool), ApiError> {
    let now = Utc::now();

    if let Some(existing) = state
        .records
        .find_merchant_by_phone(phone)
        .map_err(|e| ApiError::internal(format!("Failed to look up merchant: {e}")))?
    {
        let updated = state
            .records
            .record_login(&existing.merchant_id, now, name, clerk_user_id)
            .map_err(|e| ApiError::internal(format!("Failed to record login: {e}")))?;
        return Ok((updated, false));
    }

    // The random code suffix can collide; retry with a fresh one.
    for _ in 0..3 {
        let mut merchant = StoredMerchant::new(
            phone.to_string(),
            name.unwrap_or_default().to_string(),
            generate_merchant_code(phone),
        );
        merchant.clerk_user_id = clerk_user_id.map(str::to_string);

        match state.records.create_merchant(&merchant) {
            Ok(()) => return Ok((merchant, true)),
            Err(StorageError::AlreadyExists(_)) => {
                // Lost a race on the phone number, or the code collided.
                if let Some(existing) = state
                    .records
                    .find_merchant_by_phone(phone)
                    .map_err(|e| ApiError::internal(format!("Failed to look up merchant: {e}")))?
                {
                    let updated = state
                        .records
                        .record_login(&existing.merchant_id, now, name, clerk_user_id)
                        .map_err(|e| ApiError::internal(format!("Failed to record login: {e}")))?;
                    return Ok((updated, false));
                }
            }
            Err(e) => return Err(ApiError::internal(format!("Failed to create merchant: {e}"))),
        }
    }

    Err(ApiError::internal("Failed to allocate a merchant code"))
}

/// Issue a bearer token and assemble the shared verification response.
fn auth_response(
    state: &AppState,
    merchant: &StoredMerchant,
    is_new_user: bool,
) -> Result<Json<AuthResponse>, ApiError> {
    let claims = AccessClaims::new(
        &merchant.merchant_id,
        &merchant.phone_number,
        state.config.token_ttl_days,
        Utc::now(),
    );
    let token = issue_token(&state.config.jwt_secret, &claims)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        is_new_user,
        user: MerchantProfile::from(merchant),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::decode_token;

    fn send_request(phone: &str) -> Json<SendOtpRequest> {
        Json(SendOtpRequest {
            phone_number: phone.to_string(),
            name: None,
        })
    }

    fn verify_request(phone: &str, code: &str) -> Json<VerifyOtpRequest> {
        Json(VerifyOtpRequest {
            phone_number: phone.to_string(),
            otp_code: Some(code.to_string()),
            otp: None,
            name: Some("Asha".to_string()),
        })
    }

    /// Issue a challenge with a known code, bypassing SMS delivery.
    fn seed_challenge(state: &AppState, phone: &str, code: &str) -> StoredOtpChallenge {
        let challenge =
            StoredOtpChallenge::new(phone.to_string(), otp::hash_code(code), None);
        state.records.create_otp(&challenge).expect("store otp");
        challenge
    }

    #[tokio::test]
    async fn send_otp_stores_a_pending_challenge() {
        let state = AppState::for_tests();

        let Json(response) = send_otp(State(state.clone()), send_request("98765 43210"))
            .await
            .expect("send succeeds");

        assert!(response.success);
        assert_eq!(response.phone_number, "+919876543210");
        assert_eq!(response.message, "OTP sent to +919876543210");
        assert_eq!(response.expires_in, 600);

        let pending = state
            .records
            .latest_pending_otp("+919876543210", Utc::now())
            .unwrap()
            .expect("challenge stored");
        assert_eq!(pending.attempts, 0);
        // Dev mode is off, so the plaintext is never stored.
        assert!(pending.plaintext_code.is_none());
    }

    #[tokio::test]
    async fn send_otp_rejects_malformed_phone() {
        let state = AppState::for_tests();
        let err = send_otp(State(state), send_request("12345"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Invalid phone number format");
    }

    #[tokio::test]
    async fn verify_otp_creates_account_and_issues_token() {
        let state = AppState::for_tests();
        seed_challenge(&state, "+919876543210", "123456");

        let Json(response) = verify_otp(
            State(state.clone()),
            verify_request("+919876543210", "123456"),
        )
        .await
        .expect("verification succeeds");

        assert!(response.is_new_user);
        assert_eq!(response.user.phone_number, "+919876543210");
        assert_eq!(response.user.owner_name, "Asha");
        assert!(response.user.merchant_code.starts_with("PL_3210"));

        let claims = decode_token("test_secret", &response.token).expect("token decodes");
        assert_eq!(claims.sub, response.user.id);

        // The challenge is consumed and cannot be replayed.
        assert!(state
            .records
            .latest_pending_otp("+919876543210", Utc::now())
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn verify_otp_accepts_legacy_field_name() {
        let state = AppState::for_tests();
        seed_challenge(&state, "+919876543210", "654321");

        let request = Json(VerifyOtpRequest {
            phone_number: "9876543210".to_string(),
            otp_code: None,
            otp: Some("654321".to_string()),
            name: None,
        });

        let Json(response) = verify_otp(State(state), request)
            .await
            .expect("legacy field accepted");
        assert!(response.success);
    }

    #[tokio::test]
    async fn verify_otp_requires_a_code() {
        let state = AppState::for_tests();
        let request = Json(VerifyOtpRequest {
            phone_number: "9876543210".to_string(),
            otp_code: None,
            otp: None,
            name: None,
        });

        let err = verify_otp(State(state), request).await.unwrap_err();
        assert_eq!(err.message, "Phone number and OTP code are required");
    }

    #[tokio::test]
    async fn verify_otp_without_challenge_is_rejected() {
        let state = AppState::for_tests();
        let err = verify_otp(State(state), verify_request("9876543210", "123456"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "OTP expired or not found");
    }

    #[tokio::test]
    async fn wrong_code_counts_an_attempt() {
        let state = AppState::for_tests();
        seed_challenge(&state, "+919876543210", "123456");

        let err = verify_otp(
            State(state.clone()),
            verify_request("9876543210", "000000"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.message, "Invalid OTP");

        let pending = state
            .records
            .latest_pending_otp("+919876543210", Utc::now())
            .unwrap()
            .expect("challenge still pending");
        assert_eq!(pending.attempts, 1);
    }

    #[tokio::test]
    async fn lockout_after_too_many_attempts() {
        let state = AppState::for_tests();
        let challenge = seed_challenge(&state, "+919876543210", "123456");
        for _ in 0..OTP_MAX_ATTEMPTS {
            state
                .records
                .record_failed_otp_attempt(&challenge.otp_id)
                .unwrap();
        }

        // Even the correct code is refused once the counter is exhausted.
        let err = verify_otp(State(state), verify_request("9876543210", "123456"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Too many attempts. Request new OTP.");
    }

    #[tokio::test]
    async fn second_verification_logs_in_instead_of_creating() {
        let state = AppState::for_tests();

        seed_challenge(&state, "+919876543210", "111111");
        let Json(first) = verify_otp(
            State(state.clone()),
            verify_request("9876543210", "111111"),
        )
        .await
        .expect("first verification");

        seed_challenge(&state, "+919876543210", "222222");
        let Json(second) = verify_otp(
            State(state.clone()),
            verify_request("9876543210", "222222"),
        )
        .await
        .expect("second verification");

        assert!(first.is_new_user);
        assert!(!second.is_new_user);
        assert_eq!(first.user.id, second.user.id);
        assert_eq!(first.user.merchant_code, second.user.merchant_code);
    }

    #[tokio::test]
    async fn firebase_route_requires_configuration() {
        let state = AppState::for_tests();
        let request = Json(FirebaseVerifyRequest {
            id_token: "token".to_string(),
            phone_number: "9876543210".to_string(),
            name: None,
        });

        let err = verify_firebase(State(state), request).await.unwrap_err();
        assert_eq!(err.message, "Firebase authentication is not configured");
    }

    #[tokio::test]
    async fn clerk_route_links_the_subject() {
        let state = AppState::for_tests();
        let request = Json(ClerkVerifyRequest {
            phone_number: "9876543210".to_string(),
            clerk_user_id: "user_2abc".to_string(),
            name: Some("Asha".to_string()),
        });

        let Json(response) = verify_clerk(State(state.clone()), request)
            .await
            .expect("clerk verification succeeds");
        assert!(response.is_new_user);

        let merchant = state.records.get_merchant(&response.user.id).unwrap();
        assert_eq!(merchant.clerk_user_id.as_deref(), Some("user_2abc"));
    }

    #[tokio::test]
    async fn clerk_route_rejects_blank_subject() {
        let state = AppState::for_tests();
        let request = Json(ClerkVerifyRequest {
            phone_number: "9876543210".to_string(),
            clerk_user_id: "   ".to_string(),
            name: None,
        });

        let err = verify_clerk(State(state), request).await.unwrap_err();
        assert_eq!(err.message, "Invalid Clerk user ID");
    }

    #[tokio::test]
    async fn register_completes_the_profile() {
        let state = AppState::for_tests();
        let merchant = StoredMerchant::new(
            "+919876543210".to_string(),
            String::new(),
            "PL_32101234".to_string(),
        );
        state.records.create_merchant(&merchant).unwrap();

        let request = Json(RegisterRequest {
            name: "Asha".to_string(),
            shop_name: "Asha Prints".to_string(),
            city: "Guwahati".to_string(),
            state: None,
            pincode: Some("781001".to_string()),
            business_category: None,
        });

        let Json(response) = register(Auth(merchant.clone()), State(state.clone()), request)
            .await
            .expect("registration succeeds");

        assert!(response.user.onboarding_completed);
        assert_eq!(response.user.shop_name, "Asha Prints");

        let stored = state.records.get_merchant(&merchant.merchant_id).unwrap();
        assert!(stored.onboarding_completed);
        assert_eq!(stored.state, "Assam");
        assert_eq!(stored.business_category, "print_shop");
        assert_eq!(stored.pincode, "781001");
    }

    #[test]
    fn merchant_code_carries_the_phone_suffix() {
        let code = generate_merchant_code("+919876543210");
        assert!(code.starts_with("PL_3210"));
        assert_eq!(code.len(), 11);
        assert!(code[7..].chars().all(|c| c.is_ascii_digit()));
    }
}
