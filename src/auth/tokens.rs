// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Access token issuance and verification (HS256).

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::AccessClaims;
use super::error::AuthError;

/// Clock skew tolerance in seconds.
pub const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Sign claims with the configured secret.
pub fn issue_token(secret: &str, claims: &AccessClaims) -> Result<String, AuthError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InternalError(format!("failed to sign token: {e}")))
}

/// Verify a token and return its claims.
pub fn decode_token(secret: &str, token: &str) -> Result<AccessClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;

    let token_data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        _ => AuthError::MalformedToken,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SECRET: &str = "test_secret";

    #[test]
    fn issue_and_decode_roundtrip() {
        let claims = AccessClaims::new("merchant-1", "+919876543210", 30, Utc::now());
        let token = issue_token(SECRET, &claims).unwrap();

        let decoded = decode_token(SECRET, &token).unwrap();
        assert_eq!(decoded.sub, "merchant-1");
        assert_eq!(decoded.phone, "+919876543210");
        assert_eq!(decoded.exp, claims.exp);
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let claims = AccessClaims::new("merchant-1", "+919876543210", 30, Utc::now());
        let token = issue_token(SECRET, &claims).unwrap();

        assert!(matches!(
            decode_token("another_secret", &token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = AccessClaims::new("merchant-1", "+919876543210", 30, Utc::now());
        claims.exp = claims.iat - 2 * CLOCK_SKEW_LEEWAY as i64;
        claims.iat = claims.exp - 60;
        let token = issue_token(SECRET, &claims).unwrap();

        assert!(matches!(
            decode_token(SECRET, &token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decode_token(SECRET, "not-a-token"),
            Err(AuthError::MalformedToken)
        ));
    }
}
