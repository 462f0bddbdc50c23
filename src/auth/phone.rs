// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Phone number normalization.
//!
//! Merchants sign up with Indian mobile numbers. Storage and token claims
//! always carry the canonical `+91XXXXXXXXXX` form so lookups by phone are
//! exact string matches.

use crate::error::ApiError;

/// Country code for all merchant accounts.
const COUNTRY_CODE: &str = "91";

/// Normalize a raw phone string to canonical `+91` form.
///
/// Accepts exactly 10 bare digits (country code is prefixed) or 12 digits
/// already starting with the country code. Separators and whitespace are
/// ignored; anything else is rejected.
pub fn normalize_phone(raw: &str) -> Result<String, ApiError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => Ok(format!("+{COUNTRY_CODE}{digits}")),
        12 if digits.starts_with(COUNTRY_CODE) => Ok(format!("+{digits}")),
        _ => Err(ApiError::bad_request("Invalid phone number format")),
    }
}

/// Whether a provider-verified phone belongs to the claimed number.
///
/// Compares on the 10-digit subscriber suffix so formatting differences
/// between the identity provider and the client never cause a false
/// mismatch.
pub fn same_subscriber(verified: &str, claimed: &str) -> bool {
    let claimed_digits: String = claimed.chars().filter(|c| c.is_ascii_digit()).collect();
    if claimed_digits.len() < 10 {
        return false;
    }
    let suffix = &claimed_digits[claimed_digits.len() - 10..];
    verified.ends_with(suffix)
}
