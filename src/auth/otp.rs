// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! OTP code generation and verification.
//!
//! Codes are six decimal digits drawn uniformly from [100000, 999999].
//! Only a SHA-256 digest is stored; verification decodes the stored
//! digest and compares in constant time.

use base64ct::{Base64, Encoding};
use rand::Rng;
use ring::constant_time::verify_slices_are_equal;
use sha2::{Digest, Sha256};

/// Generate a 6-digit numeric code.
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    code.to_string()
}

/// One-way digest of a code, base64 encoded for storage.
pub fn hash_code(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    Base64::encode_string(&digest)
}

/// Compare a candidate code against a stored digest in constant time.
pub fn verify_code(candidate: &str, stored_hash: &str) -> bool {
    let candidate_digest = Sha256::digest(candidate.as_bytes());
    match Base64::decode_vec(stored_hash) {
        Ok(stored_digest) => {
            verify_slices_are_equal(candidate_digest.as_slice(), &stored_digest).is_ok()
        }
        Err(_) => false,
    }
}
