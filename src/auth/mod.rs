// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! # Authentication Module
//!
//! Phone-first authentication for the Paperlink API.
//!
//! ## Auth Flow
//!
//! 1. Client calls `POST /api/auth/send-otp` with a phone number; the
//!    server stores a hashed challenge and sends the code over SMS.
//! 2. Client calls `POST /api/auth/verify-otp` with the code; on match the
//!    merchant account is created or logged in and an HS256-signed access
//!    token is issued (30 days by default).
//! 3. Every authenticated endpoint takes `Authorization: Bearer <token>`,
//!    verified by the [`extractor::Auth`] extractor against the configured
//!    signing secret and resolved to the stored merchant.
//!
//! Firebase and Clerk token exchange are accepted as alternate identity
//! proofs on dedicated endpoints; both land in the same token issuance
//! path.
//!
//! ## Security
//!
//! - OTP codes are stored as SHA-256 digests and compared in constant time
//! - Challenges expire after 10 minutes and lock after 5 failed attempts
//! - Clock skew tolerance for token validation is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod otp;
pub mod phone;
pub mod tokens;

pub use claims::AccessClaims;
pub use error::AuthError;
pub use extractor::Auth;
pub use phone::{normalize_phone, same_subscriber};
