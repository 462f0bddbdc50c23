// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! External service integrations.
//!
//! Each provider reads its own credentials from the environment and is
//! considered unconfigured (not an error) when they are absent, so a bare
//! development checkout runs with console SMS, test payment orders, and
//! Firebase exchange disabled.

pub mod firebase;
pub mod razorpay;
pub mod sms;

pub use firebase::FirebaseVerifier;
pub use razorpay::RazorpayClient;
pub use sms::SmsClient;
