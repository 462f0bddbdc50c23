// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Paperlink - Document Sharing Service for Print Merchants
//!
//! This crate provides the multi-tenant backend behind Paperlink: print
//! merchants authenticate by phone, upload customer documents that
//! self-destruct on a timer, and hand out QR-coded share links. A public
//! portal keyed by merchant code accepts uploads from walk-in customers.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Phone OTP authentication and bearer tokens
//! - `providers` - SMS, Firebase, and Razorpay integrations
//! - `storage` - Record store (redb) and content store
//! - `sweeper` - Trial expiry and document reaping

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod qr;
pub mod state;
pub mod storage;
pub mod sweeper;
