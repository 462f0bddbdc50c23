// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Razorpay integration for subscription payments.
//!
//! Order creation goes through the Orders API with basic auth. Payment
//! verification never calls Razorpay: the checkout callback carries an
//! HMAC-SHA256 signature over `order_id|payment_id` computed with the key
//! secret, which the server recomputes and compares in constant time.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;

use crate::config::env_optional;

type HmacSha256 = Hmac<Sha256>;

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

/// Price of the unlimited plan in paise (₹250).
pub const UNLIMITED_PLAN_AMOUNT_PAISE: u64 = 25_000;

/// Currency for all orders.
pub const ORDER_CURRENCY: &str = "INR";

/// Key ID reported for synthetic orders when Razorpay is unconfigured.
pub const TEST_MODE_KEY_ID: &str = "rzp_test_placeholder";

#[derive(Debug, thiserror::Error)]
pub enum RazorpayError {
    #[error("Razorpay configuration missing: {0}")]
    MissingConfig(String),

    #[error("Razorpay request failed: {0}")]
    Request(String),

    #[error("Razorpay response was invalid: {0}")]
    InvalidResponse(String),
}

/// An order handed to the checkout widget.
#[derive(Debug, Clone)]
pub struct PaymentOrder {
    pub order_id: String,
    pub amount: u64,
    pub currency: String,
    pub key_id: String,
}

impl PaymentOrder {
    /// Synthetic order for environments without Razorpay credentials.
    pub fn test_order() -> Self {
        let suffix: String = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
        Self {
            order_id: format!("order_{suffix}"),
            amount: UNLIMITED_PLAN_AMOUNT_PAISE,
            currency: ORDER_CURRENCY.to_string(),
            key_id: TEST_MODE_KEY_ID.to_string(),
        }
    }
}

/// Client for the Razorpay Orders API.
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    key_id: String,
    key_secret: String,
    http: Client,
}

impl RazorpayClient {
    pub fn is_configured() -> bool {
        env_optional("RAZORPAY_KEY_ID").is_some() && env_optional("RAZORPAY_KEY_SECRET").is_some()
    }

    pub fn from_env() -> Result<Self, RazorpayError> {
        let key_id = env_required("RAZORPAY_KEY_ID")?;
        let key_secret = env_required("RAZORPAY_KEY_SECRET")?;

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| RazorpayError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            key_id,
            key_secret,
            http,
        })
    }

    /// Create an order for the unlimited plan.
    pub async fn create_order(
        &self,
        merchant_id: &str,
        phone_number: &str,
    ) -> Result<PaymentOrder, RazorpayError> {
        let payload = json!({
            "amount": UNLIMITED_PLAN_AMOUNT_PAISE,
            "currency": ORDER_CURRENCY,
            "receipt": order_receipt(merchant_id),
            "notes": {
                "merchant_id": merchant_id,
                "plan_id": "unlimited",
                "phone": phone_number,
            },
        });

        let response = self
            .http
            .post(format!("{RAZORPAY_API_BASE}/orders"))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&payload)
            .send()
            .await
            .map_err(|e| RazorpayError::Request(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| RazorpayError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            let description = body
                .pointer("/error/description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(RazorpayError::Request(format!("{status}: {description}")));
        }

        let order_id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RazorpayError::InvalidResponse("missing order id in response".to_string())
            })?
            .to_string();

        Ok(PaymentOrder {
            order_id,
            amount: UNLIMITED_PLAN_AMOUNT_PAISE,
            currency: ORDER_CURRENCY.to_string(),
            key_id: self.key_id.clone(),
        })
    }

    /// Verify a checkout callback signature against this client's secret.
    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(&self.key_secret, order_id, payment_id, signature)
    }
}

/// Recompute the checkout signature and compare in constant time.
///
/// Razorpay signs `order_id|payment_id` with HMAC-SHA256 using the key
/// secret and sends the lowercase hex digest.
pub fn verify_payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key_secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    ring::constant_time::verify_slices_are_equal(expected.as_bytes(), signature.as_bytes()).is_ok()
}

fn order_receipt(merchant_id: &str) -> String {
    let short = &merchant_id[..merchant_id.len().min(8)];
    format!("pl_sub_{short}")
}

fn env_required(name: &str) -> Result<String, RazorpayError> {
    env_optional(name).ok_or_else(|| RazorpayError::MissingConfig(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let signature = sign("secret", "order_abc", "pay_xyz");
        assert!(verify_payment_signature(
            "secret",
            "order_abc",
            "pay_xyz",
            &signature
        ));
    }

    #[test]
    fn wrong_secret_or_ids_fail() {
        let signature = sign("secret", "order_abc", "pay_xyz");
        assert!(!verify_payment_signature(
            "other",
            "order_abc",
            "pay_xyz",
            &signature
        ));
        assert!(!verify_payment_signature(
            "secret",
            "order_abc",
            "pay_other",
            &signature
        ));
        assert!(!verify_payment_signature(
            "secret",
            "order_abc",
            "pay_xyz",
            "deadbeef"
        ));
    }

    #[test]
    fn test_order_uses_placeholder_key() {
        let order = PaymentOrder::test_order();
        assert!(order.order_id.starts_with("order_"));
        assert_eq!(order.order_id.len(), "order_".len() + 12);
        assert_eq!(order.amount, UNLIMITED_PLAN_AMOUNT_PAISE);
        assert_eq!(order.currency, "INR");
        assert_eq!(order.key_id, TEST_MODE_KEY_ID);
    }

    #[test]
    fn receipt_truncates_long_merchant_ids() {
        assert_eq!(order_receipt("0123456789abcdef"), "pl_sub_01234567");
        assert_eq!(order_receipt("abc"), "pl_sub_abc");
    }
}
