// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Subscription endpoints: plan catalog, trial activation, and the
//! Razorpay order/verify flow for the paid tier.
//!
//! Without Razorpay credentials the order and verify endpoints run in
//! test mode: a synthetic order is issued and verification activates the
//! subscription without a signature check.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    models::{plan_catalog, unlimited_plan, PlanInfo},
    providers::razorpay::{PaymentOrder, RazorpayClient},
    state::AppState,
    storage::{AuditEvent, AuditEventType, TrialStartOutcome, UNLIMITED_MONTHLY_LIMIT},
};

/// Plan catalog response.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlansResponse {
    pub success: bool,
    pub plans: Vec<PlanInfo>,
}

/// List the available plans.
#[utoipa::path(
    get,
    path = "/api/subscriptions/plans",
    tag = "Subscriptions",
    responses((status = 200, description = "Plan catalog", body = PlansResponse))
)]
pub async fn get_plans() -> Json<PlansResponse> {
    Json(PlansResponse {
        success: true,
        plans: plan_catalog(),
    })
}

/// Trial activation response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartTrialResponse {
    pub success: bool,
    pub message: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Start the one-per-lifetime 7-day unlimited trial.
#[utoipa::path(
    post,
    path = "/api/subscriptions/start-trial",
    tag = "Subscriptions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Trial activated", body = StartTrialResponse),
        (status = 400, description = "Already entitled or trial already used")
    )
)]
pub async fn start_trial(
    Auth(merchant): Auth,
    State(state): State<AppState>,
) -> Result<Json<StartTrialResponse>, ApiError> {
    let outcome = state
        .records
        .start_trial(&merchant.merchant_id, Utc::now())
        .map_err(|e| ApiError::internal(format!("Failed to start trial: {e}")))?;

    let updated = match outcome {
        TrialStartOutcome::Started(updated) => updated,
        TrialStartOutcome::AlreadyEntitled => {
            return Err(ApiError::bad_request("Already on trial or paid plan"))
        }
        TrialStartOutcome::AlreadyUsed => {
            return Err(ApiError::bad_request("Trial already used"))
        }
    };

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::TrialStarted).with_merchant(&updated.merchant_id)
    );

    Ok(Json(StartTrialResponse {
        success: true,
        message: "7-day unlimited trial activated".to_string(),
        trial_ends_at: updated.trial_ends_at,
    }))
}

/// Request to create a payment order.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub plan_id: String,
}

/// Payment order response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: OrderInfo,
    /// Present (true) only for synthetic orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_mode: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    pub order_id: String,
    /// Amount in paise.
    pub amount: u64,
    pub currency: String,
    pub razorpay_key_id: String,
    pub plan_details: PlanDetails,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetails {
    pub name: String,
    pub monthly_limit: u32,
    /// Monthly price in rupees.
    pub price: u32,
}

impl PlanDetails {
    fn unlimited() -> Self {
        let plan = unlimited_plan();
        Self {
            name: plan.name,
            monthly_limit: plan.monthly_limit,
            price: plan.price,
        }
    }
}

/// Create a Razorpay order for the unlimited plan.
#[utoipa::path(
    post,
    path = "/api/subscriptions/create-order",
    tag = "Subscriptions",
    security(("bearer_auth" = [])),
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Plan is not purchasable"),
        (status = 500, description = "Provider order creation failed")
    )
)]
pub async fn create_order(
    Auth(merchant): Auth,
    State(_state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    if request.plan_id != "unlimited" {
        return Err(ApiError::bad_request("Invalid plan selected"));
    }

    if !RazorpayClient::is_configured() {
        let order = PaymentOrder::test_order();
        return Ok(Json(CreateOrderResponse {
            success: true,
            order: OrderInfo {
                order_id: order.order_id,
                amount: order.amount,
                currency: order.currency,
                razorpay_key_id: order.key_id,
                plan_details: PlanDetails::unlimited(),
            },
            test_mode: Some(true),
        }));
    }

    let client = RazorpayClient::from_env()
        .map_err(|e| ApiError::internal(format!("Failed to initialize payment provider: {e}")))?;
    let order = client
        .create_order(&merchant.merchant_id, &merchant.phone_number)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, merchant_id = %merchant.merchant_id, "order creation failed");
            ApiError::internal("Failed to create payment order")
        })?;

    Ok(Json(CreateOrderResponse {
        success: true,
        order: OrderInfo {
            order_id: order.order_id,
            amount: order.amount,
            currency: order.currency,
            razorpay_key_id: order.key_id,
            plan_details: PlanDetails::unlimited(),
        },
        test_mode: None,
    }))
}

/// Payment verification request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Payment verification response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub subscription: ActivatedSubscription,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivatedSubscription {
    pub plan: String,
    pub monthly_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

/// Verify a Razorpay payment and activate the unlimited plan.
///
/// The signature is recomputed server-side and compared in constant time;
/// on mismatch nothing is activated.
#[utoipa::path(
    post,
    path = "/api/subscriptions/verify-payment",
    tag = "Subscriptions",
    security(("bearer_auth" = [])),
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Subscription activated", body = VerifyPaymentResponse),
        (status = 400, description = "Signature mismatch")
    )
)]
pub async fn verify_payment(
    Auth(merchant): Auth,
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let test_mode = !RazorpayClient::is_configured();

    if !test_mode {
        let client = RazorpayClient::from_env().map_err(|e| {
            ApiError::internal(format!("Failed to initialize payment provider: {e}"))
        })?;
        if !client.verify_payment(
            &request.razorpay_order_id,
            &request.razorpay_payment_id,
            &request.razorpay_signature,
        ) {
            audit_log!(
                state.records,
                AuditEvent::new(AuditEventType::PaymentVerified)
                    .with_merchant(&merchant.merchant_id)
                    .failed()
            );
            return Err(ApiError::bad_request("Payment verification failed"));
        }
    }

    let updated = state
        .records
        .activate_unlimited(&merchant.merchant_id, &request.razorpay_payment_id, Utc::now())
        .map_err(|e| ApiError::internal(format!("Failed to activate subscription: {e}")))?;

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::PaymentVerified)
            .with_merchant(&updated.merchant_id)
            .with_resource(&request.razorpay_payment_id)
    );

    let (message, payment_id) = if test_mode {
        ("Subscription activated (test mode)".to_string(), None)
    } else {
        (
            "Payment verified! Subscription activated.".to_string(),
            Some(request.razorpay_payment_id),
        )
    };

    Ok(Json(VerifyPaymentResponse {
        success: true,
        message,
        subscription: ActivatedSubscription {
            plan: "unlimited".to_string(),
            monthly_limit: UNLIMITED_MONTHLY_LIMIT,
            payment_id,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StoredMerchant, SubscriptionStatus};

    fn seeded_merchant(state: &AppState) -> StoredMerchant {
        let merchant = StoredMerchant::new(
            "+919876543210".to_string(),
            "Asha".to_string(),
            "PL_32104821".to_string(),
        );
        state.records.create_merchant(&merchant).unwrap();
        merchant
    }

    #[tokio::test]
    async fn plans_catalog_is_static() {
        let Json(response) = get_plans().await;
        assert!(response.success);
        assert_eq!(response.plans.len(), 2);
        assert_eq!(response.plans[0].id, "free");
        assert_eq!(response.plans[1].id, "unlimited");
    }

    #[tokio::test]
    async fn trial_activates_once_per_lifetime() {
        let state = AppState::for_tests();
        let merchant = seeded_merchant(&state);

        let Json(response) = start_trial(Auth(merchant.clone()), State(state.clone()))
            .await
            .expect("trial starts");
        assert_eq!(response.message, "7-day unlimited trial activated");
        assert!(response.trial_ends_at.is_some());

        let updated = state.records.get_merchant(&merchant.merchant_id).unwrap();
        assert_eq!(updated.subscription_status, SubscriptionStatus::Trial);
        assert_eq!(updated.monthly_upload_limit, UNLIMITED_MONTHLY_LIMIT);

        // While entitled, a second activation is refused outright.
        let err = start_trial(Auth(updated.clone()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Already on trial or paid plan");
    }

    #[tokio::test]
    async fn trial_never_restarts_after_downgrade() {
        let state = AppState::for_tests();
        let merchant = seeded_merchant(&state);

        start_trial(Auth(merchant.clone()), State(state.clone()))
            .await
            .expect("trial starts");
        state
            .records
            .expire_trials(Utc::now() + chrono::Duration::days(8))
            .unwrap();

        let downgraded = state.records.get_merchant(&merchant.merchant_id).unwrap();
        assert_eq!(downgraded.subscription_status, SubscriptionStatus::Free);

        let err = start_trial(Auth(downgraded), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Trial already used");
    }

    #[tokio::test]
    async fn only_the_unlimited_plan_is_purchasable() {
        let state = AppState::for_tests();
        let merchant = seeded_merchant(&state);

        let err = create_order(
            Auth(merchant),
            State(state),
            Json(CreateOrderRequest {
                plan_id: "free".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.message, "Invalid plan selected");
    }

    #[tokio::test]
    async fn unconfigured_provider_issues_test_order() {
        let state = AppState::for_tests();
        let merchant = seeded_merchant(&state);

        let Json(response) = create_order(
            Auth(merchant),
            State(state),
            Json(CreateOrderRequest {
                plan_id: "unlimited".to_string(),
            }),
        )
        .await
        .expect("test order issued");

        assert_eq!(response.test_mode, Some(true));
        assert!(response.order.order_id.starts_with("order_"));
        assert_eq!(response.order.amount, 25_000);
        assert_eq!(response.order.currency, "INR");
        assert_eq!(response.order.razorpay_key_id, "rzp_test_placeholder");
        assert_eq!(response.order.plan_details.name, "Unlimited");
        assert_eq!(response.order.plan_details.price, 250);
    }

    #[tokio::test]
    async fn unconfigured_provider_activates_in_test_mode() {
        let state = AppState::for_tests();
        let merchant = seeded_merchant(&state);

        let Json(response) = verify_payment(
            Auth(merchant.clone()),
            State(state.clone()),
            Json(VerifyPaymentRequest {
                razorpay_order_id: "order_test".to_string(),
                razorpay_payment_id: "pay_test".to_string(),
                razorpay_signature: String::new(),
            }),
        )
        .await
        .expect("test-mode activation succeeds");

        assert_eq!(response.message, "Subscription activated (test mode)");
        assert_eq!(response.subscription.plan, "unlimited");
        assert!(response.subscription.payment_id.is_none());

        let updated = state.records.get_merchant(&merchant.merchant_id).unwrap();
        assert_eq!(updated.subscription_status, SubscriptionStatus::Unlimited);
        assert_eq!(updated.monthly_upload_limit, UNLIMITED_MONTHLY_LIMIT);
    }
}
