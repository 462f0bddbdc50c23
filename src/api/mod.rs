// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppConfig,
    models::{MerchantProfile, PlanInfo},
    state::AppState,
    storage::{DocumentStatus, SubscriptionStatus},
};

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod public;
pub mod referrals;
pub mod subscriptions;

/// Request body ceiling: the 50 MiB upload limit plus multipart overhead.
const MAX_BODY_BYTES: usize = documents::MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/auth/send-otp", post(auth::send_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/verify-otp-firebase", post(auth::verify_firebase))
        .route("/auth/verify-firebase-token", post(auth::verify_firebase))
        .route("/auth/verify-clerk-token", post(auth::verify_clerk))
        .route("/auth/register", post(auth::register))
        .route("/documents/upload", post(documents::upload_document))
        .route("/documents/list", get(documents::list_documents))
        .route(
            "/documents/public/{share_link}",
            get(public::view_shared_document),
        )
        .route(
            "/documents/download/{share_link}",
            get(public::download_document),
        )
        .route(
            "/documents/customer-upload/{merchant_code}",
            post(public::customer_upload),
        )
        .route(
            "/documents/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/dashboard/stats", get(dashboard::dashboard_stats))
        .route("/subscriptions/plans", get(subscriptions::get_plans))
        .route("/subscriptions/start-trial", post(subscriptions::start_trial))
        .route(
            "/subscriptions/create-order",
            post(subscriptions::create_order),
        )
        .route(
            "/subscriptions/verify-payment",
            post(subscriptions::verify_payment),
        )
        .route("/referrals/my-code", get(referrals::my_referral_code))
        .route("/admin/check-trials", post(admin::check_trials));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Permissive CORS for `*`, otherwise the configured origin list.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::send_otp,
        auth::verify_otp,
        auth::verify_firebase,
        auth::verify_clerk,
        auth::register,
        documents::upload_document,
        documents::list_documents,
        documents::get_document,
        documents::delete_document,
        public::view_shared_document,
        public::download_document,
        public::customer_upload,
        dashboard::dashboard_stats,
        subscriptions::get_plans,
        subscriptions::start_trial,
        subscriptions::create_order,
        subscriptions::verify_payment,
        referrals::my_referral_code,
        admin::check_trials
    ),
    components(
        schemas(
            MerchantProfile,
            PlanInfo,
            SubscriptionStatus,
            DocumentStatus,
            health::ServiceInfo,
            health::LiveResponse,
            health::ReadyResponse,
            health::ReadyChecks,
            auth::SendOtpRequest,
            auth::SendOtpResponse,
            auth::VerifyOtpRequest,
            auth::FirebaseVerifyRequest,
            auth::ClerkVerifyRequest,
            auth::AuthResponse,
            auth::RegisterRequest,
            auth::RegisterResponse,
            auth::RegisteredSummary,
            documents::UploadResponse,
            documents::UploadedDocument,
            documents::DocumentListResponse,
            documents::DocumentSummary,
            documents::DocumentDetailResponse,
            documents::DocumentDetail,
            documents::DeleteResponse,
            public::SharedViewResponse,
            public::SharedDocument,
            public::CustomerUploadResponse,
            dashboard::DashboardStatsResponse,
            dashboard::DashboardStats,
            dashboard::DocumentStats,
            dashboard::SubscriptionStats,
            subscriptions::PlansResponse,
            subscriptions::StartTrialResponse,
            subscriptions::CreateOrderRequest,
            subscriptions::CreateOrderResponse,
            subscriptions::OrderInfo,
            subscriptions::PlanDetails,
            subscriptions::ActivatedSubscription,
            subscriptions::VerifyPaymentRequest,
            subscriptions::VerifyPaymentResponse,
            referrals::ReferralCodeResponse,
            referrals::ReferralInfo,
            admin::CheckTrialsResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health and readiness"),
        (name = "Auth", description = "Phone OTP and provider token authentication"),
        (name = "Documents", description = "Merchant document lifecycle"),
        (name = "Public", description = "Share links and the customer upload portal"),
        (name = "Dashboard", description = "Merchant statistics"),
        (name = "Subscriptions", description = "Plans, trials, and payments"),
        (name = "Referrals", description = "Legacy referral compatibility"),
        (name = "Admin", description = "Operational tooling")
    )
)]
struct ApiDoc;
