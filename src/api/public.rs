// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Unauthenticated document surface: the customer-facing share view,
//! the download endpoint behind it, and the merchant-code upload portal.
//!
//! The share view is the gate: expiry and one-time-view are enforced
//! there as one conditional storage operation. Download deliberately
//! re-checks nothing; it serves until the content is physically reaped.

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    audit_log,
    error::ApiError,
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, DocumentStatus, QuotaCharge, ShareViewOutcome, StorageError,
        StoredDocument,
    },
};

use super::documents::{parse_bool_field, parse_minutes_field, read_file_part, FilePart};

/// Public share-view response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedViewResponse {
    pub success: bool,
    pub document: SharedDocument,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedDocument {
    pub id: String,
    pub customer_name: String,
    pub order_details: Option<String>,
    /// Relative URL the viewer fetches the bytes from.
    pub download_url: String,
    /// Seconds until expiry, floored at zero.
    pub expires: i64,
    pub one_time_view: bool,
    pub file_name: String,
    pub file_type: String,
    pub allow_download: bool,
}

/// View a shared document.
///
/// The view-counter increment is conditional inside the store, so a
/// one-time-view link succeeds for at most one caller ever.
#[utoipa::path(
    get,
    path = "/api/documents/public/{share_link}",
    tag = "Public",
    params(("share_link" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "Document metadata", body = SharedViewResponse),
        (status = 404, description = "Unknown or deleted share link"),
        (status = 410, description = "Expired or already consumed")
    )
)]
pub async fn view_shared_document(
    State(state): State<AppState>,
    Path(share_link): Path<String>,
) -> Result<Json<SharedViewResponse>, ApiError> {
    let now = Utc::now();
    let outcome = match state.records.consume_share_view(&share_link, now) {
        Ok(outcome) => outcome,
        Err(StorageError::NotFound(_)) => {
            return Err(ApiError::not_found("Document not found or expired"))
        }
        Err(e) => return Err(ApiError::internal(format!("Failed to resolve share link: {e}"))),
    };

    let document = match outcome {
        ShareViewOutcome::Viewed(document) => document,
        ShareViewOutcome::Expired => return Err(ApiError::gone("Document has expired")),
        ShareViewOutcome::AlreadyConsumed => {
            return Err(ApiError::gone(
                "Document was a one-time view and has been accessed",
            ))
        }
    };

    Ok(Json(SharedViewResponse {
        success: true,
        document: SharedDocument {
            id: document.document_id.clone(),
            customer_name: document.customer_name.clone(),
            order_details: document.order_details.clone(),
            download_url: format!("/api/documents/download/{share_link}"),
            expires: document.remaining_seconds(now),
            one_time_view: document.one_time_view,
            file_name: document.document_name.clone(),
            file_type: document.content_type,
            allow_download: document.allow_download,
        },
    }))
}

/// Download a shared document's bytes.
///
/// No expiry or one-time-view re-check: a viewer that passed the gate can
/// still fetch the file. Missing record or missing bytes is 404.
#[utoipa::path(
    get,
    path = "/api/documents/download/{share_link}",
    tag = "Public",
    params(("share_link" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "File bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown link or content already reaped")
    )
)]
pub async fn download_document(
    State(state): State<AppState>,
    Path(share_link): Path<String>,
) -> Result<Response, ApiError> {
    let document = state
        .records
        .find_document_by_share_link(&share_link)
        .map_err(|e| ApiError::internal(format!("Failed to resolve share link: {e}")))?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    let bytes = match state.content.get(&document.storage_key) {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => return Err(ApiError::not_found("File not found")),
        Err(e) => return Err(ApiError::internal(format!("Failed to read file: {e}"))),
    };

    let filename = document.document_name.replace(['"', '\r', '\n'], "_");
    let headers = [
        (header::CONTENT_TYPE, document.content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// Customer-portal upload response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUploadResponse {
    pub success: bool,
    pub message: String,
    pub document_id: String,
    /// Minutes until the upload self-destructs.
    pub self_destruct_in: i64,
    pub merchant_shop: String,
}

/// Accept a customer upload on a merchant's public portal.
///
/// Counts toward the merchant's lifetime total only; the monthly quota is
/// charged for merchant-initiated uploads alone. No share link is created.
#[utoipa::path(
    post,
    path = "/api/documents/customer-upload/{merchant_code}",
    tag = "Public",
    params(("merchant_code" = String, Path, description = "Merchant portal code")),
    request_body(content_type = "multipart/form-data", description = "File plus optional customer fields"),
    responses(
        (status = 200, description = "Upload accepted", body = CustomerUploadResponse),
        (status = 400, description = "Oversized or missing file"),
        (status = 404, description = "Unknown merchant code")
    )
)]
pub async fn customer_upload(
    State(state): State<AppState>,
    Path(merchant_code): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<CustomerUploadResponse>, ApiError> {
    let merchant = state
        .records
        .find_merchant_by_code(&merchant_code)
        .map_err(|e| ApiError::internal(format!("Failed to look up merchant: {e}")))?
        .ok_or_else(|| ApiError::not_found("Merchant not found"))?;

    let mut file: Option<FilePart> = None;
    let mut customer_name: Option<String> = None;
    let mut customer_phone: Option<String> = None;
    let mut self_destruct_minutes: i64 = 5;
    let mut allow_merchant_download = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file = Some(read_file_part(field).await?);
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
        match name.as_str() {
            "customerName" => customer_name = Some(value),
            "customerPhone" => customer_phone = Some(value),
            "selfDestructMinutes" => {
                self_destruct_minutes = parse_minutes_field(&value, "selfDestructMinutes")?
            }
            "allowMerchantDownload" => allow_merchant_download = parse_bool_field(&value),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("File is required"))?;

    let now = Utc::now();
    let document_id = Uuid::new_v4().to_string();
    let storage_key = format!("customer-uploads/{document_id}/{}", file.filename);

    state
        .content
        .put(&storage_key, &file.bytes)
        .map_err(|e| ApiError::internal(format!("Failed to store file: {e}")))?;

    let document = StoredDocument {
        document_id: document_id.clone(),
        owner_id: merchant.merchant_id.clone(),
        document_name: file.filename,
        content_type: file.content_type,
        file_size: file.bytes.len() as u64,
        storage_key: storage_key.clone(),
        share_link: None,
        share_link_expires_at: None,
        share_view_count: 0,
        one_time_view: false,
        allow_download: allow_merchant_download,
        customer_name: customer_name.unwrap_or_default(),
        customer_phone,
        customer_email: None,
        order_details: None,
        due_date: None,
        status: DocumentStatus::Active,
        customer_uploaded: true,
        auto_delete_at: now + Duration::minutes(self_destruct_minutes),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    if let Err(err) = state
        .records
        .create_document(&document, QuotaCharge::LifetimeOnly)
    {
        if let Err(cleanup) = state.content.delete(&storage_key) {
            tracing::warn!(error = %cleanup, key = %storage_key, "failed to clean up orphaned upload");
        }
        return Err(ApiError::internal(format!("Failed to create document: {err}")));
    }

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::CustomerUploadReceived)
            .with_merchant(&merchant.merchant_id)
            .with_resource(&document_id)
    );

    let merchant_shop = if merchant.shop_name.is_empty() {
        "Print Shop".to_string()
    } else {
        merchant.shop_name
    };

    Ok(Json(CustomerUploadResponse {
        success: true,
        message: "Document uploaded successfully".to_string(),
        document_id,
        self_destruct_in: self_destruct_minutes,
        merchant_shop,
    }))
}
