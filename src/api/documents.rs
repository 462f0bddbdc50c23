// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! Merchant-facing document lifecycle: upload, list, detail, delete.
//!
//! Uploads are multipart, capped at 50 MiB, and charged against the
//! merchant's monthly quota inside the same storage transaction that
//! creates the record. Every shared document gets an opaque share token
//! (never the document id) and a QR code encoding the share URL.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    qr,
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, DocumentStatus, QuotaCharge, StorageError, StoredDocument,
    },
};

/// Upload ceiling in bytes (50 MiB).
pub const MAX_UPLOAD_BYTES: usize = 52_428_800;

pub const FILE_TOO_LARGE: &str = "File too large. Maximum size is 50MB.";
const QUOTA_EXHAUSTED: &str = "Monthly upload limit reached. Please upgrade your plan.";

/// A file part pulled out of a multipart form.
pub struct FilePart {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Read one multipart field as a file, enforcing the size ceiling.
pub async fn read_file_part(
    field: axum::extract::multipart::Field<'_>,
) -> Result<FilePart, ApiError> {
    let filename = sanitize_filename(field.file_name().unwrap_or_default());
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::bad_request(FILE_TOO_LARGE));
    }
    Ok(FilePart {
        filename,
        content_type,
        bytes: bytes.to_vec(),
    })
}

/// Keep only the final path component of a client-supplied filename.
pub fn sanitize_filename(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim()
        .to_string();
    if name.is_empty() || name == "." || name == ".." {
        "upload.bin".to_string()
    } else {
        name
    }
}

/// Lenient form-field boolean ("true", "1", "yes", "on").
pub fn parse_bool_field(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Positive self-destruct window in minutes.
pub fn parse_minutes_field(value: &str, field: &str) -> Result<i64, ApiError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|m| *m > 0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid {field}")))
}

/// Upload response payload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub document: UploadedDocument,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    pub id: String,
    pub document_name: String,
    /// Full share URL for the customer.
    pub shared_link: String,
    /// SVG QR code of the share URL, as a data: URL.
    pub qr_code: String,
    /// Seconds until the share link expires.
    pub expires_in: i64,
    pub share_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Upload a document and create its share link.
///
/// The record insert and both owner counters move in one storage
/// transaction; on quota failure no document exists and no counter moved.
#[utoipa::path(
    post,
    path = "/api/documents/upload",
    tag = "Documents",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", description = "File plus customer fields"),
    responses(
        (status = 200, description = "Document uploaded", body = UploadResponse),
        (status = 400, description = "Quota exhausted, oversized file, or missing field"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn upload_document(
    Auth(merchant): Auth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    if !merchant.has_quota_remaining() {
        return Err(ApiError::bad_request(QUOTA_EXHAUSTED));
    }

    let mut file: Option<FilePart> = None;
    let mut customer_name: Option<String> = None;
    let mut customer_phone: Option<String> = None;
    let mut customer_email: Option<String> = None;
    let mut order_details: Option<String> = None;
    let mut due_date: Option<String> = None;
    let mut one_time_view = false;
    let mut delete_after_minutes: i64 = 5;
    let mut allow_download = true;

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
            "customerEmail" => customer_email = Some(value),
            "orderDetails" => order_details = Some(value),
            "dueDate" => due_date = Some(value),
            "oneTimeView" => one_time_view = parse_bool_field(&value),
            "deleteAfterMinutes" => {
                delete_after_minutes = parse_minutes_field(&value, "deleteAfterMinutes")?
            }
            "allowDownload" => allow_download = parse_bool_field(&value),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("File is required"))?;
    let customer_name = customer_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Customer name is required"))?;

    let now = Utc::now();
    let document_id = Uuid::new_v4().to_string();
    // The public token must not leak the document id.
    let share_token = Uuid::new_v4().to_string();
    let expires_at = now + Duration::minutes(delete_after_minutes);
    let storage_key = format!("docs/{document_id}/{}", file.filename);

    state
        .content
        .put(&storage_key, &file.bytes)
        .map_err(|e| ApiError::internal(format!("Failed to store file: {e}")))?;

    let document = StoredDocument {
        document_id: document_id.clone(),
        owner_id: merchant.merchant_id.clone(),
        document_name: file.filename.clone(),
        content_type: file.content_type,
        file_size: file.bytes.len() as u64,
        storage_key: storage_key.clone(),
        share_link: Some(share_token.clone()),
        share_link_expires_at: Some(expires_at),
        share_view_count: 0,
        one_time_view,
        allow_download,
        customer_name,
        customer_phone,
        customer_email,
        order_details,
        due_date,
        status: DocumentStatus::Active,
        customer_uploaded: false,
        auto_delete_at: expires_at,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    if let Err(err) = state.records.create_document(&document, QuotaCharge::Monthly) {
        // No record was created; drop the already-stored bytes.
        if let Err(cleanup) = state.content.delete(&storage_key) {
            tracing::warn!(error = %cleanup, key = %storage_key, "failed to clean up orphaned upload");
        }
        return Err(match err {
            StorageError::QuotaExceeded => ApiError::bad_request(QUOTA_EXHAUSTED),
            other => ApiError::internal(format!("Failed to create document: {other}")),
        });
    }

    let share_url = state.config.share_url(&share_token);
    let qr_code = qr::data_url(&share_url)?;

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::DocumentUploaded)
            .with_merchant(&merchant.merchant_id)
            .with_resource(&document_id)
    );

    Ok(Json(UploadResponse {
        success: true,
        document: UploadedDocument {
            id: document_id,
            document_name: document.document_name,
            shared_link: share_url,
            qr_code,
            expires_in: delete_after_minutes * 60,
            share_count: 0,
            created_at: now,
        },
    }))
}

/// Query parameters for the document list.
#[derive(Debug, Deserialize, IntoParams)]
pub struct DocumentListQuery {
    /// Maximum number of results (default: 20)
    #[param(default = 20)]
    pub limit: Option<usize>,
    /// Number of results to skip (default: 0)
    #[param(default = 0)]
    pub offset: Option<usize>,
}

/// Document list response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListResponse {
    pub success: bool,
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
    pub has_more: bool,
}

/// Document summary for the list view.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub document_name: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub file_size: u64,
    pub share_count: u32,
    /// Full share URL; null for customer-portal uploads.
    pub shared_link: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub status: DocumentStatus,
}

impl DocumentSummary {
    fn from_stored(document: StoredDocument, state: &AppState) -> Self {
        Self {
            id: document.document_id,
            document_name: document.document_name,
            customer_name: document.customer_name,
            customer_phone: document.customer_phone,
            file_size: document.file_size,
            share_count: document.share_view_count,
            shared_link: document
                .share_link
                .as_deref()
                .map(|link| state.config.share_url(link)),
            expires_at: document.share_link_expires_at,
            created_at: document.created_at,
            status: document.status,
        }
    }
}

/// List the caller's active documents, newest first.
#[utoipa::path(
    get,
    path = "/api/documents/list",
    tag = "Documents",
    security(("bearer_auth" = [])),
    params(DocumentListQuery),
    responses(
        (status = 200, description = "Document list", body = DocumentListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_documents(
    Auth(merchant): Auth,
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(20);
    let offset = query.offset.unwrap_or(0);

    let total = state
        .records
        .count_documents_by_owner(&merchant.merchant_id)
        .map_err(|e| ApiError::internal(format!("Failed to count documents: {e}")))?;
    let documents = state
        .records
        .list_documents_by_owner(&merchant.merchant_id, limit, offset)
        .map_err(|e| ApiError::internal(format!("Failed to list documents: {e}")))?;

    Ok(Json(DocumentListResponse {
        success: true,
        documents: documents
            .into_iter()
            .map(|doc| DocumentSummary::from_stored(doc, &state))
            .collect(),
        total,
        has_more: offset + limit < total,
    }))
}

/// Full document detail response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetailResponse {
    pub success: bool,
    pub document: DocumentDetail,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    pub id: String,
    pub document_name: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub order_details: Option<String>,
    pub due_date: Option<String>,
    pub file_size: u64,
    pub mime_type: String,
    pub share_count: u32,
    pub shared_link: Option<String>,
    pub one_time_view: bool,
    pub allow_download: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fetch one document, scoped to its owner.
#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    tag = "Documents",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document detail", body = DocumentDetailResponse),
        (status = 404, description = "Not found or not owned by caller")
    )
)]
pub async fn get_document(
    Auth(merchant): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetailResponse>, ApiError> {
    let document = owned_active_document(&state, &merchant.merchant_id, &id)?;

    Ok(Json(DocumentDetailResponse {
        success: true,
        document: DocumentDetail {
            id: document.document_id,
            document_name: document.document_name,
            customer_name: document.customer_name,
            customer_phone: document.customer_phone,
            customer_email: document.customer_email,
            order_details: document.order_details,
            due_date: document.due_date,
            file_size: document.file_size,
            mime_type: document.content_type,
            share_count: document.share_view_count,
            shared_link: document
                .share_link
                .as_deref()
                .map(|link| state.config.share_url(link)),
            one_time_view: document.one_time_view,
            allow_download: document.allow_download,
            expires_at: document.share_link_expires_at,
            created_at: document.created_at,
        },
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Soft-delete a document and drop its bytes.
///
/// Content removal is best-effort; the record flips to `deleted` either
/// way. Deleting twice yields success then 404.
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    tag = "Documents",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document deleted", body = DeleteResponse),
        (status = 404, description = "Not found or not owned by caller")
    )
)]
pub async fn delete_document(
    Auth(merchant): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let document = owned_active_document(&state, &merchant.merchant_id, &id)?;

    if let Err(err) = state.content.delete(&document.storage_key) {
        tracing::warn!(error = %err, key = %document.storage_key, "failed to delete document content");
    }

    let deleted = state
        .records
        .mark_document_deleted(&id, Utc::now())
        .map_err(|e| ApiError::internal(format!("Failed to delete document: {e}")))?;
    if !deleted {
        // Lost a race with another delete.
        return Err(ApiError::not_found("Document not found"));
    }

    audit_log!(
        state.records,
        AuditEvent::new(AuditEventType::DocumentDeleted)
            .with_merchant(&merchant.merchant_id)
            .with_resource(&id)
    );

    Ok(Json(DeleteResponse {
        success: true,
        message: "Document deleted successfully".to_string(),
    }))
}

/// Owner-scoped active lookup. Misses and foreign documents are both 404,
/// so existence is never revealed to non-owners.
fn owned_active_document(
    state: &AppState,
    owner_id: &str,
    document_id: &str,
) -> Result<StoredDocument, ApiError> {
    let document = match state.records.get_document(document_id) {
        Ok(document) => document,
        Err(StorageError::NotFound(_)) => return Err(ApiError::not_found("Document not found")),
        Err(e) => return Err(ApiError::internal(format!("Failed to load document: {e}"))),
    };
    if document.owner_id != owner_id || !document.is_active() {
        return Err(ApiError::not_found("Document not found"));
    }
    Ok(document)
}
