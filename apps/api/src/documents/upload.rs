use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::storage::{ObjectStorage, ProgressFn};
use crate::documents::store::{DocumentStore, NewDocument, ReviewDecision, ReviewUpdate};
use crate::documents::validation::validate;
use crate::errors::{AppError, BackendError, ValidationError};
use crate::models::document::{ComplianceStatus, DocumentCategory, DocumentRecord};

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Raw upload form. Every field is optional here so that missing ones are
/// reported as validation errors rather than extractor rejections.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub category: Option<String>,
    pub description: Option<String>,
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Invalid(v) => AppError::Validation(v),
            UploadError::Backend(b) => AppError::UploadFailed(b),
        }
    }
}

/// Object key for an upload: `uploads/{owner}/{category}_{millis}_{file name}`.
/// Path separators in the client's file name are flattened.
pub fn storage_key(owner_id: Uuid, category: DocumentCategory, timestamp_ms: i64, file_name: &str) -> String {
    let safe_name: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("uploads/{owner_id}/{category}_{timestamp_ms}_{safe_name}")
}

/// Validates the form, stores the bytes and records a `pending` document.
///
/// Nothing is written when validation fails. A storage or store failure is
/// logged here and returned without retry.
pub async fn upload_document(
    store: &dyn DocumentStore,
    storage: &dyn ObjectStorage,
    owner_id: Uuid,
    form: UploadForm,
    progress: Option<ProgressFn>,
) -> Result<DocumentRecord, UploadError> {
    let file = form.file.ok_or(ValidationError::MissingField("file"))?;
    let category = form
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(ValidationError::MissingField("category"))?;

    if let Err(e) = validate(file.bytes.len() as u64, &file.mime_type) {
        warn!("Rejected upload from {owner_id}: {e}");
        return Err(e.into());
    }
    let category: DocumentCategory = category.parse()?;

    let key = storage_key(owner_id, category, Utc::now().timestamp_millis(), &file.file_name);
    let file_size_bytes = file.bytes.len() as i64;
    let object = storage
        .upload(&key, file.bytes, &file.mime_type, progress)
        .await
        .map_err(|e| {
            error!("Storage upload of {key} failed: {e}");
            e
        })?;
    let file_url = storage.public_url(&object);

    let description = form
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let record = store
        .create(NewDocument {
            owner_id,
            file_name: file.file_name,
            file_url,
            category,
            description,
            file_size_bytes,
            mime_type: file.mime_type,
        })
        .await
        .map_err(|e| {
            error!("Recording upload {key} failed: {e}");
            e
        })?;

    info!(
        "User {owner_id} uploaded {} document {}",
        record.category, record.id
    );
    Ok(record)
}

/// Approves or rejects a pending document on behalf of `reviewer`.
/// A document that already carries a decision is left untouched.
pub async fn review_document(
    store: &dyn DocumentStore,
    document_id: Uuid,
    decision: ReviewDecision,
    reviewer: Uuid,
) -> Result<DocumentRecord, AppError> {
    let current = store.get(document_id).await?;
    if current.status != ComplianceStatus::Pending {
        warn!(
            "Refused to review document {document_id}: already {}",
            current.status.as_str()
        );
        return Err(AppError::Conflict(format!(
            "Document {document_id} has already been {}",
            current.status.as_str()
        )));
    }

    let record = store
        .update_review(
            document_id,
            ReviewUpdate {
                decision,
                reviewer,
                reviewed_at: Utc::now(),
            },
        )
        .await?;
    info!(
        "Document {document_id} marked {} by {reviewer}",
        record.status.as_str()
    );
    Ok(record)
}
