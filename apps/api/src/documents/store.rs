use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::models::document::{ComplianceStatus, DocumentCategory, DocumentRecord};

/// Capacity of the change feed; receivers further behind than this re-query.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Input for a freshly uploaded document. New documents always start `pending`.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub category: DocumentCategory,
    pub description: Option<String>,
    pub file_size_bytes: i64,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn status(&self) -> ComplianceStatus {
        match self {
            ReviewDecision::Approved => ComplianceStatus::Approved,
            ReviewDecision::Rejected => ComplianceStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReviewUpdate {
    pub decision: ReviewDecision,
    pub reviewer: Uuid,
    pub reviewed_at: DateTime<Utc>,
}

/// Filter for listing documents. Results are always newest upload first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    pub owner: Option<Uuid>,
}

impl DocumentQuery {
    pub fn all() -> Self {
        Self { owner: None }
    }

    pub fn owned_by(owner: Uuid) -> Self {
        Self { owner: Some(owner) }
    }

    pub fn matches(&self, record: &DocumentRecord) -> bool {
        self.owner.map_or(true, |o| o == record.owner_id)
    }

    pub fn is_affected_by(&self, change: &DocumentChange) -> bool {
        self.owner.map_or(true, |o| o == change.owner_id)
    }
}

/// Published after every successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentChange {
    pub document_id: Uuid,
    pub owner_id: Uuid,
}

/// The document collection.
///
/// `update_review` overwrites unconditionally. Only pending documents are
/// offered for review (see `review_document`), but two reviews racing on the
/// same pending document are not coordinated: the last write wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, document: NewDocument) -> Result<DocumentRecord, BackendError>;

    async fn get(&self, id: Uuid) -> Result<DocumentRecord, BackendError>;

    async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> Result<DocumentRecord, BackendError>;

    async fn query(&self, query: DocumentQuery) -> Result<Vec<DocumentRecord>, BackendError>;

    /// Raw change feed. Most callers want [`crate::documents::subscription::subscribe`].
    fn changes(&self) -> broadcast::Receiver<DocumentChange>;
}

/// Newest first; ties broken by id so listings are stable.
pub fn sort_newest_first(records: &mut [DocumentRecord]) {
    records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(a.id.cmp(&b.id)));
}
