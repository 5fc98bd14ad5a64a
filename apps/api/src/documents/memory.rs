use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::documents::store::{
    sort_newest_first, DocumentChange, DocumentQuery, DocumentStore, NewDocument, ReviewUpdate,
    CHANGE_FEED_CAPACITY,
};
use crate::errors::BackendError;
use crate::models::document::{ComplianceStatus, DocumentRecord};

/// Document collection held in process memory.
pub struct MemoryDocumentStore {
    records: RwLock<HashMap<Uuid, DocumentRecord>>,
    feed: broadcast::Sender<DocumentChange>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            records: RwLock::new(HashMap::new()),
            feed,
        }
    }

    /// Number of live subscriptions on the change feed.
    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.feed.receiver_count()
    }

    fn publish(&self, record: &DocumentRecord) {
        let _ = self.feed.send(DocumentChange {
            document_id: record.id,
            owner_id: record.owner_id,
        });
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, document: NewDocument) -> Result<DocumentRecord, BackendError> {
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            owner_id: document.owner_id,
            file_name: document.file_name,
            file_url: document.file_url,
            category: document.category,
            status: ComplianceStatus::Pending,
            description: document.description,
            uploaded_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            file_size_bytes: document.file_size_bytes,
            mime_type: document.mime_type,
        };
        self.records.write().await.insert(record.id, record.clone());
        self.publish(&record);
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<DocumentRecord, BackendError> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("Document {id} not found")))
    }

    async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> Result<DocumentRecord, BackendError> {
        let record = {
            let mut records = self.records.write().await;
            let record = records
                .get_mut(&id)
                .ok_or_else(|| BackendError::NotFound(format!("Document {id} not found")))?;
            record.status = update.decision.status();
            record.reviewed_at = Some(update.reviewed_at);
            record.reviewed_by = Some(update.reviewer);
            record.clone()
        };
        self.publish(&record);
        Ok(record)
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<DocumentRecord>, BackendError> {
        let mut records: Vec<DocumentRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    fn changes(&self) -> broadcast::Receiver<DocumentChange> {
        self.feed.subscribe()
    }
}
