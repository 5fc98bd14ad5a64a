use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::documents::store::{
    DocumentChange, DocumentQuery, DocumentStore, NewDocument, ReviewUpdate, CHANGE_FEED_CAPACITY,
};
use crate::errors::BackendError;
use crate::models::document::{ComplianceStatus, DocumentRecord, DocumentRow};

/// Document collection persisted in the `documents` table.
///
/// The change feed is in-process: writes made by this instance are seen by
/// its subscribers.
pub struct PgDocumentStore {
    pool: PgPool,
    feed: broadcast::Sender<DocumentChange>,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        let (feed, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { pool, feed }
    }

    fn publish(&self, record: &DocumentRecord) {
        let _ = self.feed.send(DocumentChange {
            document_id: record.id,
            owner_id: record.owner_id,
        });
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, document: NewDocument) -> Result<DocumentRecord, BackendError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents
                (id, owner_id, file_name, file_url, category, status,
                 description, file_size_bytes, mime_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(document.owner_id)
        .bind(&document.file_name)
        .bind(&document.file_url)
        .bind(document.category.as_str())
        .bind(ComplianceStatus::Pending.as_str())
        .bind(&document.description)
        .bind(document.file_size_bytes)
        .bind(&document.mime_type)
        .fetch_one(&self.pool)
        .await?;

        let record = DocumentRecord::try_from(row)?;
        info!("Inserted document {} for user {}", record.id, record.owner_id);
        self.publish(&record);
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<DocumentRecord, BackendError> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("Document {id} not found")))?;
        DocumentRecord::try_from(row)
    }

    async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> Result<DocumentRecord, BackendError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents
            SET status = $2, reviewed_at = $3, reviewed_by = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.decision.status().as_str())
        .bind(update.reviewed_at)
        .bind(update.reviewer)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BackendError::NotFound(format!("Document {id} not found")))?;

        let record = DocumentRecord::try_from(row)?;
        self.publish(&record);
        Ok(record)
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<DocumentRecord>, BackendError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT * FROM documents
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY uploaded_at DESC, id ASC
            "#,
        )
        .bind(query.owner)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentRecord::try_from).collect()
    }

    fn changes(&self) -> broadcast::Receiver<DocumentChange> {
        self.feed.subscribe()
    }
}
