//! Live queries over the document store.
//!
//! A subscription yields the current result set once, then a fresh result set
//! after every change that can affect it, in the order changes arrive.
//! Dropping the subscription releases its listener.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::documents::store::{DocumentChange, DocumentQuery, DocumentStore};
use crate::errors::BackendError;
use crate::models::document::DocumentRecord;

pub type Snapshot = Result<Vec<DocumentRecord>, BackendError>;

pub struct Subscription {
    store: Arc<dyn DocumentStore>,
    query: DocumentQuery,
    changes: broadcast::Receiver<DocumentChange>,
    /// Set until a fresh snapshot has been delivered. Survives a cancelled
    /// query, so `next_snapshot` is safe to use inside `select!`.
    stale: bool,
}

/// Starts listening before the first read so no write between the two is missed.
pub fn subscribe(store: Arc<dyn DocumentStore>, query: DocumentQuery) -> Subscription {
    let changes = store.changes();
    Subscription {
        store,
        query,
        changes,
        stale: true,
    }
}

impl Subscription {
    /// Waits for the next snapshot. `None` once the store's feed has shut down.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        loop {
            if self.stale {
                let snapshot = self.store.query(self.query).await;
                self.stale = false;
                return Some(snapshot);
            }
            match self.changes.recv().await {
                Ok(change) => self.stale = self.query.is_affected_by(&change),
                Err(RecvError::Lagged(n)) => {
                    warn!("Document subscription lagged by {n} changes, re-querying");
                    self.stale = true;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Stops listening. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use uuid::Uuid;

    use crate::documents::memory::MemoryDocumentStore;
    use crate::documents::store::NewDocument;
    use crate::models::document::DocumentCategory;

    fn new_doc(owner: Uuid, category: DocumentCategory) -> NewDocument {
        NewDocument {
            owner_id: owner,
            file_name: "scan.pdf".to_string(),
            file_url: "memory://scan.pdf".to_string(),
            category,
            description: None,
            file_size_bytes: 100,
            mime_type: "application/pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_snapshot_is_current_state() {
        let store = Arc::new(MemoryDocumentStore::new());
        let owner = Uuid::new_v4();
        store.create(new_doc(owner, DocumentCategory::IdProof)).await.unwrap();

        let mut sub = subscribe(store.clone(), DocumentQuery::owned_by(owner));
        let first = sub.next_snapshot().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_only_relevant_changes_produce_snapshots() {
        let store = Arc::new(MemoryDocumentStore::new());
        let owner = Uuid::new_v4();
        let mut sub = subscribe(store.clone(), DocumentQuery::owned_by(owner));
        assert!(sub.next_snapshot().await.unwrap().unwrap().is_empty());

        store
            .create(new_doc(Uuid::new_v4(), DocumentCategory::IdProof))
            .await
            .unwrap();
        store
            .create(new_doc(owner, DocumentCategory::MedicalCertificate))
            .await
            .unwrap();

        let next = tokio::time::timeout(Duration::from_secs(1), sub.next_snapshot())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].owner_id, owner);
    }

    #[tokio::test]
    async fn test_unfiltered_stream_sees_every_write() {
        let store = Arc::new(MemoryDocumentStore::new());
        let mut sub = subscribe(store.clone(), DocumentQuery::all());
        assert_eq!(sub.next_snapshot().await.unwrap().unwrap().len(), 0);

        store
            .create(new_doc(Uuid::new_v4(), DocumentCategory::Other))
            .await
            .unwrap();
        store
            .create(new_doc(Uuid::new_v4(), DocumentCategory::IdProof))
            .await
            .unwrap();
        assert_eq!(sub.next_snapshot().await.unwrap().unwrap().len(), 2);
        assert_eq!(sub.next_snapshot().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_listener() {
        let store = Arc::new(MemoryDocumentStore::new());
        let sub = subscribe(store.clone(), DocumentQuery::all());
        assert_eq!(store.listener_count(), 1);
        sub.unsubscribe();
        assert_eq!(store.listener_count(), 0);
    }
}
