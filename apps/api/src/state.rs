use std::sync::Arc;

use crate::auth::memory::MemoryAuthService;
use crate::auth::password::PasswordHasher;
use crate::auth::provider::AuthService;
use crate::config::Config;
use crate::documents::memory::MemoryDocumentStore;
use crate::documents::storage::{MemoryObjectStorage, ObjectStorage};
use crate::documents::store::DocumentStore;
use crate::faq::chat::ChatStore;
use crate::faq::knowledge_base::KNOWLEDGE_BASE;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Accounts, bearer sessions and the auth event feed.
    pub auth: Arc<dyn AuthService>,
    pub documents: Arc<dyn DocumentStore>,
    pub storage: Arc<dyn ObjectStorage>,
    /// Assistant chat sessions. Held in memory regardless of backend.
    pub chats: Arc<ChatStore>,
    pub config: Config,
}

impl AppState {
    /// State with every collaborator held in process memory.
    pub fn in_memory(config: Config) -> Self {
        let hasher = PasswordHasher::new(config.password_hash_iterations);
        AppState {
            auth: Arc::new(MemoryAuthService::new(hasher)),
            documents: Arc::new(MemoryDocumentStore::new()),
            storage: Arc::new(MemoryObjectStorage::new()),
            chats: Arc::new(ChatStore::new(KNOWLEDGE_BASE)),
            config,
        }
    }
}
