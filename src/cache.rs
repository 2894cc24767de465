//! Last delivered image per user, the source for "repeat"

use crate::generation::BackendId;
use crate::transport::UserId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The most recent successful generation for one user
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub image: Arc<[u8]>,
    pub prompt: String,
    pub backend: BackendId,
    pub generated_at: DateTime<Utc>,
}

/// Process-wide cache, one entry per user, no eviction
#[derive(Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<UserId, CachedResult>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the user's entry with a private copy of `image`
    pub async fn put(&self, user: UserId, image: &[u8], prompt: &str, backend: BackendId) {
        let entry = CachedResult {
            image: Arc::from(image),
            prompt: prompt.to_string(),
            backend,
            generated_at: Utc::now(),
        };
        self.entries.write().await.insert(user, entry);
    }

    pub async fn get(&self, user: UserId) -> Option<CachedResult> {
        self.entries.read().await.get(&user).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
