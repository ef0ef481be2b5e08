//! Session store: per-session vendor facts keyed by session id.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;

use super::model::{SessionUpdate, VendorSession};

/// Backend-agnostic session storage.
///
/// An unknown session id is a normal state (`Ok(None)`), not an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<VendorSession>, StoreError>;

    /// Create or merge, then recompute completion. Returns the stored session.
    async fn update(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<VendorSession, StoreError>;
}

/// Process-lifetime in-memory store. Last write wins per field.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, VendorSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<VendorSession>, StoreError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn update(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<VendorSession, StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_default();
        session.apply(update);
        tracing::debug!(
            session_id = %session_id,
            complete = session.application_complete,
            "Session updated"
        );
        Ok(session.clone())
    }
}
