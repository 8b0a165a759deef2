//! Clinical sessions

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::timestamp;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub created_at: String,
    pub queries: Vec<String>,
    pub status: String,
}

/// Holds the one active session
#[derive(Clone, Default)]
pub struct SessionRegistry {
    current: Arc<RwLock<Option<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session, replacing the current one.
    pub async fn create(&self) -> Session {
        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            created_at: timestamp(),
            queries: Vec::new(),
            status: "active".to_string(),
        };
        let replaced = self.current.write().await.replace(session.clone());
        tracing::info!(
            session_id = %session.session_id,
            replaced = replaced.as_ref().map(|s| s.session_id.as_str()),
            "New session"
        );
        session
    }
}
