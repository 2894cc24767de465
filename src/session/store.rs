//! In-memory session storage keyed by user

use super::{SessionState, UserSession};
use crate::transport::UserId;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, UserSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, creating an idle session on first contact
    pub async fn state(&self, user: UserId) -> SessionState {
        if let Some(session) = self.sessions.read().await.get(&user) {
            return session.state.clone();
        }

        self.sessions
            .write()
            .await
            .entry(user)
            .or_default()
            .state
            .clone()
    }

    pub async fn set_state(&self, user: UserId, state: SessionState) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(user).or_default();
        let now = Utc::now();
        tracing::trace!(
            user_id = %user,
            session_started = %session.created_at,
            since_last_change_ms = (now - session.updated_at).num_milliseconds(),
            "Session state stored"
        );
        session.state = state;
        session.updated_at = now;
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
