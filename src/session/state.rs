//! Session state types

use crate::generation::BackendId;
use chrono::{DateTime, Utc};

/// Where a user is in the create-image flow
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing in progress
    #[default]
    Idle,

    /// Backend keyboard shown, waiting for a choice
    ChoosingBackend,

    /// Backend chosen, waiting for the image description
    AwaitingPrompt { backend: BackendId },

    /// Generation in flight
    Generating { backend: BackendId, prompt: String },
}

impl SessionState {
    /// Backend picked in this flow, if the flow has got that far
    pub fn selected_backend(&self) -> Option<BackendId> {
        match self {
            SessionState::AwaitingPrompt { backend } | SessionState::Generating { backend, .. } => {
                Some(*backend)
            }
            SessionState::Idle | SessionState::ChoosingBackend => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::ChoosingBackend => "choosing_backend",
            SessionState::AwaitingPrompt { .. } => "awaiting_prompt",
            SessionState::Generating { .. } => "generating",
        }
    }
}

/// One per user identity, created on first contact and kept for the process lifetime
#[derive(Debug, Clone)]
pub struct UserSession {
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            state: SessionState::Idle,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for UserSession {
    fn default() -> Self {
        Self::new()
    }
}
