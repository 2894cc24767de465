//! Pure state transition function
//!
//! Events that the current state does not expect are not actionable: the
//! function returns `None` and the caller leaves the session untouched.

use super::{Effect, Event, SessionState};

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Pure transition function
pub fn transition(state: &SessionState, event: Event) -> Option<TransitionResult> {
    match (state, event) {
        // ============================================================
        // Informational events: valid anywhere, never change state
        // ============================================================
        (_, Event::Start) => Some(TransitionResult::new(state.clone()).with_effect(Effect::Greet)),
        (_, Event::OpenMenu) => {
            Some(TransitionResult::new(state.clone()).with_effect(Effect::ShowMenu))
        }
        (_, Event::Help) => {
            Some(TransitionResult::new(state.clone()).with_effect(Effect::ShowHelp))
        }
        (_, Event::Profile) => {
            Some(TransitionResult::new(state.clone()).with_effect(Effect::ShowProfile))
        }

        // ============================================================
        // Create-image flow
        // ============================================================
        (SessionState::Idle, Event::BeginCreation) => Some(
            TransitionResult::new(SessionState::ChoosingBackend).with_effect(Effect::AskForBackend),
        ),

        (SessionState::ChoosingBackend, Event::BackendChosen { backend }) => Some(
            TransitionResult::new(SessionState::AwaitingPrompt { backend })
                .with_effect(Effect::AskForPrompt),
        ),

        (SessionState::AwaitingPrompt { backend }, Event::PromptReceived { text })
            if !text.trim().is_empty() =>
        {
            Some(
                TransitionResult::new(SessionState::Generating {
                    backend: *backend,
                    prompt: text.clone(),
                })
                .with_effect(Effect::generate(*backend, text)),
            )
        }

        // Success or failure, the flow is over
        (SessionState::Generating { .. }, Event::GenerationFinished { .. }) => {
            Some(TransitionResult::new(SessionState::Idle))
        }

        // ============================================================
        // Follow-up actions
        // ============================================================

        // Abandons whatever was selected so far
        (_, Event::New) => Some(
            TransitionResult::new(SessionState::ChoosingBackend).with_effect(Effect::AskForBackend),
        ),

        // Works off the cache, not the session
        (_, Event::Repeat) => {
            Some(TransitionResult::new(state.clone()).with_effect(Effect::ReplayCached))
        }

        // Everything else is not actionable in the current state
        (
            _,
            Event::BeginCreation
            | Event::BackendChosen { .. }
            | Event::PromptReceived { .. }
            | Event::GenerationFinished { .. },
        ) => None,
    }
}
