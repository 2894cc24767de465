//! Effects produced by state transitions

use crate::generation::BackendId;

/// Work for the orchestrator to perform after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Greeting with the main reply keyboard
    Greet,

    /// Second-level menu (create / help / profile)
    ShowMenu,

    ShowHelp,

    ShowProfile,

    /// Backend keyboard
    AskForBackend,

    /// Ask for the image description
    AskForPrompt,

    /// Run a generation and deliver the result; yields `GenerationFinished`
    Generate { backend: BackendId, prompt: String },

    /// Re-send the cached image for this user, if any
    ReplayCached,
}

impl Effect {
    pub fn generate(backend: BackendId, prompt: impl Into<String>) -> Self {
        Effect::Generate {
            backend,
            prompt: prompt.into(),
        }
    }
}
