//! Per-user conversation state machine
//!
//! Pure transitions: `(state, event) -> (new state, effects)`. All I/O is
//! performed by the orchestrator when it executes the effects.

mod effect;
pub mod event;
pub mod state;
mod store;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{SessionState, UserSession};
pub use store::SessionStore;
pub use transition::{transition, TransitionResult};
