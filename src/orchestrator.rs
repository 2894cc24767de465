//! Event orchestration
//!
//! Feeds chat events through the session state machine and executes the
//! resulting effects: menus, generation, caching and delivery.

mod dispatcher;

#[cfg(test)]
pub mod testing;

pub use dispatcher::Dispatcher;

use crate::cache::ResultCache;
use crate::delivery::DeliveryService;
use crate::generation::{BackendId, GeneratorRegistry};
use crate::menu;
use crate::session::{transition, Effect, Event, SessionStore};
use crate::transport::{ChatTransport, Keyboard, UserId};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Composition root of the core: owns the per-user stores
pub struct Orchestrator<T: ChatTransport> {
    sessions: SessionStore,
    cache: ResultCache,
    generators: Arc<GeneratorRegistry>,
    transport: Arc<T>,
    delivery: DeliveryService<T>,
}

impl<T: ChatTransport> Orchestrator<T> {
    pub fn new(generators: Arc<GeneratorRegistry>, transport: Arc<T>) -> Self {
        Self {
            sessions: SessionStore::new(),
            cache: ResultCache::new(),
            generators,
            delivery: DeliveryService::new(Arc::clone(&transport)),
            transport,
        }
    }

    /// Replace the delivery service (tests use one without delays)
    #[allow(dead_code)]
    pub fn with_delivery(mut self, delivery: DeliveryService<T>) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Tell `user` their event was dropped because too many are already queued
    pub async fn notify_busy(&self, user: UserId) {
        self.send(user, menu::BUSY, None).await;
    }

    /// Handle one inbound event for `user`, including any events its effects produce.
    ///
    /// Never fails: every error path ends in a message to the user.
    pub async fn handle(&self, user: UserId, event: Event) {
        let mut pending = vec![event];

        while let Some(event) = pending.pop() {
            let state = self.sessions.state(user).await;
            let event_name = event.name();

            let Some(result) = transition(&state, event) else {
                tracing::debug!(
                    user_id = %user,
                    state = state.name(),
                    event = event_name,
                    "Event not actionable in current state"
                );
                continue;
            };

            if result.new_state != state {
                tracing::info!(
                    user_id = %user,
                    from = state.name(),
                    to = result.new_state.name(),
                    backend = ?result.new_state.selected_backend(),
                    event = event_name,
                    "Session transition"
                );
                self.sessions.set_state(user, result.new_state).await;
            }

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(user, effect).await {
                    pending.push(generated);
                }
            }
        }
    }

    async fn execute_effect(&self, user: UserId, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Greet => {
                self.send(user, menu::GREETING, Some(menu::main_menu())).await;
            }
            Effect::ShowMenu => {
                self.send(user, menu::CHOOSE_ACTION, Some(menu::action_menu()))
                    .await;
            }
            Effect::ShowHelp => self.send(user, menu::HELP_TEXT, None).await,
            Effect::ShowProfile => self.send(user, menu::PROFILE_TEXT, None).await,
            Effect::AskForBackend => {
                let backends = self.generators.available();
                if backends.is_empty() {
                    self.send(user, menu::NO_BACKENDS, None).await;
                } else {
                    self.send(
                        user,
                        menu::CHOOSE_BACKEND,
                        Some(menu::backend_keyboard(&backends)),
                    )
                    .await;
                }
            }
            Effect::AskForPrompt => self.send(user, menu::ASK_PROMPT, None).await,
            Effect::Generate { backend, prompt } => {
                let succeeded = self.run_generation(user, backend, &prompt).await;
                return Some(Event::GenerationFinished { succeeded });
            }
            Effect::ReplayCached => self.replay_cached(user).await,
        }
        None
    }

    /// Generate, cache and deliver. Returns whether generation succeeded.
    async fn run_generation(&self, user: UserId, backend: BackendId, prompt: &str) -> bool {
        let span = tracing::info_span!(
            "generation",
            request_id = %Uuid::new_v4(),
            user_id = %user,
            %backend
        );

        async {
            self.send(user, menu::GENERATING, None).await;

            match self.generators.generate(prompt, backend).await {
                Ok(image) => {
                    self.cache.put(user, &image, prompt, backend).await;
                    let keyboard = menu::result_keyboard();
                    if let Err(e) = self.delivery.deliver(user, &image, Some(&keyboard)).await {
                        tracing::debug!(error = %e, "Generated image was not delivered");
                    }
                    true
                }
                Err(e) => {
                    tracing::warn!(kind = %e.kind, error = %e.message, "Generation failed");
                    self.send(user, menu::GENERATION_FAILED, None).await;
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn replay_cached(&self, user: UserId) {
        let Some(cached) = self.cache.get(user).await else {
            tracing::info!(user_id = %user, "Repeat requested with nothing cached");
            self.send(user, menu::NOTHING_TO_REPEAT, None).await;
            return;
        };

        tracing::info!(
            user_id = %user,
            backend = %cached.backend,
            generated_at = %cached.generated_at,
            "Replaying cached image"
        );
        let keyboard = menu::result_keyboard();
        if let Err(e) = self
            .delivery
            .deliver(user, &cached.image, Some(&keyboard))
            .await
        {
            tracing::debug!(error = %e, "Cached image was not delivered");
        }
    }

    async fn send(&self, user: UserId, text: &str, keyboard: Option<Keyboard>) {
        if let Err(e) = self
            .transport
            .send_text(user, text, keyboard.as_ref())
            .await
        {
            tracing::warn!(user_id = %user, error = %e, "Failed to send message");
        }
    }
}
