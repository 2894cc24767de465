//! Property-based tests for the session state machine

use super::*;
use crate::generation::BackendId;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_backend() -> impl Strategy<Value = BackendId> {
    prop_oneof![Just(BackendId::Kandinsky), Just(BackendId::StableDiffusion)]
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        Just(SessionState::Idle),
        Just(SessionState::ChoosingBackend),
        arb_backend().prop_map(|backend| SessionState::AwaitingPrompt { backend }),
        (arb_backend(), "[a-z ]{1,30}")
            .prop_map(|(backend, prompt)| SessionState::Generating { backend, prompt }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Start),
        Just(Event::OpenMenu),
        Just(Event::Help),
        Just(Event::Profile),
        Just(Event::BeginCreation),
        arb_backend().prop_map(|backend| Event::BackendChosen { backend }),
        "[a-zA-Z ]{0,30}".prop_map(|text| Event::PromptReceived { text }),
        Just(Event::Repeat),
        Just(Event::New),
        any::<bool>().prop_map(|succeeded| Event::GenerationFinished { succeeded }),
    ]
}

fn resulting_state(state: &SessionState, event: Event) -> SessionState {
    transition(state, event).map_or_else(|| state.clone(), |r| r.new_state)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn idle_only_leaves_on_begin_creation_or_new(event in arb_event()) {
        let next = resulting_state(&SessionState::Idle, event.clone());
        match event {
            Event::BeginCreation | Event::New => {
                prop_assert_eq!(next, SessionState::ChoosingBackend);
            }
            _ => prop_assert_eq!(next, SessionState::Idle),
        }
    }

    #[test]
    fn generating_completion_always_yields_idle(
        backend in arb_backend(),
        prompt in "[a-z ]{1,30}",
        succeeded in any::<bool>(),
    ) {
        let state = SessionState::Generating { backend, prompt };
        let result = transition(&state, Event::GenerationFinished { succeeded }).unwrap();
        prop_assert_eq!(result.new_state, SessionState::Idle);
        prop_assert!(result.effects.is_empty());
    }

    #[test]
    fn new_always_returns_to_choosing_backend(state in arb_state()) {
        let result = transition(&state, Event::New).unwrap();
        prop_assert_eq!(result.new_state, SessionState::ChoosingBackend);
        prop_assert_eq!(result.effects, vec![Effect::AskForBackend]);
    }

    #[test]
    fn repeat_never_changes_state(state in arb_state()) {
        let result = transition(&state, Event::Repeat).unwrap();
        prop_assert_eq!(result.new_state, state);
        prop_assert_eq!(result.effects, vec![Effect::ReplayCached]);
    }

    #[test]
    fn only_generating_requests_generation(state in arb_state(), event in arb_event()) {
        if let Some(result) = transition(&state, event) {
            let generates = result.effects.iter().any(|e| matches!(e, Effect::Generate { .. }));
            prop_assert_eq!(
                generates,
                matches!(result.new_state, SessionState::Generating { .. })
                    && !matches!(state, SessionState::Generating { .. })
            );
        }
    }

    #[test]
    fn generation_uses_the_selected_backend(backend in arb_backend(), text in "[a-z]{1,20}") {
        let state = SessionState::AwaitingPrompt { backend };
        let result = transition(&state, Event::PromptReceived { text: text.clone() }).unwrap();
        prop_assert_eq!(result.effects, vec![Effect::generate(backend, text)]);
        prop_assert_eq!(result.new_state.selected_backend(), Some(backend));
    }

    #[test]
    fn chosen_backend_is_carried_until_new(
        backend in arb_backend(),
        text in "[a-z]{1,20}",
        other in arb_backend(),
    ) {
        let choosing = SessionState::ChoosingBackend;
        let awaiting = resulting_state(&choosing, Event::BackendChosen { backend });
        prop_assert_eq!(awaiting.selected_backend(), Some(backend));

        // A second choice once past ChoosingBackend is not actionable
        prop_assert_eq!(
            resulting_state(&awaiting, Event::BackendChosen { backend: other }),
            awaiting.clone()
        );

        let generating = resulting_state(&awaiting, Event::PromptReceived { text });
        prop_assert_eq!(generating.selected_backend(), Some(backend));

        for state in [awaiting, generating] {
            prop_assert_eq!(resulting_state(&state, Event::New).selected_backend(), None);
        }
    }

    #[test]
    fn backend_choice_only_counts_while_choosing(state in arb_state(), backend in arb_backend()) {
        let next = resulting_state(&state, Event::BackendChosen { backend });
        if state == SessionState::ChoosingBackend {
            prop_assert_eq!(next, SessionState::AwaitingPrompt { backend });
        } else {
            prop_assert_eq!(next, state);
        }
    }
}
