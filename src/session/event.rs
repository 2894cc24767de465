//! Events that drive a user's session

use crate::generation::BackendId;
use crate::menu;

/// Inbound chat events plus the internal completion signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Informational
    Start,
    OpenMenu,
    Help,
    Profile,

    // Create-image flow
    BeginCreation,
    BackendChosen { backend: BackendId },
    PromptReceived { text: String },

    // Follow-up actions on a delivered image
    Repeat,
    New,

    // Internal: the in-flight generation has finished
    GenerationFinished { succeeded: bool },
}

impl Event {
    /// Classify a plain text message. Anything that is not a command or menu label is a prompt.
    pub fn from_text(text: &str) -> Self {
        if is_start_command(text) {
            return Event::Start;
        }

        match text.trim() {
            menu::MENU_LABEL => Event::OpenMenu,
            menu::CREATE_LABEL => Event::BeginCreation,
            menu::HELP_LABEL => Event::Help,
            menu::PROFILE_LABEL => Event::Profile,
            _ => Event::PromptReceived {
                text: text.to_string(),
            },
        }
    }

    /// Classify an inline button press
    pub fn from_callback(data: &str) -> Option<Self> {
        match data {
            menu::REPEAT_CALLBACK => Some(Event::Repeat),
            menu::NEW_CALLBACK => Some(Event::New),
            other => {
                BackendId::from_callback_data(other).map(|backend| Event::BackendChosen { backend })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::OpenMenu => "open_menu",
            Event::Help => "help",
            Event::Profile => "profile",
            Event::BeginCreation => "begin_creation",
            Event::BackendChosen { .. } => "backend_chosen",
            Event::PromptReceived { .. } => "prompt_received",
            Event::Repeat => "repeat",
            Event::New => "new",
            Event::GenerationFinished { .. } => "generation_finished",
        }
    }
}

/// `/start`, `/start@BotName` and deep links such as `/start ref42`
fn is_start_command(text: &str) -> bool {
    let Some(command) = text.split_whitespace().next() else {
        return false;
    };
    let name = command.split_once('@').map_or(command, |(name, _)| name);
    name == menu::START_COMMAND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_labels_map_to_commands() {
        assert_eq!(Event::from_text("/start"), Event::Start);
        assert_eq!(Event::from_text(menu::MENU_LABEL), Event::OpenMenu);
        assert_eq!(Event::from_text(menu::CREATE_LABEL), Event::BeginCreation);
        assert_eq!(Event::from_text(menu::HELP_LABEL), Event::Help);
        assert_eq!(Event::from_text(menu::PROFILE_LABEL), Event::Profile);
    }

    #[test]
    fn test_start_with_bot_name_or_payload() {
        assert_eq!(Event::from_text("/start@NevaraBot"), Event::Start);
        assert_eq!(Event::from_text("/start ref42"), Event::Start);
        assert_eq!(Event::from_text("  /start@NevaraBot ref42"), Event::Start);
        assert_eq!(
            Event::from_text("/started a fox"),
            Event::PromptReceived {
                text: "/started a fox".to_string()
            }
        );
    }

    #[test]
    fn test_free_text_is_prompt_verbatim() {
        assert_eq!(
            Event::from_text("a red fox in snow "),
            Event::PromptReceived {
                text: "a red fox in snow ".to_string()
            }
        );
    }

    #[test]
    fn test_callbacks() {
        assert_eq!(Event::from_callback("repeat"), Some(Event::Repeat));
        assert_eq!(Event::from_callback("new"), Some(Event::New));
        assert_eq!(
            Event::from_callback("model_kandinsky"),
            Some(Event::BackendChosen {
                backend: BackendId::Kandinsky
            })
        );
        assert_eq!(Event::from_callback("unknown"), None);
    }
}
