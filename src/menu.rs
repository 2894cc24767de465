//! Menu labels, keyboards and canned replies

use crate::generation::BackendId;
use crate::transport::{InlineButton, Keyboard};

pub const START_COMMAND: &str = "/start";
pub const MENU_LABEL: &str = "Menu";
pub const CREATE_LABEL: &str = "🖼 Create image";
pub const HELP_LABEL: &str = "ℹ️ Help";
pub const PROFILE_LABEL: &str = "👤 Profile";

pub const REPEAT_CALLBACK: &str = "repeat";
pub const NEW_CALLBACK: &str = "new";

pub const GREETING: &str =
    "Hi! I'm Nevara, an AI that draws pictures ✨\nPress the «Menu» button 👇";
pub const CHOOSE_ACTION: &str = "Choose an action:";
pub const CHOOSE_BACKEND: &str = "Choose a model:";
pub const NO_BACKENDS: &str = "No image models are configured right now 😥";
pub const ASK_PROMPT: &str = "Describe the image ✨";
pub const GENERATING: &str = "Generating... ⏳";
pub const IMAGE_CAPTION: &str = "Done!";
pub const GENERATION_FAILED: &str = "Generation failed 😥";
pub const NOTHING_TO_REPEAT: &str = "Nothing to repeat yet 😥";
pub const DELIVERY_FAILED: &str = "Could not send the image. Please try again later.";
pub const HELP_TEXT: &str = "To create an image, choose a model and type a description.";
pub const PROFILE_TEXT: &str = "Profile is under construction ❤️";
pub const BUSY: &str = "Still working on your previous requests, please wait ⏳";

/// Top-level reply keyboard with a single "Menu" button
pub fn main_menu() -> Keyboard {
    Keyboard::Reply(vec![vec![MENU_LABEL.to_string()]])
}

/// Second level: create / help / profile
pub fn action_menu() -> Keyboard {
    Keyboard::Reply(vec![
        vec![CREATE_LABEL.to_string()],
        vec![HELP_LABEL.to_string(), PROFILE_LABEL.to_string()],
    ])
}

/// One button per configured backend, two per row
pub fn backend_keyboard(backends: &[BackendId]) -> Keyboard {
    let buttons: Vec<InlineButton> = backends
        .iter()
        .map(|b| InlineButton::new(b.button_label(), b.callback_data()))
        .collect();
    Keyboard::Inline(buttons.chunks(2).map(<[InlineButton]>::to_vec).collect())
}

/// Follow-up actions attached to a delivered image
pub fn result_keyboard() -> Keyboard {
    Keyboard::Inline(vec![vec![
        InlineButton::new("🔄 Repeat", REPEAT_CALLBACK),
        InlineButton::new("✨ New image", NEW_CALLBACK),
    ]])
}
