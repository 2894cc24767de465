//! Chat transport abstraction
//!
//! The core only needs to send text and photos to a user; receiving is done by
//! the transport's own poller which feeds the dispatcher.

mod error;
pub mod telegram;

pub use error::{TransportError, TransportErrorKind};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Identity supplied by the messaging channel. For private chats it is also
/// the destination chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Button attached to a message that reports back `callback_data` when pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Keyboard attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Persistent reply keyboard; pressing a button sends its label as text
    Reply(Vec<Vec<String>>),
    /// Buttons attached to the message itself
    Inline(Vec<Vec<InlineButton>>),
}

/// Outbound side of the chat channel
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError>;

    async fn send_photo(
        &self,
        user: UserId,
        image: &[u8],
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        (**self).send_text(user, text, keyboard).await
    }

    async fn send_photo(
        &self,
        user: UserId,
        image: &[u8],
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        (**self).send_photo(user, image, caption, keyboard).await
    }
}
