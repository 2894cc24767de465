//! Telegram Bot API transport
//!
//! Outbound messages go through [`TelegramClient`]; inbound updates are
//! long-polled by [`TelegramPoller`] and handed to the dispatcher.

use super::{ChatTransport, Keyboard, TransportError, UserId};
use crate::orchestrator::Dispatcher;
use crate::session::Event;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Long-poll duration requested from `getUpdates`, in seconds
const LONG_POLL_SECS: u64 = 30;
/// Must outlive the long poll
const HTTP_TIMEOUT: Duration = Duration::from_secs(90);
const ERROR_BACKOFF: Duration = Duration::from_secs(3);

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
}

/// Map an update to the user it came from and the event it represents
pub fn classify_update(update: &Update) -> Option<(UserId, Event)> {
    if let Some(message) = &update.message {
        let user = message.from.as_ref().map_or(message.chat.id, |u| u.id);
        let text = message.text.as_deref()?;
        return Some((UserId(user), Event::from_text(text)));
    }

    if let Some(query) = &update.callback_query {
        let event = Event::from_callback(query.data.as_deref()?)?;
        return Some((UserId(query.from.id), event));
    }

    None
}

fn reply_markup(keyboard: &Keyboard) -> Value {
    match keyboard {
        Keyboard::Reply(rows) => json!({
            "keyboard": rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            "resize_keyboard": true,
        }),
        Keyboard::Inline(rows) => json!({
            "inline_keyboard": rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| json!({ "text": b.text, "callback_data": b.callback_data }))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>(),
        }),
    }
}

/// Turn an HTTP status and body into the method's result or a classified error
fn decode_api_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, TransportError> {
    let parsed: Result<ApiResponse<T>, _> = serde_json::from_str(body);
    let description = parsed
        .as_ref()
        .ok()
        .and_then(|r| r.description.clone())
        .unwrap_or_else(|| body.to_string());

    match status {
        429 => {
            return Err(TransportError::rate_limit(format!(
                "Flood control: {description}"
            )))
        }
        500..=599 => {
            return Err(TransportError::server_error(format!(
                "HTTP {status}: {description}"
            )))
        }
        200..=299 => {}
        _ => return Err(TransportError::rejected(format!("HTTP {status}: {description}"))),
    }

    let response =
        parsed.map_err(|e| TransportError::rejected(format!("Malformed API response: {e}")))?;
    match response.result {
        Some(result) if response.ok => Ok(result),
        _ => Err(TransportError::rejected(format!("API error: {description}"))),
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct TelegramClient {
    http: Client,
    /// `{api}/bot{token}`; never logged
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn read_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| {
                TransportError::network(format!("Failed to read response: {}", e.without_url()))
            })?;
        decode_api_response(status, &body)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, TransportError> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::from(e.without_url()))?;
        Self::read_response(response).await
    }

    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), TransportError> {
        let _: IgnoredAny = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": callback_id }))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "chat_id": user.0, "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = reply_markup(keyboard);
        }
        let _: IgnoredAny = self.call("sendMessage", &body).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        user: UserId,
        image: &[u8],
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        let mut form = Form::new()
            .text("chat_id", user.0.to_string())
            .text("caption", caption.to_string())
            .part("photo", Part::bytes(image.to_vec()).file_name("image.png"));
        if let Some(keyboard) = keyboard {
            form = form.text("reply_markup", reply_markup(keyboard).to_string());
        }

        let response = self
            .http
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::from(e.without_url()))?;
        let _: IgnoredAny = Self::read_response(response).await?;
        Ok(())
    }
}

// ============================================================================
// Poller
// ============================================================================

pub struct TelegramPoller {
    client: Arc<TelegramClient>,
    offset: i64,
}

impl TelegramPoller {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client, offset: 0 }
    }

    /// Drop updates that queued up while the bot was offline
    pub async fn skip_pending(&mut self) -> Result<(), TransportError> {
        let pending = self.client.get_updates(-1, 0).await?;
        if let Some(last) = pending.last() {
            self.offset = last.update_id + 1;
            tracing::info!(offset = self.offset, "Skipped pending updates");
        }
        Ok(())
    }

    /// Poll until `cancel` fires, dispatching every recognised update
    pub async fn run<T: ChatTransport + 'static>(
        mut self,
        dispatcher: &Dispatcher<T>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Polling for updates");

        loop {
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = self.client.get_updates(self.offset, LONG_POLL_SECS) => result,
            };

            match result {
                Ok(updates) => {
                    for update in updates {
                        self.offset = self.offset.max(update.update_id + 1);
                        self.handle_update(&update, dispatcher).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        tracing::info!("Polling stopped");
    }

    async fn handle_update<T: ChatTransport + 'static>(
        &self,
        update: &Update,
        dispatcher: &Dispatcher<T>,
    ) {
        if let Some(query) = &update.callback_query {
            if let Err(e) = self.client.answer_callback_query(&query.id).await {
                tracing::debug!(error = %e, "Failed to answer callback query");
            }
        }

        match classify_update(update) {
            Some((user, event)) => {
                tracing::debug!(user_id = %user, event = event.name(), "Inbound event");
                dispatcher.dispatch(user, event).await;
            }
            None => tracing::debug!(update_id = update.update_id, "Ignoring update"),
        }
    }
}
