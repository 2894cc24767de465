//! Process configuration read from the environment

use crate::generation::{GenerationConfig, KandinskyCredentials};
use crate::transport::telegram;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub telegram_api_url: String,
    pub generation: GenerationConfig,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let defaults = GenerationConfig::default();
        let kandinsky = match (get("KANDINSKY_API_KEY"), get("KANDINSKY_SECRET_KEY")) {
            (Some(api_key), Some(secret_key)) => Some(KandinskyCredentials {
                api_key,
                secret_key,
            }),
            (None, None) => None,
            _ => {
                tracing::warn!("Only one of KANDINSKY_API_KEY / KANDINSKY_SECRET_KEY is set");
                None
            }
        };

        Ok(Self {
            bot_token,
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| telegram::DEFAULT_API_URL.to_string()),
            generation: GenerationConfig {
                kandinsky,
                kandinsky_api_url: get("KANDINSKY_API_URL").unwrap_or(defaults.kandinsky_api_url),
                huggingface_token: get("HUGGINGFACE_API_TOKEN"),
                stable_diffusion_url: get("STABLE_DIFFUSION_URL")
                    .unwrap_or(defaults.stable_diffusion_url),
            },
        })
    }
}
