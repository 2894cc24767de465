//! Stable Diffusion via the HuggingFace inference API
//!
//! Single synchronous request; a 200 response body is the image itself.

use super::{BackendId, GenerationError, ImageGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/CompVis/stable-diffusion-v1-4";

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

pub struct StableDiffusionGenerator {
    client: Client,
    url: String,
    token: String,
}

impl StableDiffusionGenerator {
    pub fn new(url: &str, token: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            token,
        })
    }
}

/// Map an inference response to the generation taxonomy
fn interpret_response(status: u16, body: Vec<u8>) -> Result<Vec<u8>, GenerationError> {
    if status != 200 {
        let text = String::from_utf8_lossy(&body);
        return Err(GenerationError::generation_failed(format!("HTTP {status}: {text}")));
    }
    if body.is_empty() {
        return Err(GenerationError::generation_failed("Empty image body"));
    }
    Ok(body)
}

#[async_trait]
impl ImageGenerator for StableDiffusionGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GenerationError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&json!({ "inputs": prompt }))
            .send()
            .await
            .map_err(|e| {
                GenerationError::submit_failed(format!("Inference request failed: {e}"))
            })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                GenerationError::generation_failed(format!("Failed to read image: {e}"))
            })?;

        interpret_response(status, body.to_vec())
    }

    fn backend(&self) -> BackendId {
        BackendId::StableDiffusion
    }
}
