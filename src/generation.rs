//! Image generation backends
//!
//! Every backend exposes the same capability, `generate(prompt) -> bytes`,
//! and is selected by a [`BackendId`].

mod error;
pub mod kandinsky;
mod registry;
mod stable_diffusion;

pub use error::{GenerationError, GenerationErrorKind};
pub use kandinsky::KandinskyGenerator;
pub use registry::{GenerationConfig, GeneratorRegistry, KandinskyCredentials};
pub use stable_diffusion::StableDiffusionGenerator;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Closed set of generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendId {
    Kandinsky,
    StableDiffusion,
}

impl BackendId {
    /// All backends, in the order they are offered to the user
    pub const ALL: [BackendId; 2] = [BackendId::Kandinsky, BackendId::StableDiffusion];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendId::Kandinsky => "kandinsky",
            BackendId::StableDiffusion => "stable_diffusion",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            BackendId::Kandinsky => "🖌 Kandinsky",
            BackendId::StableDiffusion => "🎨 Stable Diffusion",
        }
    }

    /// Payload carried by the backend's inline button
    pub fn callback_data(self) -> &'static str {
        match self {
            BackendId::Kandinsky => "model_kandinsky",
            BackendId::StableDiffusion => "model_sd",
        }
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.callback_data() == data)
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common interface for generation backends
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Produce one image for `prompt`, as raw encoded bytes
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GenerationError>;

    fn backend(&self) -> BackendId;
}

/// Logging wrapper for generators
pub struct LoggingGenerator {
    inner: Arc<dyn ImageGenerator>,
    backend: BackendId,
}

impl LoggingGenerator {
    pub fn new(inner: Arc<dyn ImageGenerator>) -> Self {
        let backend = inner.backend();
        Self { inner, backend }
    }
}

#[async_trait]
impl ImageGenerator for LoggingGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GenerationError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(prompt).await;
        let duration = start.elapsed();

        match &result {
            Ok(bytes) => {
                tracing::info!(
                    backend = %self.backend,
                    duration_ms = %duration.as_millis(),
                    bytes = bytes.len(),
                    "Image generated"
                );
            }
            Err(e) => {
                tracing::error!(
                    backend = %self.backend,
                    duration_ms = %duration.as_millis(),
                    kind = %e.kind,
                    error = %e.message,
                    "Image generation failed"
                );
            }
        }

        result
    }

    fn backend(&self) -> BackendId {
        self.backend
    }
}
