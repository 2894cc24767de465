//! Registry of configured generation backends

use super::kandinsky::{self, HttpFusionBrainApi};
use super::stable_diffusion;
use super::{
    BackendId, GenerationError, ImageGenerator, KandinskyGenerator, LoggingGenerator,
    StableDiffusionGenerator,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct KandinskyCredentials {
    pub api_key: String,
    pub secret_key: String,
}

/// Configuration for generation backends
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub kandinsky: Option<KandinskyCredentials>,
    pub kandinsky_api_url: String,
    pub huggingface_token: Option<String>,
    pub stable_diffusion_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            kandinsky: None,
            kandinsky_api_url: kandinsky::DEFAULT_API_URL.to_string(),
            huggingface_token: None,
            stable_diffusion_url: stable_diffusion::DEFAULT_MODEL_URL.to_string(),
        }
    }
}

/// Backends that have credentials, keyed by id
pub struct GeneratorRegistry {
    generators: HashMap<BackendId, Arc<dyn ImageGenerator>>,
}

impl GeneratorRegistry {
    pub fn new_empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    pub fn new(config: &GenerationConfig) -> Self {
        let mut registry = Self::new_empty();

        for backend in BackendId::ALL {
            if let Some(generator) = Self::try_create(backend, config) {
                registry.register(generator);
            }
        }

        registry
    }

    fn try_create(
        backend: BackendId,
        config: &GenerationConfig,
    ) -> Option<Arc<dyn ImageGenerator>> {
        let created: Result<Arc<dyn ImageGenerator>, String> = match backend {
            BackendId::Kandinsky => {
                let creds = config.kandinsky.as_ref()?;
                HttpFusionBrainApi::new(
                    &config.kandinsky_api_url,
                    creds.api_key.clone(),
                    creds.secret_key.clone(),
                )
                .map(|api| Arc::new(KandinskyGenerator::new(api)) as Arc<dyn ImageGenerator>)
                .map_err(|e| e.to_string())
            }
            BackendId::StableDiffusion => {
                let token = config
                    .huggingface_token
                    .as_ref()
                    .filter(|t| !t.is_empty())?;
                StableDiffusionGenerator::new(&config.stable_diffusion_url, token.clone())
                    .map(|g| Arc::new(g) as Arc<dyn ImageGenerator>)
                    .map_err(|e| e.to_string())
            }
        };

        match created {
            Ok(generator) => Some(generator),
            Err(e) => {
                tracing::warn!(%backend, error = %e, "Failed to create generator");
                None
            }
        }
    }

    /// Register a generator, wrapped with logging. Replaces any previous one for the same backend.
    pub fn register(&mut self, generator: Arc<dyn ImageGenerator>) {
        let backend = generator.backend();
        self.generators
            .insert(backend, Arc::new(LoggingGenerator::new(generator)));
    }

    pub fn get(&self, backend: BackendId) -> Option<Arc<dyn ImageGenerator>> {
        self.generators.get(&backend).cloned()
    }

    /// Configured backends in presentation order
    pub fn available(&self) -> Vec<BackendId> {
        BackendId::ALL
            .into_iter()
            .filter(|b| self.generators.contains_key(b))
            .collect()
    }

    pub fn has_backends(&self) -> bool {
        !self.generators.is_empty()
    }

    /// Generate with the chosen backend
    pub async fn generate(
        &self,
        prompt: &str,
        backend: BackendId,
    ) -> Result<Vec<u8>, GenerationError> {
        let generator = self.get(backend).ok_or_else(|| {
            GenerationError::backend_unavailable(format!("Backend {backend} is not configured"))
        })?;
        generator.generate(prompt).await
    }
}
