//! Mock implementations for testing
//!
//! These mocks enable end-to-end testing of the orchestrator without network I/O.

use super::Orchestrator;
use crate::delivery::{DeliveryService, MAX_DELIVERY_ATTEMPTS};
use crate::generation::kandinsky::{
    ApiError, FusionBrainApi, Pipeline, RunParams, RunResponse, StatusResponse, StatusResult,
};
use crate::generation::{BackendId, GenerationError, GeneratorRegistry, ImageGenerator};
use crate::retry::RetryPolicy;
use crate::transport::{ChatTransport, Keyboard, TransportError, UserId};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock Transport
// ============================================================================

/// Something the core sent to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        user: UserId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        user: UserId,
        image: Vec<u8>,
        caption: String,
        keyboard: Option<Keyboard>,
    },
}

/// Records successful sends; photo sends can be scripted to fail
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<Sent>>,
    photo_failures: Mutex<VecDeque<TransportError>>,
    photo_attempts: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next photo attempt fail with `error`
    pub fn fail_next_photo(&self, error: TransportError) {
        self.photo_failures.lock().unwrap().push_back(error);
    }

    /// Photo attempts including failed ones
    pub fn photo_attempts(&self) -> usize {
        self.photo_attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn photos(&self) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| matches!(s, Sent::Photo { .. }))
            .collect()
    }

    pub fn texts_to(&self, user: UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { user: to, text, .. } if to == user => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(Sent::Text {
            user,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn send_photo(
        &self,
        user: UserId,
        image: &[u8],
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        self.photo_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.photo_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.sent.lock().unwrap().push(Sent::Photo {
            user,
            image: image.to_vec(),
            caption: caption.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }
}

// ============================================================================
// Mock Generator
// ============================================================================

/// Generator that returns queued results
pub struct MockGenerator {
    backend: BackendId,
    results: Mutex<VecDeque<Result<Vec<u8>, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(backend: BackendId) -> Self {
        Self {
            backend,
            results: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_image(&self, image: Vec<u8>) {
        self.results.lock().unwrap().push_back(Ok(image));
    }

    pub fn queue_error(&self, error: GenerationError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::generation_failed("No mock result queued")))
    }

    fn backend(&self) -> BackendId {
        self.backend
    }
}

// ============================================================================
// Scripted FusionBrain API
// ============================================================================

pub fn pending_status() -> StatusResponse {
    StatusResponse {
        status: "PROCESSING".to_string(),
        ..Default::default()
    }
}

pub fn done_status(image: &[u8]) -> StatusResponse {
    StatusResponse {
        status: "DONE".to_string(),
        result: Some(StatusResult {
            files: vec![BASE64.encode(image)],
        }),
        error_description: None,
    }
}

/// FusionBrain stand-in that replays queued status responses.
/// Once the queue is empty every poll reports the job as still processing.
pub struct ScriptedFusionBrain {
    pipelines: Vec<Pipeline>,
    pipelines_error: Mutex<Option<ApiError>>,
    run_response: RunResponse,
    run_error: Mutex<Option<ApiError>>,
    status_delay: Option<Duration>,
    stalled: bool,
    statuses: Mutex<VecDeque<Result<StatusResponse, ApiError>>>,
    status_calls: AtomicUsize,
    runs: Mutex<Vec<(String, RunParams)>>,
}

impl ScriptedFusionBrain {
    pub fn new() -> Self {
        Self {
            pipelines: vec![Pipeline {
                id: "pipeline-1".to_string(),
                name: Some("Kandinsky 3.1".to_string()),
            }],
            pipelines_error: Mutex::new(None),
            run_response: RunResponse {
                uuid: Some("job-1".to_string()),
            },
            run_error: Mutex::new(None),
            status_delay: None,
            stalled: false,
            statuses: Mutex::new(VecDeque::new()),
            status_calls: AtomicUsize::new(0),
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pipelines(mut self, pipelines: Vec<Pipeline>) -> Self {
        self.pipelines = pipelines;
        self
    }

    pub fn with_run_response(mut self, response: RunResponse) -> Self {
        self.run_response = response;
        self
    }

    /// Fail the next pipeline listing
    pub fn with_pipelines_error(self, error: ApiError) -> Self {
        *self.pipelines_error.lock().unwrap() = Some(error);
        self
    }

    /// Fail the next run submission (the call is still recorded)
    pub fn with_run_error(self, error: ApiError) -> Self {
        *self.run_error.lock().unwrap() = Some(error);
        self
    }

    /// Every status call sleeps this long before answering
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    /// Status calls never answer
    pub fn with_stalled_status(mut self) -> Self {
        self.stalled = true;
        self
    }

    pub fn queue_status(&self, status: Result<StatusResponse, ApiError>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn recorded_runs(&self) -> Vec<(String, RunParams)> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl FusionBrainApi for ScriptedFusionBrain {
    async fn pipelines(&self) -> Result<Vec<Pipeline>, ApiError> {
        if let Some(error) = self.pipelines_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.pipelines.clone())
    }

    async fn run(&self, pipeline_id: &str, params: &RunParams) -> Result<RunResponse, ApiError> {
        self.runs
            .lock()
            .unwrap()
            .push((pipeline_id.to_string(), params.clone()));
        if let Some(error) = self.run_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.run_response.clone())
    }

    async fn status(&self, _job_id: &str) -> Result<StatusResponse, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(pending_status()))
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn registry_with(generator: &Arc<MockGenerator>) -> GeneratorRegistry {
    let mut registry = GeneratorRegistry::new_empty();
    registry.register(Arc::clone(generator) as Arc<dyn ImageGenerator>);
    registry
}

/// Orchestrator over a mock transport, delivering without delays
pub fn test_orchestrator(
    registry: GeneratorRegistry,
) -> (Orchestrator<MockTransport>, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let orchestrator = Orchestrator::new(Arc::new(registry), Arc::clone(&transport)).with_delivery(
        DeliveryService::new(Arc::clone(&transport))
            .with_policy(RetryPolicy::immediate(MAX_DELIVERY_ATTEMPTS)),
    );
    (orchestrator, transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator_drains_queue() {
        let generator = MockGenerator::new(BackendId::Kandinsky);
        generator.queue_image(b"one".to_vec());

        assert_eq!(generator.generate("a").await.unwrap(), b"one");
        assert!(generator.generate("b").await.is_err());
        assert_eq!(generator.recorded_prompts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_mock_transport_scripted_photo_failure() {
        let transport = MockTransport::new();
        transport.fail_next_photo(TransportError::network("down"));

        assert!(transport.send_photo(UserId(1), b"x", "c", None).await.is_err());
        assert!(transport.send_photo(UserId(1), b"x", "c", None).await.is_ok());
        assert_eq!(transport.photo_attempts(), 2);
        assert_eq!(transport.photos().len(), 1);
    }
}
