//! Kandinsky via the FusionBrain pipeline API
//!
//! Three-step job protocol: pick a pipeline, submit a run, poll its status
//! until it is `DONE`, fails, or the poll budget runs out.

use super::{BackendId, GenerationError, ImageGenerator};
use crate::retry::{retry, RetryOutcome, RetryPolicy, Verdict};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api-key.fusionbrain.ai/";
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const MAX_POLL_ATTEMPTS: u32 = 30;
/// Wall-clock cap on the status phase, however slow individual polls are
pub const POLL_BUDGET: Duration = Duration::from_secs(60);
pub const IMAGE_SIZE: u32 = 1024;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// `params` part of a run request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub num_images: u32,
    pub width: u32,
    pub height: u32,
    pub generate_params: GenerateParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateParams {
    pub query: String,
}

impl RunParams {
    pub fn generate(prompt: &str) -> Self {
        Self {
            kind: "GENERATE".to_string(),
            num_images: 1,
            width: IMAGE_SIZE,
            height: IMAGE_SIZE,
            generate_params: GenerateParams {
                query: prompt.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<StatusResult>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResult {
    #[serde(default)]
    pub files: Vec<String>,
}

/// Job status as far as the poller cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Done,
    Failed,
}

impl StatusResponse {
    pub fn job_status(&self) -> JobStatus {
        match self.status.as_str() {
            "DONE" => JobStatus::Done,
            "FAIL" | "FAILED" | "ERROR" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

// ============================================================================
// API seam
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Raw FusionBrain endpoints, one call each
#[async_trait]
pub trait FusionBrainApi: Send + Sync {
    async fn pipelines(&self) -> Result<Vec<Pipeline>, ApiError>;

    async fn run(&self, pipeline_id: &str, params: &RunParams) -> Result<RunResponse, ApiError>;

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError>;
}

#[async_trait]
impl<T: FusionBrainApi + ?Sized> FusionBrainApi for Arc<T> {
    async fn pipelines(&self) -> Result<Vec<Pipeline>, ApiError> {
        (**self).pipelines().await
    }

    async fn run(&self, pipeline_id: &str, params: &RunParams) -> Result<RunResponse, ApiError> {
        (**self).run(pipeline_id, params).await
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        (**self).status(job_id).await
    }
}

/// Production FusionBrain client
pub struct HttpFusionBrainApi {
    client: Client,
    base_url: String,
    api_key: String,
    secret_key: String,
}

impl HttpFusionBrainApi {
    pub fn new(base_url: &str, api_key: String, secret_key: String) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/", base_url.trim_end_matches('/')),
            api_key,
            secret_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("X-Key", format!("Key {}", self.api_key))
            .header("X-Secret", format!("Secret {}", self.secret_key))
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Malformed(format!("{e} - body: {body}")))
    }
}

#[async_trait]
impl FusionBrainApi for HttpFusionBrainApi {
    async fn pipelines(&self) -> Result<Vec<Pipeline>, ApiError> {
        let response = self
            .authorized(self.client.get(self.url("key/api/v1/pipelines")))
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn run(&self, pipeline_id: &str, params: &RunParams) -> Result<RunResponse, ApiError> {
        let params_json =
            serde_json::to_string(params).map_err(|e| ApiError::Malformed(e.to_string()))?;
        let form = Form::new()
            .text("pipeline_id", pipeline_id.to_string())
            .part(
                "params",
                Part::text(params_json).mime_str("application/json")?,
            );

        let response = self
            .authorized(self.client.post(self.url("key/api/v1/pipeline/run")))
            .multipart(form)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        let response = self
            .authorized(
                self.client
                    .get(self.url(&format!("key/api/v1/pipeline/status/{job_id}"))),
            )
            .send()
            .await?;
        Self::read_json(response).await
    }
}

// ============================================================================
// Generator
// ============================================================================

pub struct KandinskyGenerator<A = HttpFusionBrainApi> {
    api: A,
    poll_policy: RetryPolicy,
}

impl<A: FusionBrainApi> KandinskyGenerator<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            poll_policy: RetryPolicy::new(POLL_INTERVAL, MAX_POLL_ATTEMPTS),
        }
    }

    #[allow(dead_code)] // Tests shorten the interval
    pub fn with_poll_policy(mut self, policy: RetryPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    async fn pick_pipeline(&self) -> Result<String, GenerationError> {
        let pipelines = self.api.pipelines().await.map_err(|e| {
            GenerationError::backend_unavailable(format!("Pipeline listing failed: {e}"))
        })?;

        let pipeline = pipelines
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::backend_unavailable("No pipelines available"))?;

        tracing::debug!(pipeline_id = %pipeline.id, name = ?pipeline.name, "Using pipeline");
        Ok(pipeline.id)
    }

    async fn submit(&self, pipeline_id: &str, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .api
            .run(pipeline_id, &RunParams::generate(prompt))
            .await
            .map_err(|e| GenerationError::submit_failed(format!("Job submission failed: {e}")))?;

        response
            .uuid
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GenerationError::submit_failed("Run response has no job uuid"))
    }

    async fn await_result(&self, job_id: &str) -> Result<Vec<u8>, GenerationError> {
        tokio::time::timeout(POLL_BUDGET, self.poll_until_done(job_id))
            .await
            .unwrap_or_else(|_| {
                tracing::warn!(
                    %job_id,
                    budget_secs = POLL_BUDGET.as_secs(),
                    "Poll budget exceeded"
                );
                Err(GenerationError::timeout(format!(
                    "Job {job_id} not finished within {}s",
                    POLL_BUDGET.as_secs()
                )))
            })
    }

    async fn poll_until_done(&self, job_id: &str) -> Result<Vec<u8>, GenerationError> {
        let api = &self.api;

        let outcome = retry(self.poll_policy, move |attempt| async move {
            match api.status(job_id).await {
                Ok(status) => match status.job_status() {
                    JobStatus::Done => Verdict::Ready(status),
                    JobStatus::Failed => Verdict::Abort(GenerationError::generation_failed(
                        format!(
                            "Job ended with status {}: {}",
                            status.status,
                            status.error_description.as_deref().unwrap_or("no description")
                        ),
                    )),
                    JobStatus::Pending => {
                        tracing::trace!(%job_id, attempt, status = %status.status, "Job pending");
                        Verdict::Retry(None)
                    }
                },
                Err(e) => {
                    tracing::warn!(%job_id, attempt, error = %e, "Status poll failed");
                    Verdict::Retry(Some(GenerationError::generation_failed(format!(
                        "Status poll failed: {e}"
                    ))))
                }
            }
        })
        .await;

        match outcome {
            RetryOutcome::Ready(status) => decode_result(&status),
            RetryOutcome::Aborted(err) | RetryOutcome::Exhausted {
                last_error: Some(err),
                ..
            } => Err(err),
            RetryOutcome::Exhausted {
                attempts,
                last_error: None,
            } => Err(GenerationError::timeout(format!(
                "Job {job_id} not finished after {attempts} polls"
            ))),
        }
    }
}

fn decode_result(status: &StatusResponse) -> Result<Vec<u8>, GenerationError> {
    let file = status
        .result
        .as_ref()
        .and_then(|r| r.files.first())
        .ok_or_else(|| GenerationError::generation_failed("Finished job has no files"))?;

    BASE64
        .decode(file)
        .map_err(|e| GenerationError::generation_failed(format!("Invalid base64 image: {e}")))
}

#[async_trait]
impl<A: FusionBrainApi + 'static> ImageGenerator for KandinskyGenerator<A> {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GenerationError> {
        let pipeline_id = self.pick_pipeline().await?;
        let job_id = self.submit(&pipeline_id, prompt).await?;
        tracing::info!(%job_id, %pipeline_id, "Generation job submitted");
        self.await_result(&job_id).await
    }

    fn backend(&self) -> BackendId {
        BackendId::Kandinsky
    }
}
