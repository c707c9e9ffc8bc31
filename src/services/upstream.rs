//! Upstream aggregator client
//!
//! Talks to an OpenRouter-compatible API: lists the available models and
//! requests one chat completion per call. Listing failures are downgraded
//! to an empty, `degraded` listing; completion failures come back as a
//! typed [`UpstreamError`] so the fan-out layer can keep them per model.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::schemas::openrouter::{
    CompletionRequest, CompletionResponse, UpstreamErrorBody, UpstreamModelList,
};
use crate::schemas::{ApiKey, Message, ModelDescriptor};

/// Upstream error bodies are cut to this many characters
const MAX_ERROR_BODY_CHARS: usize = 500;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when calling the upstream aggregator
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("response has no completion content")]
    MissingContent,

    #[error("dispatch deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("completion task failed: {0}")]
    Aborted(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

// ============================================================================
// Upstream Trait
// ============================================================================

/// Result of a model listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelListing {
    /// Models sorted ascending by id
    pub models: Vec<ModelDescriptor>,
    /// True when the upstream call failed and `models` is empty because of it
    pub degraded: bool,
}

impl ModelListing {
    pub fn available(mut models: Vec<ModelDescriptor>) -> Self {
        models.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            models,
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            models: Vec::new(),
            degraded: true,
        }
    }
}

/// Operations the rest of the service needs from the aggregator
#[async_trait]
pub trait Upstream: Send + Sync {
    /// List models. Never fails; see [`ModelListing::degraded`].
    async fn list_models(&self, api_key: &ApiKey) -> ModelListing;

    /// Request one chat completion and return the first choice's content.
    async fn complete(
        &self,
        api_key: &ApiKey,
        model: &str,
        messages: &[Message],
    ) -> Result<String, UpstreamError>;
}

// ============================================================================
// OpenRouter Service
// ============================================================================

/// reqwest-backed [`Upstream`] for OpenRouter-compatible APIs
#[derive(Clone)]
pub struct OpenRouterService {
    client: Client,
    base_url: String,
    list_timeout: Duration,
    completion_timeout: Duration,
}

impl OpenRouterService {
    /// Create a new service from upstream settings
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "http-referer",
            HeaderValue::from_str(&config.referer)
                .map_err(|e| UpstreamError::Config(format!("referer header: {}", e)))?,
        );
        headers.insert(
            "x-title",
            HeaderValue::from_str(&config.title)
                .map_err(|e| UpstreamError::Config(format!("title header: {}", e)))?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        tracing::info!(
            base_url = %config.base_url,
            list_timeout_secs = config.list_timeout_seconds,
            completion_timeout_secs = config.completion_timeout_seconds,
            "Initialized upstream client"
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            list_timeout: config.list_timeout(),
            completion_timeout: config.completion_timeout(),
        })
    }

    async fn fetch_models(&self, api_key: &ApiKey) -> Result<Vec<ModelDescriptor>, UpstreamError> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key.expose())
            .timeout(self.list_timeout)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.text().await?;
        let list: UpstreamModelList =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Parse(e.to_string()))?;

        Ok(list.data.into_iter().map(ModelDescriptor::from).collect())
    }
}

#[async_trait]
impl Upstream for OpenRouterService {
    async fn list_models(&self, api_key: &ApiKey) -> ModelListing {
        if api_key.is_empty() {
            return ModelListing::default();
        }

        match self.fetch_models(api_key).await {
            Ok(models) => {
                tracing::debug!(model_count = models.len(), "Fetched upstream models");
                ModelListing::available(models)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch upstream models");
                ModelListing::degraded()
            }
        }
    }

    async fn complete(
        &self,
        api_key: &ApiKey,
        model: &str,
        messages: &[Message],
    ) -> Result<String, UpstreamError> {
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(
            model = %model,
            message_count = messages.len(),
            "Calling upstream chat completion"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose())
            .timeout(self.completion_timeout)
            .json(&CompletionRequest { model, messages })
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.text().await?;
        let completion: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Parse(e.to_string()))?;

        completion.first_content().ok_or(UpstreamError::MissingContent)
    }
}

/// Turn a non-2xx response into [`UpstreamError::Status`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<UpstreamErrorBody>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    };

    Err(UpstreamError::Status {
        status: status.as_u16(),
        message,
    })
}
