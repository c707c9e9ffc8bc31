//! Upstream aggregator wire types
//!
//! Request and response shapes for the OpenRouter-compatible API
//! (`GET /models`, `POST /chat/completions`). Only the fields this service
//! reads are modelled; everything else is ignored on deserialization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Shared Types
// ============================================================================

/// One turn of a conversation transcript
///
/// Forwarded to every upstream call exactly as received, including fields
/// this service does not read (e.g. `name`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// A model offered by the upstream service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Vendor-defined model identifier (e.g. "openai/gpt-4o")
    pub id: String,
    /// Human readable name, falls back to the id
    pub name: String,
}

// ============================================================================
// GET /models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpstreamModelList {
    #[serde(default)]
    pub data: Vec<UpstreamModel>,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamModel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<UpstreamModel> for ModelDescriptor {
    fn from(model: UpstreamModel) -> Self {
        let name = model.name.unwrap_or_else(|| model.id.clone());
        Self { id: model.id, name }
    }
}

// ============================================================================
// POST /chat/completions
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Content of the first choice, if any
    pub fn first_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

/// Error envelope returned by the upstream on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: UpstreamErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamErrorDetail {
    pub message: String,
}
