//! Inbound API schema definitions
//!
//! Request and response bodies for `POST /api/models` and `POST /api/chat`.
//! Absent or `null` fields deserialize to empty values so validation can
//! report them as missing instead of failing JSON extraction.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::openrouter::{Message, ModelDescriptor};

// ============================================================================
// API Key
// ============================================================================

/// Caller-supplied upstream API key
///
/// The key is never printed: `Debug` and `Display` both redact it.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Raw key, for building the authorization header only
    pub fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Treat an explicit `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// POST /api/models
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_key: ApiKey,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelDescriptor>,
    /// Set when the upstream could not be reached; omitted otherwise
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

// ============================================================================
// POST /api/chat
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_key: ApiKey,

    /// Model ids to query
    #[serde(default, deserialize_with = "null_as_default")]
    pub models: Vec<String>,

    /// Conversation transcript sent to every model
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// True when every required field is present and non-empty
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.models.is_empty() && !self.messages.is_empty()
    }
}

/// Per-model answers, already flattened to display text
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub responses: BTreeMap<String, String>,
}
