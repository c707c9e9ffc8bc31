//! Schema module
//!
//! Wire types for the inbound API and the upstream aggregator.

pub mod api;
pub mod openrouter;

pub use api::{ApiKey, ChatRequest, ChatResponse, ModelsRequest, ModelsResponse};
pub use openrouter::{Message, ModelDescriptor};
