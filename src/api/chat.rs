//! Multi-model chat endpoint
//!
//! POST /api/chat - sends one transcript to every requested model and
//! returns all answers keyed by model id.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::error::ApiError;
use crate::schemas::{ChatRequest, ChatResponse};
use crate::server::state::AppState;

/// POST /api/chat
///
/// Returns 400 when `api_key`, `models` or `messages` is missing or empty.
/// Otherwise always 200; per-model failures show up inline as
/// `"Error: ..."` strings.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;

    if !request.is_complete() {
        tracing::debug!(
            has_key = !request.api_key.is_empty(),
            model_count = request.models.len(),
            message_count = request.messages.len(),
            "Rejecting incomplete chat request"
        );
        return Err(ApiError::missing_fields());
    }

    let result = state
        .fanout
        .dispatch(&request.api_key, &request.models, &request.messages)
        .await;

    Ok(Json(ChatResponse {
        responses: result.into_display_map(),
    }))
}
