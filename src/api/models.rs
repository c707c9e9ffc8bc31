//! Model listing endpoint
//!
//! POST /api/models - lists the models the caller's key can reach.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::error::ApiError;
use crate::schemas::{ModelsRequest, ModelsResponse};
use crate::server::state::AppState;

/// POST /api/models
///
/// An empty key yields an empty list. Upstream failures also yield an empty
/// list, flagged with `degraded: true`.
pub async fn list_models(
    State(state): State<AppState>,
    payload: Result<Json<ModelsRequest>, JsonRejection>,
) -> Result<Json<ModelsResponse>, ApiError> {
    let Json(request) = payload?;

    let listing = state.upstream.list_models(&request.api_key).await;

    tracing::debug!(
        model_count = listing.models.len(),
        degraded = listing.degraded,
        "Listing available models"
    );

    Ok(Json(ModelsResponse {
        models: listing.models,
        degraded: listing.degraded,
    }))
}
