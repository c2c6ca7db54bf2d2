use axum::extract::{Extension, Path, State};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::scope::Principal;

/// GET /api/data/:entity/:id - show a single record within the caller's scope
pub async fn record_get(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let schema = state.registry.get(&entity)?;
    let record = state.engine.find_one(&principal, &schema, &id).await?;
    Ok(ApiResponse::success(record))
}
