use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    Json,
};
use serde_json::Value;

use crate::app::AppState;
use crate::error::ApiError;
use crate::filter::{Page, SearchRequest};
use crate::scope::Principal;

/// POST /api/find/:entity - search with a JSON body
///
/// ```json
/// { "page": 1, "limit": 20, "sort": "created_at", "order": "desc",
///   "status": ["open", "draft"], "title": "engineer", "salary_min_from": 50000 }
/// ```
pub async fn find_post(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Page<Value>>, ApiError> {
    let Json(request) = body?;
    let schema = state.registry.get(&entity)?;

    let page = state.engine.search(&principal, &schema, &request).await?;
    Ok(Json(page))
}
