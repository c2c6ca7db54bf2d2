use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::app::AppState;
use crate::error::ApiError;
use crate::filter::{Page, SearchRequest};
use crate::scope::Principal;

/// GET /api/data/:entity - search with filters in the query string
///
/// `?page=2&limit=10&sort=name&order=asc&status=open,draft&created_at_from=2024-01-01`
pub async fn schema_get(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Page<Value>>, ApiError> {
    let Query(pairs) = query?;
    let schema = state.registry.get(&entity)?;
    let request = SearchRequest::from_query_pairs(pairs);

    let page = state.engine.search(&principal, &schema, &request).await?;
    Ok(Json(page))
}
