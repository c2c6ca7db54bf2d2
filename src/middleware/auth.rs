use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::JwtKeys;
use crate::error::ApiError;
use crate::scope::Principal;

/// Resolves the request's `Principal` and stores it in the extensions.
///
/// A request without an Authorization header runs as the anonymous principal;
/// whether that is acceptable is the scope policy's decision. A header that is
/// present but malformed or invalid is rejected with 401.
pub async fn principal_middleware(
    State(keys): State<JwtKeys>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = match extract_jwt_from_headers(request.headers())? {
        Some(token) => keys.principal(&token)?,
        None => Principal::anonymous(),
    };

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Extract the bearer token, if any
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err(ApiError::unauthorized("Empty JWT token")),
        Some(token) => Ok(Some(token.trim().to_string())),
        None => Err(ApiError::unauthorized("Authorization header must use Bearer token format")),
    }
}
