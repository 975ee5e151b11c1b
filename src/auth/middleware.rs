// Authentication middleware and extractors
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::Claims;
use crate::{AppError, AppState};

pub const AUTH_COOKIE: &str = "auth_token";

/// Where a request's token came from. Bad cookies are ignored so the HTML
/// pages fall back to anonymous; a bad bearer token is rejected.
enum TokenSource {
    Bearer(String),
    Cookie(String),
}

fn bearer_token(headers: &HeaderMap) -> Option<Result<String, AppError>> {
    let value = headers.get(header::AUTHORIZATION)?;
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    Some(token.ok_or_else(|| AppError::AuthError("Invalid authorization header".to_string())))
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn token_source(headers: &HeaderMap) -> Result<Option<TokenSource>, AppError> {
    if let Some(bearer) = bearer_token(headers) {
        return Ok(Some(TokenSource::Bearer(bearer?)));
    }
    Ok(cookie_value(headers, AUTH_COOKIE).map(TokenSource::Cookie))
}

/// Decodes the caller's token, if any, and stores the `Claims` in the request
/// extensions for the `Claims` and `MaybeClaims` extractors.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match token_source(request.headers())? {
        Some(TokenSource::Bearer(token)) => {
            let claims = state.auth_service.verify_token(&token).map_err(|e| {
                tracing::warn!("🔒 AUTH: Rejected bearer token: {}", e);
                e
            })?;
            request.extensions_mut().insert(claims);
        }
        Some(TokenSource::Cookie(token)) => match state.auth_service.verify_token(&token) {
            Ok(claims) => {
                request.extensions_mut().insert(claims);
            }
            Err(e) => tracing::debug!("Ignoring invalid auth cookie: {}", e),
        },
        None => {}
    }

    Ok(next.run(request).await)
}

/// Required authentication: 401 when the middleware found no valid token.
#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::AuthError("Authentication credentials were not provided.".to_string()))
    }
}

/// Optional authentication for public endpoints.
#[derive(Debug, Clone)]
pub struct MaybeClaims(pub Option<Claims>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeClaims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeClaims(parts.extensions.get::<Claims>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=abc.def.ghi"));
        assert_eq!(cookie_value(&headers, AUTH_COOKIE).as_deref(), Some("abc.def.ghi"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_malformed_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(token_source(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(matches!(token_source(&headers), Ok(Some(TokenSource::Bearer(t))) if t == "abc"));
    }
}
