use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use cookie::Cookie;

use crate::error::AppError;
use crate::models::{Role, StaffProfile};
use crate::services::auth_service::SESSION_COOKIE;
use crate::web::state::AppState;

/// Staff member behind the current request, taken from the token claims.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub StaffProfile);

/// Session cookie first, then `Authorization: Bearer`.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|hv| hv.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_string());
    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<StaffProfile, AppError> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    let claims = state.tokens.verify(&token, Utc::now().timestamp())?;
    Ok(claims.profile())
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers()) {
        Ok(profile) => {
            request.extensions_mut().insert(AuthenticatedUser(profile));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers()) {
        Ok(profile) if profile.role == Role::Admin => {
            request.extensions_mut().insert(AuthenticatedUser(profile));
            next.run(request).await
        }
        Ok(profile) => {
            tracing::warn!(
                username = %profile.username,
                path = %request.uri().path(),
                "admin route refused"
            );
            AppError::Unauthorized("Admin access required".to_string()).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc.def.ghi"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer other"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));

        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn cleared_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(extract_token(&headers), None);
    }
}
