use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use cookie::{time::Duration, Cookie, SameSite};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::AppError;
use crate::services::auth_service::{SESSION_COOKIE, TOKEN_TTL_SECS};
use crate::services::staff_service::StaffError;
use crate::web::middleware::auth::authenticate;
use crate::web::state::AppState;

#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    name: String,
}

fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(Duration::seconds(TOKEN_TTL_SECS))
        .build()
}

pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload?;
    if body.username.trim().is_empty() || body.password.trim().is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let profile = match state.staff.authenticate(&body.username, &body.password).await {
        Ok(profile) => profile,
        Err(StaffError::InvalidCredentials) => {
            warn!(username = %body.username.trim(), "login failed");
            return Err(StaffError::InvalidCredentials.into());
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.tokens.issue(&profile, Utc::now().timestamp())?;
    let cookie = session_cookie(token, state.settings.cookie_secure);
    info!(username = %profile.username, role = profile.role.as_str(), "login");

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(json!({
            "success": true,
            "message": "Login successful",
            "user": profile,
        })),
    )
        .into_response())
}

pub async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.settings.allow_registration {
        return Err(AppError::Unauthorized("Registration is disabled".to_string()));
    }
    let Json(body) = payload?;
    if [&body.username, &body.password, &body.name]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Username, password and name are required".to_string(),
        ));
    }

    let profile = state
        .staff
        .register(&body.username, &body.password, &body.name)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Registration successful, please log in",
        "user": profile,
    })))
}

pub async fn verify_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let profile = authenticate(&state, &headers)?;
    Ok(Json(json!({ "success": true, "user": profile })))
}

pub async fn logout_handler(State(state): State<AppState>) -> Response {
    let mut cookie = session_cookie(String::new(), state.settings.cookie_secure);
    cookie.make_removal();

    (
        [(header::SET_COOKIE, cookie.to_string())],
        Json(json!({ "success": true, "message": "Logged out" })),
    )
        .into_response()
}
