use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::services::staff_service::AccountInput;
use crate::web::middleware::auth::AuthenticatedUser;
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AccountBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    role: String,
}

impl AccountBody {
    fn into_input(self) -> AccountInput {
        AccountInput {
            username: self.username,
            password: self.password,
            name: self.name,
            role: self.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    id: Option<String>,
}

pub async fn list_users_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let users = state.staff.list().await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    payload: Result<Json<AccountBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = payload?;
    if [&body.username, &body.password, &body.name, &body.role]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Username, password, name and role are required".to_string(),
        ));
    }

    let user = state.staff.create(body.into_input()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User created",
        "user": user,
    })))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    payload: Result<Json<AccountBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = payload?;
    if [&body.id, &body.username, &body.name, &body.role]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(AppError::Validation(
            "ID, username, name and role are required".to_string(),
        ));
    }

    let id = body.id.trim().to_string();
    let user = state.staff.update(&id, body.into_input()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User updated",
        "user": user,
    })))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(actor)): Extension<AuthenticatedUser>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let id = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("User ID is required".to_string()))?;

    let user = state.staff.delete(&actor.id, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User deleted",
        "user": user,
    })))
}
