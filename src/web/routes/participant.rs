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
use crate::services::attendance_service::{self, CheckInOutcome};
use crate::web::middleware::auth::AuthenticatedUser;
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ParticipantQuery {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    #[serde(default)]
    id: String,
}

fn required_id(raw: Option<&str>) -> Result<&str, AppError> {
    match raw.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(AppError::Validation("Participant ID is required".to_string())),
    }
}

pub async fn lookup_handler(
    State(state): State<AppState>,
    query: Result<Query<ParticipantQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let id = required_id(query.id.as_deref())?;

    let view = attendance_service::lookup_with_status(
        state.stores.roster.as_ref(),
        state.stores.log.as_ref(),
        id,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;

    Ok(Json(json!({
        "status": "found",
        "message": "Participant found",
        "data": view,
    })))
}

pub async fn check_in_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(staff)): Extension<AuthenticatedUser>,
    payload: Result<Json<CheckInBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = payload?;
    let id = required_id(Some(body.id.as_str()))?;

    let outcome = attendance_service::record_attendance(
        state.stores.roster.as_ref(),
        state.stores.log.as_ref(),
        &state.check_in_locks,
        id,
        &staff.name,
        state.settings.event_offset,
    )
    .await?;

    match outcome {
        CheckInOutcome::Recorded(view) => Ok(Json(json!({
            "status": "verified",
            "message": "Attendance recorded",
            "data": view,
        }))),
        CheckInOutcome::AlreadyRecorded(existing) => Err(AppError::Conflict {
            message: format!(
                "Participant already checked in at {}",
                existing.timestamp
            ),
            timestamp: Some(existing.timestamp),
        }),
        CheckInOutcome::NotFound => Err(AppError::NotFound("Participant not found".to_string())),
    }
}
