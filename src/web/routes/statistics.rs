use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::services::statistics_service;
use crate::web::state::AppState;

pub async fn statistics_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let stats =
        statistics_service::load_statistics(state.stores.roster.as_ref(), state.stores.log.as_ref())
            .await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}
