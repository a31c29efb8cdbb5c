use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::web::state::AppState;

const SAMPLE_ROWS: usize = 3;

/// Backend tags, row counts and a few rows from each store, for checking a
/// deployment is wired to the right sheet or database.
pub async fn stores_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let roster = state.stores.roster.list_all().await?;
    let log = state.stores.log.list_all().await?;
    let staff = state.staff.list().await?;

    let log_sample: Vec<_> = log.iter().rev().take(SAMPLE_ROWS).collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "roster": {
                "backend": state.stores.roster.backend_tag(),
                "rows": roster.len(),
                "sample": roster.iter().take(SAMPLE_ROWS).collect::<Vec<_>>(),
            },
            "log": {
                "backend": state.stores.log.backend_tag(),
                "rows": log.len(),
                "latest": log_sample,
            },
            "staff": {
                "backend": state.staff.backend_tag(),
                "accounts": staff.len(),
            },
        },
    })))
}
