use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::services::participants_service::{self, ParticipantsQuery};
use crate::web::state::AppState;

pub async fn list_handler(
    State(state): State<AppState>,
    query: Result<Query<ParticipantsQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let page = participants_service::list_participants(
        state.stores.roster.as_ref(),
        state.stores.log.as_ref(),
        &query,
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "data": page.items,
        "pagination": page.pagination,
    })))
}
