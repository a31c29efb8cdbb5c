use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::services::auth_service::TokenError;
use crate::services::staff_service::StaffError;
use crate::stores::StoreError;

/// Request-boundary error. Every handler returns `Result<_, AppError>` and the
/// client always gets the `{success:false, status, message}` envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict {
        message: String,
        timestamp: Option<String>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("upstream store error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Upstream(detail) => {
                error!(detail = %detail, "upstream store failure");
                "Data store is unavailable, try again later".to_string()
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "success": false,
            "status": if status == StatusCode::NOT_FOUND { "not_found" } else { "error" },
            "message": message,
        });
        if let AppError::Conflict {
            timestamp: Some(ts),
            ..
        } = &self
        {
            body["timestamp"] = json!(ts);
        }

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Upstream(_) | StoreError::Malformed(_) => AppError::Upstream(e.to_string()),
            StoreError::Conflict => AppError::Conflict {
                message: e.to_string(),
                timestamp: None,
            },
            StoreError::Database(_) | StoreError::Io(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<StaffError> for AppError {
    fn from(e: StaffError) -> Self {
        match e {
            StaffError::Validation(m) => AppError::Validation(m),
            StaffError::Conflict(m) => AppError::Conflict {
                message: m,
                timestamp: None,
            },
            StaffError::NotFound(m) => AppError::NotFound(m),
            StaffError::InvalidCredentials => {
                AppError::Unauthorized("Invalid username or password".to_string())
            }
            StaffError::Store(store) => store.into(),
            StaffError::Hashing(m) => AppError::Internal(m),
            e @ StaffError::IdsExhausted(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(m) => AppError::Internal(m),
            other => {
                warn!(reason = %other, "token rejected");
                AppError::Unauthorized("Invalid or expired token".to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}
