use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("invalid audit configuration: {0}")]
    Configuration(String),

    #[error("{subject_type} {subject_id} not found")]
    NotFound {
        subject_type: String,
        subject_id: String,
    },

    #[error("invalid audit entry: {0}")]
    Validation(String),

    #[error("invalid stored audit record: {0}")]
    InvalidRecord(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl AuditError {
    pub fn not_found(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        AuditError::NotFound {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
        }
    }
}

impl IntoResponse for AuditError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match &self {
            AuditError::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string(), "NOT_FOUND"),
            AuditError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), "VALIDATION_ERROR")
            }
            err => {
                tracing::error!("Audit error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR",
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
