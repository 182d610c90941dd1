use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::CatalogError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            CatalogError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message),
            CatalogError::InvalidCredentials => json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", message),
            CatalogError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "unauthorized", message),
            CatalogError::InsufficientStock { .. } => json_error(StatusCode::CONFLICT, "insufficient_stock", message),
            CatalogError::InvalidTransition { .. } => json_error(StatusCode::CONFLICT, "invalid_transition", message),
            CatalogError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
            CatalogError::Store(e) => {
                tracing::error!(error = %e, "store failure");
                json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", message)
            }
            CatalogError::Internal(detail) => {
                tracing::error!(error = %detail, "internal failure");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
            }
        }
    }
}

impl From<JsonRejection> for CatalogError {
    fn from(rejection: JsonRejection) -> Self {
        CatalogError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for CatalogError {
    fn from(rejection: PathRejection) -> Self {
        CatalogError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for CatalogError {
    fn from(rejection: QueryRejection) -> Self {
        CatalogError::Validation(rejection.body_text())
    }
}
