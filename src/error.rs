use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

/// ApiError
///
/// The error type returned by every handler. Each variant maps to one HTTP status and
/// renders as `{ "error": "<message>" }`, the shape the frontend forms already display.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Field-level validation failure. Only the first message is shown to the user.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Internal details are logged, never returned to the client.
    #[error("Something went wrong!")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "internal error");
        }
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl ApiError {
    /// conflict_on_unique
    ///
    /// A unique-constraint violation becomes `Conflict(message)`; every other
    /// database error stays internal. Covers writes racing past an earlier lookup.
    pub fn conflict_on_unique(e: sqlx::Error, message: &str) -> Self {
        let unique = e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            ApiError::Conflict(message.to_string())
        } else {
            e.into()
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(format!("database error: {e}"))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let message = first_message(&errors).unwrap_or_else(|| "Invalid fields!".to_string());
        ApiError::Validation(message)
    }
}

/// Picks a deterministic "first" message: struct-level errors, then fields in name order.
fn first_message(errors: &ValidationErrors) -> Option<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| {
        let a_schema = &*a.0 == "__all__";
        let b_schema = &*b.0 == "__all__";
        b_schema.cmp(&a_schema).then_with(|| a.0.cmp(&b.0))
    });
    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
}

pub type ApiResult<T> = Result<T, ApiError>;
