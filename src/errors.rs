use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::{BookingStatus, InvalidSlot, Role};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid slot: {0}")]
    InvalidSlot(#[from] InvalidSlot),

    #[error("{0}")]
    Validation(String),

    #[error("this slot is already booked, please choose another date or time of day")]
    Conflict,

    #[error("a {actor} cannot move a booking from {from} to {to}")]
    IllegalTransition {
        from: BookingStatus,
        to: BookingStatus,
        actor: Role,
    },

    #[error("this booking has already been rated")]
    AlreadyRated,

    #[error("not eligible to rate: {0}")]
    NotEligible(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::InvalidSlot(_) => "invalid_slot",
            AppError::Validation(_) => "validation",
            AppError::Conflict => "conflict",
            AppError::IllegalTransition { .. } => "illegal_transition",
            AppError::AlreadyRated => "already_rated",
            AppError::NotEligible(_) => "not_eligible",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidSlot(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::IllegalTransition { .. } => StatusCode::CONFLICT,
            AppError::AlreadyRated => StatusCode::CONFLICT,
            AppError::NotEligible(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for AppError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        AppError::Internal("database lock poisoned".to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if matches!(self, AppError::Conflict) {
            body["conflict"] = serde_json::Value::Bool(true);
        }

        (status, axum::Json(body)).into_response()
    }
}
