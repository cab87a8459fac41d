use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use thiserror::Error;

use crate::forms::FormErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FormErrors),

    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    /// Bad credentials. Surfaced as a notice, never a fault.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Protected route reached without a session.
    #[error("login required")]
    LoginRequired,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::Internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "errors": errors })),
            )
                .into_response(),
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, "Not found".to_string()).into_response()
            }
            AppError::Forbidden => {
                (StatusCode::FORBIDDEN, "Forbidden".to_string()).into_response()
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "notice": "Invalid credentials. Try again." })),
            )
                .into_response(),
            AppError::LoginRequired => Redirect::to("/login").into_response(),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }
}
