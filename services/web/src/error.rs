//! Error types for the web service
//!
//! Every failure is caught at the operation boundary and turned into a
//! user-visible JSON message; nothing here is retried and nothing is
//! allowed to crash a handler.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::identity::IdentityError;

/// Error type for the web service
#[derive(Error, Debug)]
pub enum AppError {
    /// No resolvable identity for an operation that requires one
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A day-scoped delete removed fewer rows than were targeted
    #[error("Deleted {deleted} of {requested} records")]
    PartialDelete { requested: usize, deleted: usize },

    /// Required external-service credentials are absent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Identity provider call failed
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Backing store rejected an operation
    #[error(transparent)]
    Store(#[from] common::error::DatabaseError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Unauthorized" }),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::PartialDelete { requested, deleted } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Some records were not deleted. Check the store's delete policy.",
                    "requested": requested,
                    "deleted": deleted,
                }),
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
            AppError::Identity(err) => match err {
                IdentityError::Rejected { message, .. } => {
                    (StatusCode::UNAUTHORIZED, json!({ "error": message }))
                }
                IdentityError::Config(msg) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
                }
                IdentityError::Transport(_) => (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "Identity provider unreachable" }),
                ),
            },
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Database error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for handler results
pub type AppResult<T> = Result<T, AppError>;
