use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Generator(msg) => {
                tracing::error!("Generator error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "GENERATOR_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Publish(e) => {
                // Terminal-business failures are the user's to resolve;
                // transient ones will be retried by the sweep.
                let status = match e.kind {
                    PublishErrorKind::Duplicate => StatusCode::CONFLICT,
                    PublishErrorKind::Auth => StatusCode::UNAUTHORIZED,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, "PUBLISH_ERROR", e.user_message())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Classification of a failed publish attempt. Drives the retry decision:
/// only `Network` and `Unknown` are retryable; `Duplicate` and `Auth` need
/// user action and must never be re-attempted automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishErrorKind {
    Duplicate,
    Network,
    Auth,
    Unknown,
}

impl PublishErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublishErrorKind::Network | PublishErrorKind::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishErrorKind::Duplicate => "duplicate",
            PublishErrorKind::Network => "network",
            PublishErrorKind::Auth => "auth",
            PublishErrorKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("publish failed ({}): {message}", kind.as_str())]
pub struct PublishError {
    pub kind: PublishErrorKind,
    pub message: String,
}

impl PublishError {
    pub fn new(kind: PublishErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Actionable copy shown to the user, distinguishing "edit your post"
    /// from "will retry" from "sign in again".
    pub fn user_message(&self) -> String {
        match self.kind {
            PublishErrorKind::Duplicate => {
                "This post looks identical to a recent one. Edit it before publishing again."
                    .to_string()
            }
            PublishErrorKind::Auth => {
                "Your social account session has expired. Please sign in again.".to_string()
            }
            PublishErrorKind::Network => {
                "A network error occurred while publishing. We'll retry shortly.".to_string()
            }
            PublishErrorKind::Unknown => {
                format!("Publishing failed: {}. We'll retry shortly.", self.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_is_not_retryable() {
        assert!(!PublishErrorKind::Duplicate.is_retryable());
    }

    #[test]
    fn test_auth_is_not_retryable() {
        assert!(!PublishErrorKind::Auth.is_retryable());
    }

    #[test]
    fn test_network_and_unknown_are_retryable() {
        assert!(PublishErrorKind::Network.is_retryable());
        assert!(PublishErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let dup = PublishError::new(PublishErrorKind::Duplicate, "x").user_message();
        let net = PublishError::new(PublishErrorKind::Network, "x").user_message();
        let auth = PublishError::new(PublishErrorKind::Auth, "x").user_message();
        assert_ne!(dup, net);
        assert_ne!(net, auth);
        assert!(auth.contains("sign in"));
    }
}
