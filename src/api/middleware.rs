use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::database::DriverError;
use crate::services::error_classifier::{classify, ErrorClass};
use crate::services::{ExportError, QueryError};
use crate::storage::StoreError;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Target database unreachable or credentials rejected
    #[error("{message}: {error}")]
    DriverConnection { message: String, error: String },

    /// Statement rejected by the target database
    #[error("{message}: {error}")]
    DriverExecution { message: String, error: String },

    #[error("{0}")]
    Unprocessable(String),

    #[error("{message}: {error}")]
    Storage { message: String, error: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps a store failure behind a fixed, operation-specific message
    pub fn storage(message: &str) -> impl FnOnce(StoreError) -> AppError + '_ {
        move |err| {
            tracing::error!("{}: {}", message, err);
            AppError::Storage {
                message: message.to_string(),
                error: err.to_string(),
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DriverConnection { .. }
            | AppError::DriverExecution { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Storage { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Best-effort hint for the UI; absent when no driver message is involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorClass>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
            kind: None,
        }
    }

    pub fn with_driver_error(mut self, error: impl Into<String>) -> Self {
        let error = error.into();
        self.kind = Some(classify(&error));
        self.error = Some(error);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Unprocessable(msg) => {
                ErrorResponse::new(msg)
            }
            AppError::DriverConnection { message, error }
            | AppError::DriverExecution { message, error } => {
                ErrorResponse::new(message).with_driver_error(error)
            }
            // Store internals stay in the log
            AppError::Storage { message, .. } => ErrorResponse::new(message),
            AppError::Internal(msg) => ErrorResponse::new(format!("Internal server error: {}", msg)),
        };

        (status, Json(body)).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::ConnectionNotFound(_) => AppError::NotFound("Connection not found".to_string()),
            QueryError::ConnectionFailed(error) => AppError::DriverConnection {
                message: "Query execution failed".to_string(),
                error,
            },
            QueryError::QueryExecutionFailed(error) => AppError::DriverExecution {
                message: "Query execution failed".to_string(),
                error,
            },
            QueryError::Store(err) => AppError::storage("Failed to execute query")(err),
            QueryError::Aborted(msg) => AppError::Internal(msg),
        }
    }
}

impl From<DriverError> for AppError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Connection(error) => AppError::DriverConnection {
                message: "Connection failed".to_string(),
                error,
            },
            DriverError::Execution(error) => AppError::DriverExecution {
                message: "Query execution failed".to_string(),
                error,
            },
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Unprocessable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_response_format() {
        let error = AppError::NotFound("Connection not found".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "message": "Connection not found" })
        );
    }

    #[tokio::test]
    async fn test_execution_failure_carries_error_and_kind() {
        let error: AppError =
            QueryError::QueryExecutionFailed("Invalid object name 'Platos'.".to_string()).into();
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "message": "Query execution failed",
                "error": "Invalid object name 'Platos'.",
                "kind": "syntax"
            })
        );
    }

    #[tokio::test]
    async fn test_storage_details_are_not_exposed() {
        let error = AppError::storage("Failed to fetch connections")(StoreError::Corrupt(
            "bad timestamp".to_string(),
        ));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "message": "Failed to fetch connections" })
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(QueryError::ConnectionNotFound(7)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(DriverError::Connection("Login failed".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ExportError::NothingToExport).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Validation("Invalid connection ID".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
