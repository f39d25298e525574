use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("Invalid reward {0}: must be 0 or 1")]
    InvalidReward(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No content available for genre '{0}'")]
    NoContentAvailable(String),

    #[error("Content fetch failed: {0}")]
    ContentFetchFailed(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => AppError::StoreUnavailable(err.to_string()),
            other => AppError::Database(other),
        }
    }
}

impl AppError {
    /// Stable machine-readable error kind, returned alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnknownPolicy(_) => "unknown_policy",
            AppError::InvalidReward(_) => "invalid_reward",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::NoContentAvailable(_) => "no_content_available",
            AppError::ContentFetchFailed(_) => "content_fetch_failed",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Database(_) => "database",
            AppError::Cache(_) => "cache",
            AppError::HttpClient(_) => "http_client",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownPolicy(_) | AppError::InvalidReward(_) | AppError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) | AppError::NoContentAvailable(_) => StatusCode::NOT_FOUND,
            AppError::ContentFetchFailed(_) | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
