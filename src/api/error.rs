// src/api/error.rs
// Centralized error handling for calls against the Mealz REST API

use reqwest::{Response, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Everything that can go wrong talking to the API.
///
/// Nothing here is retried; callers decide how to show the failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Any non-2xx response, with the raw body text
    #[error("{}: {}", .status.as_u16(), .body)]
    Http { status: StatusCode, body: String },

    /// The chat POST was rejected before any event was produced
    #[error("Chat error: {}", .status.as_u16())]
    StreamOpen { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Build an `Http` error from a failed response, consuming its body
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = read_body(response).await;
        debug!(status = status.as_u16(), body = %body, "API request failed");
        ApiError::Http { status, body }
    }

    /// Build a `StreamOpen` error from a rejected chat POST
    pub async fn stream_rejected(response: Response) -> Self {
        let status = response.status();
        let body = read_body(response).await;
        debug!(status = status.as_u16(), body = %body, "Chat stream rejected");
        ApiError::StreamOpen { status, body }
    }

    /// HTTP status, when the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } | ApiError::StreamOpen { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            ApiError::Decode(_) | ApiError::InvalidUrl(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

async fn read_body(response: Response) -> String {
    response.text().await.unwrap_or_else(|_| "<no body>".into())
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
