use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Why a single backend GET failed. Timeouts and connection errors share
/// the `Transport` kind.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchFailure {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("malformed body: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error)]
pub enum DashboardError {
    #[error("Failed to fetch {url}: {failure}")]
    Discovery { url: String, failure: FetchFailure },

    #[error("Meta unavailable: {failure}")]
    MetadataFetch { url: String, failure: FetchFailure },

    #[error("Stream {0} is not in the catalog")]
    UnknownStream(String),

    #[error("Base URL must not be empty")]
    EmptyBaseUrl,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::Discovery { .. } | DashboardError::MetadataFetch { .. } => {
                StatusCode::BAD_GATEWAY
            }
            DashboardError::UnknownStream(_) | DashboardError::EmptyBaseUrl => {
                StatusCode::BAD_REQUEST
            }
        };

        (
            status,
            Json(json!({ "error": self.to_string(), "url": self.url() })),
        )
            .into_response()
    }
}

impl DashboardError {
    /// Backend URL involved in the failure, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            DashboardError::Discovery { url, .. } | DashboardError::MetadataFetch { url, .. } => {
                Some(url.as_str())
            }
            _ => None,
        }
    }
}
