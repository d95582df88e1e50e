use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::endpoints::{streams_url, StreamEndpoints};
use crate::error::{DashboardError, FetchFailure};
use crate::types::{StreamCatalog, StreamId};

/// Thin wrapper over `reqwest::Client` for the three backend endpoints.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone, Default)]
pub struct BackendClient {
    http: Client,
}

impl BackendClient {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    /// `GET {base}/streams`, expecting a JSON array of strings.
    pub async fn list_streams(
        &self,
        base_url: &str,
        timeout: Duration,
    ) -> Result<StreamCatalog, DashboardError> {
        let url = streams_url(base_url);
        debug!("🔎 Discovering streams at {}", url);

        let raw: Vec<String> = self
            .get_json(&url, timeout)
            .await
            .map_err(|failure| DashboardError::Discovery {
                url: url.clone(),
                failure,
            })?;

        debug!("🔎 Backend reported {} stream(s)", raw.len());
        Ok(raw.iter().map(|id| StreamId::parse(id)).collect())
    }

    /// `GET {meta_url}`; any well-formed JSON body is accepted.
    pub async fn get_metadata(
        &self,
        meta_url: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, DashboardError> {
        self.get_json(meta_url, timeout)
            .await
            .map_err(|failure| DashboardError::MetadataFetch {
                url: meta_url.to_string(),
                failure,
            })
    }

    /// The video is an always-live MJPEG resource; it is handed to the
    /// viewer by reference and never fetched here.
    pub fn video_url(endpoints: &StreamEndpoints) -> &str {
        &endpoints.video_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, FetchFailure> {
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_failure(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("⚠️ {} answered HTTP {}", url, status);
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_failure(url, timeout, e))?;

        serde_json::from_slice(&body).map_err(|e| FetchFailure::Malformed(e.to_string()))
    }
}

fn transport_failure(url: &str, timeout: Duration, error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        debug!("⏱️ {} timed out after {:?}", url, timeout);
        FetchFailure::Transport(format!("timed out after {:.1}s", timeout.as_secs_f64()))
    } else {
        debug!("🔌 {} unreachable: {}", url, error);
        FetchFailure::Transport(error.to_string())
    }
}
