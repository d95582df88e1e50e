//! In-process stand-in for the surveillance backend, used by the test suites.

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use dashmap::DashMap;
use serde_json::Value;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub enum MetaBehavior {
    Json(Value),
    Status(u16),
    Garbage,
    Delay(Duration, Value),
}

pub struct FakeState {
    pub streams_body: Mutex<String>,
    pub streams_status: AtomicU16,
    pub streams_hits: AtomicUsize,
    pub meta: DashMap<String, MetaBehavior>,
    pub meta_hits: DashMap<String, usize>,
}

impl FakeState {
    pub fn set_streams(&self, streams: &[&str]) {
        let body = serde_json::to_string(streams).unwrap();
        *self.streams_body.lock().unwrap() = body;
    }

    pub fn set_streams_body(&self, body: &str) {
        *self.streams_body.lock().unwrap() = body.to_string();
    }

    pub fn set_meta(&self, key: &str, behavior: MetaBehavior) {
        self.meta.insert(key.to_string(), behavior);
    }

    pub fn meta_hits(&self, key: &str) -> usize {
        self.meta_hits.get(key).map(|hits| *hits).unwrap_or(0)
    }

    pub fn total_meta_hits(&self) -> usize {
        self.meta_hits.iter().map(|entry| *entry.value()).sum()
    }

    pub fn streams_hits(&self) -> usize {
        self.streams_hits.load(Ordering::SeqCst)
    }
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start(streams: &[&str]) -> Self {
        let state = Arc::new(FakeState {
            streams_body: Mutex::new(String::new()),
            streams_status: AtomicU16::new(200),
            streams_hits: AtomicUsize::new(0),
            meta: DashMap::new(),
            meta_hits: DashMap::new(),
        });
        state.set_streams(streams);
        for stream in streams {
            let key = crate::types::StreamId::parse(stream).canonical();
            state.set_meta(&key, MetaBehavior::Json(serde_json::json!({ "stream_id": key })));
        }

        let app = Router::new()
            .route("/streams", get(list_streams))
            .route("/meta/:source/:channel", get(get_meta))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A base URL nothing is listening on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn list_streams(State(state): State<Arc<FakeState>>) -> Response {
    state.streams_hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(state.streams_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = state.streams_body.lock().unwrap().clone();
    (status, body).into_response()
}

async fn get_meta(
    Path((source, channel)): Path<(String, String)>,
    State(state): State<Arc<FakeState>>,
) -> Response {
    let key = format!("{}/{}", source, channel);
    *state.meta_hits.entry(key.clone()).or_insert(0) += 1;

    let behavior = state.meta.get(&key).map(|entry| entry.value().clone());
    match behavior {
        Some(MetaBehavior::Json(value)) => axum::Json(value).into_response(),
        Some(MetaBehavior::Status(code)) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Some(MetaBehavior::Garbage) => "{not json".into_response(),
        Some(MetaBehavior::Delay(delay, value)) => {
            tokio::time::sleep(delay).await;
            axum::Json(value).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
