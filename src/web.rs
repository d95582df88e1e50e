use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::{RefreshConfig, RefreshConfigPatch};
use crate::dashboard::{Dashboard, DashboardSnapshot, PanelsSnapshot};
use crate::error::DashboardError;
use crate::types::StreamCatalog;

mod page;

#[derive(Debug, Deserialize)]
pub struct BaseUrlRequest {
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub streams: Vec<String>,
}

/// Dashboard page, panel poll and control endpoints.
pub fn create_web_router(dashboard: Arc<Dashboard>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/static/style.css", get(serve_css))
        .route("/api/view", get(view_handler))
        .route("/api/panels", get(panels_handler))
        .route("/api/streams", get(streams_handler))
        .route("/api/config", post(config_handler))
        .route("/api/base-url", post(base_url_handler))
        .route("/api/selection", post(selection_handler))
        .route("/api/rescan", post(rescan_handler))
        .layer(CorsLayer::permissive())
        .with_state(dashboard)
}

pub async fn start_web_server(port: u16, dashboard: Arc<Dashboard>) -> Result<()> {
    let app = create_web_router(dashboard);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 Dashboard listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler(State(dashboard): State<Arc<Dashboard>>) -> impl IntoResponse {
    let snapshot = dashboard.snapshot(Utc::now()).await;
    Html(page::render_page(&snapshot))
}

async fn serve_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], page::STYLE_CSS)
}

async fn view_handler(State(dashboard): State<Arc<Dashboard>>) -> Json<DashboardSnapshot> {
    Json(dashboard.snapshot(Utc::now()).await)
}

async fn panels_handler(State(dashboard): State<Arc<Dashboard>>) -> Json<PanelsSnapshot> {
    Json(dashboard.panels(Utc::now()).await)
}

async fn streams_handler(State(dashboard): State<Arc<Dashboard>>) -> Json<StreamCatalog> {
    Json(dashboard.catalog().await.unwrap_or_default())
}

async fn config_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Json(patch): Json<RefreshConfigPatch>,
) -> Json<RefreshConfig> {
    Json(dashboard.update_config(&patch).await)
}

async fn base_url_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Json(request): Json<BaseUrlRequest>,
) -> Result<Json<DashboardSnapshot>, DashboardError> {
    dashboard.set_base_url(&request.base_url).await?;
    Ok(Json(dashboard.snapshot(Utc::now()).await))
}

async fn selection_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<DashboardSnapshot>, DashboardError> {
    dashboard.select(&request.streams).await?;
    Ok(Json(dashboard.snapshot(Utc::now()).await))
}

async fn rescan_handler(
    State(dashboard): State<Arc<Dashboard>>,
) -> Result<Json<DashboardSnapshot>, DashboardError> {
    dashboard.rescan().await?;
    Ok(Json(dashboard.snapshot(Utc::now()).await))
}
