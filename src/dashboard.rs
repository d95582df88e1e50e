use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{MetadataCache, StatusBoard};
use crate::client::BackendClient;
use crate::config::{AppConfig, RefreshConfig, RefreshConfigPatch};
use crate::endpoints::{compose, normalize_base_url};
use crate::error::DashboardError;
use crate::grid::{GridView, MetadataPanel};
use crate::refresh::{PlanUpdate, RefreshLoop, RefreshTarget};
use crate::types::{Selection, StreamCatalog, StreamId};

#[derive(Debug, Clone)]
enum CatalogState {
    Pending,
    Loaded(StreamCatalog),
    Failed(String),
}

#[derive(Debug)]
struct DashboardState {
    base_url: String,
    config: RefreshConfig,
    catalog: CatalogState,
    selection: Selection,
    layout_version: u64,
}

/// What the page should show right now.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardView {
    Loading,
    DiscoveryFailed { message: String },
    EmptyCatalog,
    EmptySelection,
    Grid(GridView),
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub base_url: String,
    pub config: RefreshConfig,
    pub catalog: StreamCatalog,
    pub selection: Selection,
    pub layout_version: u64,
    pub view: DashboardView,
}

/// Payload for the in-place panel refresh.
#[derive(Debug, Clone, Serialize)]
pub struct PanelsSnapshot {
    pub layout_version: u64,
    pub interval_ms: u64,
    pub running: bool,
    pub panels: Vec<MetadataPanel>,
}

/// Top-level owner of the session: base URL, catalog, selection, refresh
/// settings, the metadata cache and the refresh loop.
///
/// The catalog is only fetched on mount, on a base URL change, and on an
/// explicit rescan. Polling is left entirely to the refresh loop.
pub struct Dashboard {
    client: BackendClient,
    cache: Arc<MetadataCache>,
    statuses: Arc<StatusBoard>,
    refresh: RefreshLoop,
    default_selection: usize,
    state: RwLock<DashboardState>,
}

impl Dashboard {
    pub fn new(config: &AppConfig) -> Self {
        let client = BackendClient::new();
        let cache = Arc::new(MetadataCache::new());
        let statuses = Arc::new(StatusBoard::new());
        let refresh = RefreshLoop::spawn(client.clone(), cache.clone(), statuses.clone());

        Self {
            client,
            cache,
            statuses,
            refresh,
            default_selection: config.default_selection,
            state: RwLock::new(DashboardState {
                base_url: normalize_base_url(&config.base_url).to_string(),
                config: config.refresh.clone().clamped(),
                catalog: CatalogState::Pending,
                selection: Vec::new(),
                layout_version: 0,
            }),
        }
    }

    /// Initial discovery for the configured backend.
    pub async fn mount(&self) -> Result<(), DashboardError> {
        self.discover(false).await
    }

    /// Re-read the catalog, keeping whichever selected streams still exist.
    pub async fn rescan(&self) -> Result<(), DashboardError> {
        self.discover(true).await
    }

    /// Switch backends. Everything learned from the old one is dropped.
    pub async fn set_base_url(&self, base_url: &str) -> Result<(), DashboardError> {
        let base_url = normalize_base_url(base_url.trim());
        if base_url.is_empty() {
            return Err(DashboardError::EmptyBaseUrl);
        }

        {
            let mut state = self.state.write().await;
            info!("🔀 Switching backend {} -> {}", state.base_url, base_url);
            state.base_url = base_url.to_string();
            state.catalog = CatalogState::Pending;
            state.selection.clear();
            state.layout_version += 1;

            // Bump the generation first so no in-flight fetch can refill
            // the cleared maps.
            self.sync_plan(&state, true);
            self.cache.reset();
            self.statuses.reset();
        }

        self.discover(false).await
    }

    pub async fn select<S: AsRef<str>>(&self, streams: &[S]) -> Result<(), DashboardError> {
        let mut state = self.state.write().await;

        let catalog = match &state.catalog {
            CatalogState::Loaded(catalog) => catalog,
            _ => {
                let first = streams.first().map(|s| s.as_ref()).unwrap_or_default();
                return Err(DashboardError::UnknownStream(first.to_string()));
            }
        };

        let mut selection: Selection = Vec::with_capacity(streams.len());
        for raw in streams {
            let stream_id = StreamId::parse(raw.as_ref());
            if !catalog.contains(&stream_id) {
                return Err(DashboardError::UnknownStream(raw.as_ref().to_string()));
            }
            if !selection.contains(&stream_id) {
                selection.push(stream_id);
            }
        }

        info!("🎯 Selection set to {} stream(s)", selection.len());
        state.selection = selection;
        state.layout_version += 1;
        self.sync_plan(&state, false);
        Ok(())
    }

    pub async fn update_config(&self, patch: &RefreshConfigPatch) -> RefreshConfig {
        let mut state = self.state.write().await;
        let next = state.config.apply(patch);

        if next.columns != state.config.columns
            || next.show_meta != state.config.show_meta
            || next.show_links != state.config.show_links
        {
            state.layout_version += 1;
        }

        info!("⚙️ Refresh config: {:?}", next);
        state.config = next.clone();
        self.sync_plan(&state, false);
        next
    }

    pub async fn snapshot(&self, now: DateTime<Utc>) -> DashboardSnapshot {
        let state = self.state.read().await;

        let view = match &state.catalog {
            CatalogState::Pending => DashboardView::Loading,
            CatalogState::Failed(message) => DashboardView::DiscoveryFailed {
                message: message.clone(),
            },
            CatalogState::Loaded(catalog) if catalog.is_empty() => DashboardView::EmptyCatalog,
            CatalogState::Loaded(_) if state.selection.is_empty() => DashboardView::EmptySelection,
            CatalogState::Loaded(_) => DashboardView::Grid(GridView::build(
                &state.base_url,
                &state.selection,
                &state.config,
                &self.cache,
                &self.statuses,
                state.layout_version,
                now,
            )),
        };

        DashboardSnapshot {
            base_url: state.base_url.clone(),
            config: state.config.clone(),
            catalog: match &state.catalog {
                CatalogState::Loaded(catalog) => catalog.clone(),
                _ => Vec::new(),
            },
            selection: state.selection.clone(),
            layout_version: state.layout_version,
            view,
        }
    }

    pub async fn panels(&self, now: DateTime<Utc>) -> PanelsSnapshot {
        let state = self.state.read().await;

        let panels = if state.config.show_meta && matches!(state.catalog, CatalogState::Loaded(_)) {
            state
                .selection
                .iter()
                .map(|stream_id| MetadataPanel::build(stream_id, &self.cache, &self.statuses, now))
                .collect()
        } else {
            Vec::new()
        };

        PanelsSnapshot {
            layout_version: state.layout_version,
            interval_ms: state.config.interval_ms,
            running: state.config.running,
            panels,
        }
    }

    pub async fn catalog(&self) -> Option<StreamCatalog> {
        match &self.state.read().await.catalog {
            CatalogState::Loaded(catalog) => Some(catalog.clone()),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    async fn discover(&self, keep_selection: bool) -> Result<(), DashboardError> {
        let (base_url, timeout) = {
            let state = self.state.read().await;
            (state.base_url.clone(), state.config.timeout())
        };

        let result = self.client.list_streams(&base_url, timeout).await;

        let mut state = self.state.write().await;
        if state.base_url != base_url {
            info!("Ignoring catalog from {}, backend changed meanwhile", base_url);
            return Ok(());
        }

        let outcome = match result {
            Ok(catalog) => {
                info!("📋 {} stream(s) available at {}", catalog.len(), base_url);
                let selection = if keep_selection {
                    state
                        .selection
                        .iter()
                        .filter(|id| catalog.contains(id))
                        .cloned()
                        .collect()
                } else {
                    catalog
                        .iter()
                        .take(self.default_selection)
                        .cloned()
                        .collect()
                };
                state.selection = selection;
                state.catalog = CatalogState::Loaded(catalog);
                Ok(())
            }
            Err(e) if keep_selection && matches!(state.catalog, CatalogState::Loaded(_)) => {
                // The grid stays up on the last good catalog.
                warn!("❌ Rescan failed, keeping current catalog: {}", e);
                return Err(e);
            }
            Err(e) => {
                warn!("❌ {}", e);
                state.catalog = CatalogState::Failed(e.to_string());
                Err(e)
            }
        };

        state.layout_version += 1;
        self.sync_plan(&state, false);
        outcome
    }

    /// Push the current session into the refresh loop. No catalog or no
    /// selection means nothing to poll.
    fn sync_plan(&self, state: &DashboardState, invalidate: bool) {
        let targets: Vec<RefreshTarget> = match &state.catalog {
            CatalogState::Loaded(_) => state
                .selection
                .iter()
                .map(|stream_id| RefreshTarget {
                    meta_url: compose(&state.base_url, stream_id).meta_url,
                    stream_id: stream_id.clone(),
                })
                .collect(),
            _ => Vec::new(),
        };

        self.refresh.apply(PlanUpdate {
            running: state.config.running,
            interval: state.config.interval(),
            timeout: state.config.timeout(),
            targets,
            invalidate,
        });
    }
}
