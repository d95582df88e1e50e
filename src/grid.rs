use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::{MetadataCache, StatusBoard};
use crate::config::RefreshConfig;
use crate::endpoints::{compose, StreamEndpoints};
use crate::types::{FetchStatus, StreamId};

pub const NO_METADATA: &str = "No metadata yet";

/// Split `items` row-major into rows of `columns`; the last row may be short.
pub fn partition_rows<T: Clone>(items: &[T], columns: usize) -> Vec<Vec<T>> {
    items
        .chunks(columns.max(1))
        .map(|row| row.to_vec())
        .collect()
}

/// `"2.0s ago"`, or `"unknown"` when the stream never produced metadata.
pub fn describe_age(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match last {
        Some(at) => {
            let secs = (now - at).num_milliseconds().max(0) as f64 / 1000.0;
            format!("{:.1}s ago", secs)
        }
        None => "unknown".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelStatus {
    Waiting,
    Fresh {
        updated_at: DateTime<Utc>,
    },
    Stale {
        message: String,
        failed_at: DateTime<Utc>,
        last_update: Option<DateTime<Utc>>,
    },
}

impl PanelStatus {
    pub fn caption(&self, now: DateTime<Utc>) -> String {
        match self {
            PanelStatus::Waiting => "Waiting for metadata".to_string(),
            PanelStatus::Fresh { updated_at } => {
                format!("Updated {}", updated_at.format("%H:%M:%S"))
            }
            PanelStatus::Stale {
                message,
                last_update,
                ..
            } => format!("{} (last update {})", message, describe_age(*last_update, now)),
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, PanelStatus::Stale { .. })
    }
}

/// Metadata block under one video tile. This is the only part of the page
/// that changes on a refresh tick.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataPanel {
    pub stream_id: StreamId,
    pub payload: Option<Value>,
    /// Pretty-printed payload, or the placeholder.
    pub body: String,
    pub status: PanelStatus,
    pub caption: String,
}

impl MetadataPanel {
    pub fn build(
        stream_id: &StreamId,
        cache: &MetadataCache,
        statuses: &StatusBoard,
        now: DateTime<Utc>,
    ) -> Self {
        let record = cache.get(stream_id);
        let last_update = record.as_ref().map(|record| record.fetched_at);

        let status = match (statuses.get(stream_id), last_update) {
            (Some(FetchStatus::Failed { at, message }), _) => PanelStatus::Stale {
                message,
                failed_at: at,
                last_update,
            },
            (Some(FetchStatus::Ok { at }), _) => PanelStatus::Fresh { updated_at: at },
            (None, Some(updated_at)) => PanelStatus::Fresh { updated_at },
            (None, None) => PanelStatus::Waiting,
        };

        let payload = record.map(|record| record.payload);
        let body = match &payload {
            Some(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            None => NO_METADATA.to_string(),
        };

        Self {
            stream_id: stream_id.clone(),
            caption: status.caption(now),
            payload,
            body,
            status,
        }
    }
}

/// One cell of the grid.
#[derive(Debug, Clone, Serialize)]
pub struct StreamTile {
    pub slot: usize,
    pub row: usize,
    pub column: usize,
    pub stream_id: StreamId,
    pub endpoints: StreamEndpoints,
    pub metadata: Option<MetadataPanel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridView {
    /// Bumped whenever the arrangement of tiles changes; a page that sees a
    /// new version rebuilds, otherwise it only swaps panel contents.
    pub layout_version: u64,
    pub columns: usize,
    pub show_meta: bool,
    pub show_links: bool,
    pub rows: Vec<Vec<StreamTile>>,
}

impl GridView {
    pub fn build(
        base_url: &str,
        selection: &[StreamId],
        config: &RefreshConfig,
        cache: &MetadataCache,
        statuses: &StatusBoard,
        layout_version: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let columns = config.columns.max(1);
        let rows = partition_rows(selection, columns)
            .into_iter()
            .enumerate()
            .map(|(row, ids)| {
                ids.into_iter()
                    .enumerate()
                    .map(|(column, stream_id)| StreamTile {
                        slot: row * columns + column,
                        row,
                        column,
                        endpoints: compose(base_url, &stream_id),
                        metadata: config
                            .show_meta
                            .then(|| MetadataPanel::build(&stream_id, cache, statuses, now)),
                        stream_id,
                    })
                    .collect()
            })
            .collect();

        Self {
            layout_version,
            columns,
            show_meta: config.show_meta,
            show_links: config.show_links,
            rows,
        }
    }

    #[cfg(test)]
    pub fn tiles(&self) -> impl Iterator<Item = &StreamTile> {
        self.rows.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn ids(raw: &[&str]) -> Vec<StreamId> {
        raw.iter().map(|id| StreamId::parse(id)).collect()
    }

    #[test]
    fn test_three_streams_two_columns() {
        let rows = partition_rows(&["s1", "s2", "s3"], 2);
        assert_eq!(rows, vec![vec!["s1", "s2"], vec!["s3"]]);
    }

    #[test]
    fn test_row_count_and_order() {
        let items: Vec<usize> = (0..10).collect();
        for columns in 1..=4 {
            let rows = partition_rows(&items, columns);
            assert_eq!(rows.len(), (items.len() + columns - 1) / columns);

            let flattened: Vec<usize> = rows.into_iter().flatten().collect();
            assert_eq!(flattened, items);
        }
    }

    #[test]
    fn test_zero_columns_treated_as_one() {
        assert_eq!(partition_rows(&[1, 2], 0), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_describe_age() {
        assert_eq!(describe_age(Some(at(8)), at(10)), "2.0s ago");
        assert_eq!(describe_age(None, at(10)), "unknown");
    }

    #[test]
    fn test_timeout_after_success_shows_age_and_payload() {
        let cache = MetadataCache::new();
        let statuses = StatusBoard::new();
        let id = StreamId::parse("s1");

        cache.put(&id, json!({ "frame_id": 3 }), at(8));
        statuses.record_if(&id, FetchStatus::Ok { at: at(8) }, || true);
        statuses.record_if(
            &id,
            FetchStatus::Failed {
                at: at(10),
                message: "Meta unavailable: request failed: timed out after 0.7s".to_string(),
            },
            || true,
        );

        let panel = MetadataPanel::build(&id, &cache, &statuses, at(10));
        assert_eq!(panel.payload, Some(json!({ "frame_id": 3 })));
        assert!(panel.status.is_stale());
        assert!(panel.caption.ends_with("(last update 2.0s ago)"));
    }

    #[test]
    fn test_failure_without_history_reports_unknown_age() {
        let cache = MetadataCache::new();
        let statuses = StatusBoard::new();
        let id = StreamId::parse("s1");
        statuses.record_if(
            &id,
            FetchStatus::Failed {
                at: at(1),
                message: "Meta unavailable: HTTP 404".to_string(),
            },
            || true,
        );

        let panel = MetadataPanel::build(&id, &cache, &statuses, at(1));
        assert_eq!(panel.body, NO_METADATA);
        assert_eq!(panel.caption, "Meta unavailable: HTTP 404 (last update unknown)");
    }

    #[test]
    fn test_waiting_and_fresh_captions() {
        let cache = MetadataCache::new();
        let statuses = StatusBoard::new();
        let id = StreamId::parse("s1");

        let panel = MetadataPanel::build(&id, &cache, &statuses, at(0));
        assert_eq!(panel.status, PanelStatus::Waiting);
        assert_eq!(panel.body, NO_METADATA);

        cache.put(&id, json!({}), at(0));
        let panel = MetadataPanel::build(&id, &cache, &statuses, at(1));
        assert_eq!(panel.status, PanelStatus::Fresh { updated_at: at(0) });
        assert!(panel.caption.starts_with("Updated "));
    }

    #[test]
    fn test_grid_slots_follow_selection_order() {
        let cache = MetadataCache::new();
        let statuses = StatusBoard::new();
        let config = RefreshConfig {
            columns: 2,
            ..Default::default()
        };

        let grid = GridView::build(
            "http://x/",
            &ids(&["s1", "s2", "s3"]),
            &config,
            &cache,
            &statuses,
            1,
            at(0),
        );

        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1].len(), 1);
        let placed: Vec<(usize, usize, &str)> = grid
            .tiles()
            .map(|tile| (tile.row, tile.column, tile.stream_id.as_str()))
            .collect();
        assert_eq!(placed, vec![(0, 0, "s1"), (0, 1, "s2"), (1, 0, "s3")]);
        assert_eq!(grid.rows[1][0].slot, 2);
        assert_eq!(grid.rows[0][0].endpoints.video_url, "http://x/video/s1/main");
    }

    #[test]
    fn test_hidden_metadata_has_no_panels() {
        let config = RefreshConfig {
            show_meta: false,
            ..Default::default()
        };
        let grid = GridView::build(
            "http://x",
            &ids(&["s1"]),
            &config,
            &MetadataCache::new(),
            &StatusBoard::new(),
            1,
            at(0),
        );
        assert!(grid.tiles().all(|tile| tile.metadata.is_none()));
    }
}
