use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::types::{FetchStatus, MetadataRecord, StreamId};

/// Last-known-good metadata per stream.
///
/// Each key is written only by the fetch task of its own stream, so the
/// sharded map is all the coordination needed. A failed fetch never
/// touches the cache; the previous record stays visible.
#[derive(Debug, Default)]
pub struct MetadataCache {
    records: DashMap<StreamId, MetadataRecord>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stream_id: &StreamId) -> Option<MetadataRecord> {
        self.records.get(stream_id).map(|entry| entry.value().clone())
    }

    #[cfg(test)]
    pub fn put(&self, stream_id: &StreamId, payload: serde_json::Value, fetched_at: DateTime<Utc>) {
        self.put_if(stream_id, payload, fetched_at, || true);
    }

    /// Store a record only if `is_current` still holds once the key is
    /// locked. A concurrent `reset` either waits for this write and clears
    /// it, or runs first and makes `is_current` fail.
    pub fn put_if(
        &self,
        stream_id: &StreamId,
        payload: serde_json::Value,
        fetched_at: DateTime<Utc>,
        is_current: impl FnOnce() -> bool,
    ) -> bool {
        let entry = self.records.entry(stream_id.clone());
        if !is_current() {
            return false;
        }
        entry.insert(MetadataRecord {
            stream_id: stream_id.clone(),
            payload,
            fetched_at,
        });
        true
    }

    /// Drop every record. Used when the dashboard switches backends.
    pub fn reset(&self) {
        self.records.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Latest fetch outcome per stream, kept beside the cache for status captions.
#[derive(Debug, Default)]
pub struct StatusBoard {
    statuses: DashMap<StreamId, FetchStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stream_id: &StreamId) -> Option<FetchStatus> {
        self.statuses.get(stream_id).map(|entry| entry.value().clone())
    }

    /// Same locking rule as [`MetadataCache::put_if`].
    pub fn record_if(
        &self,
        stream_id: &StreamId,
        status: FetchStatus,
        is_current: impl FnOnce() -> bool,
    ) -> bool {
        let entry = self.statuses.entry(stream_id.clone());
        if !is_current() {
            return false;
        }
        entry.insert(status);
        true
    }

    pub fn reset(&self) {
        self.statuses.clear();
    }
}
