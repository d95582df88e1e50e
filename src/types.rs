use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Channel used when a stream id carries no `/`.
pub const DEFAULT_CHANNEL: &str = "main";

/// Identifies one source + channel pair exposed by the backend.
///
/// The raw text is kept for display; equality and hashing only look at the
/// normalized `(source, channel)` pair, so `"cam1"` and `"cam1/main"` are
/// the same stream.
#[derive(Debug, Clone)]
pub struct StreamId {
    raw: String,
    source: String,
    channel: String,
}

impl StreamId {
    /// Split at the first `/`. Never fails: an empty string becomes
    /// source `""` on the default channel.
    pub fn parse(raw: &str) -> Self {
        let (source, channel) = match raw.split_once('/') {
            Some((source, channel)) => (source, channel),
            None => (raw, DEFAULT_CHANNEL),
        };

        Self {
            raw: raw.to_string(),
            source: source.to_string(),
            channel: channel.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Text as the backend reported it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `"<source>/<channel>"` with the default channel filled in.
    #[cfg(test)]
    pub fn canonical(&self) -> String {
        format!("{}/{}", self.source, self.channel)
    }
}

impl PartialEq for StreamId {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.channel == other.channel
    }
}

impl Eq for StreamId {}

impl Hash for StreamId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.channel.hash(state);
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for StreamId {
    fn from(raw: &str) -> Self {
        StreamId::parse(raw)
    }
}

impl Serialize for StreamId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for StreamId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StreamId::parse(&raw))
    }
}

/// Streams exposed by the backend, in backend order. Not deduplicated.
pub type StreamCatalog = Vec<StreamId>;

/// User-chosen streams; order is grid order.
pub type Selection = Vec<StreamId>;

/// Last-known-good metadata for one stream.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRecord {
    pub stream_id: StreamId,
    pub payload: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of the latest metadata fetch for one stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    Ok { at: DateTime<Utc> },
    Failed { at: DateTime<Utc>, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bare_source_defaults_to_main_channel() {
        let id = StreamId::parse("cam1");
        assert_eq!(id.source(), "cam1");
        assert_eq!(id.channel(), "main");
        assert_eq!(id.as_str(), "cam1");
        assert_eq!(id.canonical(), "cam1/main");
    }

    #[test]
    fn test_split_uses_first_slash() {
        let id = StreamId::parse("file0_0/ui/extra");
        assert_eq!(id.source(), "file0_0");
        assert_eq!(id.channel(), "ui/extra");
    }

    #[test]
    fn test_empty_id_is_total() {
        let id = StreamId::parse("");
        assert_eq!(id.source(), "");
        assert_eq!(id.channel(), "main");
    }

    #[test]
    fn test_equality_uses_normalized_pair() {
        assert_eq!(StreamId::parse("cam1"), StreamId::parse("cam1/main"));
        assert_ne!(StreamId::parse("cam1"), StreamId::parse("cam1/inf"));

        let set: HashSet<StreamId> = ["cam1", "cam1/main", "cam2"]
            .into_iter()
            .map(StreamId::parse)
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serde_keeps_raw_text() {
        let ids: Vec<StreamId> = serde_json::from_str(r#"["cam0/ui","cam1"]"#).unwrap();
        assert_eq!(ids[1].channel(), "main");
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"["cam0/ui","cam1"]"#);
    }
}
