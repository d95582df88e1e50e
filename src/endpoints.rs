use serde::Serialize;

use crate::types::StreamId;

/// Backend resources for one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamEndpoints {
    pub video_url: String,
    pub meta_url: String,
}

/// Strip every trailing `/` from a base URL.
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Build the video and metadata URLs for a stream id.
pub fn compose(base_url: &str, stream_id: &StreamId) -> StreamEndpoints {
    let base = normalize_base_url(base_url);
    let (source, channel) = (stream_id.source(), stream_id.channel());

    StreamEndpoints {
        video_url: format!("{}/video/{}/{}", base, source, channel),
        meta_url: format!("{}/meta/{}/{}", base, source, channel),
    }
}

/// Discovery endpoint for a base URL.
pub fn streams_url(base_url: &str) -> String {
    format!("{}/streams", normalize_base_url(base_url))
}
