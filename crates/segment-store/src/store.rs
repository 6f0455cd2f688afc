use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::segment::{Segment, SegmentMeta};

/// Fixed name of the playlist artifact.
pub const PLAYLIST_FILENAME: &str = "playlist.m3u8";

/// Content type of the playlist artifact.
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Byte-addressable segment persistence keyed by sequential id.
///
/// Writes come from a single recorder for one session at a time;
/// readers (status, listings, viewers) may run concurrently and must
/// never observe a partially written segment - bytes and metadata for
/// one id become visible atomically together.
#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// Store a segment by id. Overwrites an existing segment with the
    /// same id, so duplicate-write retries are idempotent. A successful
    /// put updates the most-recent-write timestamp.
    async fn put(&self, segment: Segment) -> Result<(), StoreError>;

    /// Fetch one segment, payload included.
    async fn get(&self, id: u32) -> Result<Segment, StoreError>;

    /// Metadata for all stored segments, ordered by id ascending.
    async fn list(&self) -> Result<Vec<SegmentMeta>, StoreError>;

    /// Overwrite the playlist artifact.
    async fn put_playlist(&self, content: &str) -> Result<(), StoreError>;

    /// Read the playlist artifact.
    async fn get_playlist(&self) -> Result<String, StoreError>;

    /// Timestamp of the most recent successful `put`, if any.
    async fn last_write_at(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Remove all segments and the playlist. Called when a new session
    /// begins so stale ids from a previous session cannot leak into the
    /// new manifest.
    async fn clear(&self) -> Result<(), StoreError>;
}
