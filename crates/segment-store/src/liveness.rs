//! Liveness derived from segment arrival recency.
//!
//! There is no heartbeat protocol: a stream counts as live while its
//! newest segment is younger than the liveness window. The tracker
//! reads only the store, so a viewer-facing process that never ran the
//! recorder can answer status queries against a shared store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::store::SegmentStore;

/// Window after which a quiet stream is reported as not live.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(30);

/// Status shape returned to viewers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub is_live: bool,
    pub segments: usize,
    pub last_segment: Option<String>,
}

/// Answers "is the stream currently live" from store contents and a
/// clock, nothing else.
///
/// The heuristic is deliberately uncoupled from the rotation interval:
/// a producer rotating slower than the window is reported as not live.
/// That tradeoff (simplicity over precision) is part of the contract.
pub struct LivenessTracker<S: ?Sized> {
    store: Arc<S>,
    window: chrono::Duration,
}

impl<S: SegmentStore + ?Sized> LivenessTracker<S> {
    /// Tracker with the default 30s window.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_window(store, DEFAULT_LIVENESS_WINDOW)
    }

    pub fn with_window(store: Arc<S>, window: Duration) -> Self {
        Self {
            store,
            window: chrono::Duration::milliseconds(window.as_millis() as i64),
        }
    }

    /// Status as of now.
    pub async fn status(&self) -> Result<StreamStatus, StoreError> {
        self.status_at(Utc::now()).await
    }

    /// Status as of an explicit instant. `is_live` holds exactly when
    /// the newest segment is strictly younger than the window.
    pub async fn status_at(&self, now: DateTime<Utc>) -> Result<StreamStatus, StoreError> {
        let segments = self.store.list().await?;
        let newest = segments.last();
        let is_live = match newest {
            Some(meta) => now.signed_duration_since(meta.created_at) < self.window,
            None => false,
        };
        Ok(StreamStatus {
            is_live,
            segments: segments.len(),
            last_segment: newest.map(|meta| meta.filename.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySegmentStore;
    use crate::segment::{Segment, SegmentMeta, segment_filename};
    use bytes::Bytes;

    fn segment_created_at(id: u32, created_at: DateTime<Utc>) -> Segment {
        Segment {
            meta: SegmentMeta {
                id,
                filename: segment_filename(id),
                duration: 6.0,
                created_at,
                size: 1,
            },
            data: Bytes::from_static(b"x"),
        }
    }

    #[tokio::test]
    async fn empty_store_is_not_live() {
        let store = Arc::new(MemorySegmentStore::new());
        let tracker = LivenessTracker::new(store);
        let status = tracker.status_at(Utc::now()).await.unwrap();
        assert!(!status.is_live);
        assert_eq!(status.segments, 0);
        assert_eq!(status.last_segment, None);
    }

    #[tokio::test]
    async fn recent_segment_is_live() {
        let store = Arc::new(MemorySegmentStore::new());
        let now = Utc::now();
        store
            .put(segment_created_at(0, now - chrono::Duration::seconds(5)))
            .await
            .unwrap();

        let tracker = LivenessTracker::new(store);
        let status = tracker.status_at(now).await.unwrap();
        assert!(status.is_live);
        assert_eq!(status.segments, 1);
        assert_eq!(status.last_segment.as_deref(), Some("segment_000000.ts"));
    }

    #[tokio::test]
    async fn window_boundary_is_strict() {
        let store = Arc::new(MemorySegmentStore::new());
        let now = Utc::now();
        store
            .put(segment_created_at(0, now - chrono::Duration::seconds(30)))
            .await
            .unwrap();

        // Exactly at the window is already stale.
        let tracker = LivenessTracker::new(Arc::clone(&store));
        assert!(!tracker.status_at(now).await.unwrap().is_live);

        let just_inside = now - chrono::Duration::milliseconds(100);
        assert!(tracker.status_at(just_inside).await.unwrap().is_live);
    }

    #[tokio::test]
    async fn stale_segment_is_not_live() {
        let store = Arc::new(MemorySegmentStore::new());
        let now = Utc::now();
        store
            .put(segment_created_at(0, now - chrono::Duration::seconds(31)))
            .await
            .unwrap();

        let tracker = LivenessTracker::new(store);
        let status = tracker.status_at(now).await.unwrap();
        assert!(!status.is_live);
        assert_eq!(status.segments, 1);
    }

    #[tokio::test]
    async fn liveness_follows_newest_segment() {
        let store = Arc::new(MemorySegmentStore::new());
        let now = Utc::now();
        store
            .put(segment_created_at(0, now - chrono::Duration::seconds(120)))
            .await
            .unwrap();
        store
            .put(segment_created_at(1, now - chrono::Duration::seconds(2)))
            .await
            .unwrap();

        let tracker = LivenessTracker::new(store);
        let status = tracker.status_at(now).await.unwrap();
        assert!(status.is_live);
        assert_eq!(status.last_segment.as_deref(), Some("segment_000001.ts"));
    }

    #[tokio::test]
    async fn custom_window_is_honored() {
        let store = Arc::new(MemorySegmentStore::new());
        let now = Utc::now();
        store
            .put(segment_created_at(0, now - chrono::Duration::seconds(8)))
            .await
            .unwrap();

        let tracker = LivenessTracker::with_window(store, Duration::from_secs(5));
        assert!(!tracker.status_at(now).await.unwrap().is_live);
    }

    #[tokio::test]
    async fn status_shape_serializes_camel_case() {
        let store = Arc::new(MemorySegmentStore::new());
        let tracker = LivenessTracker::new(store);
        let status = tracker.status_at(Utc::now()).await.unwrap();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["isLive"], false);
        assert_eq!(json["segments"], 0);
        assert!(json["lastSegment"].is_null());
    }
}
