//! In-memory segment store, the embedded rendition of the store
//! contract. Used by recorder tests and anywhere durability is not the
//! point.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::segment::{Segment, SegmentMeta};
use crate::store::SegmentStore;

#[derive(Default)]
struct Inner {
    segments: BTreeMap<u32, Segment>,
    playlist: Option<String>,
    last_write: Option<DateTime<Utc>>,
}

/// Map-backed [`SegmentStore`].
#[derive(Default)]
pub struct MemorySegmentStore {
    inner: RwLock<Inner>,
}

impl MemorySegmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SegmentStore for MemorySegmentStore {
    async fn put(&self, segment: Segment) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.last_write = Some(segment.meta.created_at);
        inner.segments.insert(segment.meta.id, segment);
        Ok(())
    }

    async fn get(&self, id: u32) -> Result<Segment, StoreError> {
        self.inner
            .read()
            .segments
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<SegmentMeta>, StoreError> {
        Ok(self
            .inner
            .read()
            .segments
            .values()
            .map(|segment| segment.meta.clone())
            .collect())
    }

    async fn put_playlist(&self, content: &str) -> Result<(), StoreError> {
        self.inner.write().playlist = Some(content.to_string());
        Ok(())
    }

    async fn get_playlist(&self) -> Result<String, StoreError> {
        self.inner
            .read()
            .playlist
            .clone()
            .ok_or(StoreError::PlaylistNotFound)
    }

    async fn last_write_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.inner.read().last_write)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.segments.clear();
        inner.playlist = None;
        inner.last_write = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let store = MemorySegmentStore::new();
        for id in [3u32, 1, 0, 2] {
            store
                .put(Segment::new(id, 6.0, Bytes::from_static(b"x")))
                .await
                .unwrap();
        }
        let ids: Vec<u32> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|meta| meta.id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn overwrite_is_idempotent() {
        let store = MemorySegmentStore::new();
        store
            .put(Segment::new(0, 6.0, Bytes::from_static(b"a")))
            .await
            .unwrap();
        store
            .put(Segment::new(0, 6.0, Bytes::from_static(b"b")))
            .await
            .unwrap();
        assert_eq!(store.get(0).await.unwrap().data.as_ref(), b"b");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let store = MemorySegmentStore::new();
        store
            .put(Segment::new(0, 6.0, Bytes::from_static(b"a")))
            .await
            .unwrap();
        store.put_playlist("#EXTM3U\n").await.unwrap();

        store.clear().await.unwrap();

        assert!(store.list().await.unwrap().is_empty());
        assert!(store.last_write_at().await.unwrap().is_none());
        assert!(matches!(
            store.get_playlist().await,
            Err(StoreError::PlaylistNotFound)
        ));
    }
}
