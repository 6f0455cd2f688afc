//! Filesystem-backed segment store.
//!
//! Segments are plain files named by their id; listing metadata is
//! derived from the file name and stats rather than sidecar records, so
//! any process with access to the directory can evaluate status or
//! serve segments without recorder state.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::StoreError;
use crate::segment::{
    DEFAULT_SEGMENT_DURATION, Segment, SegmentMeta, parse_segment_filename, segment_filename,
};
use crate::store::{PLAYLIST_FILENAME, SegmentStore};

/// Directory-backed [`SegmentStore`].
pub struct FsSegmentStore {
    root: PathBuf,
    nominal_duration: f64,
}

impl FsSegmentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            nominal_duration: DEFAULT_SEGMENT_DURATION,
        })
    }

    /// Set the nominal duration reported for listed segments. The
    /// filesystem does not record durations, so listings carry the
    /// session's configured value.
    pub fn with_nominal_duration(mut self, seconds: f64) -> Self {
        self.nominal_duration = seconds;
        self
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn meta_from_stat(&self, id: u32, stat: &std::fs::Metadata) -> Result<SegmentMeta, StoreError> {
        let modified: DateTime<Utc> = stat.modified()?.into();
        Ok(SegmentMeta {
            id,
            filename: segment_filename(id),
            duration: self.nominal_duration,
            created_at: modified,
            size: stat.len(),
        })
    }

    /// Write via a temp file and rename so readers only ever see
    /// complete segments.
    async fn write_atomic(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let final_path = self.root.join(filename);
        let tmp_path = self.root.join(format!(".{filename}.tmp"));
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }
}

#[async_trait]
impl SegmentStore for FsSegmentStore {
    async fn put(&self, segment: Segment) -> Result<(), StoreError> {
        self.write_atomic(&segment.meta.filename, &segment.data)
            .await?;
        debug!(
            id = segment.meta.id,
            size = segment.meta.size,
            "segment persisted"
        );
        Ok(())
    }

    async fn get(&self, id: u32) -> Result<Segment, StoreError> {
        let path = self.root.join(segment_filename(id));
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };
        let stat = tokio::fs::metadata(&path).await?;
        let mut meta = self.meta_from_stat(id, &stat)?;
        meta.size = data.len() as u64;
        Ok(Segment {
            meta,
            data: Bytes::from(data),
        })
    }

    async fn list(&self) -> Result<Vec<SegmentMeta>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut segments = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(id) = parse_segment_filename(name) else {
                continue;
            };
            let stat = entry.metadata().await?;
            segments.push(self.meta_from_stat(id, &stat)?);
        }
        segments.sort_by_key(|meta| meta.id);
        Ok(segments)
    }

    async fn put_playlist(&self, content: &str) -> Result<(), StoreError> {
        self.write_atomic(PLAYLIST_FILENAME, content.as_bytes())
            .await
    }

    async fn get_playlist(&self) -> Result<String, StoreError> {
        match tokio::fs::read_to_string(self.root.join(PLAYLIST_FILENAME)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::PlaylistNotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn last_write_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let segments = self.list().await?;
        Ok(segments.iter().map(|meta| meta.created_at).max())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if parse_segment_filename(name).is_some() || name == PLAYLIST_FILENAME {
                tokio::fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }
}
