//! Segment data model and deterministic file naming.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// File name prefix for stored segments.
pub const SEGMENT_PREFIX: &str = "segment_";

/// File extension for stored segments.
pub const SEGMENT_EXTENSION: &str = "ts";

/// Nominal segment duration in seconds when none is configured.
pub const DEFAULT_SEGMENT_DURATION: f64 = 6.0;

/// Canonical file name for a segment id: `segment_` followed by the
/// 6-digit zero-padded id and the fixed extension. A segment is never
/// renamed after creation.
pub fn segment_filename(id: u32) -> String {
    format!("{SEGMENT_PREFIX}{id:06}.{SEGMENT_EXTENSION}")
}

/// Parse the segment id back out of a canonical file name.
///
/// Returns `None` for anything that is not a stored segment, which lets
/// directory scans skip foreign files.
pub fn parse_segment_filename(name: &str) -> Option<u32> {
    let stem = name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_EXTENSION)?
        .strip_suffix('.')?;
    if stem.len() != 6 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Metadata for one stored segment. Payload bytes live separately so
/// listings stay cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMeta {
    /// Sequential id, unique within a session, starting at 0.
    pub id: u32,
    /// Canonical file name derived from the id.
    pub filename: String,
    /// Nominal duration recorded in the playlist, in seconds.
    pub duration: f64,
    /// When the segment was persisted.
    pub created_at: DateTime<Utc>,
    /// Payload length in bytes.
    pub size: u64,
}

/// One finalized media segment. Immutable once created.
#[derive(Debug, Clone)]
pub struct Segment {
    pub meta: SegmentMeta,
    pub data: Bytes,
}

impl Segment {
    /// Build a segment for the given id with the current timestamp.
    pub fn new(id: u32, duration: f64, data: Bytes) -> Self {
        Self {
            meta: SegmentMeta {
                id,
                filename: segment_filename(id),
                duration,
                created_at: Utc::now(),
                size: data.len() as u64,
            },
            data,
        }
    }
}

/// Listing entry shape exposed to viewer-facing consumers.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentListing {
    pub filename: String,
    pub index: u32,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl From<&SegmentMeta> for SegmentListing {
    fn from(meta: &SegmentMeta) -> Self {
        Self {
            filename: meta.filename.clone(),
            index: meta.id,
            size: meta.size,
            modified: meta.created_at,
        }
    }
}
