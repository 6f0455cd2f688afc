//! # Segment Store
//!
//! Durable persistence for media segments produced by a live capture
//! session, plus the liveness heuristic derived from segment arrival
//! recency.
//!
//! The store is a byte-addressable repository keyed by a sequential
//! segment id. It follows a single-writer, multiple-reader model: the
//! recorder is the only writer for one session at a time, while status
//! and viewer consumers read concurrently. A `put` makes bytes and
//! metadata visible together, so readers never observe a partially
//! written segment.
//!
//! Two implementations are provided:
//!
//! - [`FsSegmentStore`] - a directory of `segment_NNNNNN.ts` files plus
//!   a `playlist.m3u8` artifact
//! - [`MemorySegmentStore`] - an in-process map, mainly for tests

pub mod error;
pub mod fs;
pub mod liveness;
pub mod memory;
pub mod segment;
pub mod store;

pub use error::StoreError;
pub use fs::FsSegmentStore;
pub use liveness::{DEFAULT_LIVENESS_WINDOW, LivenessTracker, StreamStatus};
pub use memory::MemorySegmentStore;
pub use segment::{
    DEFAULT_SEGMENT_DURATION, Segment, SegmentListing, SegmentMeta, parse_segment_filename,
    segment_filename,
};
pub use store::{PLAYLIST_CONTENT_TYPE, PLAYLIST_FILENAME, SegmentStore};
