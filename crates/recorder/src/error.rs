use thiserror::Error;

use crate::capture::CaptureError;
use segment_store::StoreError;

/// Session-level errors. Per-segment failures (transcode, store write)
/// never surface here - they drop the affected segment and the session
/// continues.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The configured timings cannot drive a session; rejected on
    /// start before any resource is acquired.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The capture source could not be acquired on start; no session
    /// was created and the recorder stays idle.
    #[error("failed to acquire capture source: {0}")]
    Acquisition(#[source] CaptureError),

    #[error("a session is already recording")]
    AlreadyRecording,

    #[error("no active session")]
    NotRecording,

    /// The sealed playlist could not be persisted at session end. Hard
    /// error: it is the terminal durable artifact.
    #[error("failed to persist sealed playlist: {0}")]
    ManifestWrite(#[source] StoreError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal task failure: {0}")]
    Internal(String),
}
