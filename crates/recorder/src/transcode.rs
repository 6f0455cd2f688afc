//! Transcode boundary: converts one raw captured blob into the final
//! segment payload. Failures are per-segment and recoverable; the
//! recorder drops the affected segment and keeps rotating.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("conversion failed: {0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, raw: Bytes) -> Result<Bytes, TranscodeError>;
}

/// Identity transcoder for sources that already emit playable segment
/// payloads.
pub struct PassthroughTranscoder;

#[async_trait]
impl Transcoder for PassthroughTranscoder {
    async fn transcode(&self, raw: Bytes) -> Result<Bytes, TranscodeError> {
        Ok(raw)
    }
}
