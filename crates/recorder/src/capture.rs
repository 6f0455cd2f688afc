//! Capture boundary: the encoder-side collaborator that buffers media
//! and hands the recorder one opaque blob per closed segment.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

const READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    #[error("capture source exhausted")]
    Exhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-segment capture contract.
///
/// The recorder drives this in a strict begin/end alternation. The
/// first `begin_segment` is the acquisition step: if it fails, `start`
/// aborts and no session is created.
#[async_trait]
pub trait CaptureSource: Send {
    /// Open (or reopen after a rotation) encoder output for the next
    /// segment.
    async fn begin_segment(&mut self) -> Result<(), CaptureError>;

    /// Stop encoder output and return the flushed bytes of the segment
    /// that was just closed. An empty blob means nothing was captured
    /// during the interval; the recorder skips it without consuming an
    /// id.
    async fn end_segment(&mut self) -> Result<Bytes, CaptureError>;
}

/// Adapts a continuous byte stream (file, pipe, socket) to the
/// per-segment contract. A background task reads ahead into a channel;
/// each `end_segment` drains whatever arrived since the previous
/// rotation.
pub struct ReaderSource {
    rx: mpsc::UnboundedReceiver<Bytes>,
    exhausted: bool,
}

impl ReaderSource {
    pub fn new<R>(mut reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("capture reader stopped: {e}");
                        break;
                    }
                }
            }
        });
        Self {
            rx,
            exhausted: false,
        }
    }

    /// True once the underlying stream ended and every buffered chunk
    /// has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[async_trait]
impl CaptureSource for ReaderSource {
    async fn begin_segment(&mut self) -> Result<(), CaptureError> {
        // The reader task captures continuously; nothing to rearm.
        Ok(())
    }

    async fn end_segment(&mut self) -> Result<Bytes, CaptureError> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => out.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.exhausted = true;
                    break;
                }
            }
        }
        Ok(Bytes::from(out))
    }
}
