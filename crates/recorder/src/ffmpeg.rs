//! ffmpeg-backed transcoder: converts raw encoder output (e.g. WebM)
//! to an MPEG-TS segment by spawning an external ffmpeg process.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::debug;

use crate::transcode::{TranscodeError, Transcoder};

pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegTranscoder {
    /// Transcoder resolving `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }

    pub fn with_path(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, raw: Bytes) -> Result<Bytes, TranscodeError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("input.raw");
        let output = scratch.path().join("output.ts");
        tokio::fs::write(&input, &raw).await?;

        let result = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(&input)
            .args(["-c:v", "libx264", "-preset", "ultrafast"])
            .args(["-c:a", "aac"])
            .args(["-f", "mpegts"])
            .arg(&output)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("ffmpeg exited with failure")
                .to_string();
            return Err(TranscodeError::Failed(reason));
        }

        let converted = tokio::fs::read(&output).await?;
        debug!(
            raw_bytes = raw.len(),
            converted_bytes = converted.len(),
            "ffmpeg segment conversion complete"
        );
        Ok(Bytes::from(converted))
    }
}
