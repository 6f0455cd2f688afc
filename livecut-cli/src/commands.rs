use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use recorder::{
    CaptureSource, FfmpegTranscoder, PassthroughTranscoder, ReaderSource, RecorderConfig,
    SegmentRecorder, Transcoder,
};
use segment_store::{DEFAULT_LIVENESS_WINDOW, FsSegmentStore, LivenessTracker, SegmentListing};

pub struct RecordOptions {
    pub input: Option<PathBuf>,
    pub output: PathBuf,
    pub interval: u64,
    pub flush_grace_ms: u64,
    pub duration: Option<u64>,
    pub passthrough: bool,
    pub ffmpeg: PathBuf,
}

/// Record a capture into rotated segments until Ctrl-C or the requested
/// duration elapses, then seal the playlist.
pub async fn record(opts: RecordOptions) -> anyhow::Result<()> {
    let interval = Duration::from_secs(opts.interval);
    if interval >= DEFAULT_LIVENESS_WINDOW {
        // Liveness is judged purely on segment recency, so intervals at
        // or beyond the window make an active session report as ended.
        warn!(
            interval_secs = opts.interval,
            window_secs = DEFAULT_LIVENESS_WINDOW.as_secs(),
            "rotation interval is not shorter than the liveness window; \
             status will report the stream as not live between rotations"
        );
    }

    let store = Arc::new(
        FsSegmentStore::open(&opts.output)
            .with_context(|| format!("failed to open segment directory {:?}", opts.output))?
            .with_nominal_duration(interval.as_secs_f64()),
    );

    let transcoder: Arc<dyn Transcoder> = if opts.passthrough {
        Arc::new(PassthroughTranscoder)
    } else {
        Arc::new(FfmpegTranscoder::with_path(opts.ffmpeg))
    };

    let config = RecorderConfig::builder()
        .rotation_interval(interval)
        .flush_grace(Duration::from_millis(opts.flush_grace_ms))
        .build();

    let source: Box<dyn CaptureSource> = match &opts.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open capture source {path:?}"))?;
            Box::new(ReaderSource::new(file))
        }
        None => Box::new(ReaderSource::new(tokio::io::stdin())),
    };

    let mut recorder = SegmentRecorder::new(store, transcoder, config);
    recorder
        .start(source)
        .await
        .context("failed to start the recording session")?;
    info!(output = ?opts.output, "recording, press Ctrl-C to stop");

    match opts.duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!(secs, "requested duration elapsed");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            info!("interrupt received");
        }
    }

    let summary = recorder
        .end()
        .await
        .context("failed to end the recording session")?;
    println!(
        "recorded {} segment(s) ({} dropped) into {:?}",
        summary.segments, summary.dropped, opts.output
    );
    Ok(())
}

/// Print the stream status derived from stored segment recency.
pub async fn status(output: PathBuf) -> anyhow::Result<()> {
    let store = Arc::new(
        FsSegmentStore::open(&output)
            .with_context(|| format!("failed to open segment directory {output:?}"))?,
    );
    let status = LivenessTracker::new(store).status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// List stored segments, id-ascending, as JSON.
pub async fn segments(output: PathBuf) -> anyhow::Result<()> {
    use segment_store::SegmentStore;

    let store = FsSegmentStore::open(&output)
        .with_context(|| format!("failed to open segment directory {output:?}"))?;
    let listings: Vec<SegmentListing> = store
        .list()
        .await?
        .iter()
        .map(SegmentListing::from)
        .collect();
    println!("{}", serde_json::to_string_pretty(&listings)?);
    Ok(())
}
