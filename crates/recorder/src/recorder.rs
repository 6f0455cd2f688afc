//! The orchestrator: rotation cadence, sequential id assignment and the
//! ordered finalize pipeline.
//!
//! Rotation and finalization are decoupled so closing segment `k` never
//! stalls the capture of segment `k + 1`: the rotation loop hands each
//! closed blob to a finalize worker over a channel and immediately
//! restarts the encoder. The worker consumes jobs one at a time in
//! submission order, which is id order, so the live playlist never
//! records segment `k + 1` before `k`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use playlist::{live_playlist, sealed_playlist};
use segment_store::{Segment, SegmentMeta, SegmentStore};

use crate::capture::CaptureSource;
use crate::config::RecorderConfig;
use crate::error::RecorderError;
use crate::session::{Session, SessionState, SessionSummary};
use crate::transcode::Transcoder;

/// One closed segment awaiting finalization.
struct FinalizeJob {
    id: u32,
    raw: Bytes,
}

struct FinalizeOutcome {
    segments: Vec<SegmentMeta>,
    dropped: usize,
}

struct ActiveSession {
    session: Session,
    cancel: CancellationToken,
    rotation: JoinHandle<()>,
    finalize: JoinHandle<FinalizeOutcome>,
}

/// Drives the rotation cadence and sequences the per-segment pipeline
/// (capture -> transcode -> store -> live playlist append).
///
/// The recorder exclusively owns session state; the store is the only
/// surface shared with status or viewer consumers.
pub struct SegmentRecorder {
    store: Arc<dyn SegmentStore>,
    transcoder: Arc<dyn Transcoder>,
    config: RecorderConfig,
    active: Option<ActiveSession>,
    state: SessionState,
}

impl SegmentRecorder {
    pub fn new(
        store: Arc<dyn SegmentStore>,
        transcoder: Arc<dyn Transcoder>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            store,
            transcoder,
            config,
            active: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Start a new session: acquire the capture source, reset the id
    /// range to 0, clear prior session artifacts from the store and arm
    /// the rotation timer.
    ///
    /// Acquisition failure aborts the transition; the recorder stays
    /// out of `Recording` and no partial session is created.
    pub async fn start(&mut self, mut source: Box<dyn CaptureSource>) -> Result<(), RecorderError> {
        if self.active.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }
        // tokio intervals require a non-zero period; reject up front
        // instead of panicking the rotation task after start returned.
        if self.config.rotation_interval.is_zero() {
            return Err(RecorderError::InvalidConfig(
                "rotation interval must be non-zero".into(),
            ));
        }
        if self.config.status_refresh.is_zero() {
            return Err(RecorderError::InvalidConfig(
                "status refresh interval must be non-zero".into(),
            ));
        }

        source
            .begin_segment()
            .await
            .map_err(RecorderError::Acquisition)?;

        // Stale ids from an earlier session must not leak into the new
        // manifest.
        self.store.clear().await?;

        let session = Session::begin();
        info!("session started, {}", self.config);

        let (job_tx, job_rx) = mpsc::channel(self.config.channel_size);
        let cancel = CancellationToken::new();
        let finalized = Arc::new(AtomicUsize::new(0));

        let finalize = tokio::spawn(finalize_worker(
            job_rx,
            Arc::clone(&self.store),
            Arc::clone(&self.transcoder),
            self.config.segment_duration(),
            Arc::clone(&finalized),
        ));

        let rotation = tokio::spawn(rotation_loop(
            source,
            job_tx,
            cancel.clone(),
            self.config.clone(),
            finalized,
        ));

        self.active = Some(ActiveSession {
            session,
            cancel,
            rotation,
            finalize,
        });
        self.state = SessionState::Recording;
        Ok(())
    }

    /// End the active session: cancel the rotation timer, flush and
    /// finalize the still-open segment, drain in-flight finalize work
    /// and persist the sealed playlist exactly once.
    pub async fn end(&mut self) -> Result<SessionSummary, RecorderError> {
        let ActiveSession {
            session,
            cancel,
            rotation,
            finalize,
        } = self.active.take().ok_or(RecorderError::NotRecording)?;

        // Once requested, no further rotations are scheduled and no new
        // encoder start is issued.
        cancel.cancel();
        rotation
            .await
            .map_err(|e| RecorderError::Internal(e.to_string()))?;

        // The rotation loop performed the final flush before dropping
        // its job sender; the worker drains the queue and returns the
        // finalized list, so the last segment is never lost.
        let outcome = finalize
            .await
            .map_err(|e| RecorderError::Internal(e.to_string()))?;

        let sealed = sealed_playlist(&outcome.segments, self.config.segment_duration());
        self.store
            .put_playlist(&sealed)
            .await
            .map_err(RecorderError::ManifestWrite)?;

        self.state = SessionState::Ended;
        let summary = session.finish(outcome.segments.len(), outcome.dropped);
        info!(
            segments = summary.segments,
            dropped = summary.dropped,
            "session ended, sealed playlist written"
        );
        Ok(summary)
    }
}

async fn rotation_loop(
    mut source: Box<dyn CaptureSource>,
    jobs: mpsc::Sender<FinalizeJob>,
    cancel: CancellationToken,
    config: RecorderConfig,
    finalized: Arc<AtomicUsize>,
) {
    let mut next_id: u32 = 0;
    let mut encoder_lost = false;
    // start() already issued the acquiring begin_segment.
    let mut open = true;
    let started = tokio::time::Instant::now();

    let mut rotation = interval(config.rotation_interval);
    rotation.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut refresh = interval(config.status_refresh);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Both intervals fire immediately on creation; swallow that tick.
    rotation.tick().await;
    refresh.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = rotation.tick(), if !encoder_lost => {
                next_id = rotate(
                    source.as_mut(),
                    &jobs,
                    &cancel,
                    &config,
                    next_id,
                    &mut encoder_lost,
                    &mut open,
                )
                .await;
            }
            _ = refresh.tick() => {
                debug!(
                    elapsed = ?started.elapsed(),
                    finalized = finalized.load(Ordering::Relaxed),
                    "recording"
                );
            }
        }
    }

    // Final flush: id assignment identical to a rotation tick, but no
    // encoder restart afterwards. Skipped when no segment is open
    // (end raced the restart, or the encoder was lost), preserving the
    // begin/end alternation of the capture contract.
    if open {
        match timeout(config.flush_grace, source.end_segment()).await {
            Ok(Ok(raw)) if !raw.is_empty() => {
                if jobs.send(FinalizeJob { id: next_id, raw }).await.is_err() {
                    error!(id = next_id, "finalize worker gone before final segment");
                }
            }
            Ok(Ok(_)) => debug!("no data captured for the final segment"),
            Ok(Err(e)) => warn!("failed to flush the final segment: {e}"),
            Err(_) => warn!(
                "final segment flush timed out after {:?}",
                config.flush_grace
            ),
        }
    } else {
        debug!("no open segment at shutdown");
    }
    // Dropping the job sender lets the finalize worker drain and exit.
}

/// Close the open segment, queue it for finalization and restart the
/// encoder. Returns the id to assign next.
async fn rotate(
    source: &mut dyn CaptureSource,
    jobs: &mpsc::Sender<FinalizeJob>,
    cancel: &CancellationToken,
    config: &RecorderConfig,
    next_id: u32,
    encoder_lost: &mut bool,
    open: &mut bool,
) -> u32 {
    *open = false;
    let raw = match timeout(config.flush_grace, source.end_segment()).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            warn!(id = next_id, "segment flush failed: {e}");
            Bytes::new()
        }
        Err(_) => {
            warn!(
                id = next_id,
                "segment flush timed out after {:?}", config.flush_grace
            );
            Bytes::new()
        }
    };

    let mut id = next_id;
    if raw.is_empty() {
        // Nothing captured during this interval; no id is consumed.
        debug!("rotation produced no data");
    } else if jobs.send(FinalizeJob { id, raw }).await.is_err() {
        error!(id, "finalize worker gone, segment lost");
    } else {
        id += 1;
    }

    // An end request that raced this tick wins: the closed blob is
    // already queued, but the encoder is not restarted.
    if cancel.is_cancelled() {
        return id;
    }

    match source.begin_segment().await {
        Ok(()) => *open = true,
        Err(e) => {
            error!("failed to restart capture, rotations suspended: {e}");
            *encoder_lost = true;
        }
    }
    id
}

/// Consumes closed segments strictly in submission (== id) order:
/// transcode, persist, regenerate the live playlist. Per-segment
/// failures drop that segment and never unwind the session.
async fn finalize_worker(
    mut jobs: mpsc::Receiver<FinalizeJob>,
    store: Arc<dyn SegmentStore>,
    transcoder: Arc<dyn Transcoder>,
    segment_duration: f64,
    finalized: Arc<AtomicUsize>,
) -> FinalizeOutcome {
    let mut segments: Vec<SegmentMeta> = Vec::new();
    let mut dropped = 0usize;

    while let Some(job) = jobs.recv().await {
        let id = job.id;
        let payload = match transcoder.transcode(job.raw).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(id, "transcode failed, segment dropped: {e}");
                dropped += 1;
                continue;
            }
        };

        let segment = Segment::new(id, segment_duration, payload);
        let meta = segment.meta.clone();
        if let Err(e) = store.put(segment).await {
            // Logged distinctly from a transcode drop: durability is at
            // risk, not just one conversion.
            error!(id, "store write failed, segment dropped: {e}");
            dropped += 1;
            continue;
        }

        segments.push(meta);
        finalized.store(segments.len(), Ordering::Relaxed);
        debug!(id, total = segments.len(), "segment finalized");

        // The live view is regenerated wholesale, so a failed write
        // here is repaired by the next successful one.
        let live = live_playlist(&segments, segment_duration);
        if let Err(e) = store.put_playlist(&live).await {
            warn!(id, "live playlist write failed: {e}");
        }
    }

    FinalizeOutcome { segments, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::transcode::{PassthroughTranscoder, TranscodeError};
    use async_trait::async_trait;
    use chrono::Utc;
    use segment_store::{LivenessTracker, MemorySegmentStore};
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Capture source yielding one preset blob per rotation.
    struct ScriptedSource {
        blobs: VecDeque<Bytes>,
        fail_acquire: bool,
        begins: usize,
    }

    impl ScriptedSource {
        fn with_blobs(blobs: &[&'static [u8]]) -> Self {
            Self {
                blobs: blobs.iter().map(|b| Bytes::from_static(b)).collect(),
                fail_acquire: false,
                begins: 0,
            }
        }

        fn failing_acquire() -> Self {
            Self {
                blobs: VecDeque::new(),
                fail_acquire: true,
                begins: 0,
            }
        }
    }

    #[async_trait]
    impl CaptureSource for ScriptedSource {
        async fn begin_segment(&mut self) -> Result<(), CaptureError> {
            if self.fail_acquire && self.begins == 0 {
                return Err(CaptureError::Unavailable("no camera".into()));
            }
            self.begins += 1;
            Ok(())
        }

        async fn end_segment(&mut self) -> Result<Bytes, CaptureError> {
            Ok(self.blobs.pop_front().unwrap_or_default())
        }
    }

    /// Capture source whose flush never completes, with shared call
    /// counters to observe the begin/end sequencing from outside.
    struct BlockingSource {
        begins: Arc<AtomicUsize>,
        ends: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CaptureSource for BlockingSource {
        async fn begin_segment(&mut self) -> Result<(), CaptureError> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn end_segment(&mut self) -> Result<Bytes, CaptureError> {
            self.ends.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    /// Fails any blob that starts with `BAD`.
    struct MarkerFailTranscoder;

    #[async_trait]
    impl Transcoder for MarkerFailTranscoder {
        async fn transcode(&self, raw: Bytes) -> Result<Bytes, TranscodeError> {
            if raw.starts_with(b"BAD") {
                return Err(TranscodeError::Failed("marker blob".into()));
            }
            Ok(raw)
        }
    }

    fn recorder_with(
        store: Arc<MemorySegmentStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> SegmentRecorder {
        SegmentRecorder::new(store, transcoder, RecorderConfig::default())
    }

    async fn stored_ids(store: &MemorySegmentStore) -> Vec<u32> {
        store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|meta| meta.id)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn three_segment_session_end_to_end() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(PassthroughTranscoder));

        let source = ScriptedSource::with_blobs(&[b"seg0", b"seg1", b"seg2"]);
        recorder.start(Box::new(source)).await.unwrap();
        assert_eq!(recorder.state(), SessionState::Recording);

        // Three rotations at 6s, 12s and 18s.
        tokio::time::sleep(Duration::from_secs(19)).await;
        let summary = recorder.end().await.unwrap();

        assert_eq!(summary.segments, 3);
        assert_eq!(summary.dropped, 0);
        assert!(summary.ended_at >= summary.started_at);
        assert_eq!(stored_ids(&store).await, vec![0, 1, 2]);
        assert_eq!(store.get(1).await.unwrap().data.as_ref(), b"seg1");

        let sealed = store.get_playlist().await.unwrap();
        assert_eq!(sealed.matches("#EXTINF:").count(), 3);
        assert!(sealed.ends_with("#EXT-X-ENDLIST\n"));
        let first = sealed.find("segment_000000.ts").unwrap();
        let second = sealed.find("segment_000001.ts").unwrap();
        let third = sealed.find("segment_000002.ts").unwrap();
        assert!(first < second && second < third);

        // Within the window right after the session, the stream still
        // counts as live.
        let tracker = LivenessTracker::new(Arc::clone(&store));
        let status = tracker
            .status_at(Utc::now() + chrono::Duration::seconds(10))
            .await
            .unwrap();
        assert!(status.is_live);
        assert_eq!(status.segments, 3);
        assert_eq!(status.last_segment.as_deref(), Some("segment_000002.ts"));

        let stale = tracker
            .status_at(Utc::now() + chrono::Duration::seconds(31))
            .await
            .unwrap();
        assert!(!stale.is_live);
    }

    #[tokio::test(start_paused = true)]
    async fn live_playlist_grows_during_recording() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(PassthroughTranscoder));

        let source = ScriptedSource::with_blobs(&[b"seg0", b"seg1"]);
        recorder.start(Box::new(source)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(7)).await;
        let after_one = store.get_playlist().await.unwrap();
        assert_eq!(after_one.matches("#EXTINF:").count(), 1);
        assert!(!after_one.contains("#EXT-X-ENDLIST"));

        tokio::time::sleep(Duration::from_secs(6)).await;
        let after_two = store.get_playlist().await.unwrap();
        assert_eq!(after_two.matches("#EXTINF:").count(), 2);
        assert!(after_two.starts_with(&after_one));

        recorder.end().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn transcode_failure_drops_segment_and_session_continues() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(MarkerFailTranscoder));

        let source = ScriptedSource::with_blobs(&[b"good0", b"BAD!!", b"good2"]);
        recorder.start(Box::new(source)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(19)).await;
        let summary = recorder.end().await.unwrap();

        assert_eq!(summary.segments, 2);
        assert_eq!(summary.dropped, 1);
        assert_eq!(stored_ids(&store).await, vec![0, 2]);

        let sealed = store.get_playlist().await.unwrap();
        assert!(sealed.contains("segment_000000.ts"));
        assert!(!sealed.contains("segment_000001.ts"));
        assert!(sealed.contains("segment_000002.ts"));
    }

    #[tokio::test(start_paused = true)]
    async fn end_with_zero_segments_seals_empty_playlist() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(PassthroughTranscoder));

        recorder
            .start(Box::new(ScriptedSource::with_blobs(&[])))
            .await
            .unwrap();
        let summary = recorder.end().await.unwrap();

        assert_eq!(summary.segments, 0);
        assert!(stored_ids(&store).await.is_empty());

        let sealed = store.get_playlist().await.unwrap();
        assert_eq!(sealed.matches("#EXTINF:").count(), 0);
        assert!(sealed.contains("#EXT-X-PLAYLIST-TYPE:VOD\n"));
        assert!(sealed.ends_with("#EXT-X-ENDLIST\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn end_finalizes_the_open_segment() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(PassthroughTranscoder));

        recorder
            .start(Box::new(ScriptedSource::with_blobs(&[b"only"])))
            .await
            .unwrap();

        // End before the first rotation tick; the open segment must
        // still be flushed and sealed.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let summary = recorder.end().await.unwrap();

        assert_eq!(summary.segments, 1);
        assert_eq!(stored_ids(&store).await, vec![0]);
        assert_eq!(store.get(0).await.unwrap().data.as_ref(), b"only");
    }

    #[tokio::test]
    async fn zero_rotation_interval_is_rejected() {
        let store = Arc::new(MemorySegmentStore::new());
        let config = RecorderConfig::builder()
            .rotation_interval(Duration::ZERO)
            .build();
        let mut recorder = SegmentRecorder::new(store, Arc::new(PassthroughTranscoder), config);

        let result = recorder
            .start(Box::new(ScriptedSource::with_blobs(&[b"seg0"])))
            .await;
        assert!(matches!(result, Err(RecorderError::InvalidConfig(_))));
        assert_eq!(recorder.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn end_during_rotation_skips_encoder_restart() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(PassthroughTranscoder));

        let begins = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));
        recorder
            .start(Box::new(BlockingSource {
                begins: Arc::clone(&begins),
                ends: Arc::clone(&ends),
            }))
            .await
            .unwrap();
        assert_eq!(begins.load(Ordering::SeqCst), 1);

        // Land on the first rotation tick and let its flush get in
        // flight before requesting the end.
        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert_eq!(ends.load(Ordering::SeqCst), 1);
        let summary = recorder.end().await.unwrap();

        assert_eq!(summary.segments, 0);
        // End won the race: the encoder was never restarted and the
        // already-closed segment was not flushed a second time.
        assert_eq!(begins.load(Ordering::SeqCst), 1);
        assert_eq!(ends.load(Ordering::SeqCst), 1);
        let sealed = store.get_playlist().await.unwrap();
        assert!(sealed.ends_with("#EXT-X-ENDLIST\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn acquisition_failure_leaves_recorder_idle() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(PassthroughTranscoder));

        let result = recorder
            .start(Box::new(ScriptedSource::failing_acquire()))
            .await;
        assert!(matches!(result, Err(RecorderError::Acquisition(_))));
        assert_eq!(recorder.state(), SessionState::Idle);

        // A later start with a working source succeeds.
        recorder
            .start(Box::new(ScriptedSource::with_blobs(&[b"seg0"])))
            .await
            .unwrap();
        assert_eq!(recorder.state(), SessionState::Recording);
        recorder.end().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn state_machine_never_moves_backward() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(PassthroughTranscoder));
        assert_eq!(recorder.state(), SessionState::Idle);

        assert!(matches!(
            recorder.end().await,
            Err(RecorderError::NotRecording)
        ));

        recorder
            .start(Box::new(ScriptedSource::with_blobs(&[])))
            .await
            .unwrap();
        assert!(matches!(
            recorder
                .start(Box::new(ScriptedSource::with_blobs(&[])))
                .await,
            Err(RecorderError::AlreadyRecording)
        ));

        recorder.end().await.unwrap();
        assert_eq!(recorder.state(), SessionState::Ended);
        assert!(matches!(
            recorder.end().await,
            Err(RecorderError::NotRecording)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn new_session_restarts_id_range_at_zero() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(PassthroughTranscoder));

        recorder
            .start(Box::new(ScriptedSource::with_blobs(&[b"a0", b"a1"])))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(13)).await;
        let first = recorder.end().await.unwrap();
        assert_eq!(first.segments, 2);

        recorder
            .start(Box::new(ScriptedSource::with_blobs(&[b"b0"])))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(7)).await;
        let second = recorder.end().await.unwrap();

        assert_eq!(second.segments, 1);
        assert_eq!(stored_ids(&store).await, vec![0]);
        assert_eq!(store.get(0).await.unwrap().data.as_ref(), b"b0");
        assert_eq!(
            store.get_playlist().await.unwrap().matches("#EXTINF:").count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_rotation_does_not_consume_an_id() {
        let store = Arc::new(MemorySegmentStore::new());
        let mut recorder = recorder_with(Arc::clone(&store), Arc::new(PassthroughTranscoder));

        // Blob 0 lands on the first rotation, nothing on the second,
        // blob 1 on the third.
        recorder
            .start(Box::new(ScriptedSource::with_blobs(&[b"x", b"", b"y"])))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(19)).await;
        let summary = recorder.end().await.unwrap();

        assert_eq!(summary.segments, 2);
        assert_eq!(stored_ids(&store).await, vec![0, 1]);
        assert_eq!(store.get(1).await.unwrap().data.as_ref(), b"y");
    }
}
