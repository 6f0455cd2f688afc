//! # Recorder
//!
//! The segment lifecycle orchestrator. A [`SegmentRecorder`] owns the
//! rotation cadence and the session state machine (`Idle -> Recording
//! -> Ended`): on each rotation it closes the open encoder segment,
//! assigns the next sequential id and hands the raw blob to a finalize
//! worker (transcode, store, live playlist append) while the encoder is
//! already capturing the next segment. Ending a session flushes the
//! last open segment, drains the finalize queue and seals the playlist
//! exactly once.
//!
//! The capture and transcode collaborators sit behind narrow traits
//! ([`CaptureSource`], [`Transcoder`]); the store is the only surface
//! shared with status consumers.

pub mod capture;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod recorder;
pub mod session;
pub mod transcode;

pub use capture::{CaptureError, CaptureSource, ReaderSource};
pub use config::{RecorderConfig, RecorderConfigBuilder};
pub use error::RecorderError;
pub use ffmpeg::FfmpegTranscoder;
pub use recorder::SegmentRecorder;
pub use session::{Session, SessionState, SessionSummary};
pub use transcode::{PassthroughTranscoder, TranscodeError, Transcoder};
