use chrono::{DateTime, Utc};

/// Lifecycle of one recording session. Transitions only move forward:
/// `Idle -> Recording -> Ended`. A new `start` after `Ended` begins a
/// brand-new session with a fresh id range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Ended,
}

/// A bounded recording interval. Constructed fresh on every `start` and
/// owned exclusively by the recorder; status consumers read the store,
/// never this value.
#[derive(Debug)]
pub struct Session {
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn begin() -> Self {
        Self {
            started_at: Utc::now(),
        }
    }

    /// Close the session and produce its final accounting.
    pub fn finish(self, segments: usize, dropped: usize) -> SessionSummary {
        SessionSummary {
            segments,
            dropped,
            started_at: self.started_at,
            ended_at: Utc::now(),
        }
    }
}

/// Final accounting returned by `end`.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Segments finalized and present in the sealed playlist.
    pub segments: usize,
    /// Segments dropped to transcode or store failures.
    pub dropped: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}
