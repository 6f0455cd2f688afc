use std::fmt::Display;
use std::time::Duration;

/// Recorder timing configuration, constant for a session.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Cadence at which the open segment is rotated.
    pub rotation_interval: Duration,

    /// Bounded wait for the encoder to flush a closed segment before
    /// the next one starts.
    pub flush_grace: Duration,

    /// Cadence of the informational status log line.
    pub status_refresh: Duration,

    /// Capacity of the channel between the rotation loop and the
    /// finalize worker.
    pub channel_size: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            rotation_interval: Duration::from_secs(6),
            flush_grace: Duration::from_millis(100),
            status_refresh: Duration::from_secs(1),
            channel_size: 16,
        }
    }
}

impl RecorderConfig {
    pub fn builder() -> RecorderConfigBuilder {
        RecorderConfigBuilder::default()
    }

    /// Nominal duration recorded in the playlist for every segment.
    /// The encoder's actual duration may drift; the nominal value is
    /// what the manifest records.
    pub fn segment_duration(&self) -> f64 {
        self.rotation_interval.as_secs_f64()
    }
}

impl Display for RecorderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RecorderConfig {{ rotation_interval: {:.2}s, flush_grace: {}ms, channel_size: {} }}",
            self.rotation_interval.as_secs_f64(),
            self.flush_grace.as_millis(),
            self.channel_size
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecorderConfigBuilder {
    config: RecorderConfig,
}

impl RecorderConfigBuilder {
    pub fn rotation_interval(mut self, rotation_interval: Duration) -> Self {
        self.config.rotation_interval = rotation_interval;
        self
    }

    pub fn flush_grace(mut self, flush_grace: Duration) -> Self {
        self.config.flush_grace = flush_grace;
        self
    }

    pub fn status_refresh(mut self, status_refresh: Duration) -> Self {
        self.config.status_refresh = status_refresh;
        self
    }

    pub fn channel_size(mut self, channel_size: usize) -> Self {
        self.config.channel_size = channel_size;
        self
    }

    pub fn build(self) -> RecorderConfig {
        self.config
    }
}
