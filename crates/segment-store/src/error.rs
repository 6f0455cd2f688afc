use thiserror::Error;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("segment {0} not found")]
    NotFound(u32),

    #[error("playlist not found")]
    PlaylistNotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
