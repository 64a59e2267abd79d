use super::store::StoreError;

/// Failures surfaced by [`Home`](super::Home) operations.
#[derive(Debug, thiserror::Error)]
pub enum HomeError {
    #[error("{0} not in your fixtures")]
    NotFound(String),

    #[error("{0} already in your fixtures")]
    Conflict(String),

    #[error("failed to save home state: {0}")]
    Persistence(#[from] StoreError),
}

pub type Result<T, E = HomeError> = std::result::Result<T, E>;
