use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the network, the training sequence and the dataset
/// adapter. Every failure is synchronous and leaves the network unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// An input vector's length differs from the weight count (or the
    /// input-layer width).
    #[error("dimension mismatch: expected {expected} inputs, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A topology, reset or training call was made while learning.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown activation function '{0}'")]
    UnknownActivation(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("hidden layer {level} out of range ({count} hidden layers)")]
    LayerOutOfRange { level: usize, count: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
