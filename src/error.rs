use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors raised while configuring, training or persisting a network.
///
/// Numerical divergence is not an error: `Network::learn` reports it as
/// `Ok(false)` so a caller can retry with other hyperparameters.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Invalid hyperparameters or an unusable network layout.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The last layer does not produce as many values as the data has outputs.
    #[error("the last layer has {layer} neurons but the data has {outputs} outputs")]
    OutputMismatch { layer: usize, outputs: usize },

    /// Empty or inconsistent dataset.
    #[error("invalid data: {0}")]
    Data(String),

    #[error("failed to build the thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
