use thiserror::Error;

/// Failure at one of the pipeline's stage boundaries.
#[derive(Debug, Error)]
pub enum PoseError {
    /// Camera missing, permission denied or the stream never started.
    #[error("camera unavailable: {0:#}")]
    Capture(anyhow::Error),
    /// Model file could not be fetched or the inference session failed to build.
    #[error("failed to load pose model: {0:#}")]
    ModelLoad(anyhow::Error),
    /// A single frame could not be estimated. The render loop skips it.
    #[error("pose estimation failed: {0:#}")]
    Estimate(anyhow::Error),
    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),
}

impl PoseError {
    pub fn stage(&self) -> &'static str {
        match self {
            PoseError::Capture(_) => "camera",
            PoseError::ModelLoad(_) => "model",
            PoseError::Estimate(_) => "estimate",
            PoseError::Config(_) => "config",
        }
    }
}
