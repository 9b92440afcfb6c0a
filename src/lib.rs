//! Live webcam pose estimation: capture frames, run MoveNet on each one and
//! draw the detected keypoints (and optionally the skeleton) over the video.

pub mod config;
pub mod error;
pub mod model_download;
pub mod pipeline;
pub mod types;

pub use config::Config;
pub use error::PoseError;
pub use types::{CaptureMetadata, Frame, Keypoint, KeypointName, Pose};
