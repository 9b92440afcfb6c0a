mod common;
mod movenet;

pub use common::{INPUT_SIZE, LetterboxInfo, NUM_KEYPOINTS, decode_keypoints, prepare_frame};
pub use movenet::{MoveNet, MoveNetLoader};

use super::skeleton::MOVENET_ADJACENT_PAIRS;
use crate::types::{Frame, Pose};

/// Maps a frame to zero or more poses with keypoints in frame pixels.
pub trait PoseDetector: Send + 'static {
    fn estimate_poses(&mut self, frame: &Frame) -> anyhow::Result<Vec<Pose>>;
}

impl<D: PoseDetector + ?Sized> PoseDetector for Box<D> {
    fn estimate_poses(&mut self, frame: &Frame) -> anyhow::Result<Vec<Pose>> {
        (**self).estimate_poses(frame)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupportedModel {
    MoveNet,
}

pub fn adjacent_pairs(model: SupportedModel) -> &'static [(usize, usize)] {
    match model {
        SupportedModel::MoveNet => MOVENET_ADJACENT_PAIRS,
    }
}
