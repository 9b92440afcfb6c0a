use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{PoseDetector, common};
use crate::{
    config::Config,
    error::PoseError,
    model_download::{DownloadEvent, ensure_model_ready},
    types::{Frame, Pose},
};

/// Builds the single-person, speed-optimised MoveNet detector.
#[derive(Clone, Debug)]
pub struct MoveNetLoader {
    model_path: PathBuf,
    model_url: Option<String>,
}

impl MoveNetLoader {
    pub fn new(model_path: impl Into<PathBuf>, model_url: Option<String>) -> Self {
        Self {
            model_path: model_path.into(),
            model_url,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.model_path.clone(), config.model_url.clone())
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn load(&self) -> Result<MoveNet, PoseError> {
        self.load_with_progress(|_| {})
    }

    pub fn load_with_progress<F>(&self, on_event: F) -> Result<MoveNet, PoseError>
    where
        F: FnMut(DownloadEvent),
    {
        ensure_model_ready(&self.model_path, self.model_url.as_deref(), on_event)
            .map_err(PoseError::ModelLoad)?;

        let detector = MoveNet::from_file(&self.model_path).map_err(PoseError::ModelLoad)?;
        log::info!(
            "movenet singlepose lightning ready using {}",
            self.model_path.display()
        );
        Ok(detector)
    }
}

pub struct MoveNet {
    session: Session,
}

impl MoveNet {
    fn from_file(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        Ok(Self { session })
    }
}

impl PoseDetector for MoveNet {
    fn estimate_poses(&mut self, frame: &Frame) -> Result<Vec<Pose>> {
        let (input, letterbox) = common::prepare_frame(frame)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let raw = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = raw.iter().copied().collect();
        let keypoints = common::decode_keypoints(&flattened, &letterbox)?;

        Ok(vec![Pose::from_keypoints(keypoints)])
    }
}
