use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{model_download::default_model_path, pipeline::skeleton::OverlayMode};

pub const DEFAULT_CONFIG_FILE: &str = "pose-cam.toml";
pub const CONFIG_PATH_ENV: &str = "POSE_CAM_CONFIG";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera_index: u32,
    pub model_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    pub score_threshold: f32,
    pub overlay: OverlayMode,
    pub refresh_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_index: 0,
            model_path: default_model_path(),
            model_url: None,
            score_threshold: 0.5,
            overlay: OverlayMode::Skeleton,
            refresh_hz: 60,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Missing file means defaults; a file that exists must parse.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            bail!(
                "score_threshold must be within [0, 1], got {}",
                self.score_threshold
            );
        }
        if self.refresh_hz == 0 {
            bail!("refresh_hz must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo() {
        let config = Config::default();
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.score_threshold, 0.5);
        assert_eq!(config.overlay, OverlayMode::Skeleton);
        assert_eq!(config.refresh_hz, 60);
        assert!(config.model_url.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str("overlay = \"keypoints\"\ncamera_index = 2\n").unwrap();
        assert_eq!(config.overlay, OverlayMode::Keypoints);
        assert_eq!(config.camera_index, 2);
        assert_eq!(config.score_threshold, 0.5);
        assert_eq!(config.model_path, default_model_path());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pose-cam.toml");
        let config = Config {
            model_url: Some("https://example.invalid/movenet.onnx".to_string()),
            refresh_hz: 30,
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "score_threshold = 1.5\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("score_threshold"));
    }

    #[test]
    fn rejects_zero_refresh_rate() {
        let config = Config {
            refresh_hz: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
