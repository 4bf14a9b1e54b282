use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::detect::DEFAULT_CONFIDENCE;
use crate::error::{Error, Result};
use crate::yolo::SessionOptions;

pub const ENV_PREFIX: &str = "POTHOLE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub model_path: PathBuf,
    pub confidence: f32,
    pub iou_threshold: f32,
    pub input_size: u32,
    pub intra_threads: usize,
    pub visualization_limit: usize,
    pub font_path: Option<PathBuf>,
    pub onnxruntime_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let session = SessionOptions::default();
        Self {
            input_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("pothole_results"),
            model_path: PathBuf::from("best.onnx"),
            confidence: DEFAULT_CONFIDENCE,
            iou_threshold: session.iou_threshold,
            input_size: session.input_size,
            intra_threads: session.intra_threads,
            visualization_limit: 50,
            font_path: None,
            onnxruntime_path: None,
        }
    }
}

impl RunConfig {
    /// Defaults, overlaid by `file` when given, overlaid by `POTHOLE_*` variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
            .map_err(Error::from)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidConfig(format!(
                "confidence must be within [0, 1], got {}",
                self.confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(Error::InvalidConfig(format!(
                "iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            )));
        }
        if self.input_size == 0 {
            return Err(Error::InvalidConfig("input_size must be positive".into()));
        }
        if self.intra_threads == 0 {
            return Err(Error::InvalidConfig("intra_threads must be positive".into()));
        }
        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            input_size: self.input_size,
            intra_threads: self.intra_threads,
            iou_threshold: self.iou_threshold,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.confidence, 0.25);
        assert_eq!(config.visualization_limit, 50);
        assert_eq!(config.session_options(), SessionOptions::default());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for config in [
            RunConfig { confidence: -0.1, ..RunConfig::default() },
            RunConfig { confidence: 1.01, ..RunConfig::default() },
            RunConfig { iou_threshold: 2.0, ..RunConfig::default() },
            RunConfig { input_size: 0, ..RunConfig::default() },
            RunConfig { intra_threads: 0, ..RunConfig::default() },
        ] {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{config:?}");
        }
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pothole.toml");
        std::fs::write(
            &path,
            "input_dir = \"/data/roads\"\nconfidence = 0.4\nvisualization_limit = 10\n",
        )
        .unwrap();

        let config = RunConfig::load(Some(&path)).unwrap();

        assert_eq!(config.input_dir, PathBuf::from("/data/roads"));
        assert_eq!(config.confidence, 0.4);
        assert_eq!(config.visualization_limit, 10);
        assert_eq!(config.output_dir, RunConfig::default().output_dir);
        assert_eq!(config.font_path, None);
    }

    #[test]
    fn example_file_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("pothole.example.toml");
        assert_eq!(RunConfig::load(Some(&path)).unwrap(), RunConfig::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(RunConfig::load(Some(&path)), Err(Error::Config(_))));
    }
}
