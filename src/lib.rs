use std::path::Path;
use std::sync::Arc;

pub mod batch;
pub mod config;
pub mod detect;
pub mod error;
pub mod label;
pub mod report;
pub mod summary;
pub mod visual;
pub mod yolo;

pub use batch::{BatchRunner, BatchSettings};
pub use crate::config::RunConfig;
pub use detect::{Detection, Detector};
pub use error::{Error, Result};
pub use report::{MemoryReporter, Reporter, RunEvent, TracingReporter};
pub use summary::Summary;
pub use visual::{ConfidenceTier, Painter};

/// Points the dynamically loaded ONNX Runtime at a specific shared library.
///
/// Must run before the first session is built. Without a path `ort` falls back
/// to `ORT_DYLIB_PATH` or the platform's default library name.
pub fn onnx_init(dylib_path: Option<&Path>) -> Result<()> {
    let Some(path) = dylib_path else {
        return Ok(());
    };
    ort::init_from(path.to_string_lossy().into_owned())
        .commit()
        .map_err(|e| Error::Runtime {
            path: path.to_path_buf(),
            cause: e.into(),
        })?;
    Ok(())
}

/// Loads the model named by `config` and runs one batch over its input directory.
///
/// Returns `Ok(None)` when the model could not be loaded; nothing is written in
/// that case.
pub fn run(config: &RunConfig, reporter: Arc<dyn Reporter>) -> Result<Option<Summary>> {
    config.validate()?;

    let model = yolo::load_model(
        &config.model_path,
        &config.session_options(),
        reporter.as_ref(),
    );
    let detector = Detector::new(
        model.map(|m| Box::new(m) as Box<dyn yolo::InferenceBackend>),
        reporter.clone(),
    );
    let painter = Painter::load(config.font_path.as_deref(), reporter.as_ref());

    let mut runner = BatchRunner::new(detector, painter, BatchSettings::from(config), reporter);
    runner.run(&config.input_dir, &config.output_dir)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn runtime_init_without_path_keeps_the_environment() {
        let before = std::env::var_os("ORT_DYLIB_PATH");
        onnx_init(None).unwrap();
        assert_eq!(std::env::var_os("ORT_DYLIB_PATH"), before);
    }

    #[test]
    fn missing_weights_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("images");
        std::fs::create_dir(&input).unwrap();
        image::RgbImage::new(8, 8).save(input.join("a.png")).unwrap();

        let output = dir.path().join("results");
        let config = RunConfig {
            input_dir: input,
            output_dir: output.clone(),
            model_path: dir.path().join("missing.onnx"),
            ..RunConfig::default()
        };

        let reporter = Arc::new(MemoryReporter::default());
        let summary = run(&config, reporter.clone()).unwrap();

        assert!(summary.is_none());
        assert!(!output.exists());
        assert!(reporter
            .events()
            .iter()
            .any(|e| matches!(e, RunEvent::ModelLoadFailed { .. })));
    }

    #[test]
    fn invalid_config_is_rejected_before_loading() {
        let config = RunConfig {
            confidence: 1.5,
            ..RunConfig::default()
        };
        let reporter = Arc::new(MemoryReporter::default());
        assert!(matches!(
            run(&config, reporter.clone()),
            Err(Error::InvalidConfig(_))
        ));
        assert!(reporter.events().is_empty());
    }
}
