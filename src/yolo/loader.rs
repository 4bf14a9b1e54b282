use std::path::Path;

use crate::error::Error;
use crate::report::{Reporter, RunEvent};

use super::{InferenceBackend, SessionOptions, YoloModel};

/// Opens the weights at `path`, or reports why it could not and returns `None`.
pub fn load_model(
    path: &Path,
    options: &SessionOptions,
    reporter: &dyn Reporter,
) -> Option<YoloModel> {
    match try_load_model(path, options) {
        Ok(model) => {
            reporter.report(&RunEvent::ModelLoaded {
                path: path.to_path_buf(),
                classes: model.class_names().to_vec(),
            });
            Some(model)
        }
        Err(err) => {
            reporter.report(&RunEvent::ModelLoadFailed {
                path: path.to_path_buf(),
                reason: err.to_string(),
            });
            None
        }
    }
}

fn try_load_model(path: &Path, options: &SessionOptions) -> Result<YoloModel, Error> {
    if !path.is_file() {
        return Err(Error::ModelNotFound(path.to_path_buf()));
    }
    tracing::debug!(path = %path.display(), ?options, "loading model");
    YoloModel::new(path, options).map_err(|cause| Error::ModelLoad {
        path: path.to_path_buf(),
        cause,
    })
}
