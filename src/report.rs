//! Run events and the sinks that receive them.
//!
//! Every component that has something to say about a run takes a
//! [`Reporter`] at construction instead of logging through a global.

use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    ModelLoaded { path: PathBuf, classes: Vec<String> },
    ModelLoadFailed { path: PathBuf, reason: String },
    FontUnavailable { tried: Vec<PathBuf> },
    BatchAborted { reason: String },
    ImagesFound { count: usize },
    ImageSkipped { path: PathBuf, reason: String },
    DetectionFailed { reason: String },
    ImageFailed { path: PathBuf, reason: String },
    LabelOverwritten { path: PathBuf, label: PathBuf },
    ImageProcessed { path: PathBuf, detections: usize },
    SummaryWritten { path: PathBuf, images_processed: usize, total_detections: usize },
}

pub trait Reporter: Send + Sync {
    fn report(&self, event: &RunEvent);
}

/// Forwards events to `tracing` at a level matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &RunEvent) {
        match event {
            RunEvent::ModelLoaded { path, classes } => {
                tracing::info!(path = %path.display(), ?classes, "model loaded");
            }
            RunEvent::ModelLoadFailed { path, reason } => {
                tracing::error!(path = %path.display(), "failed to load model: {reason}");
            }
            RunEvent::FontUnavailable { tried } => {
                tracing::warn!(?tried, "no usable font, visualizations will carry boxes only");
            }
            RunEvent::BatchAborted { reason } => {
                tracing::error!("batch aborted: {reason}");
            }
            RunEvent::ImagesFound { count } => {
                tracing::info!("processing {count} images");
            }
            RunEvent::ImageSkipped { path, reason } => {
                tracing::debug!(path = %path.display(), "skipping undecodable image: {reason}");
            }
            RunEvent::DetectionFailed { reason } => {
                tracing::error!("detection failed: {reason}");
            }
            RunEvent::ImageFailed { path, reason } => {
                tracing::error!(path = %path.display(), "error processing image: {reason}");
            }
            RunEvent::LabelOverwritten { path, label } => {
                tracing::warn!(
                    path = %path.display(),
                    label = %label.display(),
                    "label file from an earlier image with the same stem was overwritten"
                );
            }
            RunEvent::ImageProcessed { path, detections } => {
                tracing::debug!(path = %path.display(), detections, "image processed");
            }
            RunEvent::SummaryWritten {
                path,
                images_processed,
                total_detections,
            } => {
                tracing::info!(
                    path = %path.display(),
                    images_processed,
                    total_detections,
                    "summary written"
                );
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<RunEvent>>,
}

impl MemoryReporter {
    pub fn events(&self) -> Vec<RunEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: &RunEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn memory_reporter_keeps_order() {
        let reporter = MemoryReporter::default();
        reporter.report(&RunEvent::ImagesFound { count: 2 });
        reporter.report(&RunEvent::BatchAborted {
            reason: "stop".to_string(),
        });
        assert_eq!(
            reporter.events(),
            vec![
                RunEvent::ImagesFound { count: 2 },
                RunEvent::BatchAborted {
                    reason: "stop".to_string()
                },
            ]
        );
    }

    #[test]
    fn reporters_work_as_trait_objects() {
        let sinks: Vec<Box<dyn Reporter>> =
            vec![Box::new(TracingReporter), Box::new(MemoryReporter::default())];
        for sink in &sinks {
            sink.report(&RunEvent::ImagesFound { count: 0 });
        }
    }
}
