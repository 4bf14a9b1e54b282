use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use image::{DynamicImage, GenericImageView};

use crate::config::RunConfig;
use crate::detect::{Detection, Detector};
use crate::error::{Error, Result};
use crate::label::write_label_file;
use crate::report::{Reporter, RunEvent};
use crate::summary::{RunCounters, Summary};
use crate::visual::Painter;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];
pub const LABELS_DIR: &str = "labels";
pub const VISUALIZATIONS_DIR: &str = "visualizations";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSettings {
    pub confidence: f32,
    pub visualization_limit: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for BatchSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            confidence: config.confidence,
            visualization_limit: config.visualization_limit,
        }
    }
}

fn is_image_file(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Image files directly inside `dir`, ordered by file name, one entry per
/// canonical path.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));

    let mut seen = HashSet::new();
    images.retain(|path| {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        seen.insert(canonical)
    });
    Ok(images)
}

/// Runs the detector over a directory and writes labels, visualizations and
/// a summary under the output directory.
pub struct BatchRunner {
    detector: Detector,
    painter: Painter,
    settings: BatchSettings,
    reporter: Arc<dyn Reporter>,
    labels_written: HashSet<PathBuf>,
}

impl BatchRunner {
    pub fn new(
        detector: Detector,
        painter: Painter,
        settings: BatchSettings,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            detector,
            painter,
            settings,
            reporter,
            labels_written: HashSet::new(),
        }
    }

    /// Returns `Ok(None)` without touching `output_dir` when no model is loaded.
    pub fn run(&mut self, input_dir: &Path, output_dir: &Path) -> Result<Option<Summary>> {
        if !self.detector.is_loaded() {
            self.reporter.report(&RunEvent::BatchAborted {
                reason: "no model loaded".to_string(),
            });
            return Ok(None);
        }

        let images = collect_images(input_dir)?;

        let labels_dir = output_dir.join(LABELS_DIR);
        let vis_dir = output_dir.join(VISUALIZATIONS_DIR);
        for dir in [&labels_dir, &vis_dir] {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir.as_path(), e))?;
        }

        self.reporter.report(&RunEvent::ImagesFound {
            count: images.len(),
        });

        self.labels_written.clear();
        let mut counters = RunCounters::default();
        for path in &images {
            self.process_image(path, &labels_dir, &vis_dir, &mut counters);
        }

        let summary = Summary::new(&counters, Local::now());
        let summary_path = output_dir.join(SUMMARY_FILE);
        summary.write(&summary_path)?;
        self.reporter.report(&RunEvent::SummaryWritten {
            path: summary_path,
            images_processed: summary.images_processed,
            total_detections: summary.total_detections,
        });
        Ok(Some(summary))
    }

    fn process_image(
        &mut self,
        path: &Path,
        labels_dir: &Path,
        vis_dir: &Path,
        counters: &mut RunCounters,
    ) {
        let decoded = image::open(path).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        });
        let img = match decoded {
            Ok(img) => img,
            Err(err) => {
                counters.images_skipped += 1;
                self.reporter.report(&RunEvent::ImageSkipped {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
                return;
            }
        };

        let visualize = counters.images_processed < self.settings.visualization_limit;
        let result = match self.detector.try_detect(&img, self.settings.confidence) {
            Ok(detections) => self
                .persist(path, &img, &detections, labels_dir, vis_dir, visualize)
                .map(|drawn| (detections.len(), drawn)),
            Err(err) => Err(err),
        };

        match result {
            Ok((found, drawn)) => {
                counters.images_processed += 1;
                counters.total_detections += found;
                if drawn {
                    counters.visualizations_written += 1;
                }
                self.reporter.report(&RunEvent::ImageProcessed {
                    path: path.to_path_buf(),
                    detections: found,
                });
            }
            Err(err) => {
                counters.images_failed += 1;
                self.reporter.report(&RunEvent::ImageFailed {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Writes the visualization first so a failed save leaves no label behind.
    fn persist(
        &mut self,
        path: &Path,
        img: &DynamicImage,
        detections: &[Detection],
        labels_dir: &Path,
        vis_dir: &Path,
        visualize: bool,
    ) -> Result<bool> {
        let vis_path = if visualize {
            let name = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let vis_path = vis_dir.join(format!("vis_{name}"));
            self.painter.save(img, detections, &vis_path)?;
            Some(vis_path)
        } else {
            None
        };

        let (width, height) = img.dimensions();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let written = match write_label_file(labels_dir, &stem, detections, width, height) {
            Ok(written) => written,
            Err(err) => {
                if let Some(vis_path) = &vis_path {
                    let _ = fs::remove_file(vis_path);
                }
                return Err(err);
            }
        };

        if let Some(label) = written {
            if !self.labels_written.insert(label.clone()) {
                self.reporter.report(&RunEvent::LabelOverwritten {
                    path: path.to_path_buf(),
                    label,
                });
            }
        }
        Ok(vis_path.is_some())
    }
}
