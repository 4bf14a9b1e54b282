use std::sync::Arc;

use image::DynamicImage;

use crate::error::{Error, Result};
use crate::report::{Reporter, RunEvent};
use crate::yolo::{InferenceBackend, RawBox};

pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// A predicted pothole region in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl Detection {
    /// Rounds corners to whole pixels, clipped to a `width` x `height` image.
    pub fn from_corners(raw: &RawBox, (width, height): (u32, u32)) -> Self {
        let (w, h) = (width as f32, height as f32);
        let x1 = raw.x1.round().clamp(0.0, w);
        let y1 = raw.y1.round().clamp(0.0, h);
        let x2 = raw.x2.round().clamp(0.0, w);
        let y2 = raw.y2.round().clamp(0.0, h);
        Self {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1).max(0.0) as u32,
            height: (y2 - y1).max(0.0) as u32,
            confidence: raw.confidence,
        }
    }
}

/// Runs the loaded model, if any, and converts its boxes into [`Detection`]s.
pub struct Detector {
    backend: Option<Box<dyn InferenceBackend>>,
    reporter: Arc<dyn Reporter>,
}

impl Detector {
    pub fn new(backend: Option<Box<dyn InferenceBackend>>, reporter: Arc<dyn Reporter>) -> Self {
        Self { backend, reporter }
    }

    pub fn disabled(reporter: Arc<dyn Reporter>) -> Self {
        Self::new(None, reporter)
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_some()
    }

    /// Fail-open detection: an inference error is reported and yields no detections.
    pub fn detect(&mut self, img: &DynamicImage, confidence: f32) -> Vec<Detection> {
        match self.try_detect(img, confidence) {
            Ok(detections) => detections,
            Err(err) => {
                self.reporter.report(&RunEvent::DetectionFailed {
                    reason: err.to_string(),
                });
                vec![]
            }
        }
    }

    /// Like [`Detector::detect`] but hands inference errors back to the caller.
    pub fn try_detect(&mut self, img: &DynamicImage, confidence: f32) -> Result<Vec<Detection>> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(vec![]);
        };
        let bounds = (img.width(), img.height());
        let boxes = backend.infer(img, confidence).map_err(Error::Inference)?;
        Ok(boxes
            .iter()
            .map(|raw| Detection::from_corners(raw, bounds))
            .collect())
    }
}
