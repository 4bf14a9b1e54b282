use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use image::DynamicImage;

use super::{InferenceBackend, RawBox};

/// Replays canned answers, one per `infer` call, then answers with no boxes.
/// Every threshold it is called with is recorded.
pub(crate) struct ScriptedBackend {
    answers: VecDeque<Result<Vec<RawBox>, String>>,
    classes: Vec<String>,
    thresholds: Arc<Mutex<Vec<f32>>>,
}

impl ScriptedBackend {
    pub(crate) fn new(answers: Vec<Result<Vec<RawBox>, String>>) -> Self {
        Self {
            answers: answers.into(),
            classes: vec!["pothole".to_string()],
            thresholds: Arc::default(),
        }
    }

    /// Shared view of the thresholds seen so far; stays valid after the
    /// backend is boxed into a detector.
    pub(crate) fn thresholds(&self) -> Arc<Mutex<Vec<f32>>> {
        self.thresholds.clone()
    }

    /// Every call returns one box per entry of `counts`, in order.
    pub(crate) fn with_counts(counts: &[usize]) -> Self {
        Self::new(
            counts
                .iter()
                .map(|&n| Ok((0..n).map(|i| boxed(i as f32 * 10.0, 0.8)).collect()))
                .collect(),
        )
    }
}

pub(crate) fn boxed(offset: f32, confidence: f32) -> RawBox {
    RawBox {
        x1: offset,
        y1: offset,
        x2: offset + 4.0,
        y2: offset + 4.0,
        confidence,
    }
}

impl InferenceBackend for ScriptedBackend {
    fn infer(&mut self, _img: &DynamicImage, confidence: f32) -> anyhow::Result<Vec<RawBox>> {
        if let Ok(mut seen) = self.thresholds.lock() {
            seen.push(confidence);
        }
        match self.answers.pop_front() {
            Some(Ok(boxes)) => Ok(boxes),
            Some(Err(reason)) => Err(anyhow::anyhow!(reason)),
            None => Ok(vec![]),
        }
    }

    fn class_names(&self) -> &[String] {
        &self.classes
    }
}
