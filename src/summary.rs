use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-run tallies kept by the batch runner.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunCounters {
    pub images_processed: usize,
    pub total_detections: usize,
    pub images_failed: usize,
    pub images_skipped: usize,
    pub visualizations_written: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub images_processed: usize,
    pub total_detections: usize,
    pub average_per_image: f64,
    pub timestamp: DateTime<Local>,
    pub images_failed: usize,
    pub images_skipped: usize,
    pub visualizations_written: usize,
}

impl Summary {
    pub fn new(counters: &RunCounters, timestamp: DateTime<Local>) -> Self {
        Self {
            images_processed: counters.images_processed,
            total_detections: counters.total_detections,
            average_per_image: average(counters.total_detections, counters.images_processed),
            timestamp,
            images_failed: counters.images_failed,
            images_skipped: counters.images_skipped,
            visualizations_written: counters.visualizations_written,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Detections per processed image, 0 when nothing was processed.
pub fn average(total: usize, processed: usize) -> f64 {
    total as f64 / processed.max(1) as f64
}
