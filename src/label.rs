//! YOLO label files: one `class x_center y_center width height` line per box,
//! every coordinate normalised to the image size.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::detect::Detection;
use crate::error::{Error, Result};

pub const POTHOLE_CLASS: u32 = 0;

impl Detection {
    pub fn to_yolo_line(&self, img_width: u32, img_height: u32) -> String {
        let (iw, ih) = (img_width as f64, img_height as f64);
        let (w, h) = (self.width as f64, self.height as f64);
        let x_center = (self.x as f64 + w / 2.0) / iw;
        let y_center = (self.y as f64 + h / 2.0) / ih;
        format!(
            "{POTHOLE_CLASS} {x_center:.6} {y_center:.6} {:.6} {:.6}",
            w / iw,
            h / ih
        )
    }
}

pub fn render_labels(detections: &[Detection], img_width: u32, img_height: u32) -> String {
    let mut out = String::new();
    for det in detections {
        let _ = writeln!(out, "{}", det.to_yolo_line(img_width, img_height));
    }
    out
}

/// Writes `<labels_dir>/<stem>.txt`. Nothing is written for an empty slice.
pub fn write_label_file(
    labels_dir: &Path,
    stem: &str,
    detections: &[Detection],
    img_width: u32,
    img_height: u32,
) -> Result<Option<PathBuf>> {
    if detections.is_empty() {
        return Ok(None);
    }
    let path = labels_dir.join(format!("{stem}.txt"));
    fs::write(&path, render_labels(detections, img_width, img_height))
        .map_err(|e| Error::io(&path, e))?;
    Ok(Some(path))
}

#[cfg(test)]
mod test {
    use super::*;

    fn det(x: u32, y: u32, width: u32, height: u32) -> Detection {
        Detection {
            x,
            y,
            width,
            height,
            confidence: 0.9,
        }
    }

    #[test]
    fn line_format() {
        assert_eq!(
            det(10, 20, 30, 40).to_yolo_line(100, 200),
            "0 0.250000 0.200000 0.300000 0.200000"
        );
    }

    #[test]
    fn line_reconstructs_pixels() {
        let (iw, ih) = (1279u32, 719u32);
        for d in [det(0, 0, 1, 1), det(13, 7, 200, 91), det(1000, 600, 279, 119)] {
            let line = d.to_yolo_line(iw, ih);
            let fields: Vec<f64> = line
                .split(' ')
                .skip(1)
                .map(|f| f.parse().unwrap())
                .collect();
            let w = fields[2] * iw as f64;
            let h = fields[3] * ih as f64;
            let x = fields[0] * iw as f64 - w / 2.0;
            let y = fields[1] * ih as f64 - h / 2.0;
            assert!((x - d.x as f64).abs() < 0.01, "{line}");
            assert!((y - d.y as f64).abs() < 0.01, "{line}");
            assert!((w - d.width as f64).abs() < 0.01, "{line}");
            assert!((h - d.height as f64).abs() < 0.01, "{line}");
        }
    }

    #[test]
    fn one_line_per_detection() {
        let text = render_labels(&[det(0, 0, 10, 10), det(5, 5, 10, 10)], 20, 20);
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn empty_detections_write_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_label_file(dir.path(), "road", &[], 10, 10).unwrap();
        assert!(written.is_none());
        assert!(!dir.path().join("road.txt").exists());
    }

    #[test]
    fn label_file_holds_every_detection() {
        let dir = tempfile::tempdir().unwrap();
        let detections = [det(0, 0, 4, 4), det(4, 4, 4, 4), det(2, 2, 2, 2)];
        let path = write_label_file(dir.path(), "road", &detections, 8, 8)
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("road.txt"));
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), detections.len());
        assert_eq!(text.lines().next(), Some("0 0.250000 0.250000 0.500000 0.500000"));
    }
}
