use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};

use crate::detect::Detection;
use crate::error::{Error, Result};
use crate::report::{Reporter, RunEvent};

const LABEL_SCALE: f32 = 16.0;

/// Confidence band that picks the box color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Strictly above 0.7 is high, strictly above 0.5 is medium.
    pub fn of(confidence: f32) -> Self {
        if confidence > 0.7 {
            ConfidenceTier::High
        } else if confidence > 0.5 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn color(self) -> Rgb<u8> {
        match self {
            ConfidenceTier::High => Rgb([0, 255, 0]),
            ConfidenceTier::Medium => Rgb([255, 255, 0]),
            ConfidenceTier::Low => Rgb([255, 0, 0]),
        }
    }
}

fn font_candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(path) = configured {
        paths.push(path.to_path_buf());
    }
    if let Some(dir) = dirs::font_dir() {
        paths.push(dir.join("DejaVuSans.ttf"));
    }
    paths.extend(
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .map(PathBuf::from),
    );
    paths
}

/// Draws detections onto copies of source images.
pub struct Painter {
    font: Option<Font<'static>>,
    scale: Scale,
}

impl Painter {
    pub fn new(font: Option<Font<'static>>) -> Self {
        Self {
            font,
            scale: Scale::uniform(LABEL_SCALE),
        }
    }

    /// Uses the first readable TrueType font, starting with `configured`.
    pub fn load(configured: Option<&Path>, reporter: &dyn Reporter) -> Self {
        let tried = font_candidates(configured);
        let font = tried
            .iter()
            .filter_map(|path| fs::read(path).ok())
            .find_map(Font::try_from_vec);
        if font.is_none() {
            reporter.report(&RunEvent::FontUnavailable { tried });
        }
        Self::new(font)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn annotate(&self, img: &DynamicImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = img.to_rgb8();

        for det in detections {
            let color = ConfidenceTier::of(det.confidence).color();
            let (x, y) = (det.x as i32, det.y as i32);
            let (w, h) = (det.width.max(1), det.height.max(1));

            draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(w, h), color);
            if w > 2 && h > 2 {
                draw_hollow_rect_mut(&mut canvas, Rect::at(x + 1, y + 1).of_size(w - 2, h - 2), color);
            }

            if let Some(font) = &self.font {
                let label = format!("Pothole {:.2}", det.confidence);
                let (_, text_h) = text_size(self.scale, font, &label);
                let ty = if y - text_h - 2 >= 0 { y - text_h - 2 } else { y + 2 };
                draw_text_mut(&mut canvas, color, x, ty, self.scale, font, &label);
            }
        }

        canvas
    }

    /// Annotates `img` and encodes it according to the extension of `path`.
    pub fn save(&self, img: &DynamicImage, detections: &[Detection], path: &Path) -> Result<()> {
        self.annotate(img, detections)
            .save(path)
            .map_err(|source| Error::Encode {
                path: path.to_path_buf(),
                source,
            })
    }
}
