use image::DynamicImage;

pub mod loader;
pub mod model;
#[cfg(test)]
pub(crate) mod scripted;

pub use loader::load_model;
pub use model::YoloModel;

/// One box as reported by the model, corner coordinates in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub input_size: u32,
    pub intra_threads: usize,
    pub iou_threshold: f32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            input_size: 640,
            intra_threads: 4,
            iou_threshold: 0.45,
        }
    }
}

/// Single-image inference over an opaque pretrained model.
pub trait InferenceBackend {
    /// Boxes scoring at least `confidence`, in the model's own output order.
    fn infer(&mut self, img: &DynamicImage, confidence: f32) -> anyhow::Result<Vec<RawBox>>;

    fn class_names(&self) -> &[String];
}
