use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use ndarray::{s, Array, ArrayView, Axis, Ix3, IxDyn};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use regex::Regex;
use std::path::Path;

use super::{InferenceBackend, RawBox, SessionOptions};

const INPUT_NAME: &str = "images";
const OUTPUT_NAME: &str = "output0";

pub struct YoloModel {
    session: Session,
    classes: Vec<String>,
    input_width: u32,
    input_height: u32,
    iou_threshold: f32,
}

impl YoloModel {
    pub fn new<P: AsRef<Path>>(model_path: P, options: &SessionOptions) -> Result<Self> {
        let session = build_session(model_path.as_ref(), options.intra_threads)
            .with_context(|| format!("building session for {}", model_path.as_ref().display()))?;

        let mut result = Self {
            session,
            classes: vec![],
            input_width: options.input_size,
            input_height: options.input_size,
            iou_threshold: options.iou_threshold,
        };
        result.classes = result.names().unwrap_or_default();
        Ok(result)
    }

    pub fn fetch_from_metadata(&self, key: &str) -> Option<String> {
        match self.session.metadata() {
            Err(_) => None,
            Ok(metadata) => metadata.custom(key).unwrap_or(None),
        }
    }

    /// Class names from the Ultralytics `names` metadata entry.
    pub fn names(&self) -> Option<Vec<String>> {
        self.fetch_from_metadata("names")
            .and_then(|names| parse_names(&names))
    }

    fn prepare_input(&self, img: &DynamicImage) -> Result<(Tensor<f32>, u32, u32)> {
        let (img_width, img_height) = (img.width(), img.height());
        let img_resized = img
            .resize_exact(self.input_width, self.input_height, FilterType::CatmullRom)
            .to_rgb8();

        let mut input = Array::zeros((1, 3, self.input_height as usize, self.input_width as usize));

        for (x, y, pixel) in img_resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            let [r, g, b] = pixel.0;
            input[[0, 0, y, x]] = (r as f32) / 255.0;
            input[[0, 1, y, x]] = (g as f32) / 255.0;
            input[[0, 2, y, x]] = (b as f32) / 255.0;
        }

        let tensor = Tensor::from_array(input)?;
        Ok((tensor, img_width, img_height))
    }

    fn process_output(
        &self,
        output: Array<f32, Ix3>,
        img_width: u32,
        img_height: u32,
        conf_threshold: f32,
    ) -> Vec<RawBox> {
        decode_predictions(
            output,
            (self.input_width, self.input_height),
            (img_width, img_height),
            conf_threshold,
            self.iou_threshold,
        )
    }
}

impl InferenceBackend for YoloModel {
    fn infer(&mut self, img: &DynamicImage, confidence: f32) -> Result<Vec<RawBox>> {
        let (input_tensor, original_w, original_h) = self.prepare_input(img)?;

        let output_array = {
            let outputs = self.session.run(inputs![INPUT_NAME => input_tensor])?;

            let (shape_ref, data_slice) = outputs[OUTPUT_NAME].try_extract_tensor::<f32>()?;
            let shape_usize: Vec<usize> = shape_ref.iter().map(|&x| x as usize).collect();

            let output_view_dyn = ArrayView::from_shape(IxDyn(&shape_usize), data_slice)?;
            let output_view_3d = output_view_dyn
                .into_dimensionality::<Ix3>()
                .context("model output is not three-dimensional")?;

            // [1, 4 + classes, candidates] -> [1, candidates, 4 + classes]
            output_view_3d.permuted_axes([0, 2, 1]).to_owned()
        };

        Ok(self.process_output(output_array, original_w, original_h, confidence))
    }

    fn class_names(&self) -> &[String] {
        &self.classes
    }
}

fn build_session(path: &Path, intra_threads: usize) -> ort::Result<Session> {
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(path)
}

/// Parses a Python dict literal such as `{0: 'pothole', 1: 'crack'}`.
pub fn parse_names(names: &str) -> Option<Vec<String>> {
    let re = Regex::new(r#"(['"])([-()\w '"]+)(['"])"#).ok()?;
    let parsed: Vec<String> = re
        .captures_iter(names)
        .map(|c| c.extract())
        .map(|(_, [_, name, _])| name.to_string())
        .collect();
    Some(parsed)
}

/// Turns transposed `[1, candidates, 4 + classes]` predictions into source-pixel
/// corner boxes, highest confidence first, after greedy IoU suppression.
///
/// Candidates must score strictly above `conf_threshold`. Corners are clipped
/// to the image.
pub fn decode_predictions(
    output: Array<f32, Ix3>,
    input_size: (u32, u32),
    image_size: (u32, u32),
    conf_threshold: f32,
    iou_threshold: f32,
) -> Vec<RawBox> {
    let (input_width, input_height) = (input_size.0 as f32, input_size.1 as f32);
    let (img_width, img_height) = (image_size.0 as f32, image_size.1 as f32);

    let mut boxes = Vec::new();
    let output_2d = output.slice(s![0, .., ..]);

    for row in output_2d.axis_iter(Axis(0)) {
        let row: Vec<f32> = row.iter().copied().collect();
        if row.len() < 5 {
            continue;
        }

        let prob = row[4..].iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if prob <= conf_threshold {
            continue;
        }

        let xc = row[0] / input_width * img_width;
        let yc = row[1] / input_height * img_height;
        let w = row[2] / input_width * img_width;
        let h = row[3] / input_height * img_height;

        boxes.push(RawBox {
            x1: (xc - w / 2.0).clamp(0.0, img_width),
            y1: (yc - h / 2.0).clamp(0.0, img_height),
            x2: (xc + w / 2.0).clamp(0.0, img_width),
            y2: (yc + h / 2.0).clamp(0.0, img_height),
            confidence: prob,
        });
    }

    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut result = Vec::new();
    while !boxes.is_empty() {
        let current = boxes.remove(0);
        result.push(current);
        boxes.retain(|other| iou(&current, other) < iou_threshold);
    }
    result
}

fn iou(box1: &RawBox, box2: &RawBox) -> f32 {
    let inter = intersection(box1, box2);
    let u = union_area(box1, box2, inter);
    if u == 0.0 {
        0.0
    } else {
        inter / u
    }
}

fn intersection(box1: &RawBox, box2: &RawBox) -> f32 {
    let x1 = box1.x1.max(box2.x1);
    let y1 = box1.y1.max(box2.y1);
    let x2 = box1.x2.min(box2.x2);
    let y2 = box1.y2.min(box2.y2);
    if x2 < x1 || y2 < y1 {
        return 0.0;
    }
    (x2 - x1) * (y2 - y1)
}

fn union_area(box1: &RawBox, box2: &RawBox, inter_area: f32) -> f32 {
    let area1 = (box1.x2 - box1.x1) * (box1.y2 - box1.y1);
    let area2 = (box2.x2 - box2.x1) * (box2.y2 - box2.y1);
    area1 + area2 - inter_area
}
