use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pothole::{RunConfig, TracingReporter};

#[derive(Parser)]
#[command(name = "pothole")]
#[command(about = "Detect potholes in a directory of images and write YOLO labels")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory containing .jpg/.jpeg/.png/.bmp images
    #[arg(short, long, value_name = "DIR")]
    input: Option<PathBuf>,

    /// Directory receiving labels/, visualizations/ and summary.json
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// ONNX weights exported from the trained detector
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Minimum confidence for a box to be kept
    #[arg(long)]
    confidence: Option<f32>,

    /// IoU above which overlapping boxes are suppressed
    #[arg(long)]
    iou: Option<f32>,

    /// Number of processed images that get an annotated copy
    #[arg(long)]
    visualization_limit: Option<usize>,

    /// TrueType font for box labels
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// ONNX Runtime shared library
    #[arg(long, value_name = "FILE")]
    onnxruntime: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, config: &mut RunConfig) {
        if let Some(input) = self.input {
            config.input_dir = input;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(model) = self.model {
            config.model_path = model;
        }
        if let Some(confidence) = self.confidence {
            config.confidence = confidence;
        }
        if let Some(iou) = self.iou {
            config.iou_threshold = iou;
        }
        if let Some(limit) = self.visualization_limit {
            config.visualization_limit = limit;
        }
        if self.font.is_some() {
            config.font_path = self.font;
        }
        if self.onnxruntime.is_some() {
            config.onnxruntime_path = self.onnxruntime;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let mut config = RunConfig::load(args.config.as_deref()).context("loading configuration")?;
    args.apply(&mut config);
    tracing::debug!(?config, "configuration");

    pothole::onnx_init(config.onnxruntime_path.as_deref())?;

    let Some(summary) = pothole::run(&config, Arc::new(TracingReporter))? else {
        anyhow::bail!("no model available at {}", config.model_path.display());
    };

    println!();
    println!("RESULTS:");
    println!("Images:    {}", summary.images_processed);
    println!("Potholes:  {}", summary.total_detections);
    println!("Average:   {:.1} per image", summary.average_per_image);
    if summary.images_failed > 0 || summary.images_skipped > 0 {
        println!(
            "Failed:    {} (skipped {} unreadable)",
            summary.images_failed, summary.images_skipped
        );
    }
    println!("Output:    {}", config.output_dir.display());

    Ok(())
}
