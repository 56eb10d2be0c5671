//! Command-line argument definitions for facecrop.

use clap::{ArgAction, Parser};
use facecrop_utils::{DetectorKind, MarginMode};
use std::path::PathBuf;

/// Crop the most prominent face out of each image.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct CropArgs {
    /// Path to an image file or a directory containing images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory that receives the crops, mirroring the input tree.
    #[arg(long, default_value = "cropped")]
    pub output_dir: PathBuf,

    /// Exact output file; only valid when `--input` is a single file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Face detector: `cascade` or `yunet`.
    #[arg(long, value_name = "KIND")]
    pub detector: Option<DetectorKind>,

    /// Detector model file. Defaults to the settings file, then `models/`.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Optional settings JSON.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Named output size (id-photo, portrait, passport, square, avatar, linkedin, instagram).
    #[arg(long)]
    pub preset: Option<String>,

    /// Output width for crops (pixels). Overrides `--preset`.
    #[arg(long)]
    pub output_width: Option<u32>,

    /// Output height for crops (pixels). Overrides `--preset`.
    #[arg(long)]
    pub output_height: Option<u32>,

    /// Override score threshold.
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Override NMS threshold.
    #[arg(long)]
    pub nms_threshold: Option<f32>,

    /// Override top_k limit.
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Margin policy: `padding` or `scale`.
    #[arg(long, value_name = "MODE")]
    pub margin_mode: Option<MarginMode>,

    /// Padding on each side as a fraction of the face box (implies `--margin-mode padding`).
    #[arg(long)]
    pub padding_pct: Option<f32>,

    /// Width multiplier for the face box (implies `--margin-mode scale`).
    #[arg(long)]
    pub margin_scale_w: Option<f32>,

    /// Height multiplier for the face box (implies `--margin-mode scale`).
    #[arg(long)]
    pub margin_scale_h: Option<f32>,

    /// Level the eye line before cropping. Use `--align-by-eyes=false` to disable.
    #[arg(long)]
    pub align_by_eyes: Option<bool>,

    /// JPEG quality (1-100).
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,

    /// Write a JSON report of every input and its outcome.
    #[arg(long)]
    pub summary: Option<PathBuf>,
}
