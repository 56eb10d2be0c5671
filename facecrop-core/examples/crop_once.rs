//! Crop `input.jpg` with the YuNet detector and write `output_face.jpg`.
//!
//! Run from the workspace root so the model path resolves:
//! `cargo run -p facecrop-core --example crop_once`

use std::time::Instant;

use anyhow::Context;
use facecrop_core::{CropperOptions, FaceCropper};
use facecrop_utils::{DetectorKind, default_model_path};

fn main() -> anyhow::Result<()> {
    let input = "input.jpg";
    let output = "output_face.jpg";

    let cropper = FaceCropper::new(
        default_model_path(DetectorKind::Yunet),
        CropperOptions::neural(),
    )?;
    let bytes = std::fs::read(input).with_context(|| format!("failed to read {input}"))?;

    let start = Instant::now();
    let jpeg = cropper.process(&bytes)?;
    let elapsed = start.elapsed();

    std::fs::write(output, &jpeg).with_context(|| format!("failed to write {output}"))?;
    println!("{output} written in {:.3}s", elapsed.as_secs_f64());
    Ok(())
}
