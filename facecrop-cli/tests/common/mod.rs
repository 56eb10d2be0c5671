//! Shared helpers for CLI integration tests.
use std::path::{Path, PathBuf};

use facecrop_utils::{DetectorKind, default_model_path};
use image::{Rgb, RgbImage};

/// Model for `kind` under the workspace `models/` directory, if present.
pub fn find_model_path(kind: DetectorKind) -> Option<PathBuf> {
    let path = Path::new("..").join(default_model_path(kind));
    if path.exists() {
        Some(path)
    } else {
        eprintln!("Skipping test: {kind} model not found at {}", path.display());
        None
    }
}

/// Write a flat grey PNG with no face in it.
pub fn write_blank_image(path: &Path) {
    RgbImage::from_pixel(96, 72, Rgb([128, 128, 128]))
        .save(path)
        .expect("save blank image");
}

pub fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
