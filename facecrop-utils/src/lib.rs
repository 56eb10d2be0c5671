//! Common helpers shared across the facecrop crates.

/// Application configuration and settings management.
pub mod config;
/// Image decoding, encoding, and tensor conversion.
pub mod image_utils;
/// Planar point math used by eye alignment.
pub mod point;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use config::{AppSettings, DetectorKind, MarginMode, default_model_path};
pub use image_utils::{decode_rgb, encode_jpeg, rgb_to_bgr_chw_padded, sniff_mime};
pub use point::Point;
pub use telemetry::{configure as configure_telemetry, timing_guard, timing_guard_if};

/// Initialize logging once for the CLI and server binaries.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies. Telemetry
/// records are always let through so `--telemetry` works without touching
/// the environment.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(telemetry::TARGET, LevelFilter::Trace);

    // A second call (tests, embedded use) keeps the first logger.
    let _ = builder.try_init();
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_rejects_missing_paths() {
        let err = normalize_path("definitely/not/here.jpg").expect_err("missing path");
        assert!(err.to_string().contains("path does not exist"));
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LevelFilter::Warn).expect("first init");
        init_logging(LevelFilter::Debug).expect("second init");
    }
}
