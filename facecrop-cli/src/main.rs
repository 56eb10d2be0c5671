mod args;
mod config;
mod input;

use std::{
    fs::{self, File},
    path::Path,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use facecrop_core::{CropperOptions, FaceCropper};
use facecrop_utils::{configure_telemetry, init_logging, normalize_path};
use log::{info, warn};
use serde::Serialize;

use crate::{
    args::CropArgs,
    config::{apply_cli_overrides, load_settings},
    input::{ProcessingItem, collect_targets},
};

#[derive(Debug, Serialize)]
struct CropRecord {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    detector: String,
    processed: usize,
    failed: usize,
    results: Vec<CropRecord>,
}

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = CropArgs::parse();

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    let input_path = normalize_path(&args.input)?;
    let items = collect_targets(&input_path, &args.output_dir, args.output.as_deref())?;

    let options = CropperOptions::from_settings(&settings)?;
    let model_path = settings.detector.resolved_model_path();
    info!(
        "Loading {} detector from {}",
        settings.detector.kind, model_path
    );
    let cropper = FaceCropper::new(model_path, options)?;

    info!("Processing {} image(s)...", items.len());
    let started = Instant::now();
    let mut results = Vec::with_capacity(items.len());
    let mut failed = 0;
    for item in &items {
        match crop_one(&cropper, item) {
            Ok(()) => {
                info!("{} -> {}", item.source.display(), item.output.display());
                results.push(CropRecord {
                    input: item.source.display().to_string(),
                    output: Some(item.output.display().to_string()),
                    error: None,
                });
            }
            Err(err) => {
                warn!("Failed to process {}: {err:#}", item.source.display());
                failed += 1;
                results.push(CropRecord {
                    input: item.source.display().to_string(),
                    output: None,
                    error: Some(format!("{err:#}")),
                });
            }
        }
    }
    info!(
        "Cropped {} of {} image(s) in {:.2?}",
        items.len() - failed,
        items.len(),
        started.elapsed()
    );

    if let Some(summary_path) = args.summary.as_ref() {
        let summary = RunSummary {
            detector: cropper.detector_kind().to_string(),
            processed: items.len() - failed,
            failed,
            results,
        };
        write_summary(summary_path, &summary)?;
    }

    if failed == items.len() {
        anyhow::bail!("all {} image(s) failed; no crops written", items.len());
    }
    Ok(())
}

fn crop_one(cropper: &FaceCropper, item: &ProcessingItem) -> Result<()> {
    let bytes = fs::read(&item.source)
        .with_context(|| format!("failed to read {}", item.source.display()))?;
    let jpeg = cropper.process(&bytes)?;
    if let Some(parent) = item.output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(&item.output, jpeg)
        .with_context(|| format!("failed to write {}", item.output.display()))
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, summary)
        .with_context(|| format!("failed to write summary to {}", path.display()))?;
    info!("Wrote summary to {}", path.display());
    Ok(())
}
