//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::Result;
use facecrop_utils::{AppSettings, MarginMode, normalize_path};
use log::info;

use crate::args::CropArgs;

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        Ok(AppSettings::default())
    }
}

/// Apply command-line arguments to override loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &CropArgs) {
    if let Some(kind) = args.detector {
        if kind != settings.detector.kind {
            // A model configured for the other detector cannot be reused.
            settings.detector.model_path = None;
        }
        settings.detector.kind = kind;
    }
    if let Some(model) = args.model.as_ref() {
        settings.detector.model_path = Some(model.display().to_string());
    }

    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = args.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            settings.telemetry.enabled = lower != "off";
            settings.telemetry.level = lower;
        }
    }

    let detection = &mut settings.detection;
    if let Some(score) = args.score_threshold {
        detection.score_threshold = Some(score);
    }
    if let Some(nms) = args.nms_threshold {
        detection.nms_threshold = Some(nms);
    }
    if let Some(top_k) = args.top_k {
        detection.top_k = Some(top_k);
    }

    let crop = &mut settings.crop;
    if let Some(preset) = args.preset.as_ref() {
        crop.preset = Some(preset.clone());
        // A preset on the command line beats sizes from the settings file.
        crop.output_width = None;
        crop.output_height = None;
    }
    if let Some(width) = args.output_width {
        crop.output_width = Some(width);
    }
    if let Some(height) = args.output_height {
        crop.output_height = Some(height);
    }

    if let Some(pct) = args.padding_pct {
        crop.padding_pct = Some(pct);
        crop.margin_mode = Some(MarginMode::Padding);
    }
    if args.margin_scale_w.is_some() || args.margin_scale_h.is_some() {
        crop.margin_scale_w = args.margin_scale_w.or(crop.margin_scale_w);
        crop.margin_scale_h = args.margin_scale_h.or(crop.margin_scale_h);
        crop.margin_mode = Some(MarginMode::Scale);
    }
    if let Some(mode) = args.margin_mode {
        crop.margin_mode = Some(mode);
    }

    if let Some(align) = args.align_by_eyes {
        crop.align_by_eyes = Some(align);
    }
    if let Some(quality) = args.jpeg_quality {
        crop.jpeg_quality = Some(quality);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use facecrop_utils::DetectorKind;

    fn parse(extra: &[&str]) -> CropArgs {
        let mut argv = vec!["facecrop", "--input", "photos"];
        argv.extend_from_slice(extra);
        CropArgs::parse_from(argv)
    }

    #[test]
    fn no_flags_leave_settings_untouched() {
        let mut settings = AppSettings::default();
        apply_cli_overrides(&mut settings, &parse(&[]));
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn switching_detector_drops_the_configured_model() {
        let mut settings = AppSettings::default();
        settings.detector.model_path = Some("models/custom.onnx".into());
        apply_cli_overrides(&mut settings, &parse(&["--detector", "haar"]));
        assert_eq!(settings.detector.kind, DetectorKind::Cascade);
        assert_eq!(
            settings.detector.resolved_model_path(),
            "models/seeta_fd_frontal_v1.0.bin"
        );
    }

    #[test]
    fn margin_flags_pick_their_policy() {
        let mut settings = AppSettings::default();
        apply_cli_overrides(&mut settings, &parse(&["--padding-pct", "0.2"]));
        assert_eq!(settings.crop.margin_mode, Some(MarginMode::Padding));
        assert_eq!(settings.crop.padding_pct, Some(0.2));

        apply_cli_overrides(&mut settings, &parse(&["--margin-scale-h", "2.2"]));
        assert_eq!(settings.crop.margin_mode, Some(MarginMode::Scale));
        assert_eq!(settings.crop.margin_scale_h, Some(2.2));
        assert_eq!(settings.crop.margin_scale_w, None);
    }

    #[test]
    fn preset_flag_replaces_file_sizes() {
        let mut settings = AppSettings::default();
        settings.crop.output_width = Some(100);
        settings.crop.output_height = Some(100);
        apply_cli_overrides(
            &mut settings,
            &parse(&["--preset", "passport", "--output-height", "600"]),
        );
        assert_eq!(settings.crop.preset.as_deref(), Some("passport"));
        assert_eq!(settings.crop.output_width, None);
        assert_eq!(settings.crop.output_height, Some(600));
    }

    #[test]
    fn telemetry_level_off_disables_telemetry() {
        let mut settings = AppSettings::default();
        apply_cli_overrides(
            &mut settings,
            &parse(&["--telemetry", "--telemetry-level", "OFF"]),
        );
        assert!(!settings.telemetry.enabled);

        apply_cli_overrides(&mut settings, &parse(&["--telemetry-level", " Trace "]));
        assert!(settings.telemetry.enabled);
        assert_eq!(settings.telemetry.level, "trace");
    }

    #[test]
    fn align_flag_takes_an_explicit_value() {
        let mut settings = AppSettings::default();
        apply_cli_overrides(&mut settings, &parse(&["--align-by-eyes", "false"]));
        assert_eq!(settings.crop.align_by_eyes, Some(false));
    }
}
