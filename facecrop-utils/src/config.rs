//! Settings shared by the facecrop CLI and server.
//!
//! Settings are stored as JSON. Every section uses `#[serde(default)]`, so a
//! partial file is valid. Numeric crop and detection fields are optional: when
//! they are left out, the engine falls back to the defaults of the selected
//! detector kind instead of a single global default.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path, str::FromStr};

/// Which face detector backs the cropper.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Funnel-structured cascade classifier; boxes only.
    #[serde(alias = "haar", alias = "seeta")]
    Cascade,
    /// YuNet neural detector; boxes plus eye landmarks.
    #[default]
    #[serde(alias = "neural")]
    Yunet,
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectorKind::Cascade => "cascade",
            DetectorKind::Yunet => "yunet",
        })
    }
}

impl FromStr for DetectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" | "haar" | "seeta" => Ok(DetectorKind::Cascade),
            "yunet" | "neural" => Ok(DetectorKind::Yunet),
            other => Err(format!(
                "invalid detector '{other}'; expected 'cascade' or 'yunet'"
            )),
        }
    }
}

/// Conventional model location for each detector kind, relative to the working directory.
pub fn default_model_path(kind: DetectorKind) -> &'static str {
    match kind {
        DetectorKind::Cascade => "models/seeta_fd_frontal_v1.0.bin",
        DetectorKind::Yunet => "models/face_detection_yunet_2023mar.onnx",
    }
}

/// How the face box is grown before aspect correction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarginMode {
    /// Symmetric additive padding, a fraction of each box dimension.
    Padding,
    /// Multiplicative scale of the box width and height.
    Scale,
}

impl fmt::Display for MarginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarginMode::Padding => "padding",
            MarginMode::Scale => "scale",
        })
    }
}

impl FromStr for MarginMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "padding" | "pad" => Ok(MarginMode::Padding),
            "scale" | "margin-scale" | "margin_scale" => Ok(MarginMode::Scale),
            other => Err(format!(
                "invalid margin mode '{other}'; expected 'padding' or 'scale'"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorSettings {
    pub kind: DetectorKind,
    /// Model file; falls back to [`default_model_path`] when unset.
    pub model_path: Option<String>,
}

impl DetectorSettings {
    pub fn resolved_model_path(&self) -> &str {
        self.model_path
            .as_deref()
            .unwrap_or_else(|| default_model_path(self.kind))
    }
}

/// Detection tuning. Only the YuNet detector reads these.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nms_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

/// Output geometry and encoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CropSettings {
    /// Named output size such as `id-photo` or `portrait`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_mode: Option<MarginMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_pct: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_scale_w: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_scale_h: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align_by_eyes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jpeg_quality: Option<u8>,
}

/// Timing telemetry controls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Debug)
    }
}

/// HTTP front-end settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub listen_addr: String,
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:1323".to_string(),
            body_limit_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub detector: DetectorSettings,
    pub detection: DetectionSettings,
    pub crop: CropSettings,
    pub telemetry: TelemetrySettings,
    pub server: ServerSettings,
}

impl AppSettings {
    /// Read settings from a JSON file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))
    }

    /// Write settings as pretty JSON, creating parent directories as needed.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create settings directory {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{ "detector": { "kind": "haar" }, "crop": { "padding_pct": 0.18 } }"#;
        let settings: AppSettings = serde_json::from_str(json).expect("parse");
        assert_eq!(settings.detector.kind, DetectorKind::Cascade);
        assert_eq!(settings.crop.padding_pct, Some(0.18));
        assert_eq!(settings.crop.output_width, None);
        assert_eq!(settings.server.listen_addr, "0.0.0.0:1323");
        assert!(!settings.telemetry.enabled);
    }

    #[test]
    fn model_path_falls_back_per_kind() {
        let mut detector = DetectorSettings::default();
        assert_eq!(
            detector.resolved_model_path(),
            "models/face_detection_yunet_2023mar.onnx"
        );
        detector.kind = DetectorKind::Cascade;
        assert_eq!(
            detector.resolved_model_path(),
            "models/seeta_fd_frontal_v1.0.bin"
        );
        detector.model_path = Some("custom.bin".into());
        assert_eq!(detector.resolved_model_path(), "custom.bin");
    }

    #[test]
    fn save_and_load_preserves_settings() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/settings.json");

        let mut settings = AppSettings::default();
        settings.detector.kind = DetectorKind::Cascade;
        settings.crop.preset = Some("portrait".into());
        settings.crop.margin_mode = Some(MarginMode::Scale);
        settings.detection.top_k = Some(50);
        settings.save_to_path(&path).expect("save");

        let loaded = AppSettings::load_from_path(&path).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn malformed_json_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").expect("write");
        let err = AppSettings::load_from_path(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn enums_parse_from_cli_strings() {
        assert_eq!("Neural".parse::<DetectorKind>(), Ok(DetectorKind::Yunet));
        assert_eq!("seeta".parse::<DetectorKind>(), Ok(DetectorKind::Cascade));
        assert!("opencv".parse::<DetectorKind>().is_err());
        assert_eq!("margin-scale".parse::<MarginMode>(), Ok(MarginMode::Scale));
        assert_eq!(DetectorKind::Yunet.to_string(), "yunet");
    }

    #[test]
    fn telemetry_level_parses_with_fallback() {
        let mut telemetry = TelemetrySettings::default();
        assert_eq!(telemetry.level_filter(), LevelFilter::Debug);
        telemetry.level = "trace".into();
        assert_eq!(telemetry.level_filter(), LevelFilter::Trace);
        telemetry.level = "loud".into();
        assert_eq!(telemetry.level_filter(), LevelFilter::Debug);
    }
}
