use facecrop_utils::{AppSettings, DetectorKind, MarginMode};
use log::warn;

use crate::cropper::MarginPolicy;
use crate::error::CropError;
use crate::postprocess::PostprocessConfig;
use crate::presets::preset_by_name;

/// Default JPEG quality for encoded crops.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Everything a [`FaceCropper`](crate::FaceCropper) needs besides the model.
#[derive(Debug, Clone, PartialEq)]
pub struct CropperOptions {
    pub detector: DetectorKind,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub top_k: usize,
    pub output_width: u32,
    pub output_height: u32,
    pub margin: MarginPolicy,
    /// Rotate to level the eyes and detect again before cropping.
    pub align_by_eyes: bool,
    pub jpeg_quality: u8,
}

impl CropperOptions {
    /// Defaults for the cascade detector: 354×472 output, 15% padding.
    pub fn cascade() -> Self {
        Self {
            detector: DetectorKind::Cascade,
            score_threshold: 0.6,
            nms_threshold: 0.3,
            top_k: 5_000,
            output_width: 354,
            output_height: 472,
            margin: MarginPolicy::Padding { pct: 0.15 },
            align_by_eyes: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Defaults for the YuNet detector: 480×600 output, 1.6×2.0 margins, eye alignment on.
    pub fn neural() -> Self {
        Self {
            detector: DetectorKind::Yunet,
            score_threshold: 0.7,
            nms_threshold: 0.3,
            top_k: 5_000,
            output_width: 480,
            output_height: 600,
            margin: MarginPolicy::Scale {
                width: 1.6,
                height: 2.0,
            },
            align_by_eyes: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn for_detector(kind: DetectorKind) -> Self {
        match kind {
            DetectorKind::Cascade => Self::cascade(),
            DetectorKind::Yunet => Self::neural(),
        }
    }

    /// Start from the detector's defaults and overlay every field the
    /// settings file sets.
    ///
    /// An explicit `output_width`/`output_height` wins over a preset. An
    /// unknown preset is an error.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, CropError> {
        let mut options = Self::for_detector(settings.detector.kind);
        let detection = &settings.detection;
        let crop = &settings.crop;

        if let Some(v) = detection.score_threshold {
            options.score_threshold = v;
        }
        if let Some(v) = detection.nms_threshold {
            options.nms_threshold = v;
        }
        if let Some(v) = detection.top_k {
            options.top_k = v;
        }

        if let Some(name) = crop.preset.as_deref() {
            let preset = preset_by_name(name)
                .ok_or_else(|| CropError::InvalidOptions(format!("unknown preset '{name}'")))?;
            options.output_width = preset.width;
            options.output_height = preset.height;
        }
        if let Some(v) = crop.output_width {
            options.output_width = v;
        }
        if let Some(v) = crop.output_height {
            options.output_height = v;
        }

        let mode = crop.margin_mode.unwrap_or(match options.margin {
            MarginPolicy::Padding { .. } => MarginMode::Padding,
            MarginPolicy::Scale { .. } => MarginMode::Scale,
        });
        options.margin = match (mode, options.margin) {
            (MarginMode::Padding, MarginPolicy::Padding { pct }) => MarginPolicy::Padding {
                pct: crop.padding_pct.unwrap_or(pct),
            },
            (MarginMode::Padding, MarginPolicy::Scale { .. }) => MarginPolicy::Padding {
                pct: crop
                    .padding_pct
                    .unwrap_or(Self::cascade_padding_pct()),
            },
            (MarginMode::Scale, MarginPolicy::Scale { width, height }) => MarginPolicy::Scale {
                width: crop.margin_scale_w.unwrap_or(width),
                height: crop.margin_scale_h.unwrap_or(height),
            },
            (MarginMode::Scale, MarginPolicy::Padding { .. }) => {
                let (width, height) = Self::neural_scales();
                MarginPolicy::Scale {
                    width: crop.margin_scale_w.unwrap_or(width),
                    height: crop.margin_scale_h.unwrap_or(height),
                }
            }
        };

        if let Some(v) = crop.align_by_eyes {
            options.align_by_eyes = v;
        }
        if let Some(v) = crop.jpeg_quality {
            options.jpeg_quality = v;
        }
        Ok(options)
    }

    fn cascade_padding_pct() -> f32 {
        match Self::cascade().margin {
            MarginPolicy::Padding { pct } => pct,
            MarginPolicy::Scale { .. } => 0.0,
        }
    }

    fn neural_scales() -> (f32, f32) {
        match Self::neural().margin {
            MarginPolicy::Scale { width, height } => (width, height),
            MarginPolicy::Padding { .. } => (1.0, 1.0),
        }
    }

    /// Check invariants and normalise out-of-range values.
    ///
    /// Zero output dimensions are rejected; negative margins become zero and
    /// JPEG quality is clamped to `1..=100`. Alignment is switched off for the
    /// cascade detector, which has no landmarks.
    pub fn validated(mut self) -> Result<Self, CropError> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(CropError::InvalidOptions(format!(
                "output size must be positive, got {}x{}",
                self.output_width, self.output_height
            )));
        }
        self.margin = self.margin.sanitized();
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if self.align_by_eyes && self.detector == DetectorKind::Cascade {
            warn!("eye alignment needs landmarks; ignored for the cascade detector");
            self.align_by_eyes = false;
        }
        Ok(self)
    }

    pub fn output_size(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    pub fn postprocess(&self) -> PostprocessConfig {
        PostprocessConfig {
            score_threshold: self.score_threshold,
            nms_threshold: self.nms_threshold,
            top_k: self.top_k,
        }
    }
}

impl Default for CropperOptions {
    fn default() -> Self {
        Self::neural()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_defaults() {
        let cascade = CropperOptions::cascade();
        assert_eq!(cascade.score_threshold, 0.6);
        assert_eq!(cascade.output_size(), (354, 472));
        assert_eq!(cascade.margin, MarginPolicy::Padding { pct: 0.15 });
        assert!(!cascade.align_by_eyes);

        let neural = CropperOptions::neural();
        assert_eq!(neural.score_threshold, 0.7);
        assert_eq!(neural.top_k, 5_000);
        assert_eq!(neural.output_size(), (480, 600));
        assert!(neural.align_by_eyes);
    }

    #[test]
    fn empty_settings_resolve_to_kind_defaults() {
        let mut settings = AppSettings::default();
        assert_eq!(
            CropperOptions::from_settings(&settings).expect("options"),
            CropperOptions::neural()
        );
        settings.detector.kind = DetectorKind::Cascade;
        assert_eq!(
            CropperOptions::from_settings(&settings).expect("options"),
            CropperOptions::cascade()
        );
    }

    #[test]
    fn settings_override_individual_fields() {
        let mut settings = AppSettings::default();
        settings.detector.kind = DetectorKind::Cascade;
        settings.crop.padding_pct = Some(0.18);
        settings.crop.preset = Some("portrait".into());
        settings.crop.output_height = Some(640);
        settings.detection.score_threshold = Some(0.5);

        let options = CropperOptions::from_settings(&settings).expect("options");
        assert_eq!(options.margin, MarginPolicy::Padding { pct: 0.18 });
        assert_eq!(options.output_size(), (480, 640));
        assert_eq!(options.score_threshold, 0.5);
        assert_eq!(options.nms_threshold, 0.3);
    }

    #[test]
    fn margin_mode_can_cross_detector_defaults() {
        let mut settings = AppSettings::default();
        settings.crop.margin_mode = Some(MarginMode::Padding);
        let options = CropperOptions::from_settings(&settings).expect("options");
        assert_eq!(options.margin, MarginPolicy::Padding { pct: 0.15 });

        settings.detector.kind = DetectorKind::Cascade;
        settings.crop.margin_mode = Some(MarginMode::Scale);
        settings.crop.margin_scale_h = Some(2.4);
        let options = CropperOptions::from_settings(&settings).expect("options");
        assert_eq!(
            options.margin,
            MarginPolicy::Scale {
                width: 1.6,
                height: 2.4
            }
        );
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let mut settings = AppSettings::default();
        settings.crop.preset = Some("poster".into());
        let err = CropperOptions::from_settings(&settings).expect_err("unknown preset");
        assert!(err.to_string().contains("poster"));
    }

    #[test]
    fn validation_rejects_zero_output_and_cleans_margins() {
        let mut options = CropperOptions::neural();
        options.output_width = 0;
        assert!(matches!(
            options.validated(),
            Err(CropError::InvalidOptions(_))
        ));

        let mut options = CropperOptions::cascade();
        options.margin = MarginPolicy::Padding { pct: -0.2 };
        options.align_by_eyes = true;
        options.jpeg_quality = 0;
        let options = options.validated().expect("valid");
        assert_eq!(options.margin, MarginPolicy::Padding { pct: 0.0 });
        assert!(!options.align_by_eyes);
        assert_eq!(options.jpeg_quality, 1);
    }
}
