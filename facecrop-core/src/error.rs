use std::path::PathBuf;

use thiserror::Error;

/// Coarse grouping of [`CropError`] variants, used by front-ends to pick a
/// status code or exit behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The cropper could not be built; nothing was processed.
    Construction,
    /// The request bytes were unusable.
    Input,
    /// No face was detected.
    NoFace,
    /// The crop rectangle collapsed.
    Geometry,
    /// Decode, detection, resize, or encode failed inside a collaborator.
    Codec,
    /// The caller cancelled before processing started.
    Cancelled,
}

/// Everything that can go wrong while building a cropper or cropping one image.
#[derive(Debug, Error)]
pub enum CropError {
    #[error("a model path is required")]
    ModelPathRequired,

    #[error("failed to load model {}: {reason}", path.display())]
    ModelLoadFailed { path: PathBuf, reason: String },

    #[error("invalid cropper options: {0}")]
    InvalidOptions(String),

    #[error("image bytes are empty")]
    EmptyInput,

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("image has zero dimensions ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("no face found")]
    NoFaceFound,

    #[error("no face found after eye alignment")]
    NoFaceAfterAlignment,

    #[error("invalid crop rectangle ({x1}, {y1}) - ({x2}, {y2})")]
    InvalidCropRect { x1: i64, y1: i64, x2: i64, y2: i64 },

    #[error("face detection failed: {0}")]
    Detection(String),

    #[error("image processing failed: {0}")]
    Codec(String),

    #[error("request cancelled")]
    Cancelled,
}

impl CropError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CropError::ModelPathRequired
            | CropError::ModelLoadFailed { .. }
            | CropError::InvalidOptions(_) => ErrorCategory::Construction,
            CropError::EmptyInput | CropError::Decode(_) | CropError::ZeroDimensions { .. } => {
                ErrorCategory::Input
            }
            CropError::NoFaceFound | CropError::NoFaceAfterAlignment => ErrorCategory::NoFace,
            CropError::InvalidCropRect { .. } => ErrorCategory::Geometry,
            CropError::Detection(_) | CropError::Codec(_) => ErrorCategory::Codec,
            CropError::Cancelled => ErrorCategory::Cancelled,
        }
    }

    pub(crate) fn model_load(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        CropError::ModelLoadFailed {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn codec(err: impl std::fmt::Display) -> Self {
        CropError::Codec(err.to_string())
    }
}
