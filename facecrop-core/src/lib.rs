//! Face detection and crop geometry.
//!
//! This crate wraps the cascade (`rustface`) and YuNet (`tract-onnx`)
//! detectors behind one trait, picks the most prominent face, optionally
//! levels the eye line, and turns the face box into a fixed-size JPEG crop.

/// Eye-line angle and image rotation.
pub mod align;
/// SeetaFace cascade detector.
pub mod cascade;
/// Crop rectangle geometry for both margin policies.
pub mod cropper;
/// Detector trait, shared wrapper and a scripted detector.
pub mod detector;
pub mod error;
/// The end-to-end crop engine.
pub mod face_cropper;
/// ONNX model loading and execution.
pub mod model;
pub mod options;
/// Detection post-processing (NMS, score filtering).
pub mod postprocess;
/// Image pre-processing (padding, tensor conversion).
pub mod preprocess;
/// Named output sizes.
pub mod presets;
pub mod selector;
/// YuNet detector adapter.
pub mod yunet;

pub use align::{eye_line_angle, level_eye_line};
pub use cascade::CascadeDetector;
pub use cropper::{CropRect, MarginPolicy, compute_crop_rect};
pub use detector::{FaceDetector, ScriptedDetector, SharedDetector};
pub use error::{CropError, ErrorCategory};
pub use face_cropper::{CropOutcome, FaceCropper};
pub use model::YuNetModel;
pub use options::{CropperOptions, DEFAULT_JPEG_QUALITY};
pub use postprocess::{
    BoundingBox, EyeLandmarks, FaceCandidate, PostprocessConfig, apply_postprocess,
};
pub use preprocess::{InputMode, InputSize, PreprocessOutput, preprocess_image};
pub use presets::{OutputPreset, preset_by_name, standard_presets};
pub use selector::select_best;
pub use yunet::YuNetDetector;

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
