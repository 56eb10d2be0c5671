//! The seam between the crop engine and concrete face detectors.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use anyhow::Result;
use facecrop_utils::{DetectorKind, timing_guard};
use image::RgbImage;

use crate::{error::CropError, postprocess::FaceCandidate};

/// A face detector the engine can drive.
///
/// Implementations may keep per-call state (the YuNet plan is resized to each
/// image), hence `&mut self`. An empty result means "no face" and is not an
/// error.
pub trait FaceDetector: Send {
    fn kind(&self) -> DetectorKind;

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceCandidate>>;
}

/// Serializes access to one detector shared by many callers.
///
/// The lock covers a whole `detect` call, so resizing the network input and
/// running it can never interleave with another request.
pub struct SharedDetector {
    kind: DetectorKind,
    inner: Mutex<Box<dyn FaceDetector>>,
}

impl SharedDetector {
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        Self {
            kind: detector.kind(),
            inner: Mutex::new(detector),
        }
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    pub fn detect(&self, image: &RgbImage) -> Result<Vec<FaceCandidate>, CropError> {
        let _guard = timing_guard("facecrop_core::detect", log::Level::Debug);
        // Detectors carry no cross-call invariants a panic could break.
        let mut detector = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        detector
            .detect(image)
            .map_err(|err| CropError::Detection(format!("{err:#}")))
    }
}

impl std::fmt::Debug for SharedDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDetector")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Detector that replays pre-recorded results, one list per call.
///
/// Once the script runs out the last list repeats. Useful wherever a
/// deterministic detector is needed without a model file: tests, benches,
/// and front-end smoke checks.
#[derive(Debug)]
pub struct ScriptedDetector {
    kind: DetectorKind,
    script: Vec<Vec<FaceCandidate>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn new(kind: DetectorKind, script: Vec<Vec<FaceCandidate>>) -> Self {
        Self {
            kind,
            script,
            calls: Default::default(),
        }
    }

    /// Always answer with the same candidates.
    pub fn repeating(kind: DetectorKind, candidates: Vec<FaceCandidate>) -> Self {
        Self::new(kind, vec![candidates])
    }

    /// Shared counter of `detect` calls, readable after the detector has
    /// been moved into a cropper.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl FaceDetector for ScriptedDetector {
    fn kind(&self) -> DetectorKind {
        self.kind
    }

    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<FaceCandidate>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_default())
    }
}
