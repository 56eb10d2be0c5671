//! The crop engine: decode, detect, optionally align, place the crop, resize
//! and encode.

use std::{
    borrow::Cow,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use facecrop_utils::{DetectorKind, decode_rgb, encode_jpeg, timing_guard};
use image::{RgbImage, imageops::FilterType};
use log::{debug, info};

use crate::align::{eye_line_angle, level_eye_line};
use crate::cascade::CascadeDetector;
use crate::cropper::{CropRect, compute_crop_rect};
use crate::detector::{FaceDetector, SharedDetector};
use crate::error::CropError;
use crate::options::CropperOptions;
use crate::postprocess::FaceCandidate;
use crate::selector::select_best;
use crate::yunet::YuNetDetector;

/// Everything known about one successful crop.
#[derive(Debug, Clone)]
pub struct CropOutcome {
    /// Encoded JPEG of exactly the configured output size.
    pub jpeg: Vec<u8>,
    /// Region cut from the (possibly rotated) source image.
    pub rect: CropRect,
    /// The face the crop was placed around.
    pub face: FaceCandidate,
    /// Whether the source was rotated to level the eyes first.
    pub aligned: bool,
    pub source_width: u32,
    pub source_height: u32,
}

/// A loaded detector plus the options that drive every crop.
///
/// `FaceCropper` is `Sync`; share one behind an `Arc` and call
/// [`process`](Self::process) from as many threads as needed. Detection calls
/// are serialized internally.
#[derive(Debug)]
pub struct FaceCropper {
    options: CropperOptions,
    detector: SharedDetector,
}

impl FaceCropper {
    /// Load the detector named by `options.detector` from `model_path`.
    pub fn new<P: AsRef<Path>>(model_path: P, options: CropperOptions) -> Result<Self, CropError> {
        let path = model_path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(CropError::ModelPathRequired);
        }
        let options = options.validated()?;
        let detector: Box<dyn FaceDetector> = match options.detector {
            DetectorKind::Cascade => Box::new(
                CascadeDetector::load(path).map_err(|err| CropError::model_load(path, &err))?,
            ),
            DetectorKind::Yunet => Box::new(
                YuNetDetector::new(path, options.postprocess())
                    .map_err(|err| CropError::model_load(path, &err))?,
            ),
        };
        info!(
            "loaded {} detector from {}",
            options.detector,
            path.display()
        );
        Ok(Self {
            options,
            detector: SharedDetector::new(detector),
        })
    }

    /// Build a cropper around any detector.
    ///
    /// The detector's own kind wins over `options.detector`.
    pub fn with_detector(
        detector: Box<dyn FaceDetector>,
        mut options: CropperOptions,
    ) -> Result<Self, CropError> {
        options.detector = detector.kind();
        let options = options.validated()?;
        Ok(Self {
            options,
            detector: SharedDetector::new(detector),
        })
    }

    pub fn options(&self) -> &CropperOptions {
        &self.options
    }

    pub fn detector_kind(&self) -> DetectorKind {
        self.detector.kind()
    }

    /// Crop the largest face in `bytes` and return it as JPEG.
    pub fn process(&self, bytes: &[u8]) -> Result<Vec<u8>, CropError> {
        self.process_detailed(bytes).map(|outcome| outcome.jpeg)
    }

    /// Like [`process`](Self::process), but gives up before any work if
    /// `cancelled` is already set.
    ///
    /// The flag is read once on entry only; a crop already past that point
    /// runs to completion.
    pub fn process_cancellable(
        &self,
        bytes: &[u8],
        cancelled: &AtomicBool,
    ) -> Result<Vec<u8>, CropError> {
        if cancelled.load(Ordering::Acquire) {
            return Err(CropError::Cancelled);
        }
        self.process(bytes)
    }

    pub fn process_detailed(&self, bytes: &[u8]) -> Result<CropOutcome, CropError> {
        if bytes.is_empty() {
            return Err(CropError::EmptyInput);
        }
        let image = {
            let _guard = timing_guard("facecrop_core::decode", log::Level::Debug);
            decode_rgb(bytes).map_err(|err| CropError::Decode(format!("{err:#}")))?
        };
        self.process_image(image)
    }

    /// Run the pipeline on an already decoded image.
    pub fn process_image(&self, image: RgbImage) -> Result<CropOutcome, CropError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(CropError::ZeroDimensions { width, height });
        }

        let candidates = self.detector.detect(&image)?;
        let mut face = select_best(&candidates)
            .cloned()
            .ok_or(CropError::NoFaceFound)?;
        debug!(
            "picked face at ({:.1}, {:.1}) {:.1}x{:.1} out of {} candidate(s)",
            face.bbox.x,
            face.bbox.y,
            face.bbox.width,
            face.bbox.height,
            candidates.len()
        );

        let mut active = Cow::Borrowed(&image);
        let mut aligned = false;
        if self.options.align_by_eyes
            && let Some(eyes) = face.eyes
        {
            let angle = eye_line_angle(&eyes);
            debug!("levelling eye line tilted by {angle:.2}°");
            let rotated = level_eye_line(&image, &face.bbox, angle);
            let candidates = self.detector.detect(&rotated)?;
            face = select_best(&candidates)
                .cloned()
                .ok_or(CropError::NoFaceAfterAlignment)?;
            face.eyes = None;
            active = Cow::Owned(rotated);
            aligned = true;
        }

        let rect = compute_crop_rect(
            width,
            height,
            &face.bbox,
            self.options.output_size(),
            self.options.margin,
        )?;
        let jpeg = self.materialize(&active, rect)?;

        Ok(CropOutcome {
            jpeg,
            rect,
            face,
            aligned,
            source_width: width,
            source_height: height,
        })
    }

    fn materialize(&self, image: &RgbImage, rect: CropRect) -> Result<Vec<u8>, CropError> {
        let _guard = timing_guard("facecrop_core::materialize", log::Level::Debug);
        let (out_w, out_h) = self.options.output_size();
        let region =
            image::imageops::crop_imm(image, rect.x1, rect.y1, rect.width(), rect.height())
                .to_image();
        let resized = image::imageops::resize(&region, out_w, out_h, FilterType::Lanczos3);
        encode_jpeg(&resized, self.options.jpeg_quality)
            .map_err(|err| CropError::codec(format!("{err:#}")))
    }
}
