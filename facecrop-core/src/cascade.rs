use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use facecrop_utils::DetectorKind;
use image::RgbImage;

use crate::detector::FaceDetector;
use crate::postprocess::{BoundingBox, FaceCandidate};

/// Sliding-window parameters for the SeetaFace funnel cascade. These are the
/// values the model ships tuned for.
const MIN_FACE_SIZE: u32 = 20;
const SCORE_THRESHOLD: f64 = 2.0;
const PYRAMID_SCALE: f32 = 0.8;
const WINDOW_STEP: u32 = 4;

/// Cascade classifier backed by `rustface`. Reports boxes only.
pub struct CascadeDetector {
    model: rustface::Model,
}

impl CascadeDetector {
    /// Read a SeetaFace model file (for example `seeta_fd_frontal_v1.0.bin`).
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());
        let file = File::open(path)
            .with_context(|| format!("failed to open cascade model {}", path.display()))?;
        let model = rustface::read_model(BufReader::new(file))
            .with_context(|| format!("failed to read cascade model {}", path.display()))?;
        Ok(Self { model })
    }
}

impl std::fmt::Debug for CascadeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeDetector").finish_non_exhaustive()
    }
}

impl FaceDetector for CascadeDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Cascade
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceCandidate>> {
        let gray = image::imageops::grayscale(image);
        let (width, height) = gray.dimensions();

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE);
        detector.set_slide_window_step(WINDOW_STEP, WINDOW_STEP);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));
        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceCandidate::from_box(
                    BoundingBox::new(
                        bbox.x() as f32,
                        bbox.y() as f32,
                        bbox.width() as f32,
                        bbox.height() as f32,
                    ),
                    face.score() as f32,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_model_is_reported() {
        let err = CascadeDetector::load("models/nope.bin").expect_err("missing");
        assert!(err.to_string().contains("model file not found"));
    }

    #[test]
    fn truncated_model_fails_to_load() {
        let mut temp = NamedTempFile::new().expect("temp file");
        temp.write_all(&[1, 2, 3]).expect("write");
        let err = CascadeDetector::load(temp.path()).expect_err("truncated");
        assert!(format!("{err:#}").contains("failed to read cascade model"));
    }
}
