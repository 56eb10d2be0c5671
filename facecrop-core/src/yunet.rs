use std::path::Path;

use anyhow::Result;
use facecrop_utils::{DetectorKind, timing_guard};
use image::RgbImage;

use crate::detector::FaceDetector;
use crate::model::YuNetModel;
use crate::postprocess::{FaceCandidate, PostprocessConfig, apply_postprocess};
use crate::preprocess::preprocess_image;

/// YuNet model coupled with its postprocessing thresholds.
///
/// Each call sizes the network to the image before inference; the plan is
/// only rebuilt when the size actually changes.
#[derive(Debug)]
pub struct YuNetDetector {
    model: YuNetModel,
    postprocess: PostprocessConfig,
}

impl YuNetDetector {
    pub fn new<P: AsRef<Path>>(model_path: P, postprocess: PostprocessConfig) -> Result<Self> {
        let model = YuNetModel::load(model_path)?;
        Ok(Self { model, postprocess })
    }

    pub fn postprocess_config(&self) -> &PostprocessConfig {
        &self.postprocess
    }
}

impl FaceDetector for YuNetDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Yunet
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceCandidate>> {
        let prep = preprocess_image(image, self.model.input_mode())?;
        self.model.set_input_size(prep.input_size)?;

        let raw = {
            let _guard = timing_guard("facecrop_core::onnx_inference", log::Level::Debug);
            self.model.run(prep.tensor)?
        };

        let _guard = timing_guard("facecrop_core::postprocess", log::Level::Trace);
        apply_postprocess(&raw, prep.scale_x, prep.scale_y, &self.postprocess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_fails_at_construction() {
        let err = YuNetDetector::new("models/absent.onnx", PostprocessConfig::default())
            .expect_err("missing model");
        assert!(err.to_string().contains("model file not found"));
    }
}
