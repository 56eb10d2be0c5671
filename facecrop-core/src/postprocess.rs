use anyhow::Result;
use facecrop_utils::Point;
use std::cmp::Ordering;
use tract_onnx::prelude::{Tensor, tract_ndarray::ArrayView2};

/// Columns per decoded YuNet row:
/// `[x, y, w, h, re_x, re_y, le_x, le_y, nt_x, nt_y, rcm_x, rcm_y, lcm_x, lcm_y, score]`.
pub(crate) const ROW_COLS: usize = 15;

/// Score filtering and suppression parameters for the neural detector.
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessConfig {
    /// Minimum confidence for a candidate to survive.
    pub score_threshold: f32,
    /// IoU above which the lower-scored of two overlapping boxes is dropped.
    pub nms_threshold: f32,
    /// Maximum candidates kept after sorting by score, before NMS. `0` keeps all.
    pub top_k: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            nms_threshold: 0.3,
            top_k: 5_000,
        }
    }
}

/// Axis-aligned bounding box in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// The x-coordinate of the top-left corner.
    pub x: f32,
    /// The y-coordinate of the top-left corner.
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area of the box; negative extents count as zero.
    pub fn area(&self) -> f32 {
        (self.width.max(0.0)) * (self.height.max(0.0))
    }

    pub fn center(&self) -> Point {
        Point::new(
            0.5f32.mul_add(self.width, self.x),
            0.5f32.mul_add(self.height, self.y),
        )
    }

    /// Intersection over Union with another box.
    pub fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Eye centres of a detected face.
///
/// `left` and `right` refer to image positions: on an upright face `left.x`
/// is smaller than `right.x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeLandmarks {
    pub left: Point,
    pub right: Point,
}

/// One face reported by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceCandidate {
    pub bbox: BoundingBox,
    /// Present only for detectors that report landmarks.
    pub eyes: Option<EyeLandmarks>,
    pub score: f32,
}

impl FaceCandidate {
    /// A candidate with no landmarks, as the cascade detector produces.
    pub fn from_box(bbox: BoundingBox, score: f32) -> Self {
        Self {
            bbox,
            eyes: None,
            score,
        }
    }

    pub fn with_eyes(mut self, left: Point, right: Point) -> Self {
        self.eyes = Some(EyeLandmarks { left, right });
        self
    }
}

/// Turn decoded YuNet rows into filtered face candidates.
///
/// `scale_x` / `scale_y` map network coordinates back to the source image
/// (both `1.0` when the image was padded rather than resized). Filtering
/// order: score threshold, sort by descending score, `top_k` truncation,
/// then greedy NMS.
pub fn apply_postprocess(
    output: &Tensor,
    scale_x: f32,
    scale_y: f32,
    config: &PostprocessConfig,
) -> Result<Vec<FaceCandidate>> {
    let rows = detection_rows(output)?;

    let mut candidates = Vec::new();
    for row in rows.rows() {
        let score = row[14];
        if !score.is_finite() || score < config.score_threshold {
            continue;
        }

        let bbox = BoundingBox::new(
            row[0] * scale_x,
            row[1] * scale_y,
            row[2] * scale_x,
            row[3] * scale_y,
        );
        if bbox.width <= 0.0 || bbox.height <= 0.0 {
            continue;
        }

        // YuNet's "right eye" sits on the image-left side of an upright face.
        candidates.push(FaceCandidate::from_box(bbox, score).with_eyes(
            Point::new(row[4] * scale_x, row[5] * scale_y),
            Point::new(row[6] * scale_x, row[7] * scale_y),
        ));
    }

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    if config.top_k > 0 && candidates.len() > config.top_k {
        candidates.truncate(config.top_k);
    }

    if config.nms_threshold > 0.0 && candidates.len() > 1 {
        candidates = non_max_suppression(candidates, config.nms_threshold);
    }

    Ok(candidates)
}

fn detection_rows(output: &Tensor) -> Result<ArrayView2<'_, f32>> {
    let rows = match output.shape() {
        [rows, ROW_COLS] => *rows,
        [1, rows, ROW_COLS] => *rows,
        other => anyhow::bail!(
            "YuNet output must have shape [N, 15] or [1, N, 15] (got {:?})",
            other
        ),
    };

    let slice = output
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("YuNet output is not f32: {e}"))?;

    ArrayView2::from_shape((rows, ROW_COLS), slice)
        .map_err(|_| anyhow::anyhow!("YuNet output data is not contiguous"))
}

fn non_max_suppression(candidates: Vec<FaceCandidate>, threshold: f32) -> Vec<FaceCandidate> {
    let mut kept: Vec<FaceCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept
            .iter()
            .all(|existing| candidate.bbox.iou(&existing.bbox) <= threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}
