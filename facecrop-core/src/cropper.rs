//! Crop rectangle geometry.
//!
//! Two margin policies turn a detected face box into a crop at the output
//! aspect ratio:
//!
//! * [`MarginPolicy::Scale`] multiplies the box, biases the centre towards the
//!   upper face, clamps each edge to the image and then pushes the opposite
//!   edge back out to recover the intended extent.
//! * [`MarginPolicy::Padding`] pads the box symmetrically, grows it to the
//!   target ratio around its midpoint and shifts the whole rectangle back
//!   inside the image (left, top, right, bottom, in that order) before a final
//!   clamp.
//!
//! Both only ever grow the margin-expanded box during aspect correction.

use crate::error::CropError;
use crate::postprocess::BoundingBox;

/// Fraction of the face height at which the margin-scale crop is centred.
const VERTICAL_BIAS: f64 = 0.45;

/// How the detected face box is expanded before aspect correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginPolicy {
    /// Multiply the box width and height.
    Scale { width: f32, height: f32 },
    /// Add `pct` of each box dimension on both sides.
    Padding { pct: f32 },
}

impl MarginPolicy {
    /// Negative or NaN factors become zero.
    pub fn sanitized(self) -> Self {
        let clean = |v: f32| if v.is_nan() { 0.0 } else { v.max(0.0) };
        match self {
            MarginPolicy::Scale { width, height } => MarginPolicy::Scale {
                width: clean(width),
                height: clean(height),
            },
            MarginPolicy::Padding { pct } => MarginPolicy::Padding { pct: clean(pct) },
        }
    }
}

/// Final crop rectangle, half-open: `[x1, x2) × [y1, y2)`.
///
/// Only constructed through [`CropRect::new`], which guarantees
/// `0 <= x1 < x2 <= width` and `0 <= y1 < y2 <= height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRect {
    /// Validate raw edges against an image of `width × height`.
    pub fn new(
        x1: i64,
        y1: i64,
        x2: i64,
        y2: i64,
        width: u32,
        height: u32,
    ) -> Result<Self, CropError> {
        let in_bounds = 0 <= x1 && x1 < x2 && x2 <= i64::from(width);
        let in_bounds = in_bounds && 0 <= y1 && y1 < y2 && y2 <= i64::from(height);
        if !in_bounds {
            return Err(CropError::InvalidCropRect { x1, y1, x2, y2 });
        }
        Ok(Self {
            x1: x1 as u32,
            y1: y1 as u32,
            x2: x2 as u32,
            y2: y2 as u32,
        })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Compute the crop rectangle for `face` inside an `img_w × img_h` image.
///
/// `output` is the final `(width, height)` and fixes the aspect ratio.
///
/// # Example
///
/// ```
/// use facecrop_core::{BoundingBox, MarginPolicy, compute_crop_rect};
///
/// let face = BoundingBox::new(450.0, 400.0, 100.0, 125.0);
/// let rect = compute_crop_rect(
///     1000,
///     1000,
///     &face,
///     (480, 600),
///     MarginPolicy::Scale { width: 1.6, height: 2.0 },
/// )
/// .unwrap();
/// assert_eq!((rect.width(), rect.height()), (200, 250));
///
/// let padded = compute_crop_rect(
///     1000,
///     1000,
///     &face,
///     (354, 472),
///     MarginPolicy::Padding { pct: 0.15 },
/// )
/// .unwrap();
/// assert!(padded.width() >= 130);
/// ```
pub fn compute_crop_rect(
    img_w: u32,
    img_h: u32,
    face: &BoundingBox,
    output: (u32, u32),
    policy: MarginPolicy,
) -> Result<CropRect, CropError> {
    let (out_w, out_h) = output;
    if out_w == 0 || out_h == 0 {
        return Err(CropError::InvalidOptions(format!(
            "output size must be positive, got {out_w}x{out_h}"
        )));
    }
    let target = f64::from(out_w) / f64::from(out_h);

    match policy.sanitized() {
        MarginPolicy::Scale { width, height } => {
            scaled_rect(img_w, img_h, face, target, f64::from(width), f64::from(height))
        }
        MarginPolicy::Padding { pct } => padded_rect(img_w, img_h, face, target, f64::from(pct)),
    }
}

fn scaled_rect(
    img_w: u32,
    img_h: u32,
    face: &BoundingBox,
    target: f64,
    scale_w: f64,
    scale_h: f64,
) -> Result<CropRect, CropError> {
    let (x, y) = (f64::from(face.x), f64::from(face.y));
    let (w, h) = (f64::from(face.width), f64::from(face.height));

    let cx = w.mul_add(0.5, x);
    let cy = h.mul_add(VERTICAL_BIAS, y);

    let mut box_w = w * scale_w;
    let mut box_h = h * scale_h;
    if !(box_w > 0.0 || box_h > 0.0) {
        return Err(CropError::InvalidCropRect {
            x1: cx.round() as i64,
            y1: cy.round() as i64,
            x2: cx.round() as i64,
            y2: cy.round() as i64,
        });
    }
    if box_w / box_h > target {
        box_h = box_w / target;
    } else {
        box_w = box_h * target;
    }

    let (x1, x2) = place_axis(cx, box_w, i64::from(img_w));
    let (y1, y2) = place_axis(cy, box_h, i64::from(img_h));
    if x2 <= x1 || y2 <= y1 {
        return Err(CropError::InvalidCropRect { x1, y1, x2, y2 });
    }
    CropRect::new(x1, y1, x2, y2, img_w, img_h)
}

/// Centre an extent of `size` on `center`, clamp both ends to `[0, limit]`
/// and, when only one end was clamped, extend the other to restore `size`.
fn place_axis(center: f64, size: f64, limit: i64) -> (i64, i64) {
    let half = size / 2.0;
    let intended = size.round() as i64;
    let lo = (center - half).round() as i64;
    let hi = (center + half).round() as i64;

    let clamped_lo = lo < 0;
    let clamped_hi = hi > limit;
    let mut lo = lo.clamp(0, limit);
    let mut hi = hi.clamp(0, limit);

    if hi - lo < intended {
        if clamped_lo && !clamped_hi {
            hi = (lo + intended).min(limit);
        } else if clamped_hi && !clamped_lo {
            lo = (hi - intended).max(0);
        }
    }
    (lo, hi)
}

fn padded_rect(
    img_w: u32,
    img_h: u32,
    face: &BoundingBox,
    target: f64,
    pct: f64,
) -> Result<CropRect, CropError> {
    let (img_w_i, img_h_i) = (i64::from(img_w), i64::from(img_h));
    let bx = f64::from(face.x).round() as i64;
    let by = f64::from(face.y).round() as i64;
    let bw = f64::from(face.width).round() as i64;
    let bh = f64::from(face.height).round() as i64;

    let pad_x = (bw as f64 * pct).round() as i64;
    let pad_y = (bh as f64 * pct).round() as i64;

    let mut x1 = bx - pad_x;
    let mut y1 = by - pad_y;
    let mut x2 = bx + bw + pad_x;
    let mut y2 = by + bh + pad_y;

    let cw = x2 - x1;
    let ch = y2 - y1;
    if cw <= 0 || ch <= 0 {
        return Err(CropError::InvalidCropRect { x1, y1, x2, y2 });
    }
    let cx = x1 + cw / 2;
    let cy = y1 + ch / 2;
    let current = cw as f64 / ch as f64;

    if current > target {
        let new_h = (cw as f64 / target).round() as i64;
        y1 = cy - new_h / 2;
        y2 = y1 + new_h;
    } else if current < target {
        let new_w = (ch as f64 * target).round() as i64;
        x1 = cx - new_w / 2;
        x2 = x1 + new_w;
    }

    // Shift, never resize. A later shift may push an earlier edge back out;
    // the clamp below takes care of that.
    if x1 < 0 {
        x2 -= x1;
        x1 = 0;
    }
    if y1 < 0 {
        y2 -= y1;
        y1 = 0;
    }
    if x2 > img_w_i {
        x1 -= x2 - img_w_i;
        x2 = img_w_i;
    }
    if y2 > img_h_i {
        y1 -= y2 - img_h_i;
        y2 = img_h_i;
    }

    let x1 = x1.clamp(0, img_w_i);
    let y1 = y1.clamp(0, img_h_i);
    let x2 = x2.clamp(0, img_w_i);
    let y2 = y2.clamp(0, img_h_i);
    if x2 - x1 <= 1 || y2 - y1 <= 1 {
        return Err(CropError::InvalidCropRect { x1, y1, x2, y2 });
    }
    CropRect::new(x1, y1, x2, y2, img_w, img_h)
}
