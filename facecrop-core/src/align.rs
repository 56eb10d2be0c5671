//! Eye-line levelling.

use facecrop_utils::timing_guard;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, rotate};

use crate::postprocess::{BoundingBox, EyeLandmarks};

/// Angle of the eye line in degrees, from the left eye to the right eye.
///
/// Positive when the right eye sits lower in the image than the left.
pub fn eye_line_angle(eyes: &EyeLandmarks) -> f32 {
    eyes.left.angle_to_degrees(eyes.right)
}

/// Rotate `image` about the centre of `face` so that an eye line tilted by
/// `angle_degrees` comes out horizontal.
///
/// The canvas keeps its size; uncovered pixels are black.
pub fn level_eye_line(image: &RgbImage, face: &BoundingBox, angle_degrees: f32) -> RgbImage {
    let _guard = timing_guard("facecrop_core::align", log::Level::Debug);
    let center = face.center();
    rotate(
        image,
        (center.x, center.y),
        -angle_degrees.to_radians(),
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
    )
}
