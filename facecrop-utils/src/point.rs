use std::ops::{Add, Sub};

/// A position in image pixel space (x to the right, y downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Angle in degrees of the segment from `self` to `other`.
    ///
    /// Measured in pixel space, so a segment that drops towards the bottom of
    /// the image has a positive angle.
    pub fn angle_to_degrees(self, other: Point) -> f32 {
        let d = other - self;
        d.y.atan2(d.x).to_degrees()
    }

    /// Rotate `self` about `center` by `theta` radians, using the same
    /// orientation as `imageproc::geometric_transformations::rotate`.
    pub fn rotated_about(self, center: Point, theta: f32) -> Point {
        let (sin, cos) = theta.sin_cos();
        let d = self - center;
        Point {
            x: d.x.mul_add(cos, -d.y * sin) + center.x,
            y: d.x.mul_add(sin, d.y * cos) + center.y,
        }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}
