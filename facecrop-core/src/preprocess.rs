//! Tensor preparation for YuNet inference.
//!
//! Graphs with a dynamic input run at the image's own resolution: the image is
//! never rescaled, only padded at the bottom and right up to the next multiple
//! of 32, so decoded coordinates are already in source pixels. Graphs exported
//! with a fixed input get a stretched copy instead, plus the factors needed to
//! map detections back.

use std::borrow::Cow;

use anyhow::Result;
use facecrop_utils::{rgb_to_bgr_chw_padded, timing_guard};
use image::{RgbImage, imageops::FilterType};
use tract_onnx::prelude::Tensor;

/// Granularity the YuNet feature pyramid needs in both dimensions.
pub const SIZE_ALIGNMENT: u32 = 32;

/// Network input resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The smallest stride-aligned size that holds `width × height`.
    pub fn aligned(width: u32, height: u32) -> Self {
        Self {
            width: align_to(width, SIZE_ALIGNMENT),
            height: align_to(height, SIZE_ALIGNMENT),
        }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self::new(640, 640)
    }
}

/// How an image is fitted to the network input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Input follows each image; pad to the stride alignment.
    Padded,
    /// The graph only accepts this size; stretch to it.
    Fixed(InputSize),
}

/// Image tensor ready for the network.
#[derive(Debug)]
pub struct PreprocessOutput {
    /// `[1, 3, H, W]` BGR float tensor.
    pub tensor: Tensor,
    /// Size the tensor was built for.
    pub input_size: InputSize,
    /// Factor from network x to source x.
    pub scale_x: f32,
    /// Factor from network y to source y.
    pub scale_y: f32,
}

/// Convert `image` into a network tensor according to `mode`.
pub fn preprocess_image(image: &RgbImage, mode: InputMode) -> Result<PreprocessOutput> {
    let _guard = timing_guard("facecrop_core::preprocess", log::Level::Trace);
    let (width, height) = image.dimensions();
    anyhow::ensure!(
        width > 0 && height > 0,
        "source image dimensions must be greater than zero"
    );

    let (input_size, source): (InputSize, Cow<'_, RgbImage>) = match mode {
        InputMode::Padded => (InputSize::aligned(width, height), Cow::Borrowed(image)),
        InputMode::Fixed(size) if size.width == width && size.height == height => {
            (size, Cow::Borrowed(image))
        }
        InputMode::Fixed(size) => {
            anyhow::ensure!(
                size.width > 0 && size.height > 0,
                "input dimensions must be greater than zero"
            );
            let resized =
                image::imageops::resize(image, size.width, size.height, FilterType::Triangle);
            (size, Cow::Owned(resized))
        }
    };

    let (scale_x, scale_y) = match mode {
        InputMode::Padded => (1.0, 1.0),
        InputMode::Fixed(size) => (
            width as f32 / size.width as f32,
            height as f32 / size.height as f32,
        ),
    };

    let chw = rgb_to_bgr_chw_padded(&source, input_size.width, input_size.height)?;
    let shape = [
        1usize,
        3,
        input_size.height as usize,
        input_size.width as usize,
    ];
    let (data, offset) = chw.into_raw_vec_and_offset();
    debug_assert_eq!(offset, Some(0), "expected contiguous array");
    let tensor = Tensor::from_shape(&shape, &data)
        .map_err(|e| anyhow::anyhow!("failed to build tensor: {e}"))?;

    Ok(PreprocessOutput {
        tensor,
        input_size,
        scale_x,
        scale_y,
    })
}

pub(crate) fn align_to(value: u32, divisor: u32) -> u32 {
    value.div_ceil(divisor).max(1) * divisor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([((x + y) * 3) as u8, 10, 250]);
        }
        img
    }

    #[test]
    fn sizes_round_up_to_stride() {
        assert_eq!(InputSize::aligned(640, 480), InputSize::new(640, 480));
        assert_eq!(InputSize::aligned(641, 1), InputSize::new(672, 32));
        assert_eq!(InputSize::aligned(354, 472), InputSize::new(384, 480));
    }

    #[test]
    fn padded_mode_keeps_source_pixels() {
        let output = preprocess_image(&gradient(40, 33), InputMode::Padded).expect("preprocess");
        assert_eq!(output.input_size, InputSize::new(64, 64));
        assert_eq!(output.tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!((output.scale_x, output.scale_y), (1.0, 1.0));

        let data = output.tensor.as_slice::<f32>().expect("f32 data");
        // Blue plane first; pixel (0, 0) is blue 250.
        assert_eq!(data[0], 250.0);
        assert_eq!(data[63 * 64 + 63], 0.0);
    }

    #[test]
    fn fixed_mode_reports_scale_factors() {
        let mode = InputMode::Fixed(InputSize::new(32, 32));
        let output = preprocess_image(&gradient(64, 16), mode).expect("preprocess");
        assert_eq!(output.tensor.shape(), &[1, 3, 32, 32]);
        assert_eq!(output.scale_x, 2.0);
        assert_eq!(output.scale_y, 0.5);
    }

    #[test]
    fn rejects_empty_images() {
        assert!(preprocess_image(&RgbImage::new(0, 5), InputMode::Padded).is_err());
    }
}
