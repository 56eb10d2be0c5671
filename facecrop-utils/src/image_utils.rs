use std::io::Cursor;

use anyhow::{Context, Result};
use image::{ExtendedColorType, ImageEncoder, RgbImage, codecs::jpeg::JpegEncoder};
use ndarray::Array3;

/// MIME type reported for buffers whose magic bytes match no known image format.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// Decode an in-memory image of any supported container into 8-bit RGB.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes).context("failed to decode image bytes")?;
    Ok(image.into_rgb8())
}

/// Encode an RGB buffer as baseline JPEG at `quality` (clamped to 1..=100).
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .context("failed to encode JPEG")?;
    Ok(buffer.into_inner())
}

/// Best-effort MIME type from the leading magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(UNKNOWN_MIME)
}

/// Convert an RGB image into a zero-padded BGR CHW array, the layout OpenCV's
/// `blobFromImage` produces with no mean subtraction or scaling.
///
/// The image occupies the top-left corner of a `padded_width × padded_height`
/// canvas; everything to the right and below stays 0.
pub fn rgb_to_bgr_chw_padded(
    image: &RgbImage,
    padded_width: u32,
    padded_height: u32,
) -> Result<Array3<f32>> {
    let (width, height) = image.dimensions();
    anyhow::ensure!(
        padded_width >= width && padded_height >= height,
        "padded canvas {padded_width}x{padded_height} is smaller than image {width}x{height}"
    );
    let mut array = Array3::<f32>::zeros((3, padded_height as usize, padded_width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (xi, yi) = (x as usize, y as usize);
        array[(0, yi, xi)] = pixel[2] as f32;
        array[(1, yi, xi)] = pixel[1] as f32;
        array[(2, yi, xi)] = pixel[0] as f32;
    }
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("encode png");
        cursor.into_inner()
    }

    #[test]
    fn bgr_conversion_pads_bottom_right() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([0, 128, 255]));
        image.put_pixel(1, 0, Rgb([255, 128, 0]));

        let array = rgb_to_bgr_chw_padded(&image, 4, 3).expect("convert");
        assert_eq!(array.shape(), &[3, 3, 4]);
        assert_eq!(array[(0, 0, 0)], 255.0);
        assert_eq!(array[(2, 0, 0)], 0.0);
        assert_eq!(array[(1, 0, 1)], 128.0);
        assert_eq!(array[(0, 2, 3)], 0.0);
    }

    #[test]
    fn bgr_conversion_rejects_small_canvas() {
        let image = RgbImage::new(8, 8);
        assert!(rgb_to_bgr_chw_padded(&image, 4, 8).is_err());
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let image = RgbImage::from_pixel(31, 17, Rgb([200, 40, 40]));
        let jpeg = encode_jpeg(&image, 90).expect("encode");
        assert_eq!(sniff_mime(&jpeg), "image/jpeg");

        let decoded = decode_rgb(&jpeg).expect("decode");
        assert_eq!(decoded.dimensions(), (31, 17));
    }

    #[test]
    fn sniffing_distinguishes_formats() {
        let png = png_bytes(&RgbImage::new(2, 2));
        assert_eq!(sniff_mime(&png), "image/png");
        assert_eq!(sniff_mime(b"GIF89a......"), "image/gif");
        assert_eq!(sniff_mime(b"hello world"), UNKNOWN_MIME);
    }

    #[test]
    fn decoding_garbage_fails() {
        assert!(decode_rgb(b"not an image").is_err());
    }
}
