//! Image normalization for classifier and echo-metric input.
//!
//! Decodes an uploaded image, converts it to BGR (the channel order the CIC
//! model was trained on), resizes it to a square target and scales samples
//! from `[0, 255]` to `[0, 1]`.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::domain::{Batching, ImageTensor, CHANNELS};

/// Maximum accepted upload size in bytes.
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// Resampling filter for the square resize (bilinear).
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Errors that can occur while turning raw bytes into a tensor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("Image is empty (0 bytes)")]
    Empty,

    #[error("Image is too large: {actual} bytes (max {max})")]
    TooLarge { actual: usize, max: usize },

    #[error("Image could not be decoded: {0}")]
    Decode(String),

    #[error("Image has zero width or height ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error("Target size must be positive")]
    InvalidTargetSize,
}

/// Decode raw bytes (PNG or JPEG) into an image.
///
/// # Errors
/// Returns `ImageError` if the bytes are empty, oversized, undecodable, or
/// decode to a zero-area raster.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge {
            actual: bytes.len(),
            max: MAX_IMAGE_BYTES,
        });
    }

    let image = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::ZeroDimension { width, height });
    }

    tracing::debug!("Decoded image {}x{} ({:?})", width, height, image.color());
    Ok(image)
}

/// Normalize a decoded image into a `target × target × 3` tensor.
///
/// # Errors
/// Returns `ImageError::ZeroDimension` for an empty raster and
/// `ImageError::InvalidTargetSize` for `target == 0`.
pub fn normalize(
    image: &DynamicImage,
    target: u32,
    batching: Batching,
) -> Result<ImageTensor, ImageError> {
    if target == 0 {
        return Err(ImageError::InvalidTargetSize);
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::ZeroDimension { width, height });
    }

    // Alpha is dropped and grayscale is expanded here.
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, target, target, RESIZE_FILTER);

    let mut data = Vec::with_capacity((target as usize) * (target as usize) * CHANNELS);
    for pixel in resized.pixels() {
        let [r, g, b] = pixel.0;
        data.push(f32::from(b) / 255.0);
        data.push(f32::from(g) / 255.0);
        data.push(f32::from(r) / 255.0);
    }

    ImageTensor::new(target, batching, data).map_err(|e| ImageError::Decode(e.to_string()))
}

/// Decode and normalize in one step.
///
/// # Errors
/// See [`decode`] and [`normalize`].
pub fn normalize_bytes(
    bytes: &[u8],
    target: u32,
    batching: Batching,
) -> Result<ImageTensor, ImageError> {
    let image = decode(bytes)?;
    normalize(&image, target, batching)
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// Encode a solid-color RGB image as PNG bytes.
    pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(rgb));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .expect("encode png");
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::solid_png;
    use super::*;
    use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    #[test]
    fn test_output_shape_for_any_input_size() {
        for (w, h) in [(1, 1), (37, 300), (640, 480), (128, 128)] {
            let bytes = solid_png(w, h, [10, 20, 30]);
            let t = normalize_bytes(&bytes, 128, Batching::Batched).expect("Should normalize");
            assert_eq!(t.shape(), vec![1, 128, 128, 3]);
            assert_eq!(t.len(), 128 * 128 * 3);
            assert!(t.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        }

        for (w, h) in [(3, 5), (320, 240)] {
            let img = RgbImage::from_pixel(w, h, Rgb([200, 100, 50]));
            let mut jpeg = Vec::new();
            DynamicImage::ImageRgb8(img)
                .write_to(&mut Cursor::new(&mut jpeg), ImageOutputFormat::Jpeg(90))
                .expect("encode jpeg");
            let t = normalize_bytes(&jpeg, 128, Batching::Batched).expect("Should normalize jpeg");
            assert_eq!(t.shape(), vec![1, 128, 128, 3]);
            // BGR: blue channel first, red last (JPEG is lossy).
            let b = t.get(64, 64, 0).expect("in range");
            let r = t.get(64, 64, 2).expect("in range");
            assert!((b - 50.0 / 255.0).abs() < 0.05);
            assert!((r - 200.0 / 255.0).abs() < 0.05);
        }
    }

    #[test]
    fn test_unbatched_echo_size() {
        let bytes = solid_png(64, 48, [0, 0, 0]);
        let t = normalize_bytes(&bytes, 200, Batching::Unbatched).expect("Should normalize");
        assert_eq!(t.shape(), vec![200, 200, 3]);
    }

    #[test]
    fn test_channels_are_bgr_and_scaled() {
        let bytes = solid_png(8, 8, [255, 0, 51]);
        let t = normalize_bytes(&bytes, 4, Batching::Batched).expect("Should normalize");
        let b = t.get(2, 2, 0).expect("in range");
        let g = t.get(2, 2, 1).expect("in range");
        let r = t.get(2, 2, 2).expect("in range");
        assert!((b - 0.2).abs() < 1e-6);
        assert!(g.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_grayscale_and_alpha_inputs_become_three_channels() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(5, 7, Luma([128])));
        let t = normalize(&gray, 16, Batching::Batched).expect("Should normalize");
        assert_eq!(t.len(), 16 * 16 * 3);

        let rgba = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 0]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .expect("encode png");
        let t = normalize_bytes(&buf, 16, Batching::Batched).expect("Should normalize");
        assert!(t.as_slice().iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_empty_bytes_rejected() {
        assert_eq!(decode(&[]).expect_err("Should fail"), ImageError::Empty);
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = decode(b"definitely not an image").expect_err("Should fail");
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn test_zero_area_and_zero_target_rejected() {
        let empty = DynamicImage::new_rgb8(0, 10);
        assert!(matches!(
            normalize(&empty, 128, Batching::Batched),
            Err(ImageError::ZeroDimension { .. })
        ));

        let bytes = solid_png(4, 4, [1, 2, 3]);
        let image = decode(&bytes).expect("Should decode");
        assert_eq!(
            normalize(&image, 0, Batching::Batched).expect_err("Should fail"),
            ImageError::InvalidTargetSize
        );
    }
}
