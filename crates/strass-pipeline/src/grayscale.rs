//! Image decoding, scaling to design resolution, and luminance conversion.
//!
//! The source image is stretched to exactly the design dimensions (one
//! cell per design unit, aspect ratio not preserved) and each pixel is
//! reduced to its luminance `0.2126*R + 0.7152*G + 0.0722*B`.

use std::fmt;

use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, LuminanceBuffer, PipelineError};

/// Resampling filter used when scaling the source image to the design
/// dimensions.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Decode raw image bytes.
///
/// Supports PNG, JPEG, BMP, and WebP formats (whatever the `image` crate
/// was built to decode).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the data is not a
/// recognizable image.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Luminance of one sRGB pixel, rounded half-to-even into `[0, 255]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.0722f64.mul_add(
        f64::from(b),
        0.2126f64.mul_add(f64::from(r), 0.7152 * f64::from(g)),
    );
    y.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Scale `image` to `dimensions` and convert it to a luminance buffer.
///
/// Fully transparent pixels read as luminance 0. When the image already
/// has the requested dimensions it is not resampled.
#[must_use = "returns the luminance buffer"]
pub fn to_luminance(
    image: &DynamicImage,
    dimensions: Dimensions,
    filter: ResampleFilter,
) -> LuminanceBuffer {
    let rgba = scale_to(image.to_rgba8(), dimensions, filter);
    log::debug!(
        "luminance: {}x{} -> {}x{} ({filter})",
        image.width(),
        image.height(),
        dimensions.width,
        dimensions.height,
    );
    LuminanceBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        if a == 0 { 0 } else { luminance(r, g, b) }
    })
}

/// Resize to exactly `dimensions`, ignoring aspect ratio.
fn scale_to(rgba: RgbaImage, dimensions: Dimensions, filter: ResampleFilter) -> RgbaImage {
    if rgba.dimensions() == (dimensions.width, dimensions.height) {
        return rgba;
    }
    image::imageops::resize(
        &rgba,
        dimensions.width,
        dimensions.height,
        filter.to_image_filter(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as a PNG byte buffer.
    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_decodes() {
        let img = RgbaImage::from_fn(3, 2, |_, _| image::Rgba([255, 255, 255, 255]));
        let decoded = decode(&encode_png(&img)).unwrap();
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 2);
    }

    #[test]
    fn luminance_weights() {
        assert_eq!(luminance(255, 255, 255), 255);
        assert_eq!(luminance(0, 0, 0), 0);
        assert_eq!(luminance(255, 0, 0), 54);
        assert_eq!(luminance(0, 255, 0), 182);
        assert_eq!(luminance(0, 0, 255), 18);
    }

    #[test]
    fn output_matches_design_dimensions() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(17, 31, |_, _| {
            image::Rgba([128, 64, 32, 255])
        }));
        let buf = to_luminance(&img, dims(40, 25), ResampleFilter::Triangle);
        assert_eq!(buf.width(), 40);
        assert_eq!(buf.height(), 25);
    }

    #[test]
    fn uniform_image_stays_uniform_after_scaling() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(10, 10, |_, _| {
            image::Rgba([0, 255, 0, 255])
        }));
        for filter in [
            ResampleFilter::Nearest,
            ResampleFilter::Triangle,
            ResampleFilter::CatmullRom,
            ResampleFilter::Gaussian,
            ResampleFilter::Lanczos3,
        ] {
            let buf = to_luminance(&img, dims(23, 7), filter);
            assert!(
                buf.samples().iter().all(|&v| v.abs_diff(182) <= 1),
                "filter {filter} changed a uniform image",
            );
        }
    }

    #[test]
    fn same_size_is_not_resampled() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(4, 1, |x, _| {
            let v = u8::try_from(x * 60).unwrap();
            image::Rgba([v, v, v, 255])
        }));
        let buf = to_luminance(&img, dims(4, 1), ResampleFilter::Lanczos3);
        assert_eq!(buf.samples(), &[0, 60, 120, 180]);
    }

    #[test]
    fn transparent_pixels_read_as_black() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([255, 255, 255, 0])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        }));
        let buf = to_luminance(&img, dims(2, 1), ResampleFilter::Nearest);
        assert_eq!(buf.samples(), &[0, 255]);
    }

    #[test]
    fn nearest_upscale_preserves_halves() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(2, 2, |x, _| {
            if x == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        }));
        let buf = to_luminance(&img, dims(8, 4), ResampleFilter::Nearest);
        assert_eq!(buf.get(0, 0), Some(0));
        assert_eq!(buf.get(3, 3), Some(0));
        assert_eq!(buf.get(4, 0), Some(255));
        assert_eq!(buf.get(7, 3), Some(255));
    }
}
