//! Raster preview of a template.
//!
//! Stones are drawn as anti-aliased filled circles on a white canvas
//! with [`tiny_skia`], then copied into an [`image::RgbaImage`] so the
//! caller can encode it in any format the `image` crate supports.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};

use strass_pipeline::{Dimensions, Template};

/// Largest canvas side, in pixels, the renderer will allocate.
pub const MAX_CANVAS_SIDE: u32 = 16_384;

/// Canvas side the automatic zoom fits the design into.
const AUTO_FIT_SIDE: f64 = 600.0;

/// Smallest scale the automatic zoom will pick.
const AUTO_MIN_SCALE: f64 = 0.1;

/// Errors from preview rendering.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The scaled canvas would be empty or larger than [`MAX_CANVAS_SIDE`].
    #[error("preview canvas {width}x{height} is empty or exceeds {MAX_CANVAS_SIDE} pixels per side")]
    InvalidCanvas {
        /// Requested canvas width in pixels.
        width: u32,
        /// Requested canvas height in pixels.
        height: u32,
    },

    /// A zoom level string could not be parsed.
    #[error("invalid zoom level '{0}': expected 'auto' or a percentage")]
    InvalidScale(String),
}

/// How design units map to preview pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewScale {
    /// Fit the design into a 600 × 600 box, but never below 10%.
    #[default]
    Auto,
    /// Fixed zoom, in percent (100 = one pixel per design unit).
    Percent(u32),
}

impl PreviewScale {
    /// Pixels per design unit for a design of `dimensions`.
    #[must_use]
    pub fn factor(self, dimensions: Dimensions) -> f64 {
        match self {
            Self::Auto => {
                let fit = (AUTO_FIT_SIDE / f64::from(dimensions.width))
                    .min(AUTO_FIT_SIDE / f64::from(dimensions.height));
                fit.max(AUTO_MIN_SCALE)
            }
            Self::Percent(percent) => f64::from(percent) / 100.0,
        }
    }
}

impl fmt::Display for PreviewScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Percent(percent) => write!(f, "{percent}%"),
        }
    }
}

impl FromStr for PreviewScale {
    type Err = ExportError;

    /// Parses `auto`, `150` or `150%`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.strip_suffix('%')
            .unwrap_or(s)
            .parse()
            .map(Self::Percent)
            .map_err(|_| ExportError::InvalidScale(s.to_string()))
    }
}

/// Canvas size in pixels: `round(width * s) × round(height * s)`.
///
/// # Errors
///
/// Returns [`ExportError::InvalidCanvas`] if either side rounds to zero
/// or exceeds [`MAX_CANVAS_SIDE`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn canvas_size(
    dimensions: Dimensions,
    scale: PreviewScale,
) -> Result<(u32, u32), ExportError> {
    let factor = scale.factor(dimensions);
    let side = |units: u32| {
        let px = (f64::from(units) * factor).round();
        if px.is_finite() && px >= 0.0 {
            px.min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    };
    let (width, height) = (side(dimensions.width), side(dimensions.height));
    let valid = |px: u32| (1..=MAX_CANVAS_SIDE).contains(&px);
    if valid(width) && valid(height) {
        Ok((width, height))
    } else {
        Err(ExportError::InvalidCanvas { width, height })
    }
}

/// Render `template` as filled circles on a white canvas.
///
/// Stones keep their template order, so later stones paint over earlier
/// ones where they overlap. Stones with a non-positive radius are
/// skipped.
///
/// # Errors
///
/// Returns [`ExportError::InvalidCanvas`] if the scaled canvas would be
/// empty or too large.
///
/// # Examples
///
/// ```
/// use strass_pipeline::{Color, Dimensions, Stone, Template};
/// use strass_export::{PreviewScale, render_preview};
///
/// let template = Template::new(vec![Stone {
///     x: 5.0,
///     y: 5.0,
///     radius: 2.0,
///     color: Color::new(0, 0, 255),
/// }]);
/// let dims = Dimensions { width: 10, height: 10 };
/// let image = render_preview(&template, dims, PreviewScale::Percent(200)).unwrap();
/// assert_eq!(image.dimensions(), (20, 20));
/// assert_eq!(image.get_pixel(10, 10).0, [0, 0, 255, 255]);
/// ```
#[allow(clippy::cast_possible_truncation)]
pub fn render_preview(
    template: &Template,
    dimensions: Dimensions,
    scale: PreviewScale,
) -> Result<RgbaImage, ExportError> {
    let (width, height) = canvas_size(dimensions, scale)?;
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return Err(ExportError::InvalidCanvas { width, height });
    };
    pixmap.fill(Color::WHITE);

    let factor = scale.factor(dimensions) as f32;
    let transform = Transform::from_scale(factor, factor);
    let mut paint = Paint::default();
    paint.anti_alias = true;

    for stone in template {
        let Some(circle) =
            PathBuilder::from_circle(stone.x as f32, stone.y as f32, stone.radius as f32)
        else {
            continue;
        };
        paint.set_color_rgba8(stone.color.r, stone.color.g, stone.color.b, 255);
        pixmap.fill_path(&circle, &paint, FillRule::Winding, transform, None);
    }

    // The canvas is opaque, so premultiplied and straight RGBA coincide.
    RgbaImage::from_raw(width, height, pixmap.take())
        .ok_or(ExportError::InvalidCanvas { width, height })
}
