//! Shared types for the strass placement pipeline.

use serde::{Deserialize, Serialize};

use crate::diagnostics::PipelineDiagnostics;
use crate::edge::EdgeMap;
use crate::grayscale::ResampleFilter;
use crate::palette::{Color, Palette};
use crate::placement::PatternKind;
use crate::threshold::ThresholdAdvice;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// original decoded image without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in design-unit coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (units from left edge).
    pub x: f64,
    /// Vertical position (units from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Design dimensions in whole units (millimetres at 1:1 export scale).
///
/// One design unit maps to exactly one luminance-buffer cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in design units.
    pub width: u32,
    /// Height in design units.
    pub height: u32,
}

/// Single-channel luminance raster, one sample per design unit.
///
/// Samples are in `[0, 255]`. Built once per pipeline run by
/// [`grayscale::to_luminance`](crate::grayscale::to_luminance) and not
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuminanceBuffer(GrayImage);

impl LuminanceBuffer {
    /// Wrap an existing grayscale image.
    #[must_use]
    pub const fn new(image: GrayImage) -> Self {
        Self(image)
    }

    /// Build a buffer from row-major samples.
    ///
    /// Returns `None` if `samples.len() != width * height`.
    #[must_use]
    pub fn from_raw(width: u32, height: u32, samples: Vec<u8>) -> Option<Self> {
        GrayImage::from_raw(width, height, samples).map(Self)
    }

    /// Build a buffer by evaluating `f` at every cell.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| image::Luma([f(x, y)])))
    }

    /// Buffer width in cells.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Buffer height in cells.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Buffer dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Luminance at cell `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        self.0.get_pixel_checked(x, y).map(|p| p.0[0])
    }

    /// Luminance at the cell containing the design-space point `(x, y)`.
    ///
    /// Coordinates are floored to the containing cell. Negative and
    /// out-of-range coordinates return `None`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample(&self, x: f64, y: f64) -> Option<u8> {
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let (fx, fy) = (x.floor(), y.floor());
        if fx >= f64::from(self.width()) || fy >= f64::from(self.height()) {
            return None;
        }
        self.get(fx as u32, fy as u32)
    }

    /// Row-major samples.
    #[must_use]
    pub fn samples(&self) -> &[u8] {
        self.0.as_raw()
    }

    /// Borrow the underlying grayscale image.
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.0
    }

    /// Consume the buffer and return the underlying grayscale image.
    #[must_use]
    pub fn into_image(self) -> GrayImage {
        self.0
    }
}

/// One placed circular stone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stone {
    /// Center x in design units.
    pub x: f64,
    /// Center y in design units.
    pub y: f64,
    /// Stone radius in design units (half the configured diameter).
    pub radius: f64,
    /// Fill color, always an entry of the resolved palette.
    pub color: Color,
}

impl Stone {
    /// The stone's center as a [`Point`].
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// The ordered stones produced by one pipeline run.
///
/// Order follows the placement strategy's scan order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Template(Vec<Stone>);

impl Template {
    /// Create a template from a vector of stones.
    #[must_use]
    pub const fn new(stones: Vec<Stone>) -> Self {
        Self(stones)
    }

    /// Returns `true` if no stones were placed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of placed stones.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all stones in placement order.
    #[must_use]
    pub fn stones(&self) -> &[Stone] {
        &self.0
    }

    /// Iterate over the stones in placement order.
    pub fn iter(&self) -> std::slice::Iter<'_, Stone> {
        self.0.iter()
    }

    /// Consumes the template and returns the underlying stones.
    #[must_use]
    pub fn into_stones(self) -> Vec<Stone> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Template {
    type Item = &'a Stone;
    type IntoIter = std::slice::Iter<'a, Stone>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Standard rhinestone sizes.
///
/// The "SS" (stone size) grades map to fixed diameters in millimetres.
/// Any other diameter within the configured range is a custom size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoneSize {
    /// SS6, 2.4 mm.
    Ss6,
    /// SS10, 2.8 mm.
    Ss10,
    /// SS16, 3.2 mm.
    Ss16,
    /// SS20, 3.6 mm.
    Ss20,
}

impl StoneSize {
    /// All standard sizes, smallest first.
    pub const ALL: [Self; 4] = [Self::Ss6, Self::Ss10, Self::Ss16, Self::Ss20];

    /// Diameter in millimetres.
    #[must_use]
    pub const fn diameter(self) -> f64 {
        match self {
            Self::Ss6 => 2.4,
            Self::Ss10 => 2.8,
            Self::Ss16 => 3.2,
            Self::Ss20 => 3.6,
        }
    }

    /// The standard size with exactly this diameter, if any.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn from_diameter(diameter: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.diameter() == diameter)
    }
}

/// Configuration for one pipeline run.
///
/// All parameters have defaults matching the tool's initial settings.
/// Fields are public; call [`validate`](Self::validate) (the pipeline
/// entry points do) before relying on the invariants documented on
/// each field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Design width in units. Must be non-zero.
    pub design_width: u32,

    /// Design height in units. Must be non-zero.
    pub design_height: u32,

    /// Stone diameter in units, within
    /// [`MIN_STONE_DIAMETER`](Self::MIN_STONE_DIAMETER)..=[`MAX_STONE_DIAMETER`](Self::MAX_STONE_DIAMETER).
    pub stone_diameter: f64,

    /// Gap between adjacent stone edges. Must be finite and `>= 0`.
    pub spacing: f64,

    /// Brightness threshold (luminance for most patterns, gradient
    /// magnitude for [`PatternKind::Contour`]).
    pub threshold: u8,

    /// Place stones on dark areas (`luminance <= threshold`) instead of
    /// bright ones (`luminance > threshold`).
    pub invert: bool,

    /// Number of luminance buckets used for coloring. Must be at least 1.
    pub color_count: u32,

    /// Which placement strategy to run.
    pub pattern: PatternKind,

    /// User palette. Empty selects the built-in default palette;
    /// otherwise the length must equal `color_count`.
    pub custom_colors: Vec<Color>,

    /// Let the threshold advisor replace a non-default threshold.
    pub force_threshold_adjust: bool,

    /// Seed for the scatter pattern's random source. `None` uses
    /// system entropy.
    pub seed: Option<u64>,

    /// Resampling filter used to scale the source image to the design
    /// dimensions.
    pub resample_filter: ResampleFilter,
}

impl PipelineConfig {
    /// Default design width in units.
    pub const DEFAULT_DESIGN_WIDTH: u32 = 150;
    /// Default design height in units.
    pub const DEFAULT_DESIGN_HEIGHT: u32 = 150;
    /// Default stone diameter (SS6).
    pub const DEFAULT_STONE_DIAMETER: f64 = StoneSize::Ss6.diameter();
    /// Default gap between stones.
    pub const DEFAULT_SPACING: f64 = 0.5;
    /// Default threshold. The threshold advisor only adjusts a threshold
    /// left at this value unless forced.
    pub const DEFAULT_THRESHOLD: u8 = 128;
    /// Default number of colors.
    pub const DEFAULT_COLOR_COUNT: u32 = 1;
    /// Default placement pattern.
    pub const DEFAULT_PATTERN: PatternKind = PatternKind::Grid;
    /// Default resampling filter.
    pub const DEFAULT_RESAMPLE_FILTER: ResampleFilter = ResampleFilter::Triangle;
    /// Smallest accepted stone diameter.
    pub const MIN_STONE_DIAMETER: f64 = 0.1;
    /// Largest accepted stone diameter.
    pub const MAX_STONE_DIAMETER: f64 = 10.0;

    /// Lattice step shared by every pattern: `stone_diameter + spacing`.
    #[must_use]
    pub fn step(&self) -> f64 {
        self.stone_diameter + self.spacing
    }

    /// Stone radius (half the diameter).
    #[must_use]
    pub fn stone_radius(&self) -> f64 {
        self.stone_diameter / 2.0
    }

    /// Target design dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.design_width,
            height: self.design_height,
        }
    }

    /// The palette stones are colored from: custom colors when given,
    /// otherwise the default palette.
    #[must_use]
    pub fn palette(&self) -> Palette {
        Palette::resolve(&self.custom_colors)
    }

    /// Check every invariant the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.design_width == 0 || self.design_height == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "design dimensions must be positive, got {}x{}",
                self.design_width, self.design_height,
            )));
        }
        if !(Self::MIN_STONE_DIAMETER..=Self::MAX_STONE_DIAMETER).contains(&self.stone_diameter) {
            return Err(PipelineError::InvalidConfig(format!(
                "stone_diameter must be between {} and {}, got {}",
                Self::MIN_STONE_DIAMETER,
                Self::MAX_STONE_DIAMETER,
                self.stone_diameter,
            )));
        }
        if !self.spacing.is_finite() || self.spacing < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "spacing must be a finite value >= 0, got {}",
                self.spacing,
            )));
        }
        if self.step() <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "stone_diameter + spacing must be positive, got {}",
                self.step(),
            )));
        }
        if self.color_count == 0 {
            return Err(PipelineError::InvalidConfig(
                "color_count must be at least 1".to_string(),
            ));
        }
        if !self.custom_colors.is_empty()
            && self.custom_colors.len() != self.color_count as usize
        {
            return Err(PipelineError::InvalidConfig(format!(
                "custom_colors must be empty or have color_count ({}) entries, got {}",
                self.color_count,
                self.custom_colors.len(),
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            design_width: Self::DEFAULT_DESIGN_WIDTH,
            design_height: Self::DEFAULT_DESIGN_HEIGHT,
            stone_diameter: Self::DEFAULT_STONE_DIAMETER,
            spacing: Self::DEFAULT_SPACING,
            threshold: Self::DEFAULT_THRESHOLD,
            invert: false,
            color_count: Self::DEFAULT_COLOR_COUNT,
            pattern: Self::DEFAULT_PATTERN,
            custom_colors: Vec::new(),
            force_threshold_adjust: false,
            seed: None,
            resample_filter: Self::DEFAULT_RESAMPLE_FILTER,
        }
    }
}

/// Result of running the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// The placed stones.
    pub template: Template,

    /// The threshold actually used for placement, and why it was chosen.
    ///
    /// Callers reflect `threshold.threshold` back into whatever control
    /// displays it.
    pub threshold: ThresholdAdvice,

    /// Design dimensions the template's coordinates live in.
    pub dimensions: Dimensions,
}

/// Result of running the pipeline with intermediate stage outputs preserved.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Original decoded RGBA image (before scaling).
    pub original: RgbaImage,
    /// Luminance buffer at design resolution.
    pub luminance: LuminanceBuffer,
    /// Sobel edge map (contour pattern only).
    pub edges: Option<EdgeMap>,
    /// Threshold decision.
    pub threshold: ThresholdAdvice,
    /// Placed stones.
    pub template: Template,
    /// Design dimensions.
    pub dimensions: Dimensions,
    /// Per-stage timing and counts.
    pub diagnostics: PipelineDiagnostics,
}

impl StagedResult {
    /// Drop the intermediates and keep only the final output.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            template: self.template,
            threshold: self.threshold,
            dimensions: self.dimensions,
        }
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}
