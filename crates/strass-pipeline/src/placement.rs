//! Stone placement: turn a luminance buffer into a template.
//!
//! This module defines the [`StonePlacer`] trait for placement
//! strategies and the [`PatternKind`] enum for selecting one at runtime.
//!
//! Every strategy walks its own set of sample locations and keeps the
//! ones that pass the accept test:
//!
//! - normal: `luminance > threshold`
//! - inverted: `luminance <= threshold`
//!
//! The contour pattern is the exception: it tests Sobel gradient
//! magnitude against the threshold, unscaled, and ignores `invert`.
//! Stone colors always come from the luminance at the sample location.

use std::f64::consts::{SQRT_2, TAU};
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::edge::{self, EdgeMap};
use crate::palette::Palette;
use crate::poisson;
use crate::types::{LuminanceBuffer, PipelineConfig, Stone, Template};

/// Selects which placement strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Regular square lattice with step `stone_diameter + spacing`.
    #[default]
    Grid,
    /// Poisson-disk scatter with minimum distance `stone_diameter + spacing`.
    Scatter,
    /// Concentric rings around the design center.
    Radial,
    /// Lattice points on strong luminance gradients (Sobel edges).
    Contour,
    /// Diagonal lines at 45°, clipped to the accepted region.
    Hatch,
}

impl PatternKind {
    /// Every pattern, in menu order.
    pub const ALL: [Self; 5] = [
        Self::Grid,
        Self::Scatter,
        Self::Radial,
        Self::Contour,
        Self::Hatch,
    ];

    /// Lowercase name, as used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Scatter => "scatter",
            Self::Radial => "radial",
            Self::Contour => "contour",
            Self::Hatch => "hatch",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters shared by every placement strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementParams {
    /// Threshold for the accept test (already advised).
    pub threshold: u8,
    /// Flip the accept test to select dark areas.
    pub invert: bool,
    /// Stone diameter in design units.
    pub stone_diameter: f64,
    /// Gap between adjacent stone edges.
    pub spacing: f64,
    /// Number of luminance buckets for coloring.
    pub color_count: u32,
    /// Palette stones are colored from.
    pub palette: Palette,
}

impl PlacementParams {
    /// Take every placement parameter from `config`, with `threshold`
    /// replacing the configured one.
    #[must_use]
    pub fn from_config(config: &PipelineConfig, threshold: u8) -> Self {
        Self {
            threshold,
            invert: config.invert,
            stone_diameter: config.stone_diameter,
            spacing: config.spacing,
            color_count: config.color_count,
            palette: config.palette(),
        }
    }

    /// Distance between neighboring sample locations.
    #[must_use]
    pub fn step(&self) -> f64 {
        self.stone_diameter + self.spacing
    }

    /// Radius of every placed stone.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.stone_diameter / 2.0
    }

    /// The accept test for one luminance sample.
    #[must_use]
    pub const fn accepts(&self, luminance: u8) -> bool {
        if self.invert {
            luminance <= self.threshold
        } else {
            luminance > self.threshold
        }
    }

    /// A stone centered at `(x, y)` colored for `luminance`.
    fn stone(&self, x: f64, y: f64, luminance: u8) -> Stone {
        Stone {
            x,
            y,
            radius: self.radius(),
            color: self.palette.color_for(luminance, self.color_count),
        }
    }
}

/// Trait for placement strategies.
///
/// Input: a luminance buffer and the shared placement parameters.
/// Output: the placed stones in scan order. Only the scatter strategy
/// draws from `rng`.
pub trait StonePlacer {
    /// Place stones over `luminance`.
    fn place(
        &self,
        luminance: &LuminanceBuffer,
        params: &PlacementParams,
        rng: &mut dyn RngCore,
    ) -> Template;
}

impl StonePlacer for PatternKind {
    fn place(
        &self,
        luminance: &LuminanceBuffer,
        params: &PlacementParams,
        rng: &mut dyn RngCore,
    ) -> Template {
        if !has_usable_step(*self, params) {
            return Template::default();
        }

        let stones = match *self {
            Self::Grid => place_grid(luminance, params),
            Self::Scatter => place_scatter(luminance, params, rng),
            Self::Radial => place_radial(luminance, params),
            Self::Contour => place_contour(luminance, &edge::sobel(luminance), params),
            Self::Hatch => place_hatch(luminance, params),
        };
        log::debug!("{self}: placed {} stones (step {})", stones.len(), params.step());
        Template::new(stones)
    }
}

/// Contour placement over an edge map the caller already computed.
///
/// `edges` must come from [`edge::sobel`] over the same `luminance`.
#[must_use]
pub fn place_on_edges(
    luminance: &LuminanceBuffer,
    edges: &EdgeMap,
    params: &PlacementParams,
) -> Template {
    if !has_usable_step(PatternKind::Contour, params) {
        return Template::default();
    }
    let stones = place_contour(luminance, edges, params);
    log::debug!("contour: placed {} stones (step {})", stones.len(), params.step());
    Template::new(stones)
}

/// Every lattice walk needs a positive finite step to terminate.
fn has_usable_step(pattern: PatternKind, params: &PlacementParams) -> bool {
    let step = params.step();
    let usable = step > 0.0 && step.is_finite();
    if !usable {
        log::warn!("{pattern}: refusing to place with step {step}");
    }
    usable
}

/// Run `pattern` over `luminance`, or produce an empty template when
/// there is no buffer yet.
#[must_use]
pub fn place(
    luminance: Option<&LuminanceBuffer>,
    pattern: PatternKind,
    params: &PlacementParams,
    rng: &mut dyn RngCore,
) -> Template {
    luminance.map_or_else(Template::default, |buffer| {
        pattern.place(buffer, params, rng)
    })
}

/// Sample positions `0, step, 2*step, ...` strictly below `extent`.
///
/// Positions are computed as `i * step` rather than accumulated so the
/// count is exactly `ceil(extent / step)`.
fn lattice(extent: f64, step: f64) -> impl Iterator<Item = f64> {
    (0u32..)
        .map(move |i| f64::from(i) * step)
        .take_while(move |&v| v < extent)
}

/// Number of lattice positions along an axis of length `extent`.
#[must_use]
pub fn lattice_count(extent: u32, step: f64) -> usize {
    lattice(f64::from(extent), step).count()
}

/// Regular lattice; each accepted lattice point gets a stone offset by
/// one radius so the stone's corner touches the lattice point.
fn place_grid(luminance: &LuminanceBuffer, params: &PlacementParams) -> Vec<Stone> {
    let step = params.step();
    let radius = params.radius();
    let mut stones = Vec::new();
    for y in lattice(f64::from(luminance.height()), step) {
        for x in lattice(f64::from(luminance.width()), step) {
            if let Some(value) = luminance.sample(x, y)
                && params.accepts(value)
            {
                stones.push(params.stone(x + radius, y + radius, value));
            }
        }
    }
    stones
}

/// Poisson-disk points; stones sit exactly on the sampled points.
fn place_scatter(
    luminance: &LuminanceBuffer,
    params: &PlacementParams,
    rng: &mut dyn RngCore,
) -> Vec<Stone> {
    let points = poisson::poisson_disk(
        f64::from(luminance.width()),
        f64::from(luminance.height()),
        params.step(),
        rng,
    );
    points
        .into_iter()
        .filter_map(|p| {
            let value = luminance.sample(p.x, p.y)?;
            params.accepts(value).then(|| params.stone(p.x, p.y, value))
        })
        .collect()
}

/// Concentric rings `step` apart around the center, each holding
/// `floor(circumference / step)` evenly spaced stones.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn place_radial(luminance: &LuminanceBuffer, params: &PlacementParams) -> Vec<Stone> {
    let step = params.step();
    let width = f64::from(luminance.width());
    let height = f64::from(luminance.height());
    let (cx, cy) = (width / 2.0, height / 2.0);
    let max_radius = cx.hypot(cy);

    let mut stones = Vec::new();
    for ring in lattice(max_radius, step) {
        let count = (TAU * ring / step).floor() as u32;
        for i in 0..count {
            let angle = f64::from(i) / f64::from(count) * TAU;
            let x = ring.mul_add(angle.cos(), cx);
            let y = ring.mul_add(angle.sin(), cy);
            if let Some(value) = luminance.sample(x, y)
                && params.accepts(value)
            {
                stones.push(params.stone(x, y, value));
            }
        }
    }
    stones
}

/// Grid lattice gated on edge magnitude instead of luminance.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn place_contour(
    luminance: &LuminanceBuffer,
    edges: &EdgeMap,
    params: &PlacementParams,
) -> Vec<Stone> {
    let step = params.step();
    let radius = params.radius();
    let threshold = f64::from(params.threshold);

    let mut stones = Vec::new();
    for y in lattice(f64::from(luminance.height()), step) {
        for x in lattice(f64::from(luminance.width()), step) {
            let (cx, cy) = (x.floor() as u32, y.floor() as u32);
            let on_edge = edges.get(cx, cy).is_some_and(|m| m > threshold);
            if on_edge && let Some(value) = luminance.get(cx, cy) {
                stones.push(params.stone(x + radius, y + radius, value));
            }
        }
    }
    stones
}

/// 45° lines starting along the top and left edges, `step * √2` apart,
/// with stones every `step` along each line inside the accepted region.
fn place_hatch(luminance: &LuminanceBuffer, params: &PlacementParams) -> Vec<Stone> {
    let step = params.step();
    let width = f64::from(luminance.width());
    let height = f64::from(luminance.height());
    let valid: Vec<bool> = luminance
        .samples()
        .iter()
        .map(|&v| params.accepts(v))
        .collect();

    let mut stones = Vec::new();
    for offset in lattice(width + height, step * SQRT_2) {
        if offset < width {
            hatch_line(luminance, params, &valid, offset, 0.0, &mut stones);
        }
        // Offset 0 was already walked from the top edge.
        if offset > 0.0 && offset < height {
            hatch_line(luminance, params, &valid, 0.0, offset, &mut stones);
        }
    }
    stones
}

/// Walk one hatch line from `(start_x, start_y)` down and to the right.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn hatch_line(
    luminance: &LuminanceBuffer,
    params: &PlacementParams,
    valid: &[bool],
    start_x: f64,
    start_y: f64,
    stones: &mut Vec<Stone>,
) {
    let step = params.step();
    let width = f64::from(luminance.width());
    let height = f64::from(luminance.height());
    let row_len = luminance.width() as usize;

    for along in lattice(f64::INFINITY, step) {
        let (x, y) = (start_x + along, start_y + along);
        if x >= width || y >= height {
            break;
        }
        let (cx, cy) = (x.floor() as usize, y.floor() as usize);
        if valid.get(cy * row_len + cx).copied().unwrap_or(false)
            && let Some(value) = luminance.sample(x, y)
        {
            stones.push(params.stone(x, y, value));
        }
    }
}
