//! Automatic brightness-threshold selection.
//!
//! Images that are almost flat, almost black, or almost white leave
//! the default threshold (128) accepting every sample or none of them.
//! The advisor looks at the luminance range and mean and proposes a
//! threshold that splits the image instead. A threshold the caller moved
//! away from the default is left alone unless adjustment is forced.

use serde::{Deserialize, Serialize};

use crate::types::{LuminanceBuffer, PipelineConfig};

/// Luminance range below which an image counts as low contrast.
pub const LOW_CONTRAST_RANGE: u8 = 30;

/// Maximum luminance below which an image counts as dark.
pub const DARK_MAX: u8 = 50;

/// Minimum luminance above which an image counts as bright.
pub const BRIGHT_MIN: u8 = 200;

/// Minimum, maximum and mean luminance of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LuminanceStats {
    /// Darkest sample.
    pub min: u8,
    /// Brightest sample.
    pub max: u8,
    /// Mean over all samples.
    pub mean: f64,
}

impl LuminanceStats {
    /// Compute statistics over every sample of `buffer`.
    ///
    /// Returns `None` for an empty buffer.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(buffer: &LuminanceBuffer) -> Option<Self> {
        let samples = buffer.samples();
        let min = samples.iter().copied().min()?;
        let max = samples.iter().copied().max()?;
        let total: u64 = samples.iter().map(|&v| u64::from(v)).sum();
        Some(Self {
            min,
            max,
            mean: total as f64 / samples.len() as f64,
        })
    }

    /// `max - min`.
    #[must_use]
    pub const fn contrast(&self) -> u8 {
        self.max - self.min
    }
}

/// Why the advisor settled on its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdviceReason {
    /// No rule applied; the caller's threshold is kept.
    Unchanged,
    /// Luminance range under [`LOW_CONTRAST_RANGE`]: threshold at the mean.
    LowContrast,
    /// Maximum under [`DARK_MAX`]: threshold at 80% of the maximum.
    Dark,
    /// Minimum over [`BRIGHT_MIN`]: threshold at 20% of the minimum.
    Bright,
    /// Adjustment was forced on an ordinary image: threshold at the mean.
    Forced,
}

/// The threshold to place stones with, and how it was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdAdvice {
    /// Threshold the caller asked for.
    pub requested: u8,
    /// Threshold to use for this run.
    pub threshold: u8,
    /// Which rule produced `threshold`.
    pub reason: AdviceReason,
    /// Statistics the decision was based on (`None` without a buffer).
    pub stats: Option<LuminanceStats>,
}

impl ThresholdAdvice {
    /// Advice that keeps `threshold` as-is.
    #[must_use]
    pub const fn unchanged(threshold: u8) -> Self {
        Self {
            requested: threshold,
            threshold,
            reason: AdviceReason::Unchanged,
            stats: None,
        }
    }

    /// Whether the advised threshold differs from the requested one.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.threshold != self.requested
    }
}

/// Propose a threshold for `buffer`.
///
/// Only a threshold equal to [`PipelineConfig::DEFAULT_THRESHOLD`] is
/// adjusted, unless `force` is set. Rules are tried in order and the
/// first match wins:
///
/// 1. range `< 30` → `round(mean)`
/// 2. max `< 50` → `round(max * 0.8)`
/// 3. min `> 200` → `round(min * 0.2)`
/// 4. `force` → `round(mean)`
/// 5. otherwise the current threshold is kept.
#[must_use]
pub fn advise(buffer: &LuminanceBuffer, current: u8, force: bool) -> ThresholdAdvice {
    let Some(stats) = LuminanceStats::compute(buffer) else {
        return ThresholdAdvice::unchanged(current);
    };
    log::debug!(
        "luminance stats: min={} max={} mean={:.2}",
        stats.min,
        stats.max,
        stats.mean,
    );

    let (threshold, reason) = if current != PipelineConfig::DEFAULT_THRESHOLD && !force {
        (current, AdviceReason::Unchanged)
    } else if stats.contrast() < LOW_CONTRAST_RANGE {
        (round_to_u8(stats.mean), AdviceReason::LowContrast)
    } else if stats.max < DARK_MAX {
        (round_to_u8(f64::from(stats.max) * 0.8), AdviceReason::Dark)
    } else if stats.min > BRIGHT_MIN {
        (round_to_u8(f64::from(stats.min) * 0.2), AdviceReason::Bright)
    } else if force {
        (round_to_u8(stats.mean), AdviceReason::Forced)
    } else {
        (current, AdviceReason::Unchanged)
    };

    if threshold != current {
        log::info!("threshold adjusted {current} -> {threshold} ({reason:?})");
    }

    ThresholdAdvice {
        requested: current,
        threshold,
        reason,
        stats: Some(stats),
    }
}

/// Round half away from zero and saturate into `u8`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
