//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process_staged`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use strass_pipeline::{Pipeline, PipelineConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let advised = Pipeline::new(png, PipelineConfig::default())
//!     .decode()?
//!     .grayscale()
//!     .advise_threshold();
//! println!("threshold {}", advised.advice().threshold);
//!
//! let staged = advised.place(&mut rng).into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying previously computed
//! intermediates and their diagnostics forward.

use image::DynamicImage;
use rand::RngCore;
use web_time::Instant;

use crate::diagnostics::{
    PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics, count_edge_cells,
};
use crate::edge::{self, EdgeMap};
use crate::grayscale;
use crate::placement::{self, PatternKind, PlacementParams, StonePlacer};
use crate::threshold::{self, ThresholdAdvice};
use crate::types::{
    Dimensions, LuminanceBuffer, PipelineConfig, PipelineError, RgbaImage, StagedResult, Template,
};

/// Run `f` and measure how long it took.
fn timed<T>(f: impl FnOnce() -> T) -> (T, std::time::Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing, call .decode() to continue"]
pub struct Pending {
    config: PipelineConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the configuration, decode the source image and advance
    /// to the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration is
    /// invalid, [`PipelineError::EmptyInput`] if the source bytes are
    /// empty, and [`PipelineError::ImageDecode`] if the data is not a
    /// recognizable image.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;
        let started = Instant::now();
        let (image, duration) = timed(|| grayscale::decode(&self.source));
        let image = image?;
        let decode = StageDiagnostics {
            duration,
            metrics: StageMetrics::Decode {
                input_bytes: self.source.len(),
                width: image.width(),
                height: image.height(),
            },
        };
        Ok(Decoded::new(self.config, image, Some(decode), started))
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
///
/// Call [`grayscale`](Self::grayscale) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .grayscale() to continue"]
pub struct Decoded {
    config: PipelineConfig,
    image: DynamicImage,
    original: RgbaImage,
    decode: Option<StageDiagnostics>,
    started: Instant,
}

impl Decoded {
    fn new(
        config: PipelineConfig,
        image: DynamicImage,
        decode: Option<StageDiagnostics>,
        started: Instant,
    ) -> Self {
        let original = image.to_rgba8();
        Self {
            config,
            image,
            original,
            decode,
            started,
        }
    }

    /// The original decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Scale to the design dimensions and convert to luminance.
    pub fn grayscale(self) -> Converted {
        let dimensions = self.config.dimensions();
        let filter = self.config.resample_filter;
        let (luminance, duration) =
            timed(|| grayscale::to_luminance(&self.image, dimensions, filter));
        let grayscale = StageDiagnostics {
            duration,
            metrics: StageMetrics::Grayscale {
                source_width: self.original.width(),
                source_height: self.original.height(),
                width: luminance.width(),
                height: luminance.height(),
                filter: filter.to_string(),
            },
        };
        Converted {
            config: self.config,
            original: self.original,
            luminance,
            decode: self.decode,
            grayscale,
            started: self.started,
        }
    }
}

// ───────────────────────── Stage 2: Converted ────────────────────────

/// Pipeline state after luminance conversion.
///
/// Call [`advise_threshold`](Self::advise_threshold) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .advise_threshold() to continue"]
pub struct Converted {
    config: PipelineConfig,
    original: RgbaImage,
    luminance: LuminanceBuffer,
    decode: Option<StageDiagnostics>,
    grayscale: StageDiagnostics,
    started: Instant,
}

impl Converted {
    /// The luminance buffer at design resolution.
    #[must_use]
    pub const fn luminance(&self) -> &LuminanceBuffer {
        &self.luminance
    }

    /// Run the threshold advisor over the luminance buffer.
    pub fn advise_threshold(self) -> Advised {
        let (advice, duration) = timed(|| {
            threshold::advise(
                &self.luminance,
                self.config.threshold,
                self.config.force_threshold_adjust,
            )
        });
        let (min, max, mean) = advice
            .stats
            .map_or((0, 0, 0.0), |s| (s.min, s.max, s.mean));
        let threshold = StageDiagnostics {
            duration,
            metrics: StageMetrics::Threshold {
                requested: advice.requested,
                threshold: advice.threshold,
                reason: advice.reason,
                min,
                max,
                mean,
            },
        };
        Advised {
            config: self.config,
            original: self.original,
            luminance: self.luminance,
            advice,
            decode: self.decode,
            grayscale: self.grayscale,
            threshold,
            started: self.started,
        }
    }
}

// ───────────────────────── Stage 3: Advised ──────────────────────────

/// Pipeline state after the threshold decision.
///
/// Call [`place`](Self::place) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .place() to continue"]
pub struct Advised {
    config: PipelineConfig,
    original: RgbaImage,
    luminance: LuminanceBuffer,
    advice: ThresholdAdvice,
    decode: Option<StageDiagnostics>,
    grayscale: StageDiagnostics,
    threshold: StageDiagnostics,
    started: Instant,
}

impl Advised {
    /// The threshold decision.
    #[must_use]
    pub const fn advice(&self) -> &ThresholdAdvice {
        &self.advice
    }

    /// Place stones with the configured pattern.
    ///
    /// The contour pattern computes its edge map as a separate,
    /// separately timed stage so it can be kept as an intermediate.
    pub fn place(self, rng: &mut dyn RngCore) -> Placed {
        let pattern = self.config.pattern;
        let params = PlacementParams::from_config(&self.config, self.advice.threshold);

        let (edges, edge_detection) = if pattern == PatternKind::Contour {
            let (edges, duration) = timed(|| edge::sobel(&self.luminance));
            let metrics = StageMetrics::EdgeDetection {
                max_magnitude: edges.max_magnitude(),
                edge_cell_count: count_edge_cells(edges.magnitudes(), params.threshold),
                total_cell_count: u64::from(edges.width()) * u64::from(edges.height()),
            };
            (Some(edges), Some(StageDiagnostics { duration, metrics }))
        } else {
            (None, None)
        };

        let (template, duration) = timed(|| match edges {
            Some(ref edges) => placement::place_on_edges(&self.luminance, edges, &params),
            None => pattern.place(&self.luminance, &params, rng),
        });
        let placement = StageDiagnostics {
            duration,
            metrics: StageMetrics::Placement {
                pattern: pattern.to_string(),
                step: params.step(),
                stone_count: template.len(),
            },
        };

        Placed {
            config: self.config,
            original: self.original,
            luminance: self.luminance,
            advice: self.advice,
            edges,
            template,
            decode: self.decode,
            grayscale: self.grayscale,
            threshold: self.threshold,
            edge_detection,
            placement,
            started: self.started,
        }
    }
}

// ───────────────────────── Stage 4: Placed ───────────────────────────

/// Pipeline state after placement, the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`] containing all intermediates.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Placed {
    config: PipelineConfig,
    original: RgbaImage,
    luminance: LuminanceBuffer,
    advice: ThresholdAdvice,
    edges: Option<EdgeMap>,
    template: Template,
    decode: Option<StageDiagnostics>,
    grayscale: StageDiagnostics,
    threshold: StageDiagnostics,
    edge_detection: Option<StageDiagnostics>,
    placement: StageDiagnostics,
    started: Instant,
}

impl Placed {
    /// The placed stones.
    #[must_use]
    pub const fn template(&self) -> &Template {
        &self.template
    }

    /// The Sobel edge map, when the contour pattern ran.
    #[must_use]
    pub const fn edges(&self) -> Option<&EdgeMap> {
        self.edges.as_ref()
    }

    /// Design dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.luminance.dimensions()
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        let dimensions = self.dimensions();
        let diagnostics = PipelineDiagnostics {
            decode: self.decode,
            grayscale: self.grayscale,
            threshold: self.threshold,
            edge_detection: self.edge_detection,
            placement: self.placement,
            total_duration: self.started.elapsed(),
            summary: PipelineSummary {
                design_width: dimensions.width,
                design_height: dimensions.height,
                pattern: self.config.pattern.to_string(),
                threshold: self.advice.threshold,
                stone_count: self.template.len(),
            },
        };
        StagedResult {
            original: self.original,
            luminance: self.luminance,
            edges: self.edges,
            threshold: self.advice,
            template: self.template,
            dimensions,
            diagnostics,
        }
    }
}

/// Entry point for the stage-by-stage API.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    ///
    /// No processing is performed; call [`.decode()`](Pending::decode)
    /// to begin.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: PipelineConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }

    /// Start from an already decoded image, skipping the decode stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration is
    /// invalid.
    pub fn from_image(
        image: DynamicImage,
        config: PipelineConfig,
    ) -> Result<Decoded, PipelineError> {
        config.validate()?;
        Ok(Decoded::new(config, image, None, Instant::now()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::threshold::AdviceReason;

    /// Encode a PNG whose left half is black and right half white.
    fn sharp_edge_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
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

    fn config(pattern: PatternKind) -> PipelineConfig {
        PipelineConfig {
            design_width: 40,
            design_height: 40,
            pattern,
            resample_filter: crate::grayscale::ResampleFilter::Nearest,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn pending_exposes_source_bytes() {
        let png = sharp_edge_png(20, 20);
        let expected_len = png.len();
        let pending = Pipeline::new(png, PipelineConfig::default());
        assert_eq!(pending.source().len(), expected_len);
    }

    #[test]
    fn decode_empty_input_returns_error() {
        let result = Pipeline::new(vec![], PipelineConfig::default()).decode();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn decode_validates_config_first() {
        let bad = PipelineConfig {
            color_count: 0,
            ..PipelineConfig::default()
        };
        let result = Pipeline::new(vec![], bad).decode();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn stages_expose_intermediates() {
        let decoded = Pipeline::new(sharp_edge_png(20, 10), config(PatternKind::Grid))
            .decode()
            .unwrap();
        assert_eq!(decoded.original().dimensions(), (20, 10));

        let converted = decoded.grayscale();
        assert_eq!(converted.luminance().width(), 40);
        assert_eq!(converted.luminance().height(), 40);

        let advised = converted.advise_threshold();
        assert_eq!(advised.advice().threshold, 128);
        assert_eq!(advised.advice().reason, AdviceReason::Unchanged);

        let mut rng = StdRng::seed_from_u64(0);
        let placed = advised.place(&mut rng);
        assert!(!placed.template().is_empty());
        assert!(placed.edges().is_none());
        assert_eq!(placed.dimensions(), Dimensions { width: 40, height: 40 });
    }

    #[test]
    fn grid_stones_land_on_bright_half() {
        let mut rng = StdRng::seed_from_u64(0);
        let staged = Pipeline::new(sharp_edge_png(40, 40), config(PatternKind::Grid))
            .decode()
            .unwrap()
            .grayscale()
            .advise_threshold()
            .place(&mut rng)
            .into_result();
        // Lattice x = 20.3 is the first column on the white half.
        assert!(staged.template.iter().all(|s| s.x - s.radius >= 20.0));
        assert_eq!(staged.template.len(), 7 * 14);
    }

    #[test]
    fn contour_keeps_edge_map_and_diagnostics() {
        let mut rng = StdRng::seed_from_u64(0);
        let staged = Pipeline::new(sharp_edge_png(40, 40), config(PatternKind::Contour))
            .decode()
            .unwrap()
            .grayscale()
            .advise_threshold()
            .place(&mut rng)
            .into_result();
        let edges = staged.edges.as_ref().unwrap();
        assert!((edges.max_magnitude() - 1020.0).abs() < 1e-9);
        assert!(staged.diagnostics.edge_detection.is_some());
        assert!(!staged.template.is_empty());
    }

    #[test]
    fn from_image_skips_decode_stage() {
        let image = DynamicImage::ImageRgba8(image::RgbaImage::from_fn(8, 8, |_, _| {
            image::Rgba([255, 255, 255, 255])
        }));
        let mut rng = StdRng::seed_from_u64(0);
        let staged = Pipeline::from_image(image, config(PatternKind::Hatch))
            .unwrap()
            .grayscale()
            .advise_threshold()
            .place(&mut rng)
            .into_result();
        assert!(staged.diagnostics.decode.is_none());
        assert_eq!(staged.diagnostics.summary.pattern, "hatch");
    }

    #[test]
    fn summary_matches_result() {
        let mut rng = StdRng::seed_from_u64(3);
        let staged = Pipeline::new(sharp_edge_png(30, 30), config(PatternKind::Scatter))
            .decode()
            .unwrap()
            .grayscale()
            .advise_threshold()
            .place(&mut rng)
            .into_result();
        let summary = &staged.diagnostics.summary;
        assert_eq!(summary.stone_count, staged.template.len());
        assert_eq!(summary.threshold, staged.threshold.threshold);
        assert_eq!(summary.design_width, 40);
        assert!(staged.diagnostics.total_duration >= staged.diagnostics.placement.duration);
    }
}
