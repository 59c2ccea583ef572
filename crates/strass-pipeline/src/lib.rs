//! strass-pipeline: Pure image-to-rhinestone placement pipeline (sans-IO).
//!
//! Converts raster images into rhinestone templates through:
//! decode -> scale + luminance -> threshold advice -> stone placement.
//!
//! Placement is pluggable ([`PatternKind`]): grid, Poisson-disk
//! scatter, concentric rings, Sobel-edge contour, or diagonal hatch.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and returns structured data. Serializers live in
//! `strass-export`, file handling in the `strass` binary.

pub mod diagnostics;
pub mod edge;
pub mod grayscale;
pub mod palette;
pub mod pipeline;
pub mod placement;
pub mod poisson;
pub mod threshold;
pub mod types;

use image::DynamicImage;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

pub use diagnostics::PipelineDiagnostics;
pub use edge::EdgeMap;
pub use grayscale::ResampleFilter;
pub use palette::{Color, Palette};
pub use pipeline::Pipeline;
pub use placement::{PatternKind, PlacementParams, StonePlacer};
pub use threshold::{AdviceReason, LuminanceStats, ThresholdAdvice};
pub use types::{
    Dimensions, LuminanceBuffer, PipelineConfig, PipelineError, Point, ProcessResult,
    StagedResult, Stone, StoneSize, Template,
};

/// Run the full pipeline on encoded image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration and
/// produces a [`ProcessResult`]: the placed stones, the threshold that
/// was actually used, and the design dimensions the stone coordinates
/// live in.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Decode the image
/// 3. Scale to the design dimensions and convert to luminance
/// 4. Threshold advice
/// 5. Stone placement with the configured pattern
///
/// The scatter pattern's random source is seeded from
/// [`PipelineConfig::seed`], or from system entropy when unset.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the configuration is
/// invalid, [`PipelineError::EmptyInput`] if `image_bytes` is empty, and
/// [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<ProcessResult, PipelineError> {
    config.validate()?;
    let image = grayscale::decode(image_bytes)?;
    let mut rng = rng_for(config);
    process_image(&image, config, &mut rng)
}

/// Run the pipeline on an already decoded image with an injected
/// random source.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the configuration is
/// invalid.
pub fn process_image(
    image: &DynamicImage,
    config: &PipelineConfig,
    rng: &mut dyn RngCore,
) -> Result<ProcessResult, PipelineError> {
    config.validate()?;
    let luminance = grayscale::to_luminance(image, config.dimensions(), config.resample_filter);
    generate(Some(&luminance), config, rng)
}

/// Advise a threshold and place stones over `luminance`.
///
/// With no buffer (nothing loaded yet) the result is an empty template,
/// the configured threshold unchanged, and the configured dimensions.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the configuration is
/// invalid.
pub fn generate(
    luminance: Option<&LuminanceBuffer>,
    config: &PipelineConfig,
    rng: &mut dyn RngCore,
) -> Result<ProcessResult, PipelineError> {
    config.validate()?;
    let advice = luminance.map_or_else(
        || ThresholdAdvice::unchanged(config.threshold),
        |buffer| threshold::advise(buffer, config.threshold, config.force_threshold_adjust),
    );
    let params = PlacementParams::from_config(config, advice.threshold);
    let template = placement::place(luminance, config.pattern, &params, rng);
    Ok(ProcessResult {
        template,
        threshold: advice,
        dimensions: luminance.map_or_else(|| config.dimensions(), LuminanceBuffer::dimensions),
    })
}

/// Run the full pipeline, preserving every intermediate and collecting
/// per-stage diagnostics.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_staged(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    let mut rng = rng_for(config);
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .grayscale()
        .advise_threshold()
        .place(&mut rng)
        .into_result())
}

/// The random source for `config`: seeded when [`PipelineConfig::seed`]
/// is set, otherwise drawn from the thread-local generator.
#[must_use]
pub fn rng_for(config: &PipelineConfig) -> StdRng {
    config.seed.map_or_else(
        || StdRng::from_rng(&mut rand::rng()),
        StdRng::seed_from_u64,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode `img` as PNG bytes.
    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
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

    /// Horizontal black-to-white ramp.
    fn ramp_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, _| {
            let v = u8::try_from(x * 255 / (width - 1)).unwrap();
            image::Rgba([v, v, v, 255])
        });
        encode_png(&img)
    }

    fn uniform_png(value: u8) -> Vec<u8> {
        encode_png(&image::RgbaImage::from_fn(16, 16, |_, _| {
            image::Rgba([value, value, value, 255])
        }))
    }

    fn small_config(pattern: PatternKind) -> PipelineConfig {
        PipelineConfig {
            design_width: 60,
            design_height: 40,
            pattern,
            seed: Some(99),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_rejects_invalid_config_before_decoding() {
        let config = PipelineConfig {
            stone_diameter: 0.0,
            ..PipelineConfig::default()
        };
        let result = process(&[], &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn process_ramp_every_pattern() {
        let png = ramp_png(64, 16);
        for pattern in PatternKind::ALL {
            let result = process(&png, &small_config(pattern)).unwrap();
            assert_eq!(result.dimensions, Dimensions { width: 60, height: 40 });
            assert_eq!(result.threshold.threshold, 128);
            for stone in &result.template {
                assert!(stone.x >= 0.0 && stone.y >= 0.0, "{pattern}: negative center");
                assert!(stone.x < 62.0 && stone.y < 42.0, "{pattern}: center off canvas");
            }
        }
    }

    #[test]
    fn process_grid_places_on_bright_side_only() {
        let result = process(&ramp_png(64, 16), &small_config(PatternKind::Grid)).unwrap();
        assert!(!result.template.is_empty());
        // Accepted cells have luminance > 128, i.e. the right half of the ramp.
        assert!(result.template.iter().all(|s| s.x > 29.0));
    }

    #[test]
    fn dark_image_threshold_is_adjusted() {
        let result = process(&uniform_png(20), &small_config(PatternKind::Grid)).unwrap();
        // Contrast 0 triggers the low-contrast rule first: threshold = mean.
        assert_eq!(result.threshold.threshold, 20);
        assert_eq!(result.threshold.reason, AdviceReason::LowContrast);
        assert!(result.template.is_empty());

        let inverted = PipelineConfig {
            invert: true,
            ..small_config(PatternKind::Grid)
        };
        let result = process(&uniform_png(20), &inverted).unwrap();
        assert_eq!(result.template.len(), 21 * 14);
    }

    #[test]
    fn seeded_scatter_is_reproducible() {
        let png = ramp_png(64, 16);
        let config = small_config(PatternKind::Scatter);
        let a = process(&png, &config).unwrap();
        let b = process(&png, &config).unwrap();
        assert_eq!(a, b);
        assert!(!a.template.is_empty());
    }

    #[test]
    fn generate_without_buffer_is_empty() {
        let config = small_config(PatternKind::Radial);
        let mut rng = rng_for(&config);
        let result = generate(None, &config, &mut rng).unwrap();
        assert!(result.template.is_empty());
        assert_eq!(result.threshold, ThresholdAdvice::unchanged(128));
        assert_eq!(result.dimensions, config.dimensions());
    }

    #[test]
    fn generate_validates_config() {
        let config = PipelineConfig {
            custom_colors: vec![Color::BLACK],
            color_count: 2,
            ..PipelineConfig::default()
        };
        let mut rng = rng_for(&config);
        assert!(generate(None, &config, &mut rng).is_err());
    }

    #[test]
    fn stone_colors_come_from_custom_palette() {
        let palette = vec![Color::new(1, 1, 1), Color::new(2, 2, 2), Color::new(3, 3, 3)];
        let config = PipelineConfig {
            color_count: 3,
            custom_colors: palette.clone(),
            threshold: 10,
            ..small_config(PatternKind::Grid)
        };
        let result = process(&ramp_png(64, 16), &config).unwrap();
        assert!(!result.template.is_empty());
        assert!(result.template.iter().all(|s| palette.contains(&s.color)));
    }

    #[test]
    fn staged_matches_process() {
        let png = ramp_png(64, 16);
        let config = small_config(PatternKind::Scatter);
        let staged = process_staged(&png, &config).unwrap();
        let direct = process(&png, &config).unwrap();
        assert_eq!(staged.diagnostics.summary.stone_count, staged.template.len());
        assert_eq!(staged.into_result(), direct);
    }
}
