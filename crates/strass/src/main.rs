//! strass: turn an image into a rhinestone placement template.
//!
//! Runs the placement pipeline on an image file and writes the template
//! as SVG, CorelDRAW-flavoured SVG, and/or a PNG preview, printing the
//! threshold actually used and per-stage diagnostics.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin strass -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use strass_export::{PreviewScale, SvgMetadata};
use strass_pipeline::{Color, PatternKind, PipelineConfig, ResampleFilter, StagedResult, StoneSize};

/// Rhinestone template generator.
///
/// Scales the image to the design size, decides which cells get a stone
/// and lays the stones out in the chosen pattern.
#[derive(Parser)]
#[command(name = "strass", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Design width in millimetres.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_DESIGN_WIDTH, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    width: u32,

    /// Design height in millimetres.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_DESIGN_HEIGHT, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    height: u32,

    /// Standard stone size. Overrides --stone-diameter.
    #[arg(long, value_enum)]
    stone_size: Option<Size>,

    /// Custom stone diameter in millimetres (0.1-10.0).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_STONE_DIAMETER)]
    stone_diameter: f64,

    /// Gap between neighbouring stones in millimetres.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SPACING)]
    spacing: f64,

    /// Luminance threshold (0-255).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Place stones on dark areas instead of bright ones.
    #[arg(long)]
    invert: bool,

    /// Number of stone colors.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_COLOR_COUNT, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    colors: u32,

    /// Custom stone color as #RRGGBB. Repeat once per color; the count
    /// must match --colors.
    #[arg(long = "color", value_name = "HEX")]
    custom_colors: Vec<Color>,

    /// Placement pattern.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_PATTERN)]
    pattern: Pattern,

    /// Seed for the scatter pattern (system entropy when omitted).
    #[arg(long)]
    seed: Option<u64>,

    /// Resampling filter used to scale the image to the design size.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    resample_filter: Filter,

    /// Apply the mean-luminance threshold even when the image looks fine.
    #[arg(long)]
    force_threshold_adjust: bool,

    /// Write a plain SVG template to this file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write a CorelDRAW-oriented SVG template to this file.
    #[arg(long)]
    cdr: Option<PathBuf>,

    /// Write a PNG preview to this file.
    #[arg(long)]
    png: Option<PathBuf>,

    /// Preview zoom: `auto` or a percentage such as `150`.
    #[arg(long, default_value = "auto")]
    zoom: PreviewScale,

    /// Date recorded in the CorelDRAW metadata (e.g. 2026-10-19).
    #[arg(long)]
    date: Option<String>,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Standard stone size selection.
#[derive(Clone, Copy, ValueEnum)]
enum Size {
    /// 2.4 mm.
    Ss6,
    /// 2.8 mm.
    Ss10,
    /// 3.2 mm.
    Ss16,
    /// 3.6 mm.
    Ss20,
}

/// Placement pattern selection.
#[derive(Clone, Copy, ValueEnum)]
enum Pattern {
    /// Square lattice.
    Grid,
    /// Poisson-disk blue noise.
    Scatter,
    /// Concentric rings around the centre.
    Radial,
    /// Lattice cells on strong edges.
    Contour,
    /// Diagonal lines.
    Hatch,
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

/// Maps a [`PatternKind`] to the local CLI [`Pattern`] enum.
const fn pattern_from_pipeline(p: PatternKind) -> Pattern {
    match p {
        PatternKind::Grid => Pattern::Grid,
        PatternKind::Scatter => Pattern::Scatter,
        PatternKind::Radial => Pattern::Radial,
        PatternKind::Contour => Pattern::Contour,
        PatternKind::Hatch => Pattern::Hatch,
    }
}

const CLI_DEFAULT_PATTERN: Pattern = pattern_from_pipeline(PipelineConfig::DEFAULT_PATTERN);

/// Maps a [`ResampleFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_pipeline(f: ResampleFilter) -> Filter {
    match f {
        ResampleFilter::Nearest => Filter::Nearest,
        ResampleFilter::Triangle => Filter::Triangle,
        ResampleFilter::CatmullRom => Filter::CatmullRom,
        ResampleFilter::Gaussian => Filter::Gaussian,
        ResampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from
/// [`PipelineConfig::DEFAULT_RESAMPLE_FILTER`] so the two cannot silently
/// diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(PipelineConfig::DEFAULT_RESAMPLE_FILTER);

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.  Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let stone_diameter = cli.stone_size.map_or(cli.stone_diameter, |size| {
        match size {
            Size::Ss6 => StoneSize::Ss6,
            Size::Ss10 => StoneSize::Ss10,
            Size::Ss16 => StoneSize::Ss16,
            Size::Ss20 => StoneSize::Ss20,
        }
        .diameter()
    });

    Ok(PipelineConfig {
        design_width: cli.width,
        design_height: cli.height,
        stone_diameter,
        spacing: cli.spacing,
        threshold: cli.threshold,
        invert: cli.invert,
        color_count: cli.colors,
        pattern: match cli.pattern {
            Pattern::Grid => PatternKind::Grid,
            Pattern::Scatter => PatternKind::Scatter,
            Pattern::Radial => PatternKind::Radial,
            Pattern::Contour => PatternKind::Contour,
            Pattern::Hatch => PatternKind::Hatch,
        },
        custom_colors: cli.custom_colors.clone(),
        force_threshold_adjust: cli.force_threshold_adjust,
        seed: cli.seed,
        resample_filter: match cli.resample_filter {
            Filter::Nearest => ResampleFilter::Nearest,
            Filter::Triangle => ResampleFilter::Triangle,
            Filter::CatmullRom => ResampleFilter::CatmullRom,
            Filter::Gaussian => ResampleFilter::Gaussian,
            Filter::Lanczos3 => ResampleFilter::Lanczos3,
        },
    })
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    log::debug!("config: {config:#?}");

    let staged = match strass_pipeline::process_staged(&image_bytes, &config) {
        Ok(staged) => staged,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let advice = staged.threshold;
    if advice.changed() {
        eprintln!(
            "Threshold: {} (adjusted from {}, {:?})",
            advice.threshold, advice.requested, advice.reason,
        );
    } else {
        eprintln!("Threshold: {}", advice.threshold);
    }
    eprintln!("Stones: {}", staged.template.len());
    if staged.template.is_empty() {
        eprintln!("No stones placed; try adjusting --threshold or --invert");
    }
    eprintln!();

    if cli.json {
        match serde_json::to_string_pretty(&staged.diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", staged.diagnostics.report());
    }

    match write_outputs(&cli, &config, &staged) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// Write every requested output file.
fn write_outputs(cli: &Cli, config: &PipelineConfig, staged: &StagedResult) -> Result<(), String> {
    let title = cli.image_path.file_stem().and_then(|s| s.to_str());
    let desc = format!(
        "{} stones, {} mm stone diameter, threshold {}",
        staged.template.len(),
        config.stone_diameter,
        staged.threshold.threshold,
    );
    let metadata = SvgMetadata {
        title,
        description: Some(&desc),
        pattern: Some(config.pattern),
        date: cli.date.as_deref(),
    };

    if let Some(ref path) = cli.svg {
        let svg = strass_export::to_svg(&staged.template, staged.dimensions, &metadata);
        write_text(path, "SVG", &svg)?;
    }

    if let Some(ref path) = cli.cdr {
        let svg = strass_export::to_cdr_svg(&staged.template, staged.dimensions, &metadata);
        write_text(path, "CorelDRAW SVG", &svg)?;
    }

    if let Some(ref path) = cli.png {
        let preview = strass_export::render_preview(&staged.template, staged.dimensions, cli.zoom)
            .map_err(|e| format!("Error rendering preview: {e}"))?;
        preview
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| format!("Error writing PNG to {}: {e}", path.display()))?;
        eprintln!(
            "PNG preview written to {} ({}x{} px)",
            path.display(),
            preview.width(),
            preview.height(),
        );
    }

    Ok(())
}

fn write_text(path: &Path, kind: &str, contents: &str) -> Result<(), String> {
    std::fs::write(path, contents)
        .map_err(|e| format!("Error writing {kind} to {}: {e}", path.display()))?;
    eprintln!("{kind} written to {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("strass").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_library() {
        let cli = parse(&["in.png"]);
        assert_eq!(config_from_cli(&cli).unwrap(), PipelineConfig::default());
        assert_eq!(cli.zoom, PreviewScale::Auto);
    }

    #[test]
    fn flags_build_config() {
        let cli = parse(&[
            "in.png",
            "--width",
            "80",
            "--height",
            "60",
            "--stone-size",
            "ss16",
            "--pattern",
            "hatch",
            "--colors",
            "2",
            "--color",
            "#ff0000",
            "--color",
            "00ff00",
            "--invert",
            "--seed",
            "7",
            "--zoom",
            "150%",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.dimensions().width, 80);
        assert_eq!(config.design_height, 60);
        assert!((config.stone_diameter - 3.2).abs() < f64::EPSILON);
        assert_eq!(config.pattern, PatternKind::Hatch);
        assert_eq!(
            config.custom_colors,
            vec![Color::new(255, 0, 0), Color::new(0, 255, 0)]
        );
        assert!(config.invert);
        assert_eq!(config.seed, Some(7));
        assert!(config.validate().is_ok());
        assert_eq!(cli.zoom, PreviewScale::Percent(150));
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "in.png",
            "--width",
            "10",
            "--config-json",
            r#"{"pattern": "radial", "design_width": 40}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.pattern, PatternKind::Radial);
        assert_eq!(config.design_width, 40);
        assert_eq!(config.design_height, PipelineConfig::DEFAULT_DESIGN_HEIGHT);
    }

    #[test]
    fn rejects_bad_input() {
        let with = |extra: &[&str]| {
            Cli::try_parse_from(["strass", "in.png"].iter().copied().chain(extra.iter().copied()))
        };
        assert!(with(&["--width", "0"]).is_err());
        assert!(with(&["--color", "red"]).is_err());
        assert!(with(&["--zoom", "huge"]).is_err());

        let cli = parse(&["in.png", "--config-json", "{not json"]);
        assert!(config_from_cli(&cli).is_err());
    }
}
