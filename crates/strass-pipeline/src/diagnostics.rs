//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! Every call to [`process_staged`](crate::process_staged) collects
//! diagnostics alongside the pipeline results.
//!
//! Duration measurements use [`std::time::Duration`]. Timestamps are
//! captured through the `web-time` crate, which uses `performance.now()`
//! on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::threshold::AdviceReason;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
///
/// Stages that do not always run have `Option` fields that are `None`
/// when the stage was skipped: `decode` when the caller supplied an
/// already decoded image, `edge_detection` for every pattern except
/// contour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: image decoding.
    pub decode: Option<StageDiagnostics>,
    /// Stage 1: scaling and luminance conversion.
    pub grayscale: StageDiagnostics,
    /// Stage 2: threshold advice.
    pub threshold: StageDiagnostics,
    /// Stage 3: Sobel edge map (contour pattern only).
    pub edge_detection: Option<StageDiagnostics>,
    /// Stage 4: stone placement.
    pub placement: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
    },
    /// Scaling and luminance conversion metrics.
    Grayscale {
        /// Source width in pixels.
        source_width: u32,
        /// Source height in pixels.
        source_height: u32,
        /// Design width in cells.
        width: u32,
        /// Design height in cells.
        height: u32,
        /// Resampling filter name.
        filter: String,
    },
    /// Threshold advice metrics.
    Threshold {
        /// Threshold from the configuration.
        requested: u8,
        /// Threshold used for placement.
        threshold: u8,
        /// Rule that produced `threshold`.
        reason: AdviceReason,
        /// Darkest sample.
        min: u8,
        /// Brightest sample.
        max: u8,
        /// Mean luminance.
        mean: f64,
    },
    /// Sobel edge map metrics.
    EdgeDetection {
        /// Largest gradient magnitude in the map.
        max_magnitude: f64,
        /// Cells whose magnitude exceeds the threshold.
        edge_cell_count: u64,
        /// Total cell count for computing edge density.
        total_cell_count: u64,
    },
    /// Stone placement metrics.
    Placement {
        /// Pattern name.
        pattern: String,
        /// Lattice step (`stone_diameter + spacing`).
        step: f64,
        /// Number of stones placed.
        stone_count: usize,
    },
}

/// High-level summary for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Design width in units.
    pub design_width: u32,
    /// Design height in units.
    pub design_height: u32,
    /// Pattern that placed the stones.
    pub pattern: String,
    /// Threshold used for placement.
    pub threshold: u8,
    /// Stones in the final template.
    pub stone_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Design: {}x{} units, {} pattern",
            self.summary.design_width, self.summary.design_height, self.summary.pattern,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let stages: Vec<(&str, &StageDiagnostics)> = {
            let mut s = Vec::new();
            if let Some(ref decode) = self.decode {
                s.push(("Decode", decode));
            }
            s.push(("Grayscale", &self.grayscale));
            s.push(("Threshold", &self.threshold));
            if let Some(ref edges) = self.edge_detection {
                s.push(("Edge Detection", edges));
            }
            s.push(("Placement", &self.placement));
            s
        };

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Threshold: {}  |  Stones: {}",
            self.summary.threshold, self.summary.stone_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Grayscale {
            source_width,
            source_height,
            width,
            height,
            filter,
        } => format!("{source_width}x{source_height} -> {width}x{height} ({filter})"),
        StageMetrics::Threshold {
            requested,
            threshold,
            reason,
            min,
            max,
            mean,
        } => format!(
            "{requested} -> {threshold} ({reason:?}) lum min={min} max={max} mean={mean:.1}"
        ),
        StageMetrics::EdgeDetection {
            max_magnitude,
            edge_cell_count,
            total_cell_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_cell_count > 0 {
                *edge_cell_count as f64 / *total_cell_count as f64 * 100.0
            } else {
                0.0
            };
            format!("max={max_magnitude:.1} edges={edge_cell_count} ({density:.1}%)")
        }
        StageMetrics::Placement {
            pattern,
            step,
            stone_count,
        } => format!("{pattern} step={step:.2} stones={stone_count}"),
    }
}

/// Count edge-map cells whose magnitude exceeds `threshold`.
pub(crate) fn count_edge_cells(magnitudes: &[f64], threshold: u8) -> u64 {
    let threshold = f64::from(threshold);
    magnitudes
        .iter()
        .map(|&m| u64::from(m > threshold))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_diagnostics(edge_detection: Option<StageDiagnostics>) -> PipelineDiagnostics {
        PipelineDiagnostics {
            decode: Some(StageDiagnostics {
                duration: Duration::from_millis(10),
                metrics: StageMetrics::Decode {
                    input_bytes: 1000,
                    width: 300,
                    height: 200,
                },
            }),
            grayscale: StageDiagnostics {
                duration: Duration::from_millis(5),
                metrics: StageMetrics::Grayscale {
                    source_width: 300,
                    source_height: 200,
                    width: 150,
                    height: 100,
                    filter: "Triangle".to_string(),
                },
            },
            threshold: StageDiagnostics {
                duration: Duration::from_millis(1),
                metrics: StageMetrics::Threshold {
                    requested: 128,
                    threshold: 32,
                    reason: AdviceReason::Dark,
                    min: 0,
                    max: 40,
                    mean: 12.5,
                },
            },
            edge_detection,
            placement: StageDiagnostics {
                duration: Duration::from_millis(4),
                metrics: StageMetrics::Placement {
                    pattern: "contour".to_string(),
                    step: 2.9,
                    stone_count: 42,
                },
            },
            total_duration: Duration::from_millis(20),
            summary: PipelineSummary {
                design_width: 150,
                design_height: 100,
                pattern: "contour".to_string(),
                threshold: 32,
                stone_count: 42,
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn count_edge_cells_is_strict() {
        assert_eq!(count_edge_cells(&[0.0, 128.0, 128.5, 1020.0], 128), 2);
        assert_eq!(count_edge_cells(&[], 0), 0);
    }

    #[test]
    fn report_lists_stages_that_ran() {
        let report = sample_diagnostics(None).report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        assert!(report.contains("Decode"));
        assert!(report.contains("128 -> 32 (Dark)"));
        assert!(report.contains("Stones: 42"));
        assert!(!report.contains("Edge Detection"));
    }

    #[test]
    fn report_includes_edge_detection_when_present() {
        let report = sample_diagnostics(Some(StageDiagnostics {
            duration: Duration::from_millis(3),
            metrics: StageMetrics::EdgeDetection {
                max_magnitude: 1020.0,
                edge_cell_count: 50,
                total_cell_count: 1000,
            },
        }))
        .report();
        assert!(report.contains("Edge Detection"));
        assert!(report.contains("(5.0%)"));
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(sample_diagnostics(None)).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.02).abs() < 1e-12);
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.total_duration, Duration::from_millis(20));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(sample_diagnostics(None)).unwrap();
        json["total_duration"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<PipelineDiagnostics>(json).is_err());
    }
}
