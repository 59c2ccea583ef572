//! strass-export: Pure template serializers (sans-IO).
//!
//! Converts a rhinestone [`Template`](strass_pipeline::Template) into
//! output formats: plain SVG, CorelDRAW-oriented SVG, and a raster
//! preview image. Nothing here touches the filesystem; callers write
//! the returned strings and images wherever they need them.

pub mod raster;
pub mod svg;

pub use raster::{ExportError, PreviewScale, canvas_size, render_preview};
pub use svg::{SvgMetadata, to_cdr_svg, to_svg};
