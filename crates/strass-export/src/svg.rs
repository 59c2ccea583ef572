//! SVG export serializers.
//!
//! Converts a [`Template`] into an SVG string with one `<circle>` per
//! stone, using the [`svg`] crate for document construction and XML
//! escaping. One design unit is one millimetre: the document is
//! `{width}mm × {height}mm` with `viewBox="0 0 width height"`, so stone
//! coordinates are written unchanged.
//!
//! Two flavors are provided:
//!
//! - [`to_svg`]: plain SVG with a shared `.stone` style.
//! - [`to_cdr_svg`]: a variant laid out for import into CorelDRAW, with
//!   RDF/Dublin Core metadata, a named layer group, per-stone ids and
//!   inline styles.
//!
//! These are pure functions with no I/O; they return a `String`.

use svg::Document;
use svg::node::element::{Circle, Description, Element, Group, Title};
use svg::node::{Node, Text};

use strass_pipeline::{Dimensions, PatternKind, Stone, Template};

/// Stroke drawn around every stone, in design units.
const STONE_STROKE_WIDTH: f64 = 0.1;

/// Title used in Dublin Core metadata when none is supplied.
const DEFAULT_DC_TITLE: &str = "Rhinestone Template";

/// Creator recorded in Dublin Core metadata.
const DC_CREATOR: &str = "strass";

/// Metadata to embed in the SVG document.
///
/// Every field is optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// When `None` and [`pattern`](Self::pattern) is set, the title
    /// defaults to `Rhinestone Template - {pattern} pattern`.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Pattern that produced the template.
    pub pattern: Option<PatternKind>,

    /// Creation date for the CorelDRAW variant's `dc:date`, typically an
    /// ISO 8601 timestamp. The serializers never read the clock.
    pub date: Option<&'a str>,
}

impl SvgMetadata<'_> {
    /// The `<title>` text, if any.
    fn resolved_title(&self) -> Option<String> {
        self.title.map(str::to_owned).or_else(|| {
            self.pattern
                .map(|pattern| format!("Rhinestone Template - {pattern} pattern"))
        })
    }
}

/// Root `<svg>` element sized in millimetres with a unit viewBox.
fn base_document(dimensions: Dimensions) -> Document {
    let Dimensions { width, height } = dimensions;
    Document::new()
        .set("width", format!("{width}mm"))
        .set("height", format!("{height}mm"))
        .set("viewBox", (0, 0, width, height))
}

/// `<defs><style>css</style></defs>`.
fn style_defs(css: &str, css_type: Option<&str>) -> Element {
    let mut style = Element::new("style");
    if let Some(css_type) = css_type {
        style.assign("type", css_type);
    }
    style.append(Text::new(css));
    let mut defs = Element::new("defs");
    defs.append(style);
    defs
}

/// `<circle>` for one stone with its geometry and fill.
fn stone_circle(stone: &Stone) -> Circle {
    Circle::new()
        .set("cx", stone.x)
        .set("cy", stone.y)
        .set("r", stone.radius)
        .set("fill", stone.color.to_string())
}

/// Serialize a template as a plain SVG document.
///
/// Stones are emitted in template order as
/// `<circle class="stone" cx cy r fill>`; the shared `.stone` style
/// gives each a thin black outline. An empty template produces a valid
/// document with no circles.
///
/// # Examples
///
/// ```
/// use strass_pipeline::{Color, Dimensions, PatternKind, Stone, Template};
/// use strass_export::{SvgMetadata, to_svg};
///
/// let template = Template::new(vec![Stone {
///     x: 1.2,
///     y: 1.2,
///     radius: 1.2,
///     color: Color::new(255, 0, 0),
/// }]);
/// let metadata = SvgMetadata {
///     pattern: Some(PatternKind::Grid),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&template, Dimensions { width: 150, height: 100 }, &metadata);
/// assert!(svg.contains(r#"width="150mm""#));
/// assert!(svg.contains("<title>Rhinestone Template - grid pattern</title>"));
/// assert!(svg.contains(r##"fill="#FF0000""##));
/// ```
#[must_use]
pub fn to_svg(template: &Template, dimensions: Dimensions, metadata: &SvgMetadata<'_>) -> String {
    let mut doc = base_document(dimensions);

    if let Some(title) = metadata.resolved_title() {
        doc = doc.add(Title::new(title.as_str()));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    doc = doc.add(style_defs(
        &format!(".stone {{ stroke: #000; stroke-width: {STONE_STROKE_WIDTH}; }}"),
        None,
    ));

    for stone in template {
        doc = doc.add(stone_circle(stone).set("class", "stone"));
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

/// Serialize a template as an SVG laid out for CorelDRAW import.
///
/// Differences from [`to_svg`]:
///
/// - `version="1.1"` and `id="rhinestone-template"` on the root, and an
///   XML declaration with `standalone="no"`
/// - a `<metadata>` block with RDF/Dublin Core `dc:title`, `dc:creator`
///   and, when supplied, `dc:date`
/// - all stones inside `<g id="rhinestone-layer">` marked as an Inkscape
///   layer, which CorelDRAW imports as a named layer
/// - per-stone `id="stone-{index}"` and an inline `style` repeating the
///   fill and stroke, since CorelDRAW ignores class selectors on import
///
/// # Examples
///
/// ```
/// use strass_pipeline::{Dimensions, Template};
/// use strass_export::{SvgMetadata, to_cdr_svg};
///
/// let svg = to_cdr_svg(
///     &Template::default(),
///     Dimensions { width: 80, height: 60 },
///     &SvgMetadata::default(),
/// );
/// assert!(svg.contains(r#"id="rhinestone-layer""#));
/// assert!(svg.contains("<dc:creator>strass</dc:creator>"));
/// ```
#[must_use]
pub fn to_cdr_svg(
    template: &Template,
    dimensions: Dimensions,
    metadata: &SvgMetadata<'_>,
) -> String {
    let mut doc = base_document(dimensions)
        .set("xmlns:xlink", "http://www.w3.org/1999/xlink")
        .set("xmlns:inkscape", "http://www.inkscape.org/namespaces/inkscape")
        .set("version", "1.1")
        .set("id", "rhinestone-template");

    let title = metadata.resolved_title();
    if let Some(ref title) = title {
        doc = doc.add(Title::new(title.as_str()));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    doc = doc.add(dublin_core(
        title.as_deref().unwrap_or(DEFAULT_DC_TITLE),
        metadata.date,
    ));

    doc = doc.add(style_defs(
        &format!(
            ".stone {{ stroke: #000000; stroke-width: {STONE_STROKE_WIDTH}; fill-rule: evenodd; }} \
             .stone-fill {{ fill-opacity: 1; }}"
        ),
        Some("text/css"),
    ));

    let mut layer = Group::new()
        .set("id", "rhinestone-layer")
        .set("inkscape:groupmode", "layer")
        .set("inkscape:label", "Rhinestones");
    for (index, stone) in template.iter().enumerate() {
        let circle = stone_circle(stone)
            .set("class", "stone stone-fill")
            .set("id", format!("stone-{index}"))
            .set(
                "style",
                format!(
                    "fill: {}; stroke: #000000; stroke-width: {STONE_STROKE_WIDTH};",
                    stone.color,
                ),
            );
        layer = layer.add(circle);
    }
    doc = doc.add(layer);

    format!("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n{doc}\n")
}

/// `<metadata>` holding an RDF description with Dublin Core fields.
fn dublin_core(title: &str, date: Option<&str>) -> Element {
    let text_element = |name: &str, text: &str| {
        let mut el = Element::new(name);
        el.append(Text::new(text));
        el
    };

    let mut description = Element::new("rdf:Description");
    description.assign("rdf:about", "");
    description.assign("xmlns:dc", "http://purl.org/dc/elements/1.1/");
    description.append(text_element("dc:title", title));
    description.append(text_element("dc:creator", DC_CREATOR));
    if let Some(date) = date {
        description.append(text_element("dc:date", date));
    }

    let mut rdf = Element::new("rdf:RDF");
    rdf.assign("xmlns:rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#");
    rdf.append(description);

    let mut metadata = Element::new("metadata");
    metadata.append(rdf);
    metadata
}
