//! Pipeline – ties together parsing, resource loading, styling, layout,
//! pagination, and rendering into a single function call.

use log::{debug, trace};

use crate::css::Stylesheet;
use crate::dom::{document_title, parse_html, style_sources, StyleSource};
use crate::engine::RenderEngine;
use crate::error::Result;
use crate::fetch::{DefaultFetcher, ImageStore, ResourceLoader, UrlFetcher};
use crate::fonts::FontManager;
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::page::{PageGeometry, PageStyle};
use crate::pagination::paginate;
use crate::render::render_pdf;
use crate::style::{build_styled_tree, Cascade};

/// Page margin used when no `@page` rule sets one, in points.
pub const DEFAULT_PAGE_MARGIN_PT: f32 = 40.0;

/// Configuration for the PDF generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata when the document has no
    /// `<title>` (default: "pdf-press output").
    pub title: String,
    /// Base URL for relative references (default: `file:///`, i.e. paths
    /// relative to the filesystem root).
    pub base_url: String,
    /// Page geometry before `@page` rules apply (default: A4, 40pt margins).
    pub page: PageGeometry,
    /// User stylesheets, applied after the document's own sheets.
    pub stylesheets: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: LayoutConfig::default_title(),
            base_url: "file:///".to_string(),
            page: PageGeometry::a4(DEFAULT_PAGE_MARGIN_PT),
            stylesheets: Vec::new(),
        }
    }
}

/// Everything needed to render once layout is done.
struct Prepared {
    layout: LayoutConfig,
    images: ImageStore,
}

fn prepare(html: &str, config: &PipelineConfig, fetcher: &dyn UrlFetcher) -> Result<Prepared> {
    // 1. Parse HTML
    let dom = parse_html(html);

    // 2. Load stylesheets: the document's in order, then the user's
    let loader = ResourceLoader::new(&config.base_url, fetcher)?;
    let mut sheets: Vec<Stylesheet> = Vec::new();
    for source in style_sources(&dom) {
        match source {
            StyleSource::Embedded(css) => sheets.extend(loader.embedded_stylesheet(&css)?),
            StyleSource::Linked(href) => sheets.extend(loader.linked_stylesheet(&href)?),
        }
    }
    for css in &config.stylesheets {
        sheets.extend(loader.embedded_stylesheet(css)?);
    }
    debug!("Loaded {} stylesheet(s)", sheets.len());

    // 3. Images
    let images = loader.images(&dom)?;
    debug!("Loaded {} image(s)", images.len());

    // 4. Build styled tree
    let cascade = Cascade::new(&sheets);
    let styled = build_styled_tree(&dom, &cascade);

    // 5. Page style from @page rules
    let page_style = PageStyle::from_rules(
        sheets.iter().flat_map(|s| s.page_rules.iter()),
        config.page,
    );
    let geometry = page_style.geometry;

    // 6. Compute layout
    let fonts = FontManager::default();
    let boxes = compute_layout(&styled, &geometry, &fonts, &images)?;

    // 7. Paginate, then resolve margin boxes now the page count is known
    let mut layout = paginate(&boxes, &geometry, &fonts);
    page_style.decorate(&mut layout, &fonts);
    layout.title = document_title(&dom).unwrap_or_else(|| config.title.clone());
    debug!("Laid out {} page(s)", layout.pages.len());
    trace!("Layout: {}", layout.to_json());

    Ok(Prepared { layout, images })
}

/// Full pipeline: HTML string → PDF bytes, fetching resources with
/// `fetcher`.
pub fn generate_pdf_with(
    html: &str,
    config: &PipelineConfig,
    fetcher: &dyn UrlFetcher,
) -> Result<(Vec<u8>, LayoutConfig)> {
    let Prepared { layout, images } = prepare(html, config, fetcher)?;
    let pdf_bytes = render_pdf(&layout, &images)?;
    Ok((pdf_bytes, layout))
}

/// Full pipeline with the default fetcher.
///
/// Returns the PDF bytes and the layout they were rendered from.
pub fn generate_pdf(html: &str, config: &PipelineConfig) -> Result<(Vec<u8>, LayoutConfig)> {
    generate_pdf_with(html, config, &DefaultFetcher::new())
}

/// Generate only the layout config (no PDF rendering) – useful for testing.
pub fn compute_layout_config(html: &str, config: &PipelineConfig) -> Result<LayoutConfig> {
    Ok(prepare(html, config, &DefaultFetcher::new())?.layout)
}

/// The in-crate [`RenderEngine`]: default page geometry and title, with the
/// caller's stylesheets and base URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEngine;

impl RenderEngine for HtmlEngine {
    fn render(&self, html: &str, stylesheets: &[&str], base_url: &str) -> Result<Vec<u8>> {
        let config = PipelineConfig {
            base_url: base_url.to_string(),
            stylesheets: stylesheets.iter().map(|s| s.to_string()).collect(),
            ..PipelineConfig::default()
        };
        let (bytes, _) = generate_pdf(html, &config)?;
        Ok(bytes)
    }
}
