//! # pdf-press – HTML → PDF with a fixed print stylesheet
//!
//! This crate turns an HTML document into a paginated PDF. The pipeline
//! stages are:
//!
//! 1. **Parse** – HTML string → DOM tree ([`dom`])
//! 2. **Load** – linked stylesheets and images via [`fetch`]
//! 3. **Style** – cascade `<style>`, linked and user sheets plus inline
//!    styles ([`css`], [`style`])
//! 4. **Layout** – compute block/flex/grid/table layout with Taffy ([`layout`])
//! 5. **Paginate** – split into pages and add `@page` margin boxes
//!    ([`pagination`], [`page`])
//! 6. **Render** – emit PDF bytes via printpdf, normalised with lopdf
//!    ([`render`], [`normalize`])
//!
//! The `generate-pdf` binary wraps the pipeline in an [`Invoker`] that reads
//! stdin, applies [`print_css::PRINT_CSS`] and writes the PDF to stdout.

pub mod css;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod fonts;
pub mod invoker;
pub mod layout;
pub mod layout_config;
pub mod normalize;
pub mod page;
pub mod pagination;
pub mod pipeline;
pub mod print_css;
pub mod render;
pub mod style;

// Re-exports for convenience
pub use engine::RenderEngine;
pub use error::{Error, RenderError};
pub use invoker::Invoker;
pub use pipeline::{generate_pdf, HtmlEngine, PipelineConfig};
