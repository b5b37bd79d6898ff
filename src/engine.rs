//! The rendering-engine seam.

use crate::error::Result;

/// Turns an HTML document into complete PDF bytes.
///
/// `stylesheets` are user stylesheets applied after the document's own
/// sheets. Relative references in the document resolve against `base_url`.
pub trait RenderEngine {
    fn render(&self, html: &str, stylesheets: &[&str], base_url: &str) -> Result<Vec<u8>>;
}

impl<E: RenderEngine + ?Sized> RenderEngine for &E {
    fn render(&self, html: &str, stylesheets: &[&str], base_url: &str) -> Result<Vec<u8>> {
        (**self).render(html, stylesheets, base_url)
    }
}
