//! Resource resolution – turns `href`/`src` references into bytes.
//!
//! References are resolved against the document base URL. `data:` URLs are
//! decoded in place; anything else goes through a [`UrlFetcher`]. A reference
//! that is not a valid URL, or a malformed `data:` URL, fails the render. A
//! fetch that fails is logged and the resource is skipped.

#[cfg(feature = "remote")]
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::io;
#[cfg(feature = "remote")]
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use log::{debug, warn};
use thiserror::Error;
use url::Url;

use crate::css::{parse_stylesheet, Stylesheet};
use crate::dom::{DomNode, Tag};
use crate::error::{RenderError, Result};

/// Per-request timeout for remote resources.
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[cfg(feature = "remote")]
const USER_AGENT: &str = concat!("pdf-press/", env!("CARGO_PKG_VERSION"));

/// Nesting limit for `@import` chains.
const MAX_IMPORT_DEPTH: usize = 8;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    #[error("Unsupported URL scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Retrieves the bytes behind an absolute, non-`data:` URL.
pub trait UrlFetcher {
    fn fetch(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Fetches `file:` URLs from disk and `http(s):` URLs with a blocking client
/// (cargo feature `remote`).
#[derive(Default)]
pub struct DefaultFetcher {
    #[cfg(feature = "remote")]
    client: OnceCell<reqwest::blocking::Client>,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "remote")]
    fn client(&self) -> std::result::Result<&reqwest::blocking::Client, FetchError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let built = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(self.client.get_or_init(|| built))
    }

    #[cfg(feature = "remote")]
    fn fetch_http(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self
            .client()?
            .get(url.as_str())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Http(e.to_string()))?;
        let body = response
            .bytes()
            .map_err(|e| FetchError::Http(format!("Failed to read response body: {e}")))?;
        Ok(body.to_vec())
    }

    #[cfg(not(feature = "remote"))]
    fn fetch_http(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
        Err(FetchError::UnsupportedScheme(url.scheme().to_string()))
    }
}

impl UrlFetcher for DefaultFetcher {
    fn fetch(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FetchError::UnsupportedScheme(format!("file URL {url}")))?;
                Ok(fs::read(path)?)
            }
            "data" => decode_data_url(url),
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Decode the payload of a `data:` URL (base64 or percent-encoded).
pub fn decode_data_url(url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
    let body = &url[url::Position::BeforePath..url::Position::AfterQuery];
    let (header, payload) = body
        .split_once(',')
        .ok_or_else(|| FetchError::MalformedDataUrl("missing `,` separator".into()))?;
    let bytes = percent_decode(payload.as_bytes());
    let is_base64 = header
        .rsplit(';')
        .next()
        .map(|p| p.trim().eq_ignore_ascii_case("base64"))
        .unwrap_or(false);
    if !is_base64 {
        return Ok(bytes);
    }
    let cleaned: Vec<u8> = bytes.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
    general_purpose::STANDARD
        .decode(&cleaned)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(&cleaned))
        .map_err(|e| FetchError::MalformedDataUrl(format!("invalid base64 payload: {e}")))
}

fn percent_decode(input: &[u8]) -> Vec<u8> {
    let hex = |b: u8| (b as char).to_digit(16).map(|d| d as u8);
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'%' && i + 2 < input.len() {
            if let (Some(hi), Some(lo)) = (hex(input[i + 1]), hex(input[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(input[i]);
        i += 1;
    }
    out
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// A fetched image with its intrinsic size.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub px_width: u32,
    pub px_height: u32,
}

/// Decoded images keyed by the `src` attribute as written in the document.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    images: HashMap<String, LoadedImage>,
}

impl ImageStore {
    pub fn get(&self, src: &str) -> Option<&LoadedImage> {
        self.images.get(src)
    }

    pub fn insert(&mut self, src: impl Into<String>, image: LoadedImage) {
        self.images.insert(src.into(), image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl LoadedImage {
    /// Decode enough of the image to learn its pixel size.
    pub fn decode(bytes: Vec<u8>) -> std::result::Result<Self, ::image::ImageError> {
        let img = ::image::load_from_memory(&bytes)?;
        Ok(Self {
            px_width: img.width(),
            px_height: img.height(),
            bytes,
        })
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Resolves and loads the resources a document references.
pub struct ResourceLoader<'a> {
    base: Url,
    fetcher: &'a dyn UrlFetcher,
}

impl<'a> ResourceLoader<'a> {
    pub fn new(base_url: &str, fetcher: &'a dyn UrlFetcher) -> Result<Self> {
        let base =
            Url::parse(base_url).map_err(|_| RenderError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self { base, fetcher })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a reference against `base`.
    pub fn resolve_against(base: &Url, reference: &str) -> Result<Url> {
        base.join(reference.trim()).map_err(|e| RenderError::InvalidUrl {
            url: reference.to_string(),
            reason: e.to_string(),
        })
    }

    /// Bytes behind `url`, or `None` when the fetch failed and the resource
    /// should be skipped.
    fn load(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        let fetched = if url.scheme() == "data" {
            decode_data_url(url)
        } else {
            debug!("Fetching {url}");
            self.fetcher.fetch(url)
        };
        match fetched {
            Ok(bytes) => Ok(Some(bytes)),
            Err(FetchError::MalformedDataUrl(reason)) => Err(RenderError::MalformedDataUrl(reason)),
            Err(e) => {
                warn!("Skipping resource {}: {e}", display_url(url));
                Ok(None)
            }
        }
    }

    /// A linked stylesheet plus everything it imports, imports first.
    pub fn linked_stylesheet(&self, href: &str) -> Result<Vec<Stylesheet>> {
        let mut out = Vec::new();
        let url = Self::resolve_against(&self.base, href)?;
        self.load_sheet(&url, 0, &mut out)?;
        Ok(out)
    }

    /// An embedded (or user) stylesheet plus everything it imports.
    pub fn embedded_stylesheet(&self, css: &str) -> Result<Vec<Stylesheet>> {
        let mut out = Vec::new();
        let base = self.base.clone();
        self.push_sheet(css, &base, 0, &mut out)?;
        Ok(out)
    }

    fn load_sheet(&self, url: &Url, depth: usize, out: &mut Vec<Stylesheet>) -> Result<()> {
        let Some(bytes) = self.load(url)? else {
            return Ok(());
        };
        let css = String::from_utf8(bytes).map_err(|e| RenderError::Stylesheet {
            url: display_url(url),
            reason: e.to_string(),
        })?;
        self.push_sheet(&css, url, depth, out)
    }

    fn push_sheet(
        &self,
        css: &str,
        sheet_url: &Url,
        depth: usize,
        out: &mut Vec<Stylesheet>,
    ) -> Result<()> {
        let sheet = parse_stylesheet(css);
        for import in &sheet.imports {
            if depth + 1 > MAX_IMPORT_DEPTH {
                warn!("Ignoring @import {import:?}: nesting deeper than {MAX_IMPORT_DEPTH}");
                continue;
            }
            let url = Self::resolve_against(sheet_url, import)?;
            self.load_sheet(&url, depth + 1, out)?;
        }
        out.push(sheet);
        Ok(())
    }

    /// Fetch and decode every `<img src>` in the document.
    pub fn images(&self, nodes: &[DomNode]) -> Result<ImageStore> {
        let mut srcs = Vec::new();
        collect_image_srcs(nodes, &mut srcs);

        let mut store = ImageStore::default();
        for src in srcs {
            if store.get(src).is_some() {
                continue;
            }
            let url = Self::resolve_against(&self.base, src)?;
            let Some(bytes) = self.load(&url)? else {
                continue;
            };
            match LoadedImage::decode(bytes) {
                Ok(image) => store.insert(src, image),
                Err(e) => warn!("Skipping image {}: {e}", display_url(&url)),
            }
        }
        Ok(store)
    }
}

fn collect_image_srcs<'n>(nodes: &'n [DomNode], out: &mut Vec<&'n str>) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Img {
                if let Some(src) = e.src().filter(|s| !s.trim().is_empty()) {
                    out.push(src);
                }
            }
            collect_image_srcs(&e.children, out);
        }
    }
}

/// URL text for diagnostics, with long `data:` payloads shortened.
fn display_url(url: &Url) -> String {
    let s = url.as_str();
    if url.scheme() == "data" && s.len() > 64 {
        let cut = (0..=64).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &s[..cut])
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use std::cell::RefCell;
    use std::io::Cursor;

    /// Serves a fixed set of URLs and records every request.
    #[derive(Default)]
    struct MapFetcher {
        files: HashMap<String, Vec<u8>>,
        requests: RefCell<Vec<String>>,
    }

    impl MapFetcher {
        fn with(mut self, url: &str, body: &[u8]) -> Self {
            self.files.insert(url.to_string(), body.to_vec());
            self
        }
    }

    impl UrlFetcher for MapFetcher {
        fn fetch(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            self.files
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not found").into())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ::image::DynamicImage::ImageRgb8(::image::RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ::image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decodes_base64_and_percent_data_urls() {
        let url = Url::parse("data:text/css;base64,cCB7IGNvbG9yOiByZWQgfQ==").unwrap();
        assert_eq!(decode_data_url(&url).unwrap(), b"p { color: red }");
        let url = Url::parse("data:text/css,p%20%7B%20color:%20red%20%7D").unwrap();
        assert_eq!(decode_data_url(&url).unwrap(), b"p { color: red }");
    }

    #[test]
    fn malformed_data_urls_are_errors() {
        let url = Url::parse("data:text/css;base64,!!!").unwrap();
        assert!(matches!(decode_data_url(&url), Err(FetchError::MalformedDataUrl(_))));
        let url = Url::parse("data:text/css;base64").unwrap();
        assert!(matches!(decode_data_url(&url), Err(FetchError::MalformedDataUrl(_))));
    }

    #[test]
    fn relative_references_resolve_against_base() {
        let fetcher = MapFetcher::default();
        let loader = ResourceLoader::new("https://demo.qandu.me/", &fetcher).unwrap();
        let url = ResourceLoader::resolve_against(loader.base(), "img/logo.png").unwrap();
        assert_eq!(url.as_str(), "https://demo.qandu.me/img/logo.png");
        assert!(ResourceLoader::resolve_against(loader.base(), "http://[::1").is_err());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let fetcher = MapFetcher::default();
        assert!(matches!(
            ResourceLoader::new("not a url", &fetcher),
            Err(RenderError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn missing_stylesheet_is_skipped() {
        let fetcher = MapFetcher::default();
        let loader = ResourceLoader::new("https://demo.qandu.me/", &fetcher).unwrap();
        let sheets = loader.linked_stylesheet("missing.css").unwrap();
        assert!(sheets.is_empty());
        assert_eq!(
            fetcher.requests.borrow().as_slice(),
            ["https://demo.qandu.me/missing.css"]
        );
    }

    #[test]
    fn malformed_data_stylesheet_fails() {
        let fetcher = MapFetcher::default();
        let loader = ResourceLoader::new("https://demo.qandu.me/", &fetcher).unwrap();
        let err = loader
            .linked_stylesheet("data:text/css;base64,!!!")
            .unwrap_err();
        assert!(matches!(err, RenderError::MalformedDataUrl(_)));
    }

    #[test]
    fn imports_come_before_the_importing_sheet() {
        let fetcher = MapFetcher::default()
            .with("https://demo.qandu.me/css/main.css", b"@import 'base.css'; p { color: red }")
            .with("https://demo.qandu.me/css/base.css", b"p { color: blue }");
        let loader = ResourceLoader::new("https://demo.qandu.me/", &fetcher).unwrap();
        let sheets = loader.linked_stylesheet("css/main.css").unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].rules[0].declarations[0].value, "blue");
        assert_eq!(sheets[1].rules[0].declarations[0].value, "red");
    }

    #[test]
    fn import_cycles_stop() {
        let fetcher =
            MapFetcher::default().with("https://demo.qandu.me/a.css", b"@import 'a.css';");
        let loader = ResourceLoader::new("https://demo.qandu.me/", &fetcher).unwrap();
        let sheets = loader.linked_stylesheet("a.css").unwrap();
        assert_eq!(sheets.len(), MAX_IMPORT_DEPTH + 1);
    }

    #[test]
    fn invalid_utf8_stylesheet_fails() {
        let fetcher = MapFetcher::default().with("https://demo.qandu.me/bad.css", &[0xff, 0xfe]);
        let loader = ResourceLoader::new("https://demo.qandu.me/", &fetcher).unwrap();
        assert!(matches!(
            loader.linked_stylesheet("bad.css"),
            Err(RenderError::Stylesheet { .. })
        ));
    }

    #[test]
    fn images_are_decoded_and_bad_ones_skipped() {
        let fetcher = MapFetcher::default()
            .with("https://demo.qandu.me/logo.png", &png(4, 2))
            .with("https://demo.qandu.me/broken.png", b"not an image");
        let loader = ResourceLoader::new("https://demo.qandu.me/", &fetcher).unwrap();
        let dom = parse_html(
            r#"<img src="logo.png"><img src="broken.png"><img src="gone.png"><img src="logo.png">"#,
        );
        let store = loader.images(&dom).unwrap();
        assert_eq!(store.len(), 1);
        let logo = store.get("logo.png").unwrap();
        assert_eq!((logo.px_width, logo.px_height), (4, 2));
        assert_eq!(fetcher.requests.borrow().len(), 3);
    }

    #[test]
    fn file_urls_are_read_from_disk() {
        let path = std::env::temp_dir().join(format!("pdf-press-fetch-{}.css", std::process::id()));
        fs::write(&path, "p { color: red }").unwrap();
        let url = Url::from_file_path(&path).unwrap();
        let bytes = DefaultFetcher::new().fetch(&url).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(bytes, b"p { color: red }");
    }

    #[test]
    fn unsupported_scheme() {
        let url = Url::parse("ftp://example.com/a.css").unwrap();
        assert!(matches!(
            DefaultFetcher::new().fetch(&url),
            Err(FetchError::UnsupportedScheme(_))
        ));
    }
}
