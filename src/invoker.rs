//! The stdin → PDF → stdout invocation.
//!
//! One run reads the whole input, renders it with the fixed print stylesheet
//! and base URL, and writes the PDF in a single write. Nothing reaches the
//! output when rendering fails.

use std::io::{Read, Write};

use log::{info, warn};

use crate::engine::RenderEngine;
use crate::error::Error;
use crate::print_css::{BASE_URL, PRINT_CSS};

/// Drives one render through a [`RenderEngine`].
#[derive(Debug, Clone, Default)]
pub struct Invoker<E> {
    engine: E,
}

impl<E: RenderEngine> Invoker<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Render raw input bytes to PDF bytes.
    ///
    /// Empty input fails with [`Error::MissingInput`] without touching the
    /// engine. Invalid UTF-8 is replaced rather than rejected.
    pub fn render(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        if input.is_empty() {
            return Err(Error::MissingInput);
        }
        let html = String::from_utf8_lossy(input);
        if let std::borrow::Cow::Owned(_) = html {
            warn!("Input is not valid UTF-8; invalid sequences were replaced");
        }
        let pdf = self.engine.render(&html, &[PRINT_CSS], BASE_URL)?;
        info!("Rendered {} input bytes to {} PDF bytes", input.len(), pdf.len());
        Ok(pdf)
    }

    /// Read all of `input`, render it and write the PDF to `output`.
    pub fn run<R: Read, W: Write>(&self, mut input: R, mut output: W) -> Result<(), Error> {
        let mut buf = Vec::new();
        input.read_to_end(&mut buf)?;
        let pdf = self.render(&buf)?;
        output.write_all(&pdf)?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RenderError, Result};
    use std::cell::RefCell;

    /// Records each call and answers with a canned result.
    #[derive(Default)]
    struct StubEngine {
        fail: bool,
        calls: RefCell<Vec<(String, Vec<String>, String)>>,
    }

    impl RenderEngine for StubEngine {
        fn render(&self, html: &str, stylesheets: &[&str], base_url: &str) -> Result<Vec<u8>> {
            self.calls.borrow_mut().push((
                html.to_string(),
                stylesheets.iter().map(|s| s.to_string()).collect(),
                base_url.to_string(),
            ));
            if self.fail {
                return Err(RenderError::Encode("engine exploded".into()));
            }
            Ok(b"%PDF-1.7 stub".to_vec())
        }
    }

    #[test]
    fn empty_input_never_reaches_the_engine() {
        let engine = StubEngine::default();
        let invoker = Invoker::new(&engine);
        let mut out = Vec::new();
        let err = invoker.run(&b""[..], &mut out).unwrap_err();
        assert!(matches!(err, Error::MissingInput));
        assert_eq!(err.to_string(), "Error: No HTML content provided");
        assert!(out.is_empty());
        assert!(engine.calls.borrow().is_empty());
    }

    #[test]
    fn input_is_passed_verbatim_with_fixed_style_and_base() {
        let engine = StubEngine::default();
        let invoker = Invoker::new(&engine);
        let mut out = Vec::new();
        invoker.run(&b"  <p>Hi</p>\n"[..], &mut out).unwrap();
        assert_eq!(out, b"%PDF-1.7 stub");

        let calls = engine.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (html, sheets, base) = &calls[0];
        assert_eq!(html, "  <p>Hi</p>\n");
        assert_eq!(sheets, &vec![PRINT_CSS.to_string()]);
        assert_eq!(base, "https://demo.qandu.me/");
    }

    #[test]
    fn whitespace_only_input_is_rendered() {
        let engine = StubEngine::default();
        let invoker = Invoker::new(&engine);
        assert!(invoker.render(b" \n").is_ok());
        assert_eq!(engine.calls.borrow().len(), 1);
    }

    #[test]
    fn engine_failure_writes_nothing() {
        let engine = StubEngine {
            fail: true,
            ..StubEngine::default()
        };
        let invoker = Invoker::new(&engine);
        let mut out = Vec::new();
        let err = invoker.run(&b"<p>x</p>"[..], &mut out).unwrap_err();
        assert_eq!(
            err.to_string(),
            "PDF Generation Error: PDF encoding failed: engine exploded"
        );
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let engine = StubEngine::default();
        let invoker = Invoker::new(&engine);
        invoker.render(b"<p>caf\xe9</p>").unwrap();
        assert_eq!(engine.calls.borrow()[0].0, "<p>caf\u{FFFD}</p>");
    }
}
