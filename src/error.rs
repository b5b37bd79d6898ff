//! Error types for the renderer and the stdin/stdout invoker.

use thiserror::Error;

/// Failures surfaced by a rendering engine.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A resource reference that cannot be resolved against the base URL.
    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A `data:` URL that is not well formed.
    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    /// Stylesheet bytes were obtained but cannot be used.
    #[error("Stylesheet {url:?} could not be loaded: {reason}")]
    Stylesheet { url: String, reason: String },

    /// The base URL handed to the engine is not an absolute URL.
    #[error("Invalid base URL {0:?}")]
    InvalidBaseUrl(String),

    /// The box tree could not be laid out.
    #[error("Layout failed: {0}")]
    Layout(String),

    /// Producing or post-processing the PDF failed.
    #[error("PDF encoding failed: {0}")]
    Encode(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for RenderError {
    fn from(err: lopdf::Error) -> Self {
        RenderError::Encode(err.to_string())
    }
}

impl From<taffy::TaffyError> for RenderError {
    fn from(err: taffy::TaffyError) -> Self {
        RenderError::Layout(err.to_string())
    }
}

/// Outcome of one invocation. The `Display` text of each variant is the
/// exact diagnostic line written to standard error.
#[derive(Debug, Error)]
pub enum Error {
    /// Standard input was empty; nothing was rendered.
    #[error("Error: No HTML content provided")]
    MissingInput,

    /// The rendering engine (or one of the streams) failed.
    #[error("PDF Generation Error: {0}")]
    Render(#[from] RenderError),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Render(RenderError::Io(err))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_message() {
        assert_eq!(Error::MissingInput.to_string(), "Error: No HTML content provided");
    }

    #[test]
    fn render_message_is_prefixed() {
        let err = Error::from(RenderError::MalformedDataUrl("missing `,`".into()));
        assert_eq!(
            err.to_string(),
            "PDF Generation Error: Malformed data URL: missing `,`"
        );
    }

    #[test]
    fn io_errors_are_render_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "Broken pipe");
        let err = Error::from(io);
        assert!(matches!(err, Error::Render(RenderError::Io(_))));
        assert_eq!(err.to_string(), "PDF Generation Error: Broken pipe");
    }
}
