//! Error types for the screenshot pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving a render request
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed request (missing or mistyped fields, bad URL, bad dimensions)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Failed to launch the browser process
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Failed to navigate to the target URL
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Failed to capture the page raster
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Navigation or a protocol call exceeded the configured ceiling
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// PNG decode/encode failure
    #[error("Image error: {0}")]
    Image(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure taxonomy surfaced to operators (never to callers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request rejected before any browser was launched
    Validation,
    /// Browser launch, navigation, timeout or capture failure
    Render,
    /// Any other failure in the pipeline
    Internal,
}

impl Error {
    /// Classify this error into the operator-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Launch(_) | Error::Navigation(_) | Error::Capture(_) | Error::Timeout(_) => {
                ErrorKind::Render
            }
            Error::Image(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Render => "render",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}
