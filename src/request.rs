//! Wire types for the screenshot endpoint and request validation

use crate::{Config, Error, Point, Result, Viewport};
use serde::{Deserialize, Serialize};
use url::Url;

/// A validated render request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub points: Option<Vec<Point>>,
}

/// Raw request body. `null` entries in `points` are invalid samples and get
/// dropped during validation.
#[derive(Debug, Deserialize)]
struct RawRequest {
    url: String,
    width: u32,
    height: u32,
    #[serde(default)]
    points: Option<Vec<Option<Point>>>,
}

impl RenderRequest {
    /// Parse and validate a JSON request body against `config`'s limits.
    pub fn from_json(body: &str, config: &Config) -> Result<Self> {
        let raw: RawRequest = serde_json::from_str(body)
            .map_err(|e| Error::validation(format!("malformed body: {}", e)))?;

        let request = RenderRequest {
            url: raw.url,
            width: raw.width,
            height: raw.height,
            points: raw
                .points
                .map(|points| points.into_iter().flatten().collect()),
        };
        request.validate(config)?;
        Ok(request)
    }

    /// Check URL scheme and dimension bounds.
    pub fn validate(&self, config: &Config) -> Result<()> {
        let parsed = Url::parse(&self.url)
            .map_err(|e| Error::validation(format!("url '{}' is not valid: {}", self.url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "url scheme '{}' is not supported",
                parsed.scheme()
            )));
        }
        if self.width == 0 || self.width > config.max_dimension {
            return Err(Error::validation(format!(
                "width must be between 1 and {}",
                config.max_dimension
            )));
        }
        if self.height > config.max_dimension {
            return Err(Error::validation(format!(
                "height must be at most {}",
                config.max_dimension
            )));
        }
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        Viewport { width: self.width, height: self.height }
    }

    /// Points to overlay; empty when none were sent.
    pub fn points(&self) -> &[Point] {
        self.points.as_deref().unwrap_or(&[])
    }
}

/// Success body: base64 PNG of the full page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotResponse {
    pub screenshot: String,
    #[serde(rename = "fullPage")]
    pub full_page: bool,
}

/// Failure body. The message is fixed and carries no detail.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}
