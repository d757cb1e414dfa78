//! Gazeshot
//!
//! Turns a remote page into a full-page screenshot and overlays a density
//! heatmap computed from gaze samples, returning a single composited image.
//!
//! # Features
//!
//! - **CDP Backend** (default): captures pages through headless Chrome
//! - **Pure raster pipeline**: accumulate -> colorize -> composite, no browser needed
//! - **Scoped browsers**: one browser process per request, torn down on every exit path
//!
//! # Example
//!
//! ```no_run
//! use gazeshot::{Config, Point, RenderRequest, RenderService};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = RenderService::new(gazeshot::new_renderer(Config::default()), Config::default());
//! let request = RenderRequest {
//!     url: "https://example.com".to_string(),
//!     width: 1280,
//!     height: 720,
//!     points: Some(vec![Point { x: 200.0, y: 150.0 }]),
//! };
//! let result = service.render(&request)?;
//! std::fs::write("heatmap.png", result.image.encode_png()?)?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod error;
pub use error::{Error, ErrorKind, Result};

pub mod rendering;
pub use rendering::{IntensityMap, RasterImage};

pub mod capture;
pub use capture::{BrowserLauncher, BrowserRenderer, BrowserSession, SessionGuard};

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod request;
pub use request::{RenderRequest, ScreenshotResponse};

pub mod tracking;
pub use tracking::SampleBuffer;

pub mod service;
pub use service::{HttpResponse, RenderResult, RenderService};

pub mod server;

// Async-friendly facade over the blocking pipeline
pub mod async_api;
pub use async_api::AsyncRenderService;

/// Configuration for the page renderer and request validation
///
/// The defaults match a containerized deployment: a 60 second ceiling on
/// navigation and protocol calls and a 4 GiB JS heap for the browser.
///
/// # Examples
///
/// ```
/// let cfg = gazeshot::Config::default();
/// assert_eq!(cfg.timeout_ms, 60_000);
/// assert!(cfg.chrome_path.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Browser executable; `None` lets the launcher locate one
    pub chrome_path: Option<PathBuf>,
    /// Ceiling for navigation, network idle and protocol calls, in milliseconds
    pub timeout_ms: u64,
    /// JS heap limit handed to the browser, in megabytes
    pub memory_limit_mb: u32,
    /// Viewport used when a request does not give a height hint
    pub default_viewport: Viewport,
    /// Largest width or height a request may ask for
    pub max_dimension: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chrome_path: None,
            timeout_ms: 60_000,
            memory_limit_mb: 4096,
            default_viewport: Viewport::default(),
            max_dimension: 16_384,
        }
    }
}

/// Viewport dimensions
///
/// `height` is only a hint for the initial window; full-page capture
/// decides the final raster height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A gaze sample in raster coordinates. May lie outside the raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Core trait for page renderers
pub trait PageRenderer {
    /// Load `url` in a fresh, isolated browser at the given viewport width and
    /// return a raster of the whole scrollable page.
    ///
    /// Whatever the outcome, the browser is gone by the time this returns.
    fn capture(&self, url: &str, viewport: Viewport) -> Result<RasterImage>;
}

/// Create the default Chrome-backed page renderer.
#[cfg(feature = "cdp")]
pub fn new_renderer(config: Config) -> BrowserRenderer<cdp::ChromeLauncher> {
    let timeout = std::time::Duration::from_millis(config.timeout_ms);
    BrowserRenderer::new(cdp::ChromeLauncher::new(config), timeout)
}
