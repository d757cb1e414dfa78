//! Request orchestration: capture, heatmap, encode

use crate::rendering::apply_heatmap;
use crate::request::{ErrorResponse, ScreenshotResponse};
use crate::{Config, Error, ErrorKind, PageRenderer, RasterImage, RenderRequest, Result};
use base64::Engine as Base64Engine;
use log::{error, info, warn};

/// Message returned for every failure, whatever its kind.
pub const RENDER_FAILURE_MESSAGE: &str = "Failed to capture screenshot";

/// Output of a successful render.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub image: RasterImage,
}

impl RenderResult {
    /// PNG-encode and base64 the image for the wire.
    pub fn to_response(&self) -> Result<ScreenshotResponse> {
        let png = self.image.encode_png()?;
        Ok(ScreenshotResponse {
            screenshot: base64::engine::general_purpose::STANDARD.encode(png),
            full_page: true,
        })
    }
}

/// Status code and JSON body for the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// The one response every failure maps to. The kind stays in the log.
    pub fn failure() -> Self {
        let body = serde_json::to_string(&ErrorResponse { error: RENDER_FAILURE_MESSAGE })
            .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", RENDER_FAILURE_MESSAGE));
        Self { status: 500, body }
    }
}

/// Runs the full pipeline for one request at a time.
///
/// Holds no per-request state; concurrent calls share nothing but the
/// renderer, which launches its own browser per call.
pub struct RenderService<R> {
    renderer: R,
    config: Config,
}

impl<R: PageRenderer> RenderService<R> {
    pub fn new(renderer: R, config: Config) -> Self {
        Self { renderer, config }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Capture the page and overlay the request's points, if any.
    pub fn render(&self, req: &RenderRequest) -> Result<RenderResult> {
        let mut viewport = req.viewport();
        if viewport.height == 0 {
            viewport.height = self.config.default_viewport.height;
        }

        let base = self.renderer.capture(&req.url, viewport)?;
        let image = apply_heatmap(base, req.points());
        Ok(RenderResult { image })
    }

    /// Validate a JSON body, render it and build the HTTP response.
    ///
    /// Failure detail goes to the log only; callers get a fixed message.
    pub fn handle_json(&self, body: &str) -> HttpResponse {
        match self.process(body) {
            Ok(response) => HttpResponse { status: 200, body: response },
            Err(e) => {
                match e.kind() {
                    ErrorKind::Validation => warn!("rejected request: {}", e),
                    kind => error!("{} failure: {}", kind, e),
                }
                HttpResponse::failure()
            }
        }
    }

    fn process(&self, body: &str) -> Result<String> {
        let req = RenderRequest::from_json(body, &self.config)?;
        info!(
            "rendering {} at width {} with {} points",
            req.url,
            req.width,
            req.points().len()
        );
        let response = self.render(&req)?.to_response()?;
        serde_json::to_string(&response)
            .map_err(|e| Error::Internal(format!("Failed to serialize response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, Viewport};
    use std::sync::Mutex;

    struct StaticRenderer {
        seen: Mutex<Vec<Viewport>>,
    }

    impl PageRenderer for StaticRenderer {
        fn capture(&self, _url: &str, viewport: Viewport) -> Result<RasterImage> {
            self.seen.lock().unwrap().push(viewport);
            Ok(RasterImage::filled(viewport.width, viewport.height + 40, [255, 255, 255, 255]))
        }
    }

    fn service() -> RenderService<StaticRenderer> {
        RenderService::new(StaticRenderer { seen: Mutex::new(Vec::new()) }, Config::default())
    }

    #[test]
    fn zero_height_uses_default_hint() {
        let svc = service();
        let req =
            RenderRequest { url: "https://a.test".into(), width: 100, height: 0, points: None };
        let out = svc.render(&req).unwrap();
        assert_eq!(svc.renderer().seen.lock().unwrap()[0], Viewport { width: 100, height: 720 });
        assert_eq!(out.image.height, 760);
    }

    #[test]
    fn empty_points_leave_capture_untouched() {
        let svc = service();
        let req = RenderRequest {
            url: "https://a.test".into(),
            width: 50,
            height: 50,
            points: Some(vec![]),
        };
        let out = svc.render(&req).unwrap();
        assert!(out.image.pixels.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn points_tint_the_capture() {
        let svc = service();
        let req = RenderRequest {
            url: "https://a.test".into(),
            width: 80,
            height: 80,
            points: Some(vec![Point { x: 40.0, y: 40.0 }]),
        };
        let out = svc.render(&req).unwrap();
        assert_ne!(out.image.pixel(40, 40), Some([255, 255, 255, 255]));
    }

    #[test]
    fn handle_json_success_shape() {
        let svc = service();
        let resp = svc.handle_json(r#"{"url":"https://a.test","width":20,"height":10}"#);
        assert_eq!(resp.status, 200);
        let parsed: ScreenshotResponse = serde_json::from_str(&resp.body).unwrap();
        assert!(parsed.full_page);
        let png = base64::engine::general_purpose::STANDARD.decode(parsed.screenshot).unwrap();
        let img = RasterImage::decode_png(&png).unwrap();
        assert_eq!((img.width, img.height), (20, 50));
    }

    struct FailingRenderer;

    impl PageRenderer for FailingRenderer {
        fn capture(&self, _url: &str, _viewport: Viewport) -> Result<RasterImage> {
            Err(Error::Navigation("net::ERR_CONNECTION_REFUSED".into()))
        }
    }

    #[test]
    fn handle_json_validation_failure_is_generic() {
        let svc = service();
        let resp = svc.handle_json(r#"{"width":20,"height":10}"#);
        assert_eq!(resp, HttpResponse::failure());
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, r#"{"error":"Failed to capture screenshot"}"#);
        assert!(svc.renderer().seen.lock().unwrap().is_empty());
    }

    #[test]
    fn every_failure_kind_looks_the_same_to_callers() {
        let rejected = service().handle_json(r#"{"url":"ftp://a.test","width":20,"height":10}"#);
        let failed = RenderService::new(FailingRenderer, Config::default())
            .handle_json(r#"{"url":"https://a.test","width":20,"height":10}"#);
        assert_eq!(rejected, failed);
        assert!(!failed.body.contains("REFUSED"));
    }
}
