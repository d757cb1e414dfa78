use crate::{Error, PageRenderer, RenderRequest, RenderResult, RenderService, Result};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

/// An async-friendly facade over [`RenderService`].
///
/// Rendering blocks for as long as the browser takes to settle, so each call
/// runs on a dedicated worker thread and reports back over a oneshot
/// channel. The awaiting task never blocks the runtime.
pub struct AsyncRenderService<R> {
    inner: Arc<RenderService<R>>,
}

impl<R> Clone for AsyncRenderService<R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<R> AsyncRenderService<R>
where
    R: PageRenderer + Send + Sync + 'static,
{
    pub fn new(service: RenderService<R>) -> Self {
        Self { inner: Arc::new(service) }
    }

    /// Render a validated request.
    pub async fn render(&self, req: RenderRequest) -> Result<RenderResult> {
        let (tx, rx) = oneshot::channel();
        let service = self.inner.clone();
        thread::spawn(move || {
            let _ = tx.send(service.render(&req));
        });
        rx.await
            .map_err(|e| Error::Internal(format!("Render worker canceled: {}", e)))?
    }

    /// Validate, render and encode a JSON body; see [`RenderService::handle_json`].
    pub async fn handle_json(&self, body: String) -> crate::HttpResponse {
        let (tx, rx) = oneshot::channel();
        let service = self.inner.clone();
        thread::spawn(move || {
            let _ = tx.send(service.handle_json(&body));
        });
        match rx.await {
            Ok(resp) => resp,
            Err(e) => {
                log::error!("render worker canceled: {}", e);
                crate::HttpResponse::failure()
            }
        }
    }
}
