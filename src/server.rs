//! HTTP boundary built on `tiny_http`
//!
//! Every request is served on its own thread. There is deliberately no
//! admission limit here; each in-flight render owns a whole browser process,
//! so deployments that expect bursts need a limiter in front of this server.

use crate::{Error, PageRenderer, RenderService, Result};
use log::{debug, info, warn};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use tiny_http::{Header, Method, Request, Response, Server};

/// Listener settings for [`HttpServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:3000`
    pub addr: String,
    /// Path that accepts render requests
    pub route: String,
    /// Largest request body accepted, in bytes
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            route: "/screenshot".to_string(),
            max_body_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Serves `POST <route>` with a [`RenderService`].
pub struct HttpServer<R> {
    server: Server,
    service: Arc<RenderService<R>>,
    config: ServerConfig,
}

impl<R> HttpServer<R>
where
    R: PageRenderer + Send + Sync + 'static,
{
    pub fn bind(config: ServerConfig, service: Arc<RenderService<R>>) -> Result<Self> {
        let server = Server::http(config.addr.as_str())
            .map_err(|e| Error::Internal(format!("Failed to bind {}: {}", config.addr, e)))?;
        Ok(Self { server, service, config })
    }

    /// Bound socket address (useful when binding port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Accept requests until the listener fails.
    pub fn run(self) {
        info!("listening on {} (route {})", self.config.addr, self.config.route);
        let config = Arc::new(self.config);
        for request in self.server.incoming_requests() {
            let service = self.service.clone();
            let config = config.clone();
            std::thread::spawn(move || handle_request(&service, &config, request));
        }
    }
}

fn handle_request<R: PageRenderer>(
    service: &RenderService<R>,
    config: &ServerConfig,
    mut request: Request,
) {
    let path = request.url().split('?').next().unwrap_or("").to_string();
    debug!("{} {}", request.method(), path);

    let (status, body) = if path != config.route {
        (404, r#"{"error":"Not found"}"#.to_string())
    } else if *request.method() != Method::Post {
        (405, r#"{"error":"Method not allowed"}"#.to_string())
    } else {
        match read_body(&mut request, config.max_body_bytes) {
            Some(body) => {
                let resp = service.handle_json(&body);
                (resp.status, resp.body)
            }
            None => (413, r#"{"error":"Payload too large"}"#.to_string()),
        }
    };

    let mut response = Response::from_string(body).with_status_code(status);
    if let Ok(header) = "Content-Type: application/json".parse::<Header>() {
        response.add_header(header);
    }
    if let Err(e) = request.respond(response) {
        warn!("failed to write response: {}", e);
    }
}

/// Read the body as UTF-8, or `None` if it exceeds `limit`.
///
/// Invalid UTF-8 is replaced rather than rejected; the JSON parser will
/// refuse it with a validation error.
fn read_body(request: &mut Request, limit: u64) -> Option<String> {
    if request.body_length().is_some_and(|len| len as u64 > limit) {
        return None;
    }
    let mut bytes = Vec::new();
    if let Err(e) = request.as_reader().take(limit + 1).read_to_end(&mut bytes) {
        warn!("failed to read request body: {}", e);
        return Some(String::new());
    }
    if bytes.len() as u64 > limit {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
