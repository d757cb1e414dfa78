use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gazeshot::server::{HttpServer, ServerConfig};
use gazeshot::{Config, Point, RenderRequest, RenderService, SampleBuffer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "gazeshot", version, about = "Full-page screenshots with gaze heatmap overlays")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve POST requests with JSON bodies and answer with base64 PNGs
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
        #[arg(long, default_value = "/screenshot")]
        route: String,
        #[arg(long, default_value_t = 8 * 1024 * 1024)]
        max_body_bytes: u64,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Capture one page and write the composited PNG to disk
    Render {
        #[arg(long)]
        url: String,
        #[arg(long)]
        width: u32,
        #[arg(long, default_value_t = 0)]
        height: u32,
        /// JSON array of {"x","y"} samples; null entries are skipped
        #[arg(long)]
        points: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        browser: BrowserArgs,
    },
}

#[derive(Args)]
struct BrowserArgs {
    /// Chrome/Chromium executable
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,
    #[arg(long, default_value_t = 60_000)]
    timeout_ms: u64,
    #[arg(long, default_value_t = 4096)]
    memory_limit_mb: u32,
}

impl BrowserArgs {
    fn into_config(self) -> Config {
        Config {
            chrome_path: self.chrome_path,
            timeout_ms: self.timeout_ms,
            memory_limit_mb: self.memory_limit_mb,
            ..Default::default()
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn read_points(path: &PathBuf) -> anyhow::Result<Vec<Point>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let samples: Vec<Option<Point>> =
        serde_json::from_str(&raw).with_context(|| format!("parse points in {}", path.display()))?;
    let mut buffer = SampleBuffer::new();
    buffer.extend(samples);
    if buffer.dropped() > 0 {
        log::info!("skipped {} invalid samples", buffer.dropped());
    }
    Ok(buffer.finish())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { addr, route, max_body_bytes, browser } => {
            let config = browser.into_config();
            let renderer = gazeshot::new_renderer(config.clone());
            let service = Arc::new(RenderService::new(renderer, config));
            let server = HttpServer::bind(ServerConfig { addr, route, max_body_bytes }, service)?;
            server.run();
        }
        Command::Render { url, width, height, points, out, browser } => {
            let config = browser.into_config();
            let points = points.as_ref().map(read_points).transpose()?;
            let request = RenderRequest { url, width, height, points };
            request.validate(&config)?;

            let service = RenderService::new(gazeshot::new_renderer(config.clone()), config);
            let result = service.render(&request)?;
            std::fs::write(&out, result.image.encode_png()?)
                .with_context(|| format!("write {}", out.display()))?;
            let (w, h) = (result.image.width, result.image.height);
            log::info!("wrote {}x{} image to {}", w, h, out.display());
        }
    }
    Ok(())
}
