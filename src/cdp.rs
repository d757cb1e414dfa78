//! Chrome DevTools Protocol browser sessions (uses the `headless_chrome` crate)

use crate::capture::{BrowserLauncher, BrowserSession};
use crate::{Config, Error, Result, Viewport};
use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::ffi::OsStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle event Chrome fires once no more than two requests have been in
/// flight for 500ms.
const NETWORK_IDLE_EVENT: &str = "networkAlmostIdle";

const IDLE_POLL: Duration = Duration::from_millis(50);

/// Launches one headless Chrome per capture.
///
/// The executable path and limits come from the `Config` given at
/// construction; nothing is read from the environment afterwards.
pub struct ChromeLauncher {
    config: Config,
}

impl ChromeLauncher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl BrowserLauncher for ChromeLauncher {
    type Session = ChromeSession;

    fn launch(&self, viewport: Viewport) -> Result<ChromeSession> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let js_flags =
            format!("--js-flags=--max-old-space-size={}", self.config.memory_limit_mb);
        let args = vec![
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(js_flags.as_str()),
        ];
        let height = if viewport.height == 0 {
            self.config.default_viewport.height
        } else {
            viewport.height
        };

        // Sandboxing is left to the container the service runs in
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((viewport.width, height)))
            .path(self.config.chrome_path.clone())
            .args(args)
            // Bounds every protocol round trip, Page.navigate included
            .idle_browser_timeout(timeout)
            .build()
            .map_err(|e| Error::Launch(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Launch(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::Launch(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(timeout);

        tab.call_method(Page::SetLifecycleEventsEnabled { enabled: true })
            .map_err(|e| Error::Launch(format!("Failed to enable lifecycle events: {}", e)))?;

        Ok(ChromeSession {
            browser,
            tab,
            timeout_ms: self.config.timeout_ms,
            max_height: self.config.max_dimension,
        })
    }
}

/// A running Chrome with a single tab. Dropping it kills the process.
pub struct ChromeSession {
    browser: Browser,
    tab: Arc<Tab>,
    timeout_ms: u64,
    max_height: u32,
}

/// Time left before `deadline`, or a timeout once it has passed.
fn remaining(deadline: Instant, timeout: Duration) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(Error::Timeout(timeout.as_millis() as u64));
    }
    Ok(left)
}

/// Map a protocol failure into the crate error, keeping timeouts distinct.
fn protocol_error(
    what: &str,
    wrap: fn(String) -> Error,
    err: anyhow::Error,
    timeout_ms: u64,
) -> Error {
    if err.downcast_ref::<headless_chrome::util::Timeout>().is_some() {
        Error::Timeout(timeout_ms)
    } else {
        wrap(format!("{} failed: {}", what, err))
    }
}

/// Clip covering the whole CSS content box, cut at `max_height`.
fn page_clip(width: f64, height: f64, max_height: u32) -> Page::Viewport {
    let max_height = max_height as f64;
    if height > max_height {
        warn!(
            "page is {}px tall, capturing only the top {}px",
            height.ceil(),
            max_height
        );
    }
    Page::Viewport {
        x: 0.0,
        y: 0.0,
        width: width.max(1.0),
        height: height.clamp(1.0, max_height),
        scale: 1.0,
    }
}

impl ChromeSession {
    fn wait_for_network_idle(
        idle: &AtomicBool,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<()> {
        while !idle.load(Ordering::SeqCst) {
            remaining(deadline, timeout)?;
            std::thread::sleep(IDLE_POLL);
        }
        Ok(())
    }

    /// Navigate, wait for the load and then for network idle, all against
    /// one deadline. The load wait only gets what navigation left over.
    fn navigate_within(
        &self,
        url: &str,
        idle: &AtomicBool,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<()> {
        let timeout_ms = timeout.as_millis() as u64;

        self.tab
            .navigate_to(url)
            .map_err(|e| protocol_error("Navigation", Error::Navigation, e, timeout_ms))?;

        self.tab.set_default_timeout(remaining(deadline, timeout)?);
        self.tab
            .wait_until_navigated()
            .map_err(|e| protocol_error("Navigation", Error::Navigation, e, timeout_ms))?;

        Self::wait_for_network_idle(idle, deadline, timeout)
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let idle = Arc::new(AtomicBool::new(false));

        let flag = idle.clone();
        let main_frame = self.tab.get_target_id().clone();
        let listener = self
            .tab
            .add_event_listener(Arc::new(move |event: &Event| {
                if let Event::PageLifecycleEvent(lifecycle) = event {
                    if lifecycle.params.frame_id != main_frame {
                        return;
                    }
                    match lifecycle.params.name.as_str() {
                        "init" => flag.store(false, Ordering::SeqCst),
                        NETWORK_IDLE_EVENT => flag.store(true, Ordering::SeqCst),
                        _ => {}
                    }
                }
            }))
            .map_err(|e| Error::Navigation(format!("Failed to watch lifecycle events: {}", e)))?;

        let result = self.navigate_within(url, &idle, deadline, timeout);

        // Capture calls get the full budget again
        self.tab.set_default_timeout(Duration::from_millis(self.timeout_ms));
        if let Err(e) = self.tab.remove_event_listener(&listener) {
            debug!("failed to remove lifecycle listener: {}", e);
        }
        result
    }

    fn capture_full_page(&mut self) -> Result<Vec<u8>> {
        let metrics = self
            .tab
            .call_method(Page::GetLayoutMetrics(None))
            .map_err(|e| protocol_error("Layout metrics", Error::Capture, e, self.timeout_ms))?;
        let content = metrics.css_content_size;
        let clip = page_clip(content.width, content.height, self.max_height);

        let shot = self
            .tab
            .call_method(Page::CaptureScreenshot {
                format: Some(Page::CaptureScreenshotFormatOption::Png),
                quality: None,
                clip: Some(clip),
                from_surface: Some(true),
                capture_beyond_viewport: Some(true),
                optimize_for_speed: None,
            })
            .map_err(|e| protocol_error("Screenshot", Error::Capture, e, self.timeout_ms))?;

        base64::engine::general_purpose::STANDARD
            .decode(shot.data.as_bytes())
            .map_err(|e| Error::Capture(format!("Screenshot payload was not base64: {}", e)))
    }

    fn close(self) -> Result<()> {
        // Dropping the browser kills the child process
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::BrowserRenderer;
    use crate::PageRenderer;

    #[test]
    fn expired_deadline_is_a_timeout() {
        let timeout = Duration::from_millis(250);
        let past = Instant::now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(remaining(past, timeout), Err(Error::Timeout(250))));

        let left = remaining(Instant::now() + Duration::from_secs(30), timeout).unwrap();
        assert!(left <= Duration::from_secs(30) && left > Duration::from_secs(29));
    }

    #[test]
    fn idle_wait_gives_up_at_the_shared_deadline() {
        let idle = AtomicBool::new(false);
        let deadline = Instant::now() + Duration::from_millis(120);
        let started = Instant::now();
        let err = ChromeSession::wait_for_network_idle(&idle, deadline, Duration::from_secs(60))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(60_000)));
        assert!(started.elapsed() < Duration::from_secs(2));

        idle.store(true, Ordering::SeqCst);
        let later = Instant::now() + Duration::from_secs(5);
        let waited = ChromeSession::wait_for_network_idle(&idle, later, Duration::from_secs(60));
        assert!(waited.is_ok());
    }

    #[test]
    fn protocol_timeouts_keep_their_kind() {
        let err = protocol_error(
            "Navigation",
            Error::Navigation,
            anyhow::Error::new(headless_chrome::util::Timeout),
            60_000,
        );
        assert!(matches!(err, Error::Timeout(60_000)));

        let err = protocol_error("Screenshot", Error::Capture, anyhow::anyhow!("target closed"), 1);
        assert!(matches!(err, Error::Capture(ref msg) if msg.contains("target closed")));
    }

    #[test]
    fn tall_pages_are_clipped_at_max_height() {
        let clip = page_clip(1280.0, 40_000.0, 16_384);
        assert_eq!((clip.width, clip.height), (1280.0, 16_384.0));

        let clip = page_clip(0.0, 0.0, 16_384);
        assert_eq!((clip.width, clip.height), (1.0, 1.0));

        let clip = page_clip(800.0, 2400.0, 16_384);
        assert_eq!(clip.height, 2400.0);
    }

    #[test]
    fn test_chrome_capture() {
        // This test requires Chrome to be installed, so we skip it in CI
        if std::env::var("CI").is_ok() {
            return;
        }
        let launcher = ChromeLauncher::new(Config::default());
        let renderer = BrowserRenderer::new(launcher, Duration::from_secs(60));
        let viewport = Viewport { width: 320, height: 200 };
        match renderer.capture("data:text/html,<h1>gazeshot</h1>", viewport) {
            Ok(img) => assert_eq!(img.width, 320),
            Err(e) => eprintln!("Skipping Chrome capture test, Chrome unavailable: {}", e),
        }
    }
}
