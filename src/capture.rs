//! Scoped browser sessions and the page renderer built on them
//!
//! A [`BrowserLauncher`] starts one isolated browser per call and hands back a
//! [`BrowserSession`]. [`BrowserRenderer`] wraps that session in a
//! [`SessionGuard`] immediately, so the browser is closed exactly once on
//! every path out of `capture`: success, a returned error, or a panic.

use crate::{Error, PageRenderer, RasterImage, Result, Viewport};
use log::{debug, warn};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// Starts browser processes.
pub trait BrowserLauncher {
    type Session: BrowserSession;

    /// Launch a fresh browser with a window of the given size.
    fn launch(&self, viewport: Viewport) -> Result<Self::Session>;
}

/// A live browser owned by a single request.
pub trait BrowserSession {
    /// Navigate and wait for network idle, bounded by `timeout`.
    fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Capture the whole scrollable page as PNG bytes.
    fn capture_full_page(&mut self) -> Result<Vec<u8>>;

    /// Terminate the browser process.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Owns a session and closes it when dropped.
pub struct SessionGuard<S: BrowserSession> {
    session: Option<S>,
}

impl<S: BrowserSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session: Some(session) }
    }

    /// Close the session now instead of at end of scope.
    pub fn release(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("closing browser session");
            if let Err(e) = session.close() {
                warn!("browser teardown reported an error: {}", e);
            }
        }
    }
}

impl<S: BrowserSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        // Only `teardown` empties the slot, and it runs on consume or drop.
        self.session.as_ref().expect("session used after release")
    }
}

impl<S: BrowserSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session.as_mut().expect("session used after release")
    }
}

impl<S: BrowserSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Page renderer that launches a dedicated browser for every capture.
pub struct BrowserRenderer<L> {
    launcher: L,
    timeout: Duration,
}

impl<L: BrowserLauncher> BrowserRenderer<L> {
    pub fn new(launcher: L, timeout: Duration) -> Self {
        Self { launcher, timeout }
    }
}

impl<L: BrowserLauncher> PageRenderer for BrowserRenderer<L> {
    fn capture(&self, url: &str, viewport: Viewport) -> Result<RasterImage> {
        if viewport.width == 0 {
            return Err(Error::validation("viewport width must be positive"));
        }

        debug!("launching browser ({}x{})", viewport.width, viewport.height);
        let mut session = SessionGuard::new(self.launcher.launch(viewport)?);

        debug!("navigating to {}", url);
        session.navigate(url, self.timeout)?;

        debug!("capturing full page");
        let png = session.capture_full_page()?;
        session.release();

        RasterImage::decode_png(&png)
            .map_err(|e| Error::Capture(format!("Screenshot was not a readable PNG: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        launches: AtomicUsize,
        closes: AtomicUsize,
    }

    enum Script {
        Ok,
        FailNavigate,
        FailCapture,
        GarbledCapture,
        PanicCapture,
    }

    struct FakeLauncher {
        counters: Arc<Counters>,
        script: fn() -> Script,
    }

    struct FakeSession {
        counters: Arc<Counters>,
        script: Script,
    }

    impl BrowserLauncher for FakeLauncher {
        type Session = FakeSession;

        fn launch(&self, _viewport: Viewport) -> Result<FakeSession> {
            self.counters.launches.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession { counters: self.counters.clone(), script: (self.script)() })
        }
    }

    impl BrowserSession for FakeSession {
        fn navigate(&mut self, _url: &str, timeout: Duration) -> Result<()> {
            match self.script {
                Script::FailNavigate => Err(Error::Timeout(timeout.as_millis() as u64)),
                _ => Ok(()),
            }
        }

        fn capture_full_page(&mut self) -> Result<Vec<u8>> {
            match self.script {
                Script::FailCapture => Err(Error::Capture("target crashed".into())),
                Script::GarbledCapture => Ok(b"truncated screenshot".to_vec()),
                Script::PanicCapture => panic!("renderer process aborted"),
                _ => RasterImage::filled(4, 6, [255, 255, 255, 255]).encode_png(),
            }
        }

        fn close(self) -> Result<()> {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn renderer(script: fn() -> Script) -> (BrowserRenderer<FakeLauncher>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let launcher = FakeLauncher { counters: counters.clone(), script };
        (BrowserRenderer::new(launcher, Duration::from_secs(60)), counters)
    }

    #[test]
    fn success_closes_once() {
        let (r, c) = renderer(|| Script::Ok);
        let img = r.capture("http://x.test", Viewport { width: 4, height: 2 }).unwrap();
        assert_eq!((img.width, img.height), (4, 6));
        assert_eq!(c.launches.load(Ordering::SeqCst), 1);
        assert_eq!(c.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn navigation_timeout_closes_once() {
        let (r, c) = renderer(|| Script::FailNavigate);
        let err = r.capture("http://x.test", Viewport::default()).unwrap_err();
        assert!(matches!(err, Error::Timeout(60_000)));
        assert_eq!(c.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn capture_failure_closes_once() {
        let (r, c) = renderer(|| Script::FailCapture);
        assert!(r.capture("http://x.test", Viewport::default()).is_err());
        assert_eq!(c.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn undecodable_screenshot_is_a_render_failure() {
        let (r, c) = renderer(|| Script::GarbledCapture);
        let err = r.capture("http://x.test", Viewport::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Render);
        assert_eq!(c.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panic_during_capture_still_closes_once() {
        let (r, c) = renderer(|| Script::PanicCapture);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            r.capture("http://x.test", Viewport::default())
        }));
        assert!(outcome.is_err());
        assert_eq!(c.launches.load(Ordering::SeqCst), 1);
        assert_eq!(c.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_width_never_launches() {
        let (r, c) = renderer(|| Script::Ok);
        assert!(r.capture("http://x.test", Viewport { width: 0, height: 10 }).is_err());
        assert_eq!(c.launches.load(Ordering::SeqCst), 0);
    }
}
