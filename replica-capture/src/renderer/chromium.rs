//! Chromium-based renderer using chromiumoxide.

use super::Renderer;
use crate::error::{CaptureError, Result};
use crate::profile::Profile;
use crate::result::Viewport;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, NavigateParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

const HARDENING_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--disable-blink-features=AutomationControlled",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-ipc-flooding-protection",
    "--disable-hang-monitor",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-client-side-phishing-detection",
    "--disable-sync",
    "--disable-default-apps",
    "--disable-translate",
    "--disable-extensions",
    "--disable-component-extensions-with-background-pages",
    "--disable-breakpad",
    "--disable-component-update",
    "--disable-domain-reliability",
    "--metrics-recording-only",
    "--no-first-run",
    "--safebrowsing-disable-auto-update",
    "--password-store=basic",
    "--use-mock-keychain",
    "--hide-scrollbars",
    "--mute-audio",
    "--disable-notifications",
];

const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
window.chrome = { runtime: {} };
"#;

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    // 1. --chrome-path
    if let Some(path) = explicit
        && path.exists()
    {
        return Some(path.clone());
    }

    // 2. REPLICA_CHROME_PATH env
    if let Ok(p) = std::env::var("REPLICA_CHROME_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common install locations
    let common = [
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/local/bin/chrome",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
        "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
    ];
    common.iter().map(PathBuf::from).find(|p| p.exists())
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    /// Value for `--proxy-server`, e.g. `socks5://127.0.0.1:9050`.
    pub proxy: Option<String>,
    pub navigation_timeout: Duration,
    pub profile: Profile,
    /// Seeds the settle pattern; advanced once per page.
    pub settle_seed: u64,
}

/// One scripted settle pass: scroll offsets with pauses, an optional
/// scroll-back, then pointer moves.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlePlan {
    pub lead_in: Duration,
    pub scrolls: Vec<(u32, Duration)>,
    pub scroll_back: Option<(u32, Duration)>,
    pub pointer_moves: Vec<(u32, u32, Duration)>,
    pub tail: Duration,
}

impl SettlePlan {
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let secs = |rng: &mut StdRng, lo: f64, hi: f64| {
            Duration::from_secs_f64(rng.random_range(lo..hi))
        };

        let lead_in = secs(&mut rng, 0.5, 2.0);
        let steps = rng.random_range(3..=8);
        let scrolls = (0..steps)
            .map(|_| (rng.random_range(100..=800), secs(&mut rng, 0.1, 1.5)))
            .collect();
        let scroll_back = if rng.random_bool(0.3) {
            Some((rng.random_range(100..=400), secs(&mut rng, 0.5, 1.5)))
        } else {
            None
        };
        let moves = rng.random_range(3..=7);
        let pointer_moves = (0..moves)
            .map(|_| {
                (
                    rng.random_range(100..=800),
                    rng.random_range(100..=600),
                    secs(&mut rng, 0.1, 0.5),
                )
            })
            .collect();
        let tail = secs(&mut rng, 0.5, 1.5);

        Self {
            lead_in,
            scrolls,
            scroll_back,
            pointer_moves,
            tail,
        }
    }
}

/// `goto` waits for the load event under the request timeout, so a page that
/// never finishes loading surfaces here rather than in `wait_for_ready`.
fn navigation_error(url: &Url, timeout: Duration, error: CdpError) -> CaptureError {
    match error {
        CdpError::Timeout => CaptureError::RenderTimeout {
            url: url.to_string(),
            timeout,
        },
        other => CaptureError::render_failure(url.as_str(), other),
    }
}

/// Chromium-based renderer driving a single tab.
pub struct ChromiumRenderer {
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    page: Page,
    profile: Profile,
    navigation_timeout: Duration,
    settle_seed: AtomicU64,
}

impl ChromiumRenderer {
    /// Launch Chromium and open the tab every page is rendered in.
    pub async fn launch(options: BrowserOptions) -> Result<Self> {
        let chrome_path = find_chromium(options.chrome_path.as_ref()).ok_or_else(|| {
            CaptureError::RendererInit(
                "Chromium not found. Install Chrome/Chromium or pass --chrome-path".to_string(),
            )
        })?;
        info!("Using browser at {}", chrome_path.display());

        let Viewport { width, height } = options.profile.viewport;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(width, height)
            .viewport(CdpViewport {
                width,
                height,
                ..Default::default()
            })
            .request_timeout(options.navigation_timeout)
            .args(HARDENING_ARGS.iter().copied())
            .arg(format!("--user-agent={}", options.profile.user_agent));

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(proxy) = &options.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        let config = builder
            .build()
            .map_err(|e| CaptureError::RendererInit(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CaptureError::RendererInit(format!("failed to launch Chromium: {e}")))?;

        // Spawn the handler task
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::RendererInit(format!("failed to open tab: {e}")))?;

        if let Err(e) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
        {
            warn!("Could not install navigator masking script: {}", e);
        }

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handler_task)),
            page,
            profile: options.profile,
            navigation_timeout: options.navigation_timeout,
            settle_seed: AtomicU64::new(options.settle_seed),
        })
    }

    async fn run_script(&self, script: String) {
        if let Err(e) = self.page.evaluate(script).await {
            debug!("Settle script failed (ignored): {}", e);
        }
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn navigate(&self, url: &Url) -> Result<()> {
        let mut params = NavigateParams::builder().url(url.as_str());
        if let Some(referer) = &self.profile.referer {
            params = params.referrer(referer.clone());
        }
        let params = params
            .build()
            .map_err(|e| CaptureError::render_failure(url.as_str(), e))?;

        self.page
            .goto(params)
            .await
            .map_err(|e| navigation_error(url, self.navigation_timeout, e))?;
        Ok(())
    }

    async fn wait_for_ready(&self, timeout: Duration) -> bool {
        let poll = async {
            loop {
                if self.page.find_element("body").await.is_ok() {
                    return;
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    async fn settle(&self) {
        let seed = self.settle_seed.fetch_add(1, Ordering::Relaxed);
        let plan = SettlePlan::from_seed(seed);

        tokio::time::sleep(plan.lead_in).await;

        let mut offset: u64 = 0;
        for (amount, pause) in &plan.scrolls {
            offset += u64::from(*amount);
            self.run_script(format!("window.scrollTo(0, {});", offset))
                .await;
            tokio::time::sleep(*pause).await;
        }
        if let Some((amount, pause)) = plan.scroll_back {
            self.run_script(format!("window.scrollBy(0, -{});", amount))
                .await;
            tokio::time::sleep(pause).await;
        }

        for (x, y, pause) in &plan.pointer_moves {
            self.run_script(format!(
                "document.dispatchEvent(new MouseEvent('mousemove', \
                 {{ clientX: {x}, clientY: {y}, bubbles: true }}));"
            ))
            .await;
            tokio::time::sleep(*pause).await;
        }

        tokio::time::sleep(plan.tail).await;
    }

    async fn current_markup(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| CaptureError::render_failure("current page", e))
    }

    async fn snapshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::render_failure("current page", e))
    }

    async fn title(&self) -> Result<String> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| CaptureError::render_failure("current page", e))?;
        Ok(title.unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        if let Err(e) = self.page.clone().close().await {
            debug!("Closing tab failed: {}", e);
        }
        if let Err(e) = browser.close().await {
            warn!("Closing browser failed: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }
        info!("Browser closed");
        Ok(())
    }

    fn user_agent(&self) -> Option<String> {
        Some(self.profile.user_agent.clone())
    }

    fn viewport(&self) -> Option<Viewport> {
        Some(self.profile.viewport)
    }
}
