use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use indicatif::{ProgressBar, ProgressStyle};
use replica_capture::config::{
    CrawlConfig, DEFAULT_ASSET_TIMEOUT, DEFAULT_ASSET_WORKERS, DEFAULT_DYNAMIC_WAIT,
    DEFAULT_PROXY_PORT, DEFAULT_WAIT_TIMEOUT, Pacing,
};
use replica_capture::fetch::{HttpFetch, ReqwestFetch};
use replica_capture::profile::{DefaultProfiles, Profile, ProfileSelector};
use replica_capture::renderer::{BrowserOptions, ChromiumRenderer, Renderer, find_chromium};
use replica_capture::result::{CrawlSummary, Viewport};
use replica_capture::sink::{FileSink, FsSink};
use replica_capture::{AssetStore, Crawler, PageCapturer};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

/// Endpoint answering whether the caller came through Tor.
pub const TOR_CHECK_URL: &str = "https://check.torproject.org/api/ip";
const PROXY_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for a clone run, as collected by the CLI.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    pub url: Url,
    /// Defaults to [`default_output_dir`] when unset.
    pub output_dir: Option<PathBuf>,
    pub max_depth: usize,
    pub same_origin: bool,
    pub wait_time: Duration,
    pub dynamic_wait: Duration,
    pub human_behavior: bool,
    pub anonymize: bool,
    pub proxy_port: u16,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub screen_size: Option<Viewport>,
    pub seed: Option<u64>,
    pub asset_timeout: Duration,
    pub asset_workers: usize,
    pub pacing: Pacing,
    pub show_progress_bars: bool,
}

impl CloneOptions {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            output_dir: None,
            max_depth: 0,
            same_origin: true,
            wait_time: DEFAULT_WAIT_TIMEOUT,
            dynamic_wait: DEFAULT_DYNAMIC_WAIT,
            human_behavior: true,
            anonymize: false,
            proxy_port: DEFAULT_PROXY_PORT,
            headless: true,
            chrome_path: None,
            user_agent: None,
            screen_size: None,
            seed: None,
            asset_timeout: DEFAULT_ASSET_TIMEOUT,
            asset_workers: DEFAULT_ASSET_WORKERS,
            pacing: Pacing::default(),
            show_progress_bars: false,
        }
    }

    /// The output root: the explicit directory, or one named after the host
    /// and `now`.
    pub fn output_root(&self, now: NaiveDateTime) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(&self.url, now))
    }

    pub fn to_config(&self, output_root: PathBuf) -> CrawlConfig {
        CrawlConfig::new(self.url.clone(), output_root)
            .with_max_depth(self.max_depth)
            .with_same_origin(self.same_origin)
            .with_wait_timeout(self.wait_time)
            .with_settle(self.human_behavior)
            .with_dynamic_wait(self.dynamic_wait)
            .with_asset_timeout(self.asset_timeout)
            .with_asset_workers(self.asset_workers)
            .with_pacing(self.pacing)
            .with_anonymize(self.anonymize, self.proxy_port)
    }

    /// Profile for this run, with any CLI overrides applied.
    pub fn profile(&self, selector: &dyn ProfileSelector, seed: u64) -> Profile {
        let mut profile = selector.choose(seed);
        if let Some(ref user_agent) = self.user_agent {
            profile = profile.with_user_agent(user_agent.clone());
        }
        if let Some(viewport) = self.screen_size {
            profile = profile.with_viewport(viewport);
        }
        profile
    }
}

/// A finished clone run.
#[derive(Debug, Clone)]
pub struct CloneOutcome {
    pub output_root: PathBuf,
    pub profile: Profile,
    /// Whether traffic actually went through the anonymizing proxy.
    pub proxied: bool,
    pub summary: CrawlSummary,
}

/// Result of a dry run: everything is set up, nothing is downloaded.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub output_root: PathBuf,
    pub browser: PathBuf,
    pub profile: Profile,
    pub proxied: bool,
}

/// Callback for reporting run-level status messages
pub type CloneProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyStatus {
    #[serde(rename = "IsTor", default)]
    pub is_tor: bool,
    #[serde(rename = "IP", default)]
    pub ip: Option<String>,
}

/// `<host>_<YYYYmmdd_HHMMSS>`, with dots and colons in the host replaced by
/// underscores.
pub fn default_output_dir(url: &Url, now: NaiveDateTime) -> PathBuf {
    let mut netloc = url.host_str().unwrap_or("site").to_string();
    if let Some(port) = url.port() {
        netloc.push_str(&format!(":{}", port));
    }
    let netloc = netloc.replace(['.', ':'], "_");
    PathBuf::from(format!("{}_{}", netloc, now.format("%Y%m%d_%H%M%S")))
}

/// Asks `check_url` who we are, optionally through `proxy`.
pub async fn probe_proxy(check_url: &str, proxy: Option<&str>) -> Result<ProxyStatus> {
    let mut builder = reqwest::Client::builder().timeout(PROXY_PROBE_TIMEOUT);
    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("invalid proxy URL")?);
    }
    let client = builder.build().context("failed to build probe client")?;

    let status = client
        .get(check_url)
        .send()
        .await
        .with_context(|| format!("proxy probe to {} failed", check_url))?
        .error_for_status()?
        .json::<ProxyStatus>()
        .await
        .context("unexpected proxy probe response")?;
    Ok(status)
}

/// Verifies the configured anonymizing proxy. On any doubt the run falls
/// back to direct connections.
async fn resolve_proxy(config: CrawlConfig, progress: Option<&CloneProgressCallback>) -> CrawlConfig {
    let Some(proxy) = config.http_proxy() else {
        return config;
    };
    info!("Checking anonymizing proxy at {}", proxy);

    let message = match probe_proxy(TOR_CHECK_URL, Some(&proxy)).await {
        Ok(status) if status.is_tor => {
            let ip = status.ip.unwrap_or_else(|| "unknown".to_string());
            info!("Proxy verified, exit IP {}", ip);
            if let Some(callback) = progress {
                callback(format!("✓ Routing through Tor (exit IP {})", ip));
            }
            return config;
        }
        Ok(_) => "proxy answered but traffic is not leaving through Tor".to_string(),
        Err(e) => format!("{:#}", e),
    };

    warn!("Anonymizing proxy unavailable ({}); continuing without it", message);
    if let Some(callback) = progress {
        callback(format!("[!] Proxy unavailable ({}); continuing without it", message));
    }
    let port = config.proxy_port;
    config.with_anonymize(false, port)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}

/// Drives a crawl over an already started renderer, then closes it.
///
/// The renderer is closed whatever the crawl outcome.
pub async fn capture_site(
    config: CrawlConfig,
    renderer: Arc<dyn Renderer>,
    fetcher: Arc<dyn HttpFetch>,
    seed: u64,
    cancel: CancellationToken,
    progress_bar: Option<ProgressBar>,
) -> CrawlSummary {
    let config = Arc::new(config);
    let sink: Arc<dyn FileSink> = Arc::new(FsSink);
    let assets = AssetStore::new(
        fetcher,
        sink.clone(),
        config.output_root.clone(),
        config.asset_timeout,
    )
    .with_workers(config.asset_workers);
    let capturer = PageCapturer::new(renderer.clone(), assets, sink, config.clone());

    let mut crawler = Crawler::new(capturer, config.clone())
        .with_seed(seed)
        .with_cancellation(cancel);

    if let Some(pb) = progress_bar {
        let processed = Arc::new(AtomicUsize::new(0));
        crawler = crawler.with_progress_callback(Arc::new(move |depth: usize, url: String| {
            let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!("[{}] depth {}: {}", count, depth, url));
        }));
    }

    let summary = crawler.run(&config.start_url, config.max_depth).await;

    if let Err(e) = renderer.close().await {
        warn!("Failed to close renderer: {}", e);
    }
    summary
}

/// Runs a complete clone: validate, verify the proxy, launch the browser,
/// crawl, release the browser.
pub async fn execute_clone(
    options: CloneOptions,
    progress_callback: Option<CloneProgressCallback>,
    cancel: CancellationToken,
) -> Result<CloneOutcome> {
    let seed = options.seed.unwrap_or_else(rand::random);
    let output_root = options.output_root(chrono::Local::now().naive_local());
    let config = options.to_config(output_root.clone());
    config.validate().context("invalid configuration")?;

    let config = resolve_proxy(config, progress_callback.as_ref()).await;
    let profile = options.profile(&DefaultProfiles, seed);
    info!(
        "Profile: {} at {} (seed {})",
        profile.user_agent, profile.viewport, seed
    );

    FsSink
        .ensure_dir(&output_root)
        .await
        .context("failed to create output directory")?;

    let fetcher = ReqwestFetch::new(&profile.user_agent, config.http_proxy().as_deref())
        .context("failed to build HTTP client")?;

    let renderer = ChromiumRenderer::launch(BrowserOptions {
        headless: options.headless,
        chrome_path: options.chrome_path.clone(),
        proxy: config.browser_proxy(),
        navigation_timeout: config.wait_timeout,
        profile: profile.clone(),
        settle_seed: seed,
    })
    .await
    .context("failed to start browser")?;

    if let Some(ref callback) = progress_callback {
        callback(format!("✓ Browser ready, saving to {}", output_root.display()));
    }

    let progress_bar = options
        .show_progress_bars
        .then(|| spinner("Starting capture..."));

    let proxied = config.anonymize;
    let summary = capture_site(
        config,
        Arc::new(renderer),
        Arc::new(fetcher),
        seed,
        cancel,
        progress_bar.clone(),
    )
    .await;

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    Ok(CloneOutcome {
        output_root,
        profile,
        proxied,
        summary,
    })
}

/// Validates the run, verifies the proxy and starts then stops the browser.
/// Nothing is downloaded or written.
pub async fn run_check(
    options: CloneOptions,
    progress_callback: Option<CloneProgressCallback>,
) -> Result<CheckOutcome> {
    let seed = options.seed.unwrap_or_else(rand::random);
    let output_root = options.output_root(chrono::Local::now().naive_local());
    let config = options.to_config(output_root.clone());
    config.validate().context("invalid configuration")?;

    let config = resolve_proxy(config, progress_callback.as_ref()).await;
    let profile = options.profile(&DefaultProfiles, seed);

    let browser = find_chromium(options.chrome_path.as_ref())
        .context("Chromium not found. Install Chrome/Chromium or pass --chrome-path")?;

    let renderer = ChromiumRenderer::launch(BrowserOptions {
        headless: options.headless,
        chrome_path: Some(browser.clone()),
        proxy: config.browser_proxy(),
        navigation_timeout: config.wait_timeout,
        profile: profile.clone(),
        settle_seed: seed,
    })
    .await
    .context("failed to start browser")?;
    renderer.close().await.context("failed to close browser")?;

    Ok(CheckOutcome {
        output_root,
        browser,
        profile,
        proxied: config.anonymize,
    })
}
