//! Run configuration, resolved once before a crawl starts.

use crate::error::{CaptureError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DYNAMIC_WAIT: Duration = Duration::from_secs(3);
pub const DEFAULT_ASSET_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_ASSET_WORKERS: usize = 8;
pub const DEFAULT_PROXY_PORT: u16 = 9050;

/// Randomized pause inserted between consecutive page visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// No pause at all. Used by tests and single-page runs.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rng.random_range(min..=max))
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(5))
    }
}

/// Immutable crawl configuration. Built with the `with_*` methods, then
/// checked once with [`CrawlConfig::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub start_url: Url,
    pub output_root: PathBuf,
    /// 0 captures the start page only.
    pub max_depth: usize,
    /// Only follow links whose host and port match the start URL.
    pub same_origin: bool,
    /// Bound on the renderer's readiness barrier.
    pub wait_timeout: Duration,
    /// Run the renderer's scroll/mouse settle behavior.
    pub settle: bool,
    /// Extra time given to asynchronous content after settling.
    pub dynamic_wait: Duration,
    pub asset_timeout: Duration,
    pub asset_workers: usize,
    pub pacing: Pacing,
    /// Route traffic through a local SOCKS5 proxy (Tor).
    pub anonymize: bool,
    pub proxy_port: u16,
}

impl CrawlConfig {
    pub fn new(start_url: Url, output_root: impl Into<PathBuf>) -> Self {
        Self {
            start_url,
            output_root: output_root.into(),
            max_depth: 0,
            same_origin: true,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            settle: true,
            dynamic_wait: DEFAULT_DYNAMIC_WAIT,
            asset_timeout: DEFAULT_ASSET_TIMEOUT,
            asset_workers: DEFAULT_ASSET_WORKERS,
            pacing: Pacing::default(),
            anonymize: false,
            proxy_port: DEFAULT_PROXY_PORT,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_same_origin(mut self, same_origin: bool) -> Self {
        self.same_origin = same_origin;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_settle(mut self, settle: bool) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_dynamic_wait(mut self, wait: Duration) -> Self {
        self.dynamic_wait = wait;
        self
    }

    pub fn with_asset_timeout(mut self, timeout: Duration) -> Self {
        self.asset_timeout = timeout;
        self
    }

    pub fn with_asset_workers(mut self, workers: usize) -> Self {
        self.asset_workers = workers;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_anonymize(mut self, anonymize: bool, port: u16) -> Self {
        self.anonymize = anonymize;
        self.proxy_port = port;
        self
    }

    /// Proxy URL for the HTTP client, resolving DNS through the proxy.
    pub fn http_proxy(&self) -> Option<String> {
        self.anonymize
            .then(|| format!("socks5h://127.0.0.1:{}", self.proxy_port))
    }

    /// Proxy argument value for the browser.
    pub fn browser_proxy(&self) -> Option<String> {
        self.anonymize
            .then(|| format!("socks5://127.0.0.1:{}", self.proxy_port))
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.start_url.scheme(), "http" | "https") {
            return Err(CaptureError::InvalidConfig(format!(
                "start URL must be http or https, got '{}'",
                self.start_url
            )));
        }
        if self.start_url.host_str().is_none() {
            return Err(CaptureError::InvalidConfig(format!(
                "start URL has no host: {}",
                self.start_url
            )));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(CaptureError::InvalidConfig(
                "output directory must not be empty".to_string(),
            ));
        }
        if self.wait_timeout.is_zero() {
            return Err(CaptureError::InvalidConfig(
                "render wait timeout must be greater than zero".to_string(),
            ));
        }
        if self.asset_timeout.is_zero() {
            return Err(CaptureError::InvalidConfig(
                "asset timeout must be greater than zero".to_string(),
            ));
        }
        if self.asset_workers == 0 {
            return Err(CaptureError::InvalidConfig(
                "asset worker pool needs at least one worker".to_string(),
            ));
        }
        if self.pacing.min > self.pacing.max {
            return Err(CaptureError::InvalidConfig(format!(
                "pacing minimum {:?} exceeds maximum {:?}",
                self.pacing.min, self.pacing.max
            )));
        }
        if self.anonymize && self.proxy_port == 0 {
            return Err(CaptureError::InvalidConfig(
                "proxy port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
