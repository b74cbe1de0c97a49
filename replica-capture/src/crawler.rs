use crate::capture::PageCapturer;
use crate::config::CrawlConfig;
use crate::result::{CaptureFailure, CapturedPage, CrawlSummary};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
pub type PageCallback = Arc<dyn Fn(&CapturedPage) + Send + Sync>;

/// A frontier entry: popped once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: usize,
}

/// Breadth-first crawl controller. Drives one page capture at a time.
pub struct Crawler {
    capturer: PageCapturer,
    config: Arc<CrawlConfig>,
    cancel: CancellationToken,
    rng: StdRng,
    progress_callback: Option<ProgressCallback>,
    page_callback: Option<PageCallback>,
}

impl Crawler {
    pub fn new(capturer: PageCapturer, config: Arc<CrawlConfig>) -> Self {
        Self {
            capturer,
            config,
            cancel: CancellationToken::new(),
            rng: StdRng::from_os_rng(),
            progress_callback: None,
            page_callback: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Seeds the pacing jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_page_callback(mut self, callback: PageCallback) -> Self {
        self.page_callback = Some(callback);
        self
    }

    pub fn capturer(&self) -> &PageCapturer {
        &self.capturer
    }

    /// Crawls from `start_url`, capturing every admissible page up to
    /// `max_depth` link hops away. Page failures are recorded, never
    /// retried, and never stop the crawl.
    pub async fn run(&mut self, start_url: &Url, max_depth: usize) -> CrawlSummary {
        info!("Starting crawl of {} (max depth {})", start_url, max_depth);
        let started = Instant::now();
        let mut summary = CrawlSummary::new(start_url, max_depth);

        let start = normalize(start_url);
        let mut frontier: VecDeque<FrontierEntry> = VecDeque::new();
        let mut scheduled: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();

        scheduled.insert(start.to_string());
        frontier.push_back(FrontierEntry {
            url: start.clone(),
            depth: 0,
        });

        while let Some(entry) = frontier.pop_front() {
            if self.cancel.is_cancelled() {
                warn!(
                    "Crawl cancelled with {} page(s) still queued",
                    frontier.len() + 1
                );
                summary.cancelled = true;
                break;
            }

            let key = entry.url.to_string();
            scheduled.remove(&key);

            if visited.contains(&key) || entry.depth > max_depth {
                debug!("Discarding {} (depth {})", key, entry.depth);
                continue;
            }

            // Pace consecutive visits
            if !visited.is_empty() && !self.pause().await {
                summary.cancelled = true;
                break;
            }

            visited.insert(key.clone());
            let page_id = format!("page_{}", visited.len());

            info!("Crawling depth {}: {}", entry.depth, entry.url);
            if let Some(ref callback) = self.progress_callback {
                callback(entry.depth, key.clone());
            }

            let page = match self.capturer.capture(&entry.url, &page_id).await {
                Ok(page) => CapturedPage {
                    depth: entry.depth,
                    ..page
                },
                Err(e) => {
                    warn!("Capture failed for {}: {}", entry.url, e);
                    summary
                        .failures
                        .push(CaptureFailure::new(&entry.url, entry.depth, &e));
                    continue;
                }
            };

            if entry.depth < max_depth {
                for link in &page.links {
                    let Some(link) = self.admit(&start, link) else {
                        continue;
                    };
                    let link_key = link.to_string();
                    if visited.contains(&link_key) || scheduled.contains(&link_key) {
                        continue;
                    }
                    debug!("Queuing {} at depth {}", link_key, entry.depth + 1);
                    scheduled.insert(link_key);
                    frontier.push_back(FrontierEntry {
                        url: link,
                        depth: entry.depth + 1,
                    });
                }
            }

            if let Some(ref callback) = self.page_callback {
                callback(&page);
            }
            summary.pages.push(page);
        }

        summary.assets = self.capturer.assets().counts();
        summary.elapsed = started.elapsed();
        info!(
            "Crawl complete. Captured {} page(s), {} failure(s)",
            summary.pages.len(),
            summary.failures.len()
        );
        summary
    }

    /// Normalized `link` if it may be crawled from `start`.
    fn admit(&self, start: &Url, link: &Url) -> Option<Url> {
        if !matches!(link.scheme(), "http" | "https") {
            debug!("  -> Not http(s), skipping {}", link);
            return None;
        }
        if self.config.same_origin && !is_same_origin(start, link) {
            debug!("  -> Cross-origin, skipping {}", link);
            return None;
        }
        Some(normalize(link))
    }

    /// Sleeps for the next pacing delay. Returns false if cancelled first.
    async fn pause(&mut self) -> bool {
        let delay = self.config.pacing.next_delay(&mut self.rng);
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        debug!("Pacing for {:?}", delay);
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

/// Drops the fragment; two URLs differing only there are the same page.
pub fn normalize(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Exact authority match: host plus explicit port, scheme ignored.
/// Subdomains are different origins. A port equal to the scheme default is
/// normalized away when the URL is parsed.
pub fn is_same_origin(start: &Url, candidate: &Url) -> bool {
    start.host_str() == candidate.host_str() && start.port() == candidate.port()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_normalize_drops_fragment() {
        assert_eq!(
            normalize(&url("https://example.com/a#top")).as_str(),
            "https://example.com/a"
        );
        assert_eq!(
            normalize(&url("https://example.com/a?q=1")).as_str(),
            "https://example.com/a?q=1"
        );
    }

    #[test]
    fn test_same_origin_is_exact_host_and_port() {
        let start = url("https://example.com/");
        assert!(is_same_origin(&start, &url("https://example.com/about")));
        assert!(is_same_origin(&start, &url("http://example.com/about")));
        assert!(!is_same_origin(&start, &url("http://example.com:443/x")));
        assert!(!is_same_origin(&start, &url("http://example.com:8080/")));
        assert!(!is_same_origin(&start, &url("https://blog.example.com/")));
        assert!(!is_same_origin(&start, &url("https://example.com:8443/")));
        assert!(!is_same_origin(&start, &url("https://other.org/")));

        let local = url("http://127.0.0.1:8080/");
        assert!(is_same_origin(&local, &url("http://127.0.0.1:8080/a")));
        assert!(is_same_origin(&local, &url("https://127.0.0.1:8080/a")));
        assert!(!is_same_origin(&local, &url("http://127.0.0.1/a")));
    }
}
