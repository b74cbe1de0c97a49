use crate::error::{CaptureError, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Byte download capability used by the asset store.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetches `url`, failing on transport errors, timeouts and non-success
    /// statuses.
    async fn get(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>>;
}

/// `reqwest`-backed fetcher with browser-like default headers.
#[derive(Debug, Clone)]
pub struct ReqwestFetch {
    client: Client,
}

impl ReqwestFetch {
    pub fn new(user_agent: &str, proxy: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(header::DNT, HeaderValue::from_static("1"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5));

        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::AssetDownload {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
