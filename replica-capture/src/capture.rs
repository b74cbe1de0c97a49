//! One page visit: render, stabilize, extract, persist.

use crate::assets::AssetStore;
use crate::config::CrawlConfig;
use crate::error::{CaptureError, Result};
use crate::extract::extract;
use crate::renderer::Renderer;
use crate::result::{CapturedPage, PageMetadata};
use crate::sink::FileSink;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub struct PageCapturer {
    renderer: Arc<dyn Renderer>,
    assets: AssetStore,
    sink: Arc<dyn FileSink>,
    config: Arc<CrawlConfig>,
}

impl PageCapturer {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        assets: AssetStore,
        sink: Arc<dyn FileSink>,
        config: Arc<CrawlConfig>,
    ) -> Self {
        Self {
            renderer,
            assets,
            sink,
            config,
        }
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    /// Captures `url` as `<page_id>.html`, `<page_id>.png` and
    /// `<page_id>_metadata.json` under the output root.
    ///
    /// Files written before a failure are left in place.
    pub async fn capture(&self, url: &Url, page_id: &str) -> Result<CapturedPage> {
        info!("Capturing page: {}", url);

        self.renderer.navigate(url).await?;

        if !self.renderer.wait_for_ready(self.config.wait_timeout).await {
            return Err(CaptureError::RenderTimeout {
                url: url.to_string(),
                timeout: self.config.wait_timeout,
            });
        }

        if self.config.settle {
            debug!("Settling {}", url);
            self.renderer.settle().await;
        }
        if !self.config.dynamic_wait.is_zero() {
            tokio::time::sleep(self.config.dynamic_wait).await;
        }

        let markup = self.renderer.current_markup().await?;
        let snapshot = self.renderer.snapshot().await?;
        let title = self.renderer.title().await?;

        let root = &self.config.output_root;
        let html_file = PathBuf::from(format!("{}.html", page_id));
        let snapshot_file = PathBuf::from(format!("{}.png", page_id));
        let metadata_file = PathBuf::from(format!("{}_metadata.json", page_id));

        self.sink.ensure_dir(root).await?;
        self.sink
            .write_file(&root.join(&snapshot_file), &snapshot)
            .await?;
        self.sink
            .write_file(&root.join(&html_file), markup.as_bytes())
            .await?;

        let extraction = extract(&markup, url);
        debug!(
            "{} asset reference(s), {} link(s) on {}",
            extraction.asset_refs.len(),
            extraction.links.len(),
            url
        );
        let assets = self
            .assets
            .fetch_all(extraction.asset_base(url), &extraction.asset_refs)
            .await;

        let captured_at = Utc::now();
        let metadata = PageMetadata {
            url: url.to_string(),
            timestamp: captured_at.to_rfc3339(),
            title: title.clone(),
            html_file: html_file.clone(),
            snapshot_file: snapshot_file.clone(),
            user_agent: self.renderer.user_agent(),
            viewport: self.renderer.viewport(),
            assets: assets.clone(),
        };
        self.write_metadata(&root.join(&metadata_file), &metadata)
            .await?;

        info!("✓ Page captured: {}", title);

        Ok(CapturedPage {
            source_url: url.clone(),
            page_id: page_id.to_string(),
            depth: 0,
            title,
            html_path: html_file,
            snapshot_path: snapshot_file,
            metadata_path: metadata_file,
            assets,
            captured_at,
            links: extraction.links,
        })
    }

    async fn write_metadata(&self, path: &Path, metadata: &PageMetadata) -> Result<()> {
        let json = serde_json::to_vec_pretty(metadata)?;
        self.sink.write_file(path, &json).await
    }
}
