//! Renderer abstraction for loading and snapshotting pages.
//!
//! The crawl drives a single rendering surface, so every method takes
//! `&self` and is called strictly one page at a time.

pub mod chromium;

use crate::error::Result;
use crate::result::Viewport;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

pub use chromium::{BrowserOptions, ChromiumRenderer, find_chromium};

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Load `url`. Fails on unrecoverable navigation errors.
    async fn navigate(&self, url: &Url) -> Result<()>;

    /// Readiness barrier: true once the document root is present, false if
    /// `timeout` elapses first.
    async fn wait_for_ready(&self, timeout: Duration) -> bool;

    /// Best-effort activity (scrolling, pointer movement) that nudges lazy
    /// content into loading. Failures are discarded and never surface.
    async fn settle(&self);

    /// The rendered document markup.
    async fn current_markup(&self) -> Result<String>;

    /// PNG snapshot of the rendered page.
    async fn snapshot(&self) -> Result<Vec<u8>>;

    /// The resolved document title.
    async fn title(&self) -> Result<String>;

    /// Releases the rendering surface. Safe to call more than once.
    async fn close(&self) -> Result<()>;

    /// User agent the renderer presents, when known.
    fn user_agent(&self) -> Option<String> {
        None
    }

    fn viewport(&self) -> Option<Viewport> {
        None
    }
}
