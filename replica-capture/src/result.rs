use crate::error::CaptureError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Kind of sub-resource referenced by a captured document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Css,
    Js,
    Img,
    Font,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 4] = [
        AssetCategory::Css,
        AssetCategory::Js,
        AssetCategory::Img,
        AssetCategory::Font,
    ];

    /// Directory under the output root holding this category's files.
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetCategory::Css => "css",
            AssetCategory::Js => "js",
            AssetCategory::Img => "img",
            AssetCategory::Font => "font",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Local asset paths (relative to the output root) grouped by category,
/// in the order the document referenced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub css: Vec<PathBuf>,
    pub js: Vec<PathBuf>,
    pub img: Vec<PathBuf>,
    pub font: Vec<PathBuf>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a path unless the category already lists it.
    pub fn push(&mut self, category: AssetCategory, path: PathBuf) {
        let entries = self.entries_mut(category);
        if !entries.contains(&path) {
            entries.push(path);
        }
    }

    pub fn get(&self, category: AssetCategory) -> &[PathBuf] {
        match category {
            AssetCategory::Css => &self.css,
            AssetCategory::Js => &self.js,
            AssetCategory::Img => &self.img,
            AssetCategory::Font => &self.font,
        }
    }

    fn entries_mut(&mut self, category: AssetCategory) -> &mut Vec<PathBuf> {
        match category {
            AssetCategory::Css => &mut self.css,
            AssetCategory::Js => &mut self.js,
            AssetCategory::Img => &mut self.img,
            AssetCategory::Font => &mut self.font,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetCategory, &PathBuf)> {
        AssetCategory::ALL
            .into_iter()
            .flat_map(move |category| self.get(category).iter().map(move |p| (category, p)))
    }

    pub fn len(&self) -> usize {
        self.css.len() + self.js.len() + self.img.len() + self.font.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A successfully captured page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedPage {
    pub source_url: Url,
    pub page_id: String,
    pub depth: usize,
    pub title: String,
    pub html_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub metadata_path: PathBuf,
    pub assets: AssetManifest,
    pub captured_at: DateTime<Utc>,
    /// Hyperlink targets found in the rendered markup, unfiltered.
    #[serde(skip)]
    pub links: Vec<Url>,
}

/// On-disk shape of `<pageId>_metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub url: String,
    pub timestamp: String,
    pub title: String,
    pub html_file: PathBuf,
    pub snapshot_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    pub assets: AssetManifest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A page that could not be captured. Never retried within the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureFailure {
    pub url: String,
    pub depth: usize,
    pub kind: String,
    pub error: String,
}

impl CaptureFailure {
    pub fn new(url: &Url, depth: usize, error: &CaptureError) -> Self {
        Self {
            url: url.to_string(),
            depth,
            kind: error.kind().to_string(),
            error: error.to_string(),
        }
    }
}

/// Stored asset files per category for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCounts {
    pub css: usize,
    pub js: usize,
    pub img: usize,
    pub font: usize,
}

impl AssetCounts {
    pub fn increment(&mut self, category: AssetCategory) {
        match category {
            AssetCategory::Css => self.css += 1,
            AssetCategory::Js => self.js += 1,
            AssetCategory::Img => self.img += 1,
            AssetCategory::Font => self.font += 1,
        }
    }

    pub fn get(&self, category: AssetCategory) -> usize {
        match category {
            AssetCategory::Css => self.css,
            AssetCategory::Js => self.js,
            AssetCategory::Img => self.img,
            AssetCategory::Font => self.font,
        }
    }

    pub fn total(&self) -> usize {
        self.css + self.js + self.img + self.font
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub start_url: String,
    pub max_depth: usize,
    pub pages: Vec<CapturedPage>,
    pub failures: Vec<CaptureFailure>,
    pub assets: AssetCounts,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl CrawlSummary {
    pub fn new(start_url: &Url, max_depth: usize) -> Self {
        Self {
            start_url: start_url.to_string(),
            max_depth,
            pages: Vec::new(),
            failures: Vec::new(),
            assets: AssetCounts::default(),
            cancelled: false,
            elapsed: Duration::from_secs(0),
        }
    }

    pub fn pages_captured(&self) -> usize {
        self.pages.len()
    }

    /// Every captured page persists exactly one snapshot.
    pub fn snapshots_taken(&self) -> usize {
        self.pages.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}
