use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Timed out after {timeout:?} waiting for {url} to become ready")]
    RenderTimeout { url: String, timeout: Duration },

    #[error("Rendering {url} failed: {reason}")]
    RenderFailure { url: String, reason: String },

    #[error("Asset download failed for {url}: {reason}")]
    AssetDownload { url: String, reason: String },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Renderer could not be started: {0}")]
    RendererInit(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),
}

impl CaptureError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaptureError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn render_failure(url: impl Into<String>, reason: impl ToString) -> Self {
        CaptureError::RenderFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Short label used in summaries and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::RenderTimeout { .. } => "render-timeout",
            CaptureError::RenderFailure { .. } => "render-failure",
            CaptureError::AssetDownload { .. } => "asset-download",
            CaptureError::Filesystem { .. } | CaptureError::IoError(_) => "filesystem",
            CaptureError::InvalidConfig(_) => "invalid-config",
            CaptureError::RendererInit(_) => "renderer-init",
            CaptureError::HttpError(_) => "http",
            CaptureError::SerializeError(_) => "serialize",
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
