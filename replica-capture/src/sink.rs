use crate::error::{CaptureError, Result};
use async_trait::async_trait;
use std::path::Path;

/// Destination for captured artifacts. Both operations fail loudly.
#[async_trait]
pub trait FileSink: Send + Sync {
    async fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()>;
    async fn ensure_dir(&self, path: &Path) -> Result<()>;
}

/// Writes straight to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

#[async_trait]
impl FileSink for FsSink {
    async fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| CaptureError::filesystem(path, e))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| CaptureError::filesystem(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_sink_writes_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("css");
        let sink = FsSink;

        sink.ensure_dir(&nested).await.unwrap();
        sink.write_file(&nested.join("app.css"), b"body{}").await.unwrap();

        let written = std::fs::read(nested.join("app.css")).unwrap();
        assert_eq!(written, b"body{}");
    }

    #[tokio::test]
    async fn test_fs_sink_reports_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("file.bin");

        let err = FsSink.write_file(&path, b"x").await.unwrap_err();
        assert!(matches!(err, CaptureError::Filesystem { .. }));
        assert_eq!(err.kind(), "filesystem");
    }
}
