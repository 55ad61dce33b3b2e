//! Local file delivery for recordings and screenshots

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Invalid download name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hands a finished blob to the user
#[async_trait::async_trait]
pub trait DownloadSink: Send + Sync {
    /// Deliver `bytes` under `file_name`, returning where it ended up
    async fn download(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError>;
}

/// Writes downloads into one directory
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn download(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name == "."
            || file_name == ".."
        {
            return Err(DownloadError::InvalidName(file_name.to_string()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;

        info!("Downloaded {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}
