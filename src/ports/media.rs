use crate::domain::content_id::ContentId;
use crate::error::BoxError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Files produced by acquisition. Transient: removed once the run commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedMedia {
    pub audio_path: PathBuf,
    pub caption_path: PathBuf,
    pub title: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fetch the whole-video audio and caption track for `locator` into `work_dir`.
    async fn fetch(
        &self,
        locator: &str,
        content_id: &ContentId,
        work_dir: &Path,
    ) -> Result<DownloadedMedia, BoxError>;
}
