use crate::domain::content_id::ContentId;
use crate::error::BoxError;
use crate::ports::media::{DownloadedMedia, MediaSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Acquisition from files already on disk.
///
/// The pair is copied into the work dir under the same names a download would
/// get, so finalization only ever deletes the copies.
#[derive(Clone, Debug)]
pub struct LocalFiles {
    audio: PathBuf,
    captions: PathBuf,
}

impl LocalFiles {
    pub fn new(audio: impl Into<PathBuf>, captions: impl Into<PathBuf>) -> Self {
        Self {
            audio: audio.into(),
            captions: captions.into(),
        }
    }
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (
        tokio::fs::canonicalize(a).await,
        tokio::fs::canonicalize(b).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

async fn copy_into(source: &Path, dest: &Path) -> Result<(), BoxError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(source, dest)
        .await
        .map_err(|e| format!("cannot copy {}: {}", source.display(), e))?;
    Ok(())
}

#[async_trait]
impl MediaSource for LocalFiles {
    async fn fetch(
        &self,
        _locator: &str,
        content_id: &ContentId,
        work_dir: &Path,
    ) -> Result<DownloadedMedia, BoxError> {
        let audio_ext = self
            .audio
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp3");
        let audio_path = work_dir.join(format!("{}.{}", content_id, audio_ext));
        let caption_path = work_dir.join(format!("{}.vtt", content_id));

        // The copies are deleted once the run commits, so neither may be the original.
        for (source, dest) in [(&self.audio, &audio_path), (&self.captions, &caption_path)] {
            if same_file(source, dest).await {
                return Err(format!(
                    "{} already sits at the work path {}; move it out of the work dir",
                    source.display(),
                    dest.display()
                )
                .into());
            }
        }

        copy_into(&self.audio, &audio_path).await?;
        copy_into(&self.captions, &caption_path).await?;

        Ok(DownloadedMedia {
            audio_path,
            caption_path,
            title: self
                .audio
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(String::from),
        })
    }
}
