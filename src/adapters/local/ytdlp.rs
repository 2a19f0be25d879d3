//! Acquisition through the `yt-dlp` command line tool.

use crate::domain::content_id::ContentId;
use crate::error::BoxError;
use crate::ports::media::{DownloadedMedia, MediaSource};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command as TokioCommand;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct YtDlpSource {
    bin: String,
    subtitle_lang: String,
    audio_quality: String,
    cookies: Option<String>,
}

impl YtDlpSource {
    pub fn new(bin: impl Into<String>, subtitle_lang: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            subtitle_lang: subtitle_lang.into(),
            audio_quality: String::from("192K"),
            cookies: None,
        }
    }

    /// Netscape cookie jar contents, written to a temporary file per fetch.
    pub fn with_cookies(mut self, cookies: Option<String>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Where the audio and caption files land. Derived from the output
    /// template, never discovered by listing the directory.
    pub fn expected_paths(&self, content_id: &ContentId, work_dir: &Path) -> (PathBuf, PathBuf) {
        (
            work_dir.join(format!("{}.mp3", content_id)),
            work_dir.join(format!("{}.{}.vtt", content_id, self.subtitle_lang)),
        )
    }

    pub fn build_args(
        &self,
        locator: &str,
        content_id: &ContentId,
        work_dir: &Path,
        cookie_file: Option<&Path>,
    ) -> Vec<OsString> {
        let template = work_dir.join(format!("{}.%(ext)s", content_id));
        let mut args: Vec<OsString> = [
            "--no-playlist",
            "-f",
            "bestaudio/best",
            "-x",
            "--audio-format",
            "mp3",
            "--audio-quality",
            self.audio_quality.as_str(),
            "--write-subs",
            "--write-auto-subs",
            "--sub-langs",
            self.subtitle_lang.as_str(),
            "--sub-format",
            "vtt",
            "--no-simulate",
            "--print",
            "title",
            "-o",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(template.into_os_string());

        if let Some(cookie_file) = cookie_file {
            args.push(OsString::from("--cookies"));
            args.push(cookie_file.as_os_str().to_os_string());
        }
        args.push(OsString::from("--"));
        args.push(OsString::from(locator));
        args
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn fetch(
        &self,
        locator: &str,
        content_id: &ContentId,
        work_dir: &Path,
    ) -> Result<DownloadedMedia, BoxError> {
        tokio::fs::create_dir_all(work_dir).await?;

        let cookie_file = match &self.cookies {
            Some(cookies) => {
                let path = work_dir.join(format!("{}.cookies.txt", content_id));
                tokio::fs::write(&path, cookies).await?;
                Some(path)
            }
            None => None,
        };

        info!(%content_id, locator, "Downloading audio and captions");
        let output = TokioCommand::new(&self.bin)
            .args(self.build_args(locator, content_id, work_dir, cookie_file.as_deref()))
            .output()
            .await;

        if let Some(path) = &cookie_file {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Could not remove cookie file");
            }
        }

        let output = output.map_err(|e| format!("{} could not be run: {}", self.bin, e))?;
        if !output.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }

        let (audio_path, caption_path) = self.expected_paths(content_id, work_dir);
        for path in [&audio_path, &caption_path] {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(format!("expected download {} not found", path.display()).into());
            }
        }

        let title = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(String::from);

        Ok(DownloadedMedia {
            audio_path,
            caption_path,
            title,
        })
    }
}
