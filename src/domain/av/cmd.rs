use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Output;
use tokio::process::Command as TokioCommand;

/// Millisecond range of the source track to cut, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl ClipRange {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Format milliseconds as the `S.mmm` seconds string ffmpeg expects.
pub fn ms_to_seconds_arg(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// The external tools the segmentation stage shells out to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaToolRunner: Send + Sync {
    /// Print the container duration in seconds on stdout.
    async fn probe_duration(&self, media: &Path) -> io::Result<Output>;

    /// Cut `range` out of `source` and encode it as constant bitrate mp3 at `output`.
    async fn extract_clip(
        &self,
        source: &Path,
        range: ClipRange,
        bitrate: &str,
        output: &Path,
    ) -> io::Result<Output>;
}

/// Runs the real `ffprobe`/`ffmpeg` binaries.
#[derive(Clone, Debug)]
pub struct FfmpegRunner {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FfmpegRunner {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl MediaToolRunner for FfmpegRunner {
    async fn probe_duration(&self, media: &Path) -> io::Result<Output> {
        TokioCommand::new(&self.ffprobe_bin)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(media)
            .output()
            .await
    }

    async fn extract_clip(
        &self,
        source: &Path,
        range: ClipRange,
        bitrate: &str,
        output: &Path,
    ) -> io::Result<Output> {
        TokioCommand::new(&self.ffmpeg_bin)
            .arg("-y")
            .arg("-v")
            .arg("error")
            .arg("-ss")
            .arg(ms_to_seconds_arg(range.start_ms))
            .arg("-t")
            .arg(ms_to_seconds_arg(range.duration_ms()))
            .arg("-i")
            .arg(source)
            .arg("-vn")
            .arg("-map_metadata")
            .arg("-1")
            .arg("-c:a")
            .arg("libmp3lame")
            .arg("-b:a")
            .arg(bitrate)
            .arg(output)
            .output()
            .await
    }
}
