//! Configuration loaded from the environment (and `.env` when present).

use crate::application::PipelineOptions;
use crate::domain::av::segments::SegmentOptions;
use std::env;
use std::path::PathBuf;

/// Settings shared by the acquisition, segmentation and commit stages.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Root of the clip tree, clips land in `<output_dir>/<ContentId>/`
    pub output_dir: PathBuf,
    /// Where transient whole-video audio and caption files are downloaded
    pub work_dir: PathBuf,
    /// Append-only list of committed content identifiers
    pub ledger_path: PathBuf,
    /// Where numbered transcript manifests are written
    pub manifest_dir: PathBuf,
    /// Cues shorter than this are dropped
    pub min_cue_ms: u64,
    /// Fixed bitrate passed to the mp3 encoder
    pub audio_bitrate: String,
    /// Caption language requested from the downloader
    pub subtitle_lang: String,
    /// Leave downloaded inputs on disk when a run fails
    pub keep_failed_inputs: bool,
    /// Commit runs that produced zero clips
    pub commit_empty_runs: bool,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub ytdlp_bin: String,
    /// Netscape cookie jar contents handed to the downloader
    pub youtube_cookies: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            work_dir: PathBuf::from("work"),
            ledger_path: PathBuf::from("downloaded_videos.txt"),
            manifest_dir: PathBuf::from("processed_output"),
            min_cue_ms: 500,
            audio_bitrate: String::from("192k"),
            subtitle_lang: String::from("tr"),
            keep_failed_inputs: true,
            commit_empty_runs: true,
            ffmpeg_bin: String::from("ffmpeg"),
            ffprobe_bin: String::from("ffprobe"),
            ytdlp_bin: String::from("yt-dlp"),
            youtube_cookies: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        Self {
            output_dir: env_path("OUTPUT_DIR").unwrap_or(defaults.output_dir),
            work_dir: env_path("WORK_DIR").unwrap_or(defaults.work_dir),
            ledger_path: env_path("LEDGER_PATH").unwrap_or(defaults.ledger_path),
            manifest_dir: env_path("MANIFEST_DIR").unwrap_or(defaults.manifest_dir),
            min_cue_ms: env_parsed("MIN_CUE_MS").unwrap_or(defaults.min_cue_ms),
            audio_bitrate: env::var("AUDIO_BITRATE").unwrap_or(defaults.audio_bitrate),
            subtitle_lang: env::var("SUBTITLE_LANG").unwrap_or(defaults.subtitle_lang),
            keep_failed_inputs: env_parsed("KEEP_FAILED_INPUTS")
                .unwrap_or(defaults.keep_failed_inputs),
            commit_empty_runs: env_parsed("COMMIT_EMPTY_RUNS")
                .unwrap_or(defaults.commit_empty_runs),
            ffmpeg_bin: env::var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: env::var("FFPROBE_BIN").unwrap_or(defaults.ffprobe_bin),
            ytdlp_bin: env::var("YTDLP_BIN").unwrap_or(defaults.ytdlp_bin),
            youtube_cookies: env::var("YOUTUBE_COOKIES")
                .ok()
                .filter(|cookies| !cookies.trim().is_empty()),
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            work_dir: config.work_dir.clone(),
            keep_failed_inputs: config.keep_failed_inputs,
            commit_empty_runs: config.commit_empty_runs,
            segment: SegmentOptions {
                min_duration_ms: config.min_cue_ms,
                bitrate: config.audio_bitrate.clone(),
            },
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}
