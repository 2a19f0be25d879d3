use super::cmd::MediaToolRunner;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A whole-video audio track on disk. Never modified by the engine, so cutting
/// the same range twice yields the same clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub duration_ms: u64,
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("audio file not found: {0}")]
    Missing(PathBuf),

    #[error("ffprobe could not be run: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffprobe failed: {0}")]
    Failed(String),

    #[error("unparseable duration {0:?}")]
    Unparseable(String),
}

impl AudioTrack {
    pub async fn probe(path: &Path, runner: &impl MediaToolRunner) -> Result<AudioTrack, ProbeError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ProbeError::Missing(path.to_path_buf()));
        }

        let output = runner.probe_duration(path).await?;
        if !output.status.success() {
            return Err(ProbeError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration_ms = parse_duration_ms(&stdout)
            .ok_or_else(|| ProbeError::Unparseable(stdout.trim().to_string()))?;

        Ok(AudioTrack {
            path: path.to_path_buf(),
            duration_ms,
        })
    }
}

/// Parse ffprobe's decimal seconds (`"123.456000"`) into whole milliseconds
/// without going through floating point. Digits past the millisecond are
/// truncated.
pub fn parse_duration_ms(text: &str) -> Option<u64> {
    let text = text.trim();
    let (secs, frac) = match text.split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (text, ""),
    };
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let millis: String = frac.chars().chain("000".chars()).take(3).collect();
    secs.parse::<u64>()
        .ok()?
        .checked_mul(1000)?
        .checked_add(millis.parse::<u64>().ok()?)
}
