//! WebVTT caption track parsing.
//!
//! A malformed cue only costs that cue: it is reported as a [`CueError`],
//! logged, and parsing carries on with the next block.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

/// One timed caption entry, text kept exactly as it appeared in the track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    /// 0-based position of the cue block in the track
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Raw text, multiple lines joined with `\n`
    pub text: String,
}

impl Cue {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Text with inline markup (`<c>`, `<i>`, karaoke timestamps) removed and
    /// the common entities decoded.
    pub fn plain_text(&self) -> String {
        let untagged = tag_re().replace_all(&self.text, "");
        untagged
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&")
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CueError {
    #[error("cue {index}: no timing line in block starting with {first_line:?}")]
    MalformedHeader { index: usize, first_line: String },

    #[error("cue {index}: invalid timestamp {value:?}")]
    InvalidTimestamp { index: usize, value: String },

    #[error("cue {index}: no caption text")]
    MissingText { index: usize },
}

/// Result of parsing a whole track.
#[derive(Debug, Default)]
pub struct ParsedTrack {
    pub cues: Vec<Cue>,
    pub warnings: Vec<CueError>,
}

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+):)?(\d{2}):(\d{2})[.,](\d{3})$").expect("valid regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Parse `HH:MM:SS.mmm` (or the short `MM:SS.mmm`) into milliseconds.
pub fn parse_timestamp(value: &str) -> Option<u64> {
    let caps = timestamp_re().captures(value.trim())?;
    let hours: u64 = match caps.get(1) {
        Some(h) => h.as_str().parse().ok()?,
        None => 0,
    };
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    let millis: u64 = caps[4].parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)?
        .checked_mul(1000)?
        .checked_add(millis)
}

/// Parse the contents of a WebVTT file.
pub fn parse_vtt(content: &str) -> ParsedTrack {
    let content = content.trim_start_matches('\u{feff}');
    let mut track = ParsedTrack::default();
    let mut index = 0;

    for (block_no, block) in blocks(content).into_iter().enumerate() {
        let first = block[0];
        if block_no == 0 && first.starts_with("WEBVTT") {
            continue;
        }
        if is_metadata_block(first) {
            continue;
        }

        match parse_cue_block(index, &block) {
            Ok(cue) => track.cues.push(cue),
            Err(e) => {
                warn!(error = %e, "Skipping malformed cue");
                track.warnings.push(e);
            }
        }
        index += 1;
    }

    track
}

/// Read and parse a caption file from disk.
///
/// Invalid UTF-8 is replaced with U+FFFD, so a corrupted byte only damages the
/// text of the cue it sits in.
pub async fn read_caption_track(path: &Path) -> std::io::Result<ParsedTrack> {
    let bytes = tokio::fs::read(path).await?;
    Ok(parse_vtt(&String::from_utf8_lossy(&bytes)))
}

fn blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn is_metadata_block(first_line: &str) -> bool {
    ["NOTE", "STYLE", "REGION"].iter().any(|kw| {
        first_line == *kw
            || first_line
                .strip_prefix(*kw)
                .is_some_and(|rest| rest.starts_with(char::is_whitespace))
    })
}

fn parse_cue_block(index: usize, block: &[&str]) -> Result<Cue, CueError> {
    let timing_pos = block
        .iter()
        .position(|line| line.contains("-->"))
        .ok_or_else(|| CueError::MalformedHeader {
            index,
            first_line: block[0].to_string(),
        })?;

    let (start, end) = parse_timing_line(index, block[timing_pos])?;

    let text = block[timing_pos + 1..].join("\n");
    if text.trim().is_empty() {
        return Err(CueError::MissingText { index });
    }

    Ok(Cue {
        index,
        start_ms: start,
        end_ms: end,
        text,
    })
}

fn parse_timing_line(index: usize, line: &str) -> Result<(u64, u64), CueError> {
    let invalid = |value: &str| CueError::InvalidTimestamp {
        index,
        value: value.trim().to_string(),
    };

    let (left, right) = line.split_once("-->").ok_or_else(|| invalid(line))?;
    // Cue settings (`align:start position:0%`) may follow the end timestamp.
    let end_token = right.split_whitespace().next().unwrap_or("");

    let start = parse_timestamp(left).ok_or_else(|| invalid(left))?;
    let end = parse_timestamp(end_token).ok_or_else(|| invalid(end_token))?;
    Ok((start, end))
}
