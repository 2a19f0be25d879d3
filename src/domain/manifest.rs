//! Records handed to the feature-extraction and upload stages.

use crate::domain::av::segments::Clip;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("audio file {0} is missing or empty")]
    MissingAudio(PathBuf),

    #[error("not a clip file name: {0}")]
    NotAClip(String),
}

/// Features the excluded extraction stage computes for one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipFeatures {
    pub spectrogram: PathBuf,
    pub mfcc: Vec<Vec<f32>>,
    pub tokens: Vec<String>,
    pub token_ids: Vec<u32>,
}

/// Full per-clip record. Every field is required, also when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub audio_file: PathBuf,
    pub transcription: String,
    pub spectrogram: PathBuf,
    pub mfcc: Vec<Vec<f32>>,
    pub tokens: Vec<String>,
    pub token_ids: Vec<u32>,
}

impl ManifestRecord {
    pub fn from_clip(clip: &Clip, features: ClipFeatures) -> Self {
        Self {
            audio_file: clip.output_path.clone(),
            transcription: transcription_from_text(&clip.sanitized_text),
            spectrogram: features.spectrogram,
            mfcc: features.mfcc,
            tokens: features.tokens,
            token_ids: features.token_ids,
        }
    }
}

/// The audio/transcription pair produced before any feature extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub audio_file: PathBuf,
    pub transcription: String,
}

impl TranscriptRecord {
    pub fn from_clip(clip: &Clip) -> Self {
        Self {
            audio_file: clip.output_path.clone(),
            transcription: transcription_from_text(&clip.sanitized_text),
        }
    }

    /// Rebuild a record from a clip already on disk, `003_kara_haber.mp3`.
    pub fn from_clip_path(path: &Path) -> Result<Self, ManifestError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ManifestError::NotAClip(path.display().to_string()))?;
        Ok(Self {
            audio_file: path.to_path_buf(),
            transcription: transcription_from_file_name(name)?,
        })
    }
}

fn transcription_from_text(sanitized: &str) -> String {
    sanitized.replace('_', " ")
}

/// Drop the `NNN_` prefix and the extension, turn underscores back into spaces.
pub fn transcription_from_file_name(name: &str) -> Result<String, ManifestError> {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    match stem.split_once('_') {
        Some((number, text)) if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) => {
            Ok(transcription_from_text(text))
        }
        _ => Err(ManifestError::NotAClip(name.to_string())),
    }
}

/// Every referenced audio file must exist and be non-empty before hand-off.
pub fn verify_handoff<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<(), ManifestError> {
    for path in paths {
        let ok = std::fs::metadata(path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false);
        if !ok {
            return Err(ManifestError::MissingAudio(path.to_path_buf()));
        }
    }
    Ok(())
}
