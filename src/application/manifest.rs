//! Transcript manifest over every clip under the output root.

use crate::domain::av::segments::CLIP_EXTENSION;
use crate::domain::manifest::{verify_handoff, ManifestError, TranscriptRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const MANIFEST_SUFFIX: &str = "_transcripts.json";

/// Collect clip files below `output_root`, in path order.
pub fn collect_transcripts(output_root: &Path) -> Result<Vec<TranscriptRecord>, ManifestError> {
    let mut records = Vec::new();
    for entry in WalkDir::new(output_root).sort_by_file_name() {
        let entry = entry.map_err(|e| ManifestError::Io {
            path: e.path().unwrap_or(output_root).to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(CLIP_EXTENSION)
        {
            continue;
        }
        match TranscriptRecord::from_clip_path(path) {
            Ok(record) => records.push(record),
            Err(ManifestError::NotAClip(name)) => debug!(name, "Skipping non-clip file"),
            Err(e) => return Err(e),
        }
    }
    Ok(records)
}

/// One past the highest `NNNNNNN_transcripts.json` already in `manifest_dir`.
pub fn next_manifest_path(manifest_dir: &Path) -> Result<PathBuf, ManifestError> {
    let entries = match std::fs::read_dir(manifest_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(manifest_dir.join(manifest_name(1)))
        }
        Err(source) => {
            return Err(ManifestError::Io {
                path: manifest_dir.to_path_buf(),
                source,
            })
        }
    };

    let highest = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| name.strip_suffix(MANIFEST_SUFFIX)?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    Ok(manifest_dir.join(manifest_name(highest + 1)))
}

fn manifest_name(number: u64) -> String {
    format!("{:07}{}", number, MANIFEST_SUFFIX)
}

/// Write the transcript manifest and return its path.
pub fn write_transcript_manifest(
    output_root: &Path,
    manifest_dir: &Path,
) -> Result<PathBuf, ManifestError> {
    let records = collect_transcripts(output_root)?;
    verify_handoff(records.iter().map(|r| r.audio_file.as_path()))?;

    std::fs::create_dir_all(manifest_dir).map_err(|source| ManifestError::Io {
        path: manifest_dir.to_path_buf(),
        source,
    })?;
    let path = next_manifest_path(manifest_dir)?;
    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(&path, json).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), records = records.len(), "Transcript manifest written");
    Ok(path)
}
