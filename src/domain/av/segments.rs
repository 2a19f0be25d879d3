//! Caption-aligned segmentation.
//!
//! Planning is a pure function of the audio duration and the cue list, so a
//! rerun over the same inputs produces the same file names. Execution cuts
//! each planned range with ffmpeg, one clip at a time and in plan order.

use super::audio::AudioTrack;
use super::cmd::{ClipRange, MediaToolRunner};
use crate::domain::captions::Cue;
use crate::domain::sanitize::{sanitize, truncate_component};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CLIP_EXTENSION: &str = "mp3";
const MAX_TEXT_BYTES: usize = 200;

/// One written audio segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    /// 1-based position among retained cues
    pub sequence: usize,
    pub source_cue_index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub sanitized_text: String,
    pub output_path: PathBuf,
}

impl Clip {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// A cue that survived clamping and filtering, with its final file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedClip {
    pub sequence: usize,
    pub cue_index: usize,
    pub range: ClipRange,
    pub sanitized_text: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationSummary {
    /// Cues handed to the engine
    pub attempted: usize,
    /// Clips written
    pub retained: usize,
    /// Cues rejected for inverted or out-of-range timing
    pub skipped_invalid: usize,
    /// Cues shorter than the minimum duration
    pub skipped_short: usize,
    /// Planned clips whose extraction or write failed
    pub failed: usize,
}

impl SegmentationSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_invalid + self.skipped_short
    }
}

impl fmt::Display for SegmentationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted={} retained={} skipped={} (invalid={}, short={}) failed={}",
            self.attempted,
            self.retained,
            self.skipped(),
            self.skipped_invalid,
            self.skipped_short,
            self.failed
        )
    }
}

#[derive(Debug, Default)]
pub struct Plan {
    pub clips: Vec<PlannedClip>,
    pub summary: SegmentationSummary,
}

/// Build the zero-padded clip file name, `001_kara_haber_var.mp3`.
pub fn clip_file_name(sequence: usize, sanitized_text: &str) -> String {
    format!("{:03}_{}.{}", sequence, sanitized_text, CLIP_EXTENSION)
}

/// Clamp, filter and number the cues. Cues are taken in the order given.
pub fn plan_clips(cues: &[Cue], audio_duration_ms: u64, min_duration_ms: u64) -> Plan {
    let mut plan = Plan::default();

    for cue in cues {
        plan.summary.attempted += 1;

        if cue.end_ms <= cue.start_ms || cue.start_ms >= audio_duration_ms {
            warn!(
                cue = cue.index,
                start_ms = cue.start_ms,
                end_ms = cue.end_ms,
                audio_duration_ms,
                "Skipping cue with invalid timing"
            );
            plan.summary.skipped_invalid += 1;
            continue;
        }

        let end_ms = cue.end_ms.min(audio_duration_ms);
        if end_ms - cue.start_ms < min_duration_ms {
            debug!(cue = cue.index, duration_ms = end_ms - cue.start_ms, "Dropping short cue");
            plan.summary.skipped_short += 1;
            continue;
        }

        let sequence = plan.clips.len() + 1;
        let sanitized_text = truncate_component(&sanitize(&cue.plain_text()), MAX_TEXT_BYTES);
        plan.clips.push(PlannedClip {
            sequence,
            cue_index: cue.index,
            range: ClipRange {
                start_ms: cue.start_ms,
                end_ms,
            },
            file_name: clip_file_name(sequence, &sanitized_text),
            sanitized_text,
        });
    }

    plan
}

/// Per-clip failure. Logged and counted, never fatal for the run.
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("clip {sequence}: ffmpeg could not be run: {source}")]
    Spawn {
        sequence: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("clip {sequence}: ffmpeg exited with {status}: {stderr}")]
    Encoder {
        sequence: usize,
        status: String,
        stderr: String,
    },

    #[error("clip {sequence}: output {path} missing or empty")]
    EmptyOutput { sequence: usize, path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct SegmentOptions {
    pub min_duration_ms: u64,
    pub bitrate: String,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            min_duration_ms: 500,
            bitrate: String::from("192k"),
        }
    }
}

/// Clips written by one run, in sequence order, and the counters.
#[derive(Debug, Default)]
pub struct Segmentation {
    pub clips: Vec<Clip>,
    pub summary: SegmentationSummary,
}

pub struct SegmentationEngine<R> {
    runner: R,
    options: SegmentOptions,
}

impl<R> SegmentationEngine<R>
where
    R: MediaToolRunner,
{
    pub fn new(runner: R, options: SegmentOptions) -> Self {
        Self { runner, options }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Cut `audio` into one clip per retained cue under `out_dir`.
    ///
    /// Only failing to create `out_dir` is an error; individual clips that fail
    /// are logged and counted in the summary.
    pub async fn segment(
        &self,
        audio: &AudioTrack,
        cues: &[Cue],
        out_dir: &Path,
    ) -> std::io::Result<Segmentation> {
        tokio::fs::create_dir_all(out_dir).await?;

        let plan = plan_clips(cues, audio.duration_ms, self.options.min_duration_ms);
        let mut result = Segmentation {
            clips: Vec::with_capacity(plan.clips.len()),
            summary: plan.summary,
        };

        for planned in plan.clips {
            let output_path = out_dir.join(&planned.file_name);
            match self.extract(audio, &planned, &output_path).await {
                Ok(()) => {
                    debug!(sequence = planned.sequence, path = %output_path.display(), "Clip written");
                    result.summary.retained += 1;
                    result.clips.push(Clip {
                        sequence: planned.sequence,
                        source_cue_index: planned.cue_index,
                        start_ms: planned.range.start_ms,
                        end_ms: planned.range.end_ms,
                        sanitized_text: planned.sanitized_text,
                        output_path,
                    });
                }
                Err(e) => {
                    warn!(cue = planned.cue_index, error = %e, "Clip extraction failed");
                    result.summary.failed += 1;
                }
            }
        }

        info!(out_dir = %out_dir.display(), "Segmentation finished: {}", result.summary);
        Ok(result)
    }

    async fn extract(
        &self,
        audio: &AudioTrack,
        planned: &PlannedClip,
        output_path: &Path,
    ) -> Result<(), SegmentError> {
        let sequence = planned.sequence;
        let output = self
            .runner
            .extract_clip(&audio.path, planned.range, &self.options.bitrate, output_path)
            .await
            .map_err(|source| SegmentError::Spawn { sequence, source })?;

        if !output.status.success() {
            return Err(SegmentError::Encoder {
                sequence,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let written = tokio::fs::metadata(output_path)
            .await
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if !written {
            return Err(SegmentError::EmptyOutput {
                sequence,
                path: output_path.to_path_buf(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::av::cmd::MockMediaToolRunner;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    fn cue(index: usize, start_ms: u64, end_ms: u64, text: &str) -> Cue {
        Cue {
            index,
            start_ms,
            end_ms,
            text: text.to_string(),
        }
    }

    fn track(duration_ms: u64) -> AudioTrack {
        AudioTrack {
            path: PathBuf::from("/tmp/fake_source_for_test.mp3"),
            duration_ms,
        }
    }

    fn create_mock_std_output(stderr: &str, success: bool) -> std::io::Result<Output> {
        Ok(Output {
            status: if success {
                ExitStatus::from_raw(0)
            } else {
                ExitStatus::from_raw(1 << 8)
            },
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        })
    }

    /// A runner that writes a few bytes where ffmpeg would write the clip.
    fn writing_runner() -> MockMediaToolRunner {
        let mut runner = MockMediaToolRunner::new();
        runner
            .expect_extract_clip()
            .returning(|_, _, _, output| {
                std::fs::write(output, b"ID3fake").unwrap();
                create_mock_std_output("", true)
            });
        runner
    }

    mod planning {
        use super::*;

        #[test]
        fn test_short_cue_yields_no_clip() {
            let cues = vec![cue(0, 1_000, 1_200, "a")];
            let plan = plan_clips(&cues, 60_000, 500);
            assert!(plan.clips.is_empty());
            assert_eq!(plan.summary.skipped_short, 1);
            assert_eq!(plan.summary.attempted, 1);
        }

        #[test]
        fn test_single_cue_named_from_text() {
            let cues = vec![cue(0, 0, 2_000, "kara haber var")];
            let plan = plan_clips(&cues, 60_000, 500);
            assert_eq!(plan.clips.len(), 1);
            assert_eq!(plan.clips[0].file_name, "001_kara_haber_var.mp3");
            assert_eq!(plan.clips[0].range.duration_ms(), 2_000);
        }

        #[test]
        fn test_sequence_counts_retained_cues_only() {
            let cues = vec![
                cue(0, 0, 100, "kısa"),
                cue(3, 1_000, 2_000, "bir"),
                cue(4, 2_000, 2_100, "kısa"),
                cue(9, 3_000, 4_000, "iki"),
                cue(12, 5_000, 6_000, "üç"),
            ];
            let plan = plan_clips(&cues, 60_000, 500);

            let sequences: Vec<usize> = plan.clips.iter().map(|c| c.sequence).collect();
            assert_eq!(sequences, vec![1, 2, 3]);
            let names: Vec<&str> = plan.clips.iter().map(|c| c.file_name.as_str()).collect();
            assert_eq!(names, vec!["001_bir.mp3", "002_iki.mp3", "003_üç.mp3"]);
            assert_eq!(plan.clips[1].cue_index, 9);
        }

        #[test]
        fn test_identical_text_never_collides() {
            let cues = vec![
                cue(0, 0, 1_000, "evet"),
                cue(1, 1_000, 2_000, "evet"),
                cue(2, 2_000, 3_000, "evet?"),
            ];
            let plan = plan_clips(&cues, 60_000, 500);
            let mut names: Vec<&str> = plan.clips.iter().map(|c| c.file_name.as_str()).collect();
            names.dedup();
            assert_eq!(names.len(), 3);
        }

        #[test]
        fn test_inverted_and_zero_length_cues_are_invalid() {
            let cues = vec![
                cue(0, 5_000, 4_000, "ters"),
                cue(1, 5_000, 5_000, "sıfır"),
                cue(2, 6_000, 7_000, "iyi"),
            ];
            let plan = plan_clips(&cues, 60_000, 500);
            assert_eq!(plan.clips.len(), 1);
            assert_eq!(plan.clips[0].sequence, 1);
            assert_eq!(plan.summary.skipped_invalid, 2);
        }

        #[test]
        fn test_end_overshoot_is_clamped() {
            let cues = vec![cue(0, 9_000, 12_000, "son")];
            let plan = plan_clips(&cues, 10_000, 500);
            assert_eq!(
                plan.clips[0].range,
                ClipRange {
                    start_ms: 9_000,
                    end_ms: 10_000
                }
            );
        }

        #[test]
        fn test_clamped_cue_still_filtered_by_length() {
            let cues = vec![cue(0, 9_800, 12_000, "son")];
            let plan = plan_clips(&cues, 10_000, 500);
            assert!(plan.clips.is_empty());
            assert_eq!(plan.summary.skipped_short, 1);
        }

        #[test]
        fn test_start_past_audio_is_invalid() {
            let cues = vec![cue(0, 10_000, 11_000, "sonra"), cue(1, 12_000, 13_000, "daha")];
            let plan = plan_clips(&cues, 10_000, 500);
            assert!(plan.clips.is_empty());
            assert_eq!(plan.summary.skipped_invalid, 2);
        }

        #[test]
        fn test_markup_and_empty_text_in_names() {
            let cues = vec![
                cue(0, 0, 1_000, "<c>merhaba</c><00:00:00.400><c> dünya</c>"),
                cue(1, 1_000, 2_000, "???"),
            ];
            let plan = plan_clips(&cues, 60_000, 500);
            assert_eq!(plan.clips[0].file_name, "001_merhaba_dünya.mp3");
            assert_eq!(plan.clips[1].file_name, "002_untitled.mp3");
        }

        #[test]
        fn test_threshold_is_configurable() {
            let cues = vec![cue(0, 0, 300, "kısa ama yeterli")];
            assert!(plan_clips(&cues, 60_000, 500).clips.is_empty());
            assert_eq!(plan_clips(&cues, 60_000, 250).clips.len(), 1);
        }

        #[test]
        fn test_planning_is_deterministic() {
            let cues = vec![cue(0, 0, 1_000, "bir"), cue(1, 1_000, 1_100, "x"), cue(2, 2_000, 4_000, "iki")];
            let first = plan_clips(&cues, 60_000, 500);
            let second = plan_clips(&cues, 60_000, 500);
            assert_eq!(first.clips, second.clips);
        }

        #[test]
        fn test_long_text_is_capped() {
            let long = "kelime ".repeat(100);
            let plan = plan_clips(&[cue(0, 0, 1_000, &long)], 60_000, 500);
            assert!(plan.clips[0].sanitized_text.len() <= MAX_TEXT_BYTES);
            assert!(!plan.clips[0].sanitized_text.ends_with('_'));
        }
    }

    mod execution {
        use super::*;

        #[tokio::test]
        async fn test_writes_clip_per_retained_cue() {
            let dir = tempfile::tempdir().unwrap();
            let out_dir = dir.path().join("output").join("abc");
            let engine = SegmentationEngine::new(writing_runner(), SegmentOptions::default());
            let cues = vec![
                cue(0, 1_000, 1_200, "a"),
                cue(1, 0, 2_000, "kara haber var"),
                cue(2, 3_000, 2_000, "ters"),
                cue(3, 4_000, 6_000, "ikinci"),
            ];

            let result = engine.segment(&track(60_000), &cues, &out_dir).await.unwrap();

            assert_eq!(result.clips.len(), 2);
            assert_eq!(result.clips[0].output_path, out_dir.join("001_kara_haber_var.mp3"));
            assert_eq!(result.clips[0].duration_ms(), 2_000);
            assert_eq!(result.clips[1].output_path, out_dir.join("002_ikinci.mp3"));
            assert!(result.clips.iter().all(|c| c.output_path.exists()));
            assert_eq!(
                result.summary,
                SegmentationSummary {
                    attempted: 4,
                    retained: 2,
                    skipped_invalid: 1,
                    skipped_short: 1,
                    failed: 0,
                }
            );
        }

        #[tokio::test]
        async fn test_passes_exact_range_and_bitrate() {
            let dir = tempfile::tempdir().unwrap();
            let mut runner = MockMediaToolRunner::new();
            runner
                .expect_extract_clip()
                .withf(|source, range, bitrate, output| {
                    source == Path::new("/tmp/fake_source_for_test.mp3")
                        && *range
                            == ClipRange {
                                start_ms: 9_000,
                                end_ms: 10_000,
                            }
                        && bitrate == "128k"
                        && output.ends_with("001_son.mp3")
                })
                .times(1)
                .returning(|_, _, _, output| {
                    std::fs::write(output, b"ID3").unwrap();
                    create_mock_std_output("", true)
                });
            let options = SegmentOptions {
                min_duration_ms: 500,
                bitrate: "128k".to_string(),
            };
            let engine = SegmentationEngine::new(runner, options);

            let result = engine
                .segment(&track(10_000), &[cue(0, 9_000, 15_000, "son")], dir.path())
                .await
                .unwrap();
            assert_eq!(result.clips[0].end_ms, 10_000);
        }

        #[tokio::test]
        async fn test_failed_clip_is_counted_and_run_continues() {
            let dir = tempfile::tempdir().unwrap();
            let mut runner = MockMediaToolRunner::new();
            runner
                .expect_extract_clip()
                .withf(|_, range, _, _| range.start_ms == 1_000)
                .times(1)
                .returning(|_, _, _, _| create_mock_std_output("Conversion failed!", false));
            runner
                .expect_extract_clip()
                .withf(|_, range, _, _| range.start_ms == 3_000)
                .times(1)
                .returning(|_, _, _, _| {
                    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "ffmpeg not found"))
                });
            runner
                .expect_extract_clip()
                .withf(|_, range, _, _| range.start_ms != 1_000 && range.start_ms != 3_000)
                .times(2)
                .returning(|_, _, _, output| {
                    std::fs::write(output, b"ID3").unwrap();
                    create_mock_std_output("", true)
                });
            let engine = SegmentationEngine::new(runner, SegmentOptions::default());
            let cues = vec![
                cue(0, 0, 1_000, "bir"),
                cue(1, 1_000, 2_000, "iki"),
                cue(2, 3_000, 4_000, "üç"),
                cue(3, 5_000, 6_000, "dört"),
            ];

            let result = engine.segment(&track(60_000), &cues, dir.path()).await.unwrap();

            assert_eq!(result.summary.failed, 2);
            assert_eq!(result.summary.retained, 2);
            let sequences: Vec<usize> = result.clips.iter().map(|c| c.sequence).collect();
            assert_eq!(sequences, vec![1, 4]);
            assert!(dir.path().join("004_dört.mp3").exists());
        }

        #[tokio::test]
        async fn test_empty_output_counts_as_failure() {
            let dir = tempfile::tempdir().unwrap();
            let mut runner = MockMediaToolRunner::new();
            runner
                .expect_extract_clip()
                .times(1)
                .returning(|_, _, _, output| {
                    std::fs::write(output, b"").unwrap();
                    create_mock_std_output("", true)
                });
            let engine = SegmentationEngine::new(runner, SegmentOptions::default());

            let result = engine
                .segment(&track(60_000), &[cue(0, 0, 1_000, "boş")], dir.path())
                .await
                .unwrap();
            assert!(result.clips.is_empty());
            assert_eq!(result.summary.failed, 1);
        }

        #[tokio::test]
        async fn test_no_retained_cues_gives_empty_folder() {
            let dir = tempfile::tempdir().unwrap();
            let out_dir = dir.path().join("empty");
            let mut runner = MockMediaToolRunner::new();
            runner.expect_extract_clip().times(0);
            let engine = SegmentationEngine::new(runner, SegmentOptions::default());

            let result = engine
                .segment(&track(60_000), &[cue(0, 0, 100, "a")], &out_dir)
                .await
                .unwrap();
            assert!(result.clips.is_empty());
            assert!(out_dir.is_dir());
            assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
        }

        #[tokio::test]
        async fn test_rerun_overwrites_with_same_names() {
            let dir = tempfile::tempdir().unwrap();
            let engine = SegmentationEngine::new(writing_runner(), SegmentOptions::default());
            let cues = vec![cue(0, 0, 1_000, "bir"), cue(1, 1_000, 2_000, "iki")];

            let first = engine.segment(&track(60_000), &cues, dir.path()).await.unwrap();
            let second = engine.segment(&track(60_000), &cues, dir.path()).await.unwrap();

            assert_eq!(first.clips, second.clips);
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        }

        #[tokio::test]
        async fn test_unwritable_output_dir_is_run_level_error() {
            let dir = tempfile::tempdir().unwrap();
            let blocker = dir.path().join("not_a_dir");
            std::fs::write(&blocker, b"file").unwrap();
            let mut runner = MockMediaToolRunner::new();
            runner.expect_extract_clip().times(0);
            let engine = SegmentationEngine::new(runner, SegmentOptions::default());

            let result = engine
                .segment(&track(60_000), &[cue(0, 0, 1_000, "bir")], &blocker.join("abc"))
                .await;
            assert!(result.is_err());
        }
    }
}
