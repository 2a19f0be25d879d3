use crate::domain::av::audio::AudioTrack;
use crate::domain::av::cmd::MediaToolRunner;
use crate::domain::av::segments::{SegmentOptions, SegmentationEngine};
use crate::domain::captions::read_caption_track;
use crate::domain::content_id::ContentId;
use crate::domain::run::{RunReport, RunState};
use crate::error::PipelineError;
use crate::ports::ledger::ProcessedLedger;
use crate::ports::media::{DownloadedMedia, MediaSource};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Clips go to `<output_dir>/<ContentId>/`.
    pub output_dir: PathBuf,
    /// Where acquisition puts the whole-video audio and captions.
    pub work_dir: PathBuf,
    pub keep_failed_inputs: bool,
    pub commit_empty_runs: bool,
    pub segment: SegmentOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            work_dir: PathBuf::from("work"),
            keep_failed_inputs: true,
            commit_empty_runs: true,
            segment: SegmentOptions::default(),
        }
    }
}

/// Drives one source video from locator to committed clips.
///
/// The ledger is only written after every clip is on disk and the transient
/// inputs are gone, so a run that stops anywhere earlier is retried in full
/// next time.
pub struct PipelineService<M, L, R> {
    source: M,
    ledger: L,
    engine: SegmentationEngine<R>,
    options: PipelineOptions,
}

impl<M, L, R> PipelineService<M, L, R>
where
    M: MediaSource,
    L: ProcessedLedger,
    R: MediaToolRunner,
{
    pub fn new(source: M, ledger: L, runner: R, options: PipelineOptions) -> Self {
        Self {
            source,
            ledger,
            engine: SegmentationEngine::new(runner, options.segment.clone()),
            options,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Process one locator.
    ///
    /// Returns `Err` only when no id can be extracted; every other outcome,
    /// failures included, comes back as a report.
    pub async fn process(&self, locator: &str) -> Result<RunReport, PipelineError> {
        let content_id = ContentId::from_locator(locator)?;
        let mut report = RunReport {
            output_dir: self.options.output_dir.join(content_id.as_str()),
            content_id,
            state: RunState::Downloading,
            summary: None,
            parse_warnings: 0,
            clips: Vec::new(),
            failure: None,
        };

        match self.ledger.contains(&report.content_id).await {
            Ok(true) => {
                report.state = RunState::AlreadyProcessed;
                info!(content_id = %report.content_id, "Already processed, skipping");
                return Ok(report);
            }
            Ok(false) => {}
            Err(e) => {
                self.fail(&mut report, PipelineError::Ledger(e), None).await;
                return Ok(report);
            }
        }

        let mut media = None;
        match self.run_stages(locator, &mut report, &mut media).await {
            Ok(()) => info!("Run finished: {}", report),
            Err(e) => self.fail(&mut report, e, media.as_ref()).await,
        }
        Ok(report)
    }

    async fn run_stages(
        &self,
        locator: &str,
        report: &mut RunReport,
        fetched: &mut Option<DownloadedMedia>,
    ) -> Result<(), PipelineError> {
        let id = report.content_id.clone();
        info!(content_id = %id, locator, "Run started");

        let media = self
            .source
            .fetch(locator, &id, &self.options.work_dir)
            .await
            .map_err(|e| PipelineError::source_unavailable(&id, e))?;
        if let Some(title) = &media.title {
            info!(content_id = %id, title = %title, "Source acquired");
        }
        *fetched = Some(media.clone());

        advance(report, RunState::Segmenting);
        let audio = AudioTrack::probe(&media.audio_path, self.engine.runner())
            .await
            .map_err(|e| PipelineError::source_unavailable(&id, e))?;
        let track = read_caption_track(&media.caption_path)
            .await
            .map_err(|e| {
                PipelineError::source_unavailable(
                    &id,
                    format!("captions {}: {}", media.caption_path.display(), e),
                )
            })?;
        report.parse_warnings = track.warnings.len();
        if report.parse_warnings > 0 {
            warn!(content_id = %id, dropped = report.parse_warnings, "Malformed cues dropped while parsing captions");
        }
        debug!(
            content_id = %id,
            cues = track.cues.len(),
            duration_ms = audio.duration_ms,
            "Inputs ready"
        );

        let segmentation = self
            .engine
            .segment(&audio, &track.cues, &report.output_dir)
            .await
            .map_err(|source| PipelineError::OutputDirectory {
                path: report.output_dir.display().to_string(),
                source,
            })?;
        report.summary = Some(segmentation.summary);
        report.clips = segmentation.clips;

        if report.clips.is_empty() {
            if !self.options.commit_empty_runs {
                return Err(PipelineError::EmptyRun(id));
            }
            warn!(content_id = %id, "No clips retained, committing anyway");
        }

        advance(report, RunState::Finalizing);
        remove_inputs(&media)
            .await
            .map_err(|e| PipelineError::finalization(&id, e))?;
        self.ledger
            .commit(&id)
            .await
            .map_err(|e| PipelineError::finalization(&id, e))?;

        advance(report, RunState::Committed);
        Ok(())
    }

    async fn fail(
        &self,
        report: &mut RunReport,
        failure: PipelineError,
        media: Option<&DownloadedMedia>,
    ) {
        advance(report, RunState::Failed);
        report.failure = Some(failure);

        if let Some(media) = media {
            if self.options.keep_failed_inputs {
                info!(
                    audio = %media.audio_path.display(),
                    captions = %media.caption_path.display(),
                    "Keeping inputs of failed run"
                );
            } else if let Err(e) = remove_inputs(media).await {
                warn!(content_id = %report.content_id, error = %e, "Could not remove inputs of failed run");
            }
        }
        error!("Run failed: {}", report);
    }
}

/// Move the report to `next`. Illegal transitions are logged and leave the state as is.
fn advance(report: &mut RunReport, next: RunState) -> bool {
    if !report.state.can_transition_to(next) {
        error!(content_id = %report.content_id, from = %report.state, to = %next, "Illegal run transition rejected");
        return false;
    }
    debug!(content_id = %report.content_id, from = %report.state, to = %next, "Run transition");
    report.state = next;
    true
}

/// Delete the whole-video audio and caption files. Already-missing files are fine.
async fn remove_inputs(media: &DownloadedMedia) -> std::io::Result<()> {
    remove_if_present(&media.audio_path).await?;
    remove_if_present(&media.caption_path).await
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
