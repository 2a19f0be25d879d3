use crate::domain::av::segments::{Clip, SegmentationSummary};
use crate::domain::content_id::ContentId;
use crate::error::PipelineError;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of one source video through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Downloading,
    Segmenting,
    Finalizing,
    Committed,
    Failed,
    /// Ledger already had the id; nothing was done.
    AlreadyProcessed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Downloading, Segmenting)
                | (Segmenting, Finalizing)
                | (Finalizing, Committed)
                | (Downloading, Failed)
                | (Segmenting, Failed)
                | (Finalizing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Committed | RunState::Failed | RunState::AlreadyProcessed
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Downloading => "downloading",
            RunState::Segmenting => "segmenting",
            RunState::Finalizing => "finalizing",
            RunState::Committed => "committed",
            RunState::Failed => "failed",
            RunState::AlreadyProcessed => "already-processed",
        };
        f.write_str(name)
    }
}

/// What one run did. Produced for every run that got past id extraction,
/// including failed ones.
#[derive(Debug)]
pub struct RunReport {
    pub content_id: ContentId,
    pub state: RunState,
    pub output_dir: PathBuf,
    pub summary: Option<SegmentationSummary>,
    /// Cue blocks dropped by the caption parser
    pub parse_warnings: usize,
    pub clips: Vec<Clip>,
    pub failure: Option<PipelineError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        matches!(self.state, RunState::Committed | RunState::AlreadyProcessed)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] -> {}",
            self.content_id,
            self.state,
            self.output_dir.display()
        )?;
        if let Some(summary) = &self.summary {
            write!(f, " ({} parse_warnings={})", summary, self.parse_warnings)?;
        }
        if let Some(failure) = &self.failure {
            write!(f, ": {}", failure)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::RunState::*;
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Downloading.can_transition_to(Segmenting));
        assert!(Segmenting.can_transition_to(Finalizing));
        assert!(Finalizing.can_transition_to(Committed));
    }

    #[test]
    fn test_failure_reachable_before_commit_only() {
        assert!(Downloading.can_transition_to(Failed));
        assert!(Segmenting.can_transition_to(Failed));
        assert!(Finalizing.can_transition_to(Failed));
        assert!(!Committed.can_transition_to(Failed));
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!Downloading.can_transition_to(Finalizing));
        assert!(!Downloading.can_transition_to(Committed));
        assert!(!Segmenting.can_transition_to(Committed));
        assert!(!Failed.can_transition_to(Downloading));
        assert!(!AlreadyProcessed.can_transition_to(Downloading));
    }

    #[test]
    fn test_terminal_states() {
        assert!(Committed.is_terminal());
        assert!(Failed.is_terminal());
        assert!(AlreadyProcessed.is_terminal());
        assert!(!Segmenting.is_terminal());
    }

    #[test]
    fn test_report_display_includes_parse_warnings() {
        let report = RunReport {
            content_id: ContentId::from_locator("watch?v=abc").unwrap(),
            state: Committed,
            output_dir: PathBuf::from("output/abc"),
            summary: Some(SegmentationSummary {
                attempted: 3,
                retained: 2,
                skipped_short: 1,
                ..SegmentationSummary::default()
            }),
            parse_warnings: 2,
            clips: Vec::new(),
            failure: None,
        };
        let line = report.to_string();
        assert!(line.starts_with("abc [committed] -> output/abc"));
        assert!(line.contains("retained=2"));
        assert!(line.contains("parse_warnings=2"));
    }
}
