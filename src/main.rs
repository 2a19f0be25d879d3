//! subsplit binary
//!
//! Cuts source videos into one mp3 clip per caption cue and records finished
//! videos in the ledger. See `subsplit --help`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use subsplit::adapters::local::{FileLedger, LocalFiles, YtDlpSource};
use subsplit::adapters::InMemoryLedger;
use subsplit::application::manifest::write_transcript_manifest;
use subsplit::application::{PipelineOptions, PipelineService};
use subsplit::config::PipelineConfig;
use subsplit::domain::av::cmd::FfmpegRunner;
use subsplit::ports::ledger::ProcessedLedger;
use subsplit::ports::media::MediaSource;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "subsplit", version, about = "Subtitle-aligned audio segmentation")]
struct Cli {
    /// Root directory for per-video clip folders (overrides OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Ledger file of processed video ids (overrides LEDGER_PATH)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download, segment and commit one or more videos
    Run(RunArgs),
    /// Write a transcript manifest over every clip in the output directory
    Manifest {
        /// Directory for numbered manifests (overrides MANIFEST_DIR)
        #[arg(long)]
        manifest_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Video locators, e.g. https://www.youtube.com/watch?v=<id>
    locators: Vec<String>,

    /// File with one locator per line; blank lines and `#` comments are ignored
    #[arg(long)]
    batch: Option<PathBuf>,

    /// Use this audio file instead of downloading
    #[arg(long, requires = "captions")]
    audio: Option<PathBuf>,

    /// Use this WebVTT file instead of downloading
    #[arg(long, requires = "audio")]
    captions: Option<PathBuf>,

    /// Keep the ledger in memory; nothing is committed to disk
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let mut config = PipelineConfig::from_env();
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(ledger) = cli.ledger {
        config.ledger_path = ledger;
    }

    match cli.command {
        Commands::Run(args) => {
            let mut locators = args.locators;
            if let Some(batch) = &args.batch {
                locators.extend(read_batch(batch).await?);
            }
            if locators.is_empty() {
                bail!("no locators given");
            }
            if args.audio.is_some() && locators.len() > 1 {
                bail!("--audio/--captions take exactly one locator");
            }

            match (args.audio, args.captions) {
                (Some(audio), Some(captions)) => {
                    with_ledger(LocalFiles::new(audio, captions), &config, args.dry_run, &locators)
                        .await
                }
                _ => {
                    let source = YtDlpSource::new(&config.ytdlp_bin, &config.subtitle_lang)
                        .with_cookies(config.youtube_cookies.clone());
                    with_ledger(source, &config, args.dry_run, &locators).await
                }
            }
        }
        Commands::Manifest { manifest_dir } => {
            let manifest_dir = manifest_dir.unwrap_or_else(|| config.manifest_dir.clone());
            let output_dir = config.output_dir.clone();
            let path = tokio::task::spawn_blocking(move || {
                write_transcript_manifest(&output_dir, &manifest_dir)
            })
            .await??;
            println!("{}", path.display());
            Ok(true)
        }
    }
}

async fn with_ledger<M: MediaSource>(
    source: M,
    config: &PipelineConfig,
    dry_run: bool,
    locators: &[String],
) -> Result<bool> {
    if dry_run {
        info!("Dry run: ledger kept in memory");
        process_all(source, InMemoryLedger::new(), config, locators).await
    } else {
        process_all(source, FileLedger::new(&config.ledger_path), config, locators).await
    }
}

/// Process locators in order. Returns whether every run succeeded.
async fn process_all<M, L>(
    source: M,
    ledger: L,
    config: &PipelineConfig,
    locators: &[String],
) -> Result<bool>
where
    M: MediaSource,
    L: ProcessedLedger,
{
    let runner = FfmpegRunner::new(&config.ffmpeg_bin, &config.ffprobe_bin);
    let service = PipelineService::new(source, ledger, runner, PipelineOptions::from(config));

    let mut all_ok = true;
    for locator in locators {
        tokio::select! {
            result = service.process(locator) => match result {
                Ok(report) => {
                    println!("{}", report);
                    all_ok &= report.is_success();
                }
                Err(e) => {
                    warn!(locator = %locator, "{}", e);
                    all_ok = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                warn!(locator = %locator, "Interrupted; run not committed");
                return Ok(false);
            }
        }
    }
    Ok(all_ok)
}

async fn read_batch(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading batch file {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}
