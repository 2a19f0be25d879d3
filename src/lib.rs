//! subsplit - Subtitle-aligned audio segmentation
//!
//! Turns a captioned video into one mp3 clip per caption cue, named after the
//! cue text, and records every fully processed video in a ledger so reruns
//! skip it.
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (content ids, captions, av, sanitizing, manifests)
//! - ports/: Trait definitions (ledger, media source)
//! - adapters/: Concrete implementations (ledger file, yt-dlp, local files, in-memory)
//! - application/: Generic services (pipeline run, transcript manifest)
//! - config: Environment configuration
//! - error: Run-level errors

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use config::PipelineConfig;
pub use error::PipelineError;
