//! Application layer - Services composed from domain logic and ports.

pub mod manifest;
pub mod pipeline;

pub use pipeline::{PipelineOptions, PipelineService};
