//! Audio probing and caption-aligned clip extraction.

pub mod audio;
pub mod cmd;
pub mod segments;
