use crate::error::PipelineError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};
use std::sync::OnceLock;

/// Stable identifier of one source video. Doubles as ledger key and as the
/// name of the per-video output folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

fn query_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[?&#;])v=([^&#]+)").expect("valid regex"))
}

fn short_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"youtu\.be/([^?&#/]+)").expect("valid regex"))
}

impl ContentId {
    /// Extract the id from a locator such as `https://www.youtube.com/watch?v=abc&t=3`.
    pub fn from_locator(locator: &str) -> Result<ContentId, PipelineError> {
        let locator = locator.trim();
        let captured = query_param_re()
            .captures(locator)
            .or_else(|| short_link_re().captures(locator))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());

        match captured {
            Some(id) if is_single_component(id) => Ok(ContentId(id.to_string())),
            _ => Err(PipelineError::MissingIdentifier(locator.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// The id names a directory under the output root, so it must not escape it.
fn is_single_component(id: &str) -> bool {
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !id.contains(['/', '\\'])
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
