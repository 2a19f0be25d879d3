//! Domain layer - Pure business logic.

pub mod av;
pub mod captions;
pub mod content_id;
pub mod manifest;
pub mod run;
pub mod sanitize;
