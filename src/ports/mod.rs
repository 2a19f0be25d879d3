//! Ports - Trait definitions implemented by adapters.

pub mod ledger;
pub mod media;
