use crate::domain::content_id::ContentId;
use crate::error::BoxError;
use crate::ports::ledger::ProcessedLedger;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Ledger kept in memory, for dry runs. Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    entries: Arc<Mutex<Vec<ContentId>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = ContentId>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries.into_iter().collect())),
        }
    }

    pub fn entries(&self) -> Vec<ContentId> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ProcessedLedger for InMemoryLedger {
    async fn contains(&self, id: &ContentId) -> Result<bool, BoxError> {
        Ok(self.entries().contains(id))
    }

    async fn commit(&self, id: &ContentId) -> Result<(), BoxError> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(id.clone());
        Ok(())
    }
}
