//! No-op memory backend: disables persistent memory entirely.

use async_trait::async_trait;
use sanskara_core::error::MemoryError;
use sanskara_core::memory::{MemoryBackend, MemoryEntry, MemoryScope};

/// A no-op memory backend that stores nothing.
///
/// Recall over it always ends on the empty path.
pub struct NoopMemory;

#[async_trait]
impl MemoryBackend for NoopMemory {
    fn name(&self) -> &str {
        "none"
    }

    async fn store(&self, _entry: MemoryEntry) -> Result<String, MemoryError> {
        Ok(String::new())
    }

    async fn search_similar(
        &self,
        _scope: &MemoryScope,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }

    async fn recent(
        &self,
        _scope: &MemoryScope,
        _limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }

    async fn count(&self, _scope: &MemoryScope) -> Result<usize, MemoryError> {
        Ok(0)
    }
}
