//! In-memory backend: useful for testing and ephemeral sessions.

use crate::embedding::HashingEmbedder;
use crate::vector;
use async_trait::async_trait;
use sanskara_core::error::MemoryError;
use sanskara_core::memory::{Embedder, MemoryBackend, MemoryEntry, MemoryKind, MemoryScope};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Minimum cosine score for a similarity hit. Zero-overlap texts score 0.
const DEFAULT_MIN_SCORE: f32 = 0.01;

/// An in-memory backend that stores memories in a Vec.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryBackend {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_embedder(Arc::new(HashingEmbedder::default()))
    }

    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            embedder,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Up to `limit` kept entries, newest first.
    async fn newest(&self, limit: usize, keep: impl Fn(&MemoryEntry) -> bool) -> Vec<MemoryEntry> {
        let entries = self.entries.read().await;
        let mut results: Vec<MemoryEntry> = entries.iter().filter(|&e| keep(e)).cloned().collect();
        // Reversed first so entries with equal timestamps come out last-stored first.
        results.reverse();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        results.truncate(limit);
        results
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn store(&self, mut entry: MemoryEntry) -> Result<String, MemoryError> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        if entry.embedding.is_none() {
            entry.embedding = Some(self.embedder.embed(&entry.text)?);
        }
        let id = entry.id.clone();
        self.entries.write().await.push(entry);
        Ok(id)
    }

    async fn search_similar(
        &self,
        scope: &MemoryScope,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        let query_embedding = self.embedder.embed(query)?;
        let entries = self.entries.read().await;
        Ok(vector::vector_search(
            entries.iter().filter(|e| &e.scope == scope),
            &query_embedding,
            limit,
            self.min_score,
        ))
    }

    async fn recent(
        &self,
        scope: &MemoryScope,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(self.newest(limit, |e| &e.scope == scope).await)
    }

    async fn recent_by_kind(
        &self,
        scope: &MemoryScope,
        kind: MemoryKind,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(self
            .newest(limit, |e| &e.scope == scope && e.kind == kind)
            .await)
    }

    async fn count(&self, scope: &MemoryScope) -> Result<usize, MemoryError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| &e.scope == scope)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn scope(owner: &str) -> MemoryScope {
        MemoryScope::new("SanskaraAI", owner)
    }

    fn entry(owner: &str, text: &str, minutes_ago: i64) -> MemoryEntry {
        MemoryEntry::new(scope(owner), text, Utc::now() - Duration::minutes(minutes_ago))
    }

    #[tokio::test]
    async fn store_assigns_id_and_embedding() {
        let mem = InMemoryBackend::new();
        let id = mem.store(entry("w1", "Caterer shortlisted", 0)).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(mem.count(&scope("w1")).await.unwrap(), 1);
        assert!(mem.entries.read().await[0].embedding.is_some());
    }

    #[tokio::test]
    async fn search_is_scoped_and_ranked() {
        let mem = InMemoryBackend::new();
        mem.store(entry("w1", "Photographer budget is two lakh", 5)).await.unwrap();
        mem.store(entry("w1", "Mehendi starts at noon", 4)).await.unwrap();
        mem.store(entry("w2", "Photographer budget for another couple", 3)).await.unwrap();

        let results = mem
            .search_similar(&scope("w1"), "photographer budget", 5)
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].text, "Photographer budget is two lakh");
        assert!(results.iter().all(|e| e.scope.owner_id == "w1"));
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let mem = InMemoryBackend::new();
        mem.store(entry("w1", "oldest", 30)).await.unwrap();
        mem.store(entry("w1", "newest", 1)).await.unwrap();
        mem.store(entry("w1", "middle", 10)).await.unwrap();

        let results = mem.recent(&scope("w1"), 2).await.unwrap();
        let texts: Vec<_> = results.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["newest", "middle"]);
    }

    #[tokio::test]
    async fn recent_by_kind_reaches_past_newer_turns() {
        let mem = InMemoryBackend::new();
        mem.store(entry("w1", "Session summary: venue booked", 60).with_kind(MemoryKind::SessionFinalSummary))
            .await
            .unwrap();
        for i in 0..10 {
            mem.store(entry("w1", &format!("turn {i}"), 50 - i)).await.unwrap();
        }

        let summaries = mem
            .recent_by_kind(&scope("w1"), MemoryKind::SessionFinalSummary, 1)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].text, "Session summary: venue booked");

        let turns = mem
            .recent_by_kind(&scope("w1"), MemoryKind::Turn, 3)
            .await
            .unwrap();
        let texts: Vec<_> = turns.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["turn 9", "turn 8", "turn 7"]);
    }

    #[tokio::test]
    async fn count_per_scope() {
        let mem = InMemoryBackend::new();
        mem.store(entry("w1", "a", 0)).await.unwrap();
        mem.store(entry("w2", "b", 0)).await.unwrap();
        assert_eq!(mem.count(&scope("w1")).await.unwrap(), 1);
        assert_eq!(mem.count(&scope("w3")).await.unwrap(), 0);
    }
}
