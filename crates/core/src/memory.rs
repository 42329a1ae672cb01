//! Memory trait: durable conversation memories with similarity search.
//!
//! Memories are short texts (chat turns, end-of-session summaries) stored per
//! [`MemoryScope`]. Backends support two reads:
//! - `search_similar`: vector similarity against the query text
//! - `recent`: plain recency, newest first, no ranking
//!
//! Semantic recall uses the first and degrades to the second.

use crate::error::MemoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespace a memory belongs to: the application plus the owning
/// conversation (a wedding, in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryScope {
    pub app_name: String,
    pub owner_id: String,
}

impl MemoryScope {
    pub fn new(app_name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            owner_id: owner_id.into(),
        }
    }
}

/// What kind of text a memory holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// A single conversation turn or note.
    #[default]
    Turn,
    /// A compressed summary written when a session ends.
    SessionFinalSummary,
}

/// A single memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique ID for this memory
    pub id: String,

    /// Owning scope
    pub scope: MemoryScope,

    /// The text of the memory
    pub text: String,

    /// Who produced the text ("user", "assistant", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default)]
    pub kind: MemoryKind,

    /// Chat session the memory was taken from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// When this memory was created
    pub created_at: DateTime<Utc>,

    /// Relevance score (set by similarity search)
    #[serde(default)]
    pub score: f32,

    /// Optional embedding vector (stored as blob in DB)
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryEntry {
    /// A new turn memory with a blank id (backends assign one on store).
    pub fn new(scope: MemoryScope, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            scope,
            text: text.into(),
            author: None,
            kind: MemoryKind::Turn,
            session_id: None,
            created_at,
            score: 0.0,
            embedding: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_kind(mut self, kind: MemoryKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Turns text into a fixed-dimension vector.
pub trait Embedder: Send + Sync {
    /// Output dimension.
    fn dimension(&self) -> usize;

    /// Embed one text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}

/// The core MemoryBackend trait.
///
/// Implementations: SQLite, in-memory (for testing), none (no-op).
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory", "none").
    fn name(&self) -> &str;

    /// Store a new memory entry, returning its id.
    async fn store(&self, entry: MemoryEntry) -> Result<String, MemoryError>;

    /// Up to `limit` entries of `scope` ranked by similarity to `query`,
    /// most similar first.
    async fn search_similar(
        &self,
        scope: &MemoryScope,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError>;

    /// Up to `limit` entries of `scope`, newest first.
    async fn recent(
        &self,
        scope: &MemoryScope,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError>;

    /// Up to `limit` entries of `scope` with the given `kind`, newest first.
    ///
    /// The default scans every entry of the scope through [`Self::recent`];
    /// backends that can filter at the source should override it.
    async fn recent_by_kind(
        &self,
        scope: &MemoryScope,
        kind: MemoryKind,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        let total = self.count(scope).await?;
        let mut entries = self.recent(scope, total).await?;
        entries.retain(|e| e.kind == kind);
        entries.truncate(limit);
        Ok(entries)
    }

    /// Number of entries stored for `scope`.
    async fn count(&self, scope: &MemoryScope) -> Result<usize, MemoryError>;
}
