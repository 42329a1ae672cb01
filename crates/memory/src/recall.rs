//! Semantic recall with a recency fallback.
//!
//! Recall is a two-step protocol over any [`MemoryBackend`]:
//!
//! 1. Similarity search, bounded by a timeout.
//! 2. If that errors, times out, or yields no usable fact: the most recent
//!    memories of the scope, unranked. With `summaries_only` the backend
//!    is asked for summaries directly, however many turns came after them.
//!
//! Both steps produce the same [`SemanticMemory`] shape. Which one served
//! the result is carried by [`RecallOutcome`] so callers can record it;
//! backend failures themselves never reach the caller. The only error is
//! [`RecallError::InvalidInput`], raised before any backend call.

use sanskara_core::context::{MemorySource, RecallPath, SemanticMemory};
use sanskara_core::error::{MemoryError, RecallError};
use sanskara_core::memory::{MemoryBackend, MemoryEntry, MemoryKind, MemoryScope};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Over-fetch factor for similarity search when only summaries are wanted,
/// since ranking is over all kinds and filtering happens after the limit.
const SUMMARY_OVERFETCH: usize = 4;

/// Knobs for [`SemanticRecall`].
#[derive(Debug, Clone)]
pub struct RecallOptions {
    /// Return nothing without touching the backend.
    pub disabled: bool,
    /// Bound on each backend call.
    pub timeout: Duration,
    /// Facts longer than this are cut and end with `…`.
    pub max_fact_chars: usize,
    /// Keep only session summaries.
    pub summaries_only: bool,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            disabled: false,
            timeout: Duration::from_secs(3),
            max_fact_chars: 220,
            summaries_only: false,
        }
    }
}

/// Which path served a recall.
#[derive(Debug, Clone, PartialEq)]
pub enum RecallOutcome {
    /// Similarity search succeeded with at least one fact.
    Vector(SemanticMemory),
    /// Similarity search failed or came back empty; these are the most
    /// recent memories instead.
    Fallback(SemanticMemory),
    /// Disabled, or nothing stored.
    Empty,
}

impl RecallOutcome {
    pub fn path(&self) -> RecallPath {
        match self {
            Self::Vector(_) => RecallPath::Vector,
            Self::Fallback(_) => RecallPath::Fallback,
            Self::Empty => RecallPath::Empty,
        }
    }

    pub fn into_memory(self) -> SemanticMemory {
        match self {
            Self::Vector(memory) | Self::Fallback(memory) => memory,
            Self::Empty => SemanticMemory::new(),
        }
    }
}

/// The semantic memory index for one application namespace.
pub struct SemanticRecall {
    backend: Arc<dyn MemoryBackend>,
    app_name: String,
    options: RecallOptions,
}

impl SemanticRecall {
    pub fn new(backend: Arc<dyn MemoryBackend>, app_name: impl Into<String>) -> Self {
        Self {
            backend,
            app_name: app_name.into(),
            options: RecallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RecallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RecallOptions {
        &self.options
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Facts relevant to `query` from `conversation_id`'s memories, at most
    /// `top_k` of them. The path taken is dropped; see [`Self::recall`].
    pub async fn search_facts(
        &self,
        conversation_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<SemanticMemory, RecallError> {
        self.recall(conversation_id, query, top_k)
            .await
            .map(RecallOutcome::into_memory)
    }

    /// Run the recall protocol and report which path served it.
    pub async fn recall(
        &self,
        conversation_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<RecallOutcome, RecallError> {
        if self.options.disabled {
            debug!("Semantic recall disabled");
            return Ok(RecallOutcome::Empty);
        }
        if top_k == 0 {
            return Err(RecallError::InvalidInput("top_k must be at least 1".into()));
        }
        if query.trim().is_empty() {
            return Err(RecallError::InvalidInput("query must not be empty".into()));
        }
        if conversation_id.trim().is_empty() {
            return Err(RecallError::InvalidInput(
                "conversation id must not be empty".into(),
            ));
        }

        let scope = MemoryScope::new(&self.app_name, conversation_id);
        let fetch_limit = self.fetch_limit(top_k);

        match self
            .bounded(self.backend.search_similar(&scope, query, fetch_limit))
            .await
        {
            Ok(entries) => {
                let memory = self.collect(entries, top_k);
                if !memory.is_empty() {
                    debug!(
                        conversation = conversation_id,
                        facts = memory.len(),
                        "Semantic recall served by vector search"
                    );
                    return Ok(RecallOutcome::Vector(memory));
                }
                debug!(
                    conversation = conversation_id,
                    "Vector search returned no usable facts, using recency fallback"
                );
            }
            Err(e) => {
                warn!(
                    conversation = conversation_id,
                    backend = self.backend.name(),
                    error = %e,
                    "Vector search failed, using recency fallback"
                );
            }
        }

        let recent = if self.options.summaries_only {
            self.backend
                .recent_by_kind(&scope, MemoryKind::SessionFinalSummary, fetch_limit)
        } else {
            self.backend.recent(&scope, fetch_limit)
        };
        match self.bounded(recent).await {
            Ok(entries) => {
                let memory = self.collect(entries, top_k);
                if memory.is_empty() {
                    Ok(RecallOutcome::Empty)
                } else {
                    Ok(RecallOutcome::Fallback(memory))
                }
            }
            Err(e) => {
                warn!(
                    conversation = conversation_id,
                    backend = self.backend.name(),
                    error = %e,
                    "Recency fallback failed, returning no memories"
                );
                Ok(RecallOutcome::Empty)
            }
        }
    }

    fn fetch_limit(&self, top_k: usize) -> usize {
        if self.options.summaries_only {
            top_k.saturating_mul(SUMMARY_OVERFETCH)
        } else {
            top_k
        }
    }

    async fn bounded<F>(&self, fut: F) -> Result<Vec<MemoryEntry>, MemoryError>
    where
        F: Future<Output = Result<Vec<MemoryEntry>, MemoryError>>,
    {
        match tokio::time::timeout(self.options.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MemoryError::Timeout {
                timeout_ms: self.options.timeout.as_millis() as u64,
            }),
        }
    }

    /// Compact backend entries into facts, preserving their order.
    fn collect(&self, entries: Vec<MemoryEntry>, top_k: usize) -> SemanticMemory {
        let mut memory = SemanticMemory::new();
        for entry in entries {
            if memory.len() >= top_k {
                break;
            }
            if self.options.summaries_only && entry.kind != MemoryKind::SessionFinalSummary {
                continue;
            }
            let fact = compact(&entry.text, self.options.max_fact_chars);
            if fact.is_empty() {
                continue;
            }
            memory.push(
                fact,
                MemorySource {
                    content: entry.text,
                    created_at: entry.created_at,
                    author: entry.author,
                    session_id: entry.session_id,
                },
            );
        }
        memory
    }
}

/// Trim, flatten newlines, and cut to `max_chars` characters (the last one
/// being `…` when cut). A limit of 0 yields an empty string.
pub fn compact(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    let flat = text.trim().replace(['\r', '\n'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
