//! Ephemeral artifact store.
//!
//! Holds uploaded binaries (images, PDFs) for the lifetime of the process,
//! indexed by the conversation that uploaded them. Nothing is persisted: a
//! restart empties the store.
//!
//! The id→record map and the conversation→ids index live behind one
//! [`tokio::sync::RwLock`], so an insert updates both atomically and every
//! read sees a consistent snapshot. Payloads are shared `Arc<[u8]>` so
//! `get_bytes` never copies under the lock.

use chrono::{DateTime, Utc};
use sanskara_core::message::ConversationKey;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Everything about an artifact except its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMetadata {
    pub artifact_id: String,
    pub conversation: ConversationKey,
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

struct StoredArtifact {
    metadata: ArtifactMetadata,
    /// Insertion sequence; breaks `created_at` ties.
    seq: u64,
    content: Arc<[u8]>,
}

#[derive(Default)]
struct Inner {
    artifacts: HashMap<String, StoredArtifact>,
    by_conversation: HashMap<ConversationKey, Vec<String>>,
    next_seq: u64,
}

impl Inner {
    /// Records for `key`, newest first.
    fn newest_first(&self, key: &ConversationKey) -> Vec<&StoredArtifact> {
        let mut records: Vec<&StoredArtifact> = self
            .by_conversation
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|id| self.artifacts.get(id))
            .collect();
        records.sort_by(|a, b| {
            b.metadata
                .created_at
                .cmp(&a.metadata.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        records
    }
}

/// In-process artifact store. Clone it freely; clones share storage.
#[derive(Clone, Default)]
pub struct ArtifactStore {
    inner: Arc<RwLock<Inner>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` under `conversation` and return its metadata.
    pub async fn add(
        &self,
        conversation: &ConversationKey,
        filename: impl Into<String>,
        content: impl Into<Arc<[u8]>>,
        mime_type: impl Into<String>,
        caption: Option<String>,
    ) -> ArtifactMetadata {
        let content: Arc<[u8]> = content.into();
        let metadata = ArtifactMetadata {
            artifact_id: Uuid::new_v4().to_string(),
            conversation: conversation.clone(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            size: content.len(),
            caption,
            created_at: Utc::now(),
        };

        {
            let mut inner = self.inner.write().await;
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner
                .by_conversation
                .entry(conversation.clone())
                .or_default()
                .push(metadata.artifact_id.clone());
            inner.artifacts.insert(
                metadata.artifact_id.clone(),
                StoredArtifact {
                    metadata: metadata.clone(),
                    seq,
                    content,
                },
            );
        }

        info!(
            artifact_id = %metadata.artifact_id,
            filename = %metadata.filename,
            size = metadata.size,
            conversation = %conversation,
            "Stored artifact"
        );
        metadata
    }

    /// Up to `limit` artifacts of `conversation`, newest first.
    pub async fn list_recent(
        &self,
        conversation: &ConversationKey,
        limit: usize,
    ) -> Vec<ArtifactMetadata> {
        let inner = self.inner.read().await;
        inner
            .newest_first(conversation)
            .into_iter()
            .take(limit)
            .map(|a| a.metadata.clone())
            .collect()
    }

    /// Raw payload by id, from any conversation. `None` if unknown.
    pub async fn get_bytes(&self, artifact_id: &str) -> Option<Arc<[u8]>> {
        self.inner
            .read()
            .await
            .artifacts
            .get(artifact_id)
            .map(|a| Arc::clone(&a.content))
    }

    /// Artifacts of `conversation` whose filename is in `filenames`, newest
    /// first.
    pub async fn find_by_filenames(
        &self,
        conversation: &ConversationKey,
        filenames: &[&str],
    ) -> Vec<ArtifactMetadata> {
        let inner = self.inner.read().await;
        inner
            .newest_first(conversation)
            .into_iter()
            .filter(|a| filenames.contains(&a.metadata.filename.as_str()))
            .map(|a| a.metadata.clone())
            .collect()
    }

    /// Session of the most recent upload by `user_id` in `app_name`.
    pub async fn latest_session(&self, app_name: &str, user_id: &str) -> Option<String> {
        let inner = self.inner.read().await;
        inner
            .artifacts
            .values()
            .filter(|a| {
                a.metadata.conversation.app_name == app_name
                    && a.metadata.conversation.user_id == user_id
            })
            .max_by(|a, b| {
                a.metadata
                    .created_at
                    .cmp(&b.metadata.created_at)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|a| a.metadata.conversation.session_id.clone())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.artifacts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
