pub mod assemble;
pub mod config_cmd;
pub mod memory;

use anyhow::Context;
use sanskara_config::AppConfig;
use sanskara_core::memory::MemoryBackend;
use sanskara_memory::{
    HashingEmbedder, InMemoryBackend, NoopMemory, RecallOptions, SemanticRecall, SqliteBackend,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Open the memory backend named in `[memory]`.
pub(crate) async fn open_backend(config: &AppConfig) -> anyhow::Result<Arc<dyn MemoryBackend>> {
    let embedder = Arc::new(HashingEmbedder::new(config.memory.embedding_dim));
    let backend: Arc<dyn MemoryBackend> = match config.memory.backend.as_str() {
        "sqlite" => {
            let path = config.memory_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let backend = SqliteBackend::new(&path.to_string_lossy())
                .await?
                .with_embedder(embedder);
            Arc::new(backend)
        }
        "in_memory" => Arc::new(InMemoryBackend::with_embedder(embedder)),
        "none" => Arc::new(NoopMemory),
        other => anyhow::bail!("Unknown memory backend '{other}'"),
    };
    debug!(backend = backend.name(), "Memory backend ready");
    Ok(backend)
}

pub(crate) fn recall_options(config: &AppConfig) -> RecallOptions {
    RecallOptions {
        disabled: config.recall.disabled,
        timeout: Duration::from_millis(config.recall.timeout_ms),
        max_fact_chars: config.recall.max_fact_chars,
        summaries_only: config.recall.summaries_only,
    }
}

pub(crate) fn semantic_recall(config: &AppConfig, backend: Arc<dyn MemoryBackend>) -> SemanticRecall {
    SemanticRecall::new(backend, &config.app_name).with_options(recall_options(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_options_follow_config() {
        let mut config = AppConfig::default();
        config.recall.disabled = true;
        config.recall.timeout_ms = 750;
        let options = recall_options(&config);
        assert!(options.disabled);
        assert_eq!(options.timeout, Duration::from_millis(750));
        assert_eq!(options.max_fact_chars, 220);
    }

    #[tokio::test]
    async fn sqlite_backend_opens_under_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.memory.path = dir.path().join("nested/memories.db").display().to_string();

        let backend = open_backend(&config).await.unwrap();
        assert_eq!(backend.name(), "sqlite");
        assert!(dir.path().join("nested/memories.db").exists());
    }

    #[tokio::test]
    async fn unknown_backend_is_rejected() {
        let mut config = AppConfig::default();
        config.memory.backend = "redis".into();
        assert!(open_backend(&config).await.is_err());
    }
}
