//! `sanskara remember` / `sanskara recall`: Memory commands.

use chrono::Utc;
use sanskara_config::AppConfig;
use sanskara_core::context::SemanticMemory;
use sanskara_core::memory::{MemoryBackend, MemoryEntry, MemoryKind, MemoryScope};
use std::sync::Arc;

pub async fn remember(
    config: &AppConfig,
    owner: &str,
    text: &str,
    summary: bool,
    author: &str,
) -> anyhow::Result<()> {
    let backend = super::open_backend(config).await?;
    let id = store(backend.as_ref(), &config.app_name, owner, text, summary, author).await?;
    let total = backend.count(&MemoryScope::new(&config.app_name, owner)).await?;
    println!("Stored memory {id} ({total} for {owner} in {})", backend.name());
    Ok(())
}

pub async fn recall(
    config: &AppConfig,
    owner: &str,
    query: &str,
    top_k: Option<usize>,
) -> anyhow::Result<()> {
    let backend = super::open_backend(config).await?;
    let memory = search(config, backend, owner, query, top_k.unwrap_or(config.recall.top_k)).await?;

    if memory.is_empty() {
        println!("No memories found for {owner}.");
        return Ok(());
    }
    for (i, (fact, source)) in memory.iter().enumerate() {
        println!(
            "  {:>2}. {fact}  [{}{}]",
            i + 1,
            source.created_at.format("%Y-%m-%d %H:%M"),
            source
                .author
                .as_deref()
                .map(|a| format!(", {a}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

async fn store(
    backend: &dyn MemoryBackend,
    app_name: &str,
    owner: &str,
    text: &str,
    summary: bool,
    author: &str,
) -> anyhow::Result<String> {
    if text.trim().is_empty() {
        anyhow::bail!("Memory text must not be empty");
    }
    let kind = if summary {
        MemoryKind::SessionFinalSummary
    } else {
        MemoryKind::Turn
    };
    let entry = MemoryEntry::new(MemoryScope::new(app_name, owner), text, Utc::now())
        .with_kind(kind)
        .with_author(author);
    Ok(backend.store(entry).await?)
}

async fn search(
    config: &AppConfig,
    backend: Arc<dyn MemoryBackend>,
    owner: &str,
    query: &str,
    top_k: usize,
) -> anyhow::Result<SemanticMemory> {
    let recall = super::semantic_recall(config, backend);
    Ok(recall.search_facts(owner, query, top_k).await?)
}
