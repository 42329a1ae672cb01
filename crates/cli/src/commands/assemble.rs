//! `sanskara assemble`: Build one turn's context from a state snapshot.

use anyhow::Context;
use sanskara_artifacts::{ArtifactMetadata, ArtifactStore};
use sanskara_config::AppConfig;
use sanskara_context::{ContextService, StateSnapshot, build_request};
use sanskara_core::message::ConversationKey;
use sanskara_telemetry::{ContextDebugger, debug_context_keys};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Session id used for uploads made through the CLI.
const CLI_SESSION: &str = "cli";
const RECENT_ARTIFACTS: usize = 10;

pub async fn run(
    config: &AppConfig,
    snapshot: &Path,
    message: &str,
    wedding_id: &str,
    user_id: &str,
    attachments: &[PathBuf],
) -> anyhow::Result<()> {
    let source = Arc::new(StateSnapshot::from_path(snapshot)?);
    let backend = super::open_backend(config).await?;
    let recall = Arc::new(super::semantic_recall(config, backend));
    let service = ContextService::new(source, recall, &config.context);

    let conversation = ConversationKey::new(&config.app_name, user_id, CLI_SESSION);
    let store = ArtifactStore::new();
    let artifacts = attach(&store, &conversation, attachments).await?;

    let request = build_request(
        wedding_id,
        user_id,
        message,
        config.context.k_turns,
        config.recall.top_k,
    )
    .with_session(CLI_SESSION);
    let context = service.build_context(&request).await;

    wait_for_telemetry(service.debugger(), 1).await;
    let context_json = serde_json::to_value(&context)?;
    let output = json!({
        "intent": request.intent(),
        "scope": request.scope(),
        "context": context_json,
        "artifacts": artifacts,
        "keys": debug_context_keys(&context_json),
        "telemetry": service.debugger().report(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Store each file under `conversation` and return the newest uploads.
async fn attach(
    store: &ArtifactStore,
    conversation: &ConversationKey,
    paths: &[PathBuf],
) -> anyhow::Result<Vec<ArtifactMetadata>> {
    for path in paths {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read attachment {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        store
            .add(conversation, filename, bytes, mime_type(path), None)
            .await;
    }
    Ok(store.list_recent(conversation, RECENT_ARTIFACTS).await)
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("txt" | "md") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Telemetry is recorded on a background task.
async fn wait_for_telemetry(debugger: &ContextDebugger, requests: u64) {
    for _ in 0..50 {
        if debugger.total_requests() >= requests {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types_by_extension() {
        assert_eq!(mime_type(Path::new("venue.JPG")), "image/jpeg");
        assert_eq!(mime_type(Path::new("quote.pdf")), "application/pdf");
        assert_eq!(mime_type(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn attachments_land_in_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let menu = dir.path().join("menu.txt");
        let photo = dir.path().join("mandap.png");
        std::fs::write(&menu, "paneer tikka").unwrap();
        std::fs::write(&photo, [0x89, b'P', b'N', b'G']).unwrap();

        let store = ArtifactStore::new();
        let key = ConversationKey::new("SanskaraAI", "u1", CLI_SESSION);
        let listed = attach(&store, &key, &[menu, photo]).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].filename, "mandap.png");
        assert_eq!(listed[0].mime_type, "image/png");
        let bytes = store.get_bytes(&listed[1].artifact_id).await.unwrap();
        assert_eq!(&bytes[..], b"paneer tikka");
    }

    #[tokio::test]
    async fn missing_attachment_is_an_error() {
        let store = ArtifactStore::new();
        let key = ConversationKey::new("SanskaraAI", "u1", CLI_SESSION);
        let result = attach(&store, &key, &[PathBuf::from("/nonexistent/file.png")]).await;
        assert!(result.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn assembles_from_snapshot_with_in_memory_backend() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("state.json");
        std::fs::write(
            &snapshot,
            r#"{"plan": {"user_display_name": "Riya"}, "recent_messages": []}"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.memory.backend = "in_memory".into();
        run(&config, &snapshot, "Show the budget", "w1", "u1", &[])
            .await
            .unwrap();
    }
}
