//! SQLite memory backend.
//!
//! One table, `memories`, holds every scope's entries:
//! - `content`: JSON `{text, metadata}` as written by [`content_json`]
//! - `embedding`: little-endian f32 blob
//! - `created_at`: RFC 3339 with fixed precision, so text order is time order
//!
//! Similarity is cosine ranking in Rust over the scope's rows.

use crate::adapter::{RawMemoryRow, SUMMARY_TYPE, content_json, to_memory_entry};
use crate::embedding::HashingEmbedder;
use crate::vector;
use async_trait::async_trait;
use chrono::SecondsFormat;
use sanskara_core::error::MemoryError;
use sanskara_core::memory::{Embedder, MemoryBackend, MemoryEntry, MemoryKind, MemoryScope};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const MIN_SCORE: f32 = 0.01;

/// A SQLite memory backend.
pub struct SqliteBackend {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl SqliteBackend {
    /// Create a new SQLite backend from a file path or URL.
    ///
    /// The database and its table are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // A single connection keeps `sqlite::memory:` databases shared.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let backend = Self::from_pool(pool).await?;
        info!("SQLite memory backend initialized at {path}");
        Ok(backend)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let backend = Self {
            pool,
            embedder: Arc::new(HashingEmbedder::default()),
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Replace the embedder. Stored vectors from another embedder will no
    /// longer compare meaningfully.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                iid         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT UNIQUE NOT NULL,
                app_name    TEXT NOT NULL,
                owner_id    TEXT NOT NULL,
                content     TEXT NOT NULL,
                embedding   BLOB,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("memories table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memories_scope_created \
             ON memories(app_name, owner_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("scope index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    /// Map a row through the adapter; `None` for rows it rejects.
    fn row_to_entry(row: &sqlx::sqlite::SqliteRow, scope: &MemoryScope) -> Option<MemoryEntry> {
        let content: String = row.try_get("content").ok()?;
        let raw = RawMemoryRow {
            id: row.try_get("id").ok(),
            content: serde_json::from_str(&content)
                .unwrap_or(serde_json::Value::String(content)),
            created_at: row.try_get("created_at").ok(),
            author: None,
        };
        let mut entry = to_memory_entry(raw, scope)?;
        entry.embedding = row
            .try_get::<Option<Vec<u8>>, _>("embedding")
            .ok()
            .flatten()
            .map(|blob| Self::blob_to_embedding(&blob));
        Some(entry)
    }
}

#[async_trait]
impl MemoryBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn store(&self, mut entry: MemoryEntry) -> Result<String, MemoryError> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        let embedding = match entry.embedding.take() {
            Some(e) => e,
            None => self.embedder.embed(&entry.text)?,
        };
        let content = content_json(&entry).to_string();
        let created_at = entry.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            r#"
            INSERT INTO memories (id, app_name, owner_id, content, embedding, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                embedding = excluded.embedding
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.scope.app_name)
        .bind(&entry.scope.owner_id)
        .bind(&content)
        .bind(Self::embedding_to_blob(&embedding))
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT failed: {e}")))?;

        debug!(id = %entry.id, owner = %entry.scope.owner_id, "Stored memory");
        Ok(entry.id)
    }

    async fn search_similar(
        &self,
        scope: &MemoryScope,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        let query_embedding = self.embedder.embed(query)?;
        let rows = sqlx::query(
            "SELECT id, content, embedding, created_at FROM memories \
             WHERE app_name = ?1 AND owner_id = ?2 AND embedding IS NOT NULL",
        )
        .bind(&scope.app_name)
        .bind(&scope.owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Vector scan: {e}")))?;

        let entries: Vec<MemoryEntry> = rows
            .iter()
            .filter_map(|row| Self::row_to_entry(row, scope))
            .collect();

        Ok(vector::vector_search(&entries, &query_embedding, limit, MIN_SCORE))
    }

    async fn recent(
        &self,
        scope: &MemoryScope,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        let rows = sqlx::query(
            "SELECT id, content, embedding, created_at FROM memories \
             WHERE app_name = ?1 AND owner_id = ?2 \
             ORDER BY created_at DESC, iid DESC LIMIT ?3",
        )
        .bind(&scope.app_name)
        .bind(&scope.owner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Recent: {e}")))?;

        Ok(rows
            .iter()
            .filter_map(|row| Self::row_to_entry(row, scope))
            .collect())
    }

    async fn recent_by_kind(
        &self,
        scope: &MemoryScope,
        kind: MemoryKind,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        // Rows whose content is not a JSON object carry no type and count as turns.
        let rows = sqlx::query(
            "SELECT id, content, embedding, created_at FROM memories \
             WHERE app_name = ?1 AND owner_id = ?2 \
             AND (IFNULL(CASE WHEN json_valid(content) THEN json_extract(content, '$.metadata.type') END, '') = ?3) = ?4 \
             ORDER BY created_at DESC, iid DESC LIMIT ?5",
        )
        .bind(&scope.app_name)
        .bind(&scope.owner_id)
        .bind(SUMMARY_TYPE)
        .bind(kind == MemoryKind::SessionFinalSummary)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Recent by kind: {e}")))?;

        Ok(rows
            .iter()
            .filter_map(|row| Self::row_to_entry(row, scope))
            .collect())
    }

    async fn count(&self, scope: &MemoryScope) -> Result<usize, MemoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM memories WHERE app_name = ?1 AND owner_id = ?2",
        )
        .bind(&scope.app_name)
        .bind(&scope.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| MemoryError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(cnt as usize)
    }
}
