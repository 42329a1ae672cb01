//! Memory backends and semantic recall for Sanskara.
//!
//! Backends implement [`sanskara_core::MemoryBackend`]; [`SemanticRecall`]
//! sits on top of any of them and degrades from similarity search to plain
//! recency when the backend misbehaves.

pub mod adapter;
pub mod embedding;
pub mod in_memory;
pub mod noop;
pub mod recall;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use adapter::{RawMemoryRow, content_json, to_memory_entry};
pub use embedding::HashingEmbedder;
pub use in_memory::InMemoryBackend;
pub use noop::NoopMemory;
pub use recall::{RecallOptions, RecallOutcome, SemanticRecall, compact};
pub use vector::{cosine_similarity, vector_search};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
