//! # Sanskara Core
//!
//! Domain types, traits, and error definitions for the Sanskara context
//! layer: the part of the wedding-planning assistant that gathers plan state,
//! chat history, and recalled memories into a bounded context for the
//! orchestrator model.
//!
//! ## Design Philosophy
//!
//! Every seam is defined as a trait here. Implementations live in their
//! respective crates:
//! - [`MemoryBackend`] and [`Embedder`] → `sanskara-memory`
//! - [`StateSource`] → supplied by the embedding application (database layer)

pub mod context;
pub mod error;
pub mod memory;
pub mod message;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use context::{
    ContextMeta, ContextRequest, ContextScope, Intent, MemorySource, OrchestratorContext,
    RecallPath, SemanticMemory,
};
pub use error::{Error, MemoryError, RecallError, Result, SliceError};
pub use memory::{Embedder, MemoryBackend, MemoryEntry, MemoryKind, MemoryScope};
pub use message::{ChatTurn, ConversationKey, Role};
pub use state::{
    BudgetState, CollaborationState, PendingActions, PlanState, Record, StateSource, TaskState,
    VendorState,
};
