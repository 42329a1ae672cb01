//! Orchestrator context assembly for Sanskara.
//!
//! A turn's context is built in two stages:
//!
//! 1. [`ContextService`] fetches the state slices the request's scope needs
//!    and the semantic memory slice, concurrently, each one bounded and
//!    independently fallible.
//! 2. [`ContextAssembler`] merges whatever arrived into an
//!    [`OrchestratorContext`](sanskara_core::OrchestratorContext): failed
//!    slices become empty, lists are capped, recent messages are windowed,
//!    and the whole is kept under a soft token budget.
//!
//! # Determinism
//!
//! Assembly is a pure function of its inputs plus the timestamp passed to
//! [`ContextAssembler::assemble_at`].

pub mod assembler;
pub mod intent;
pub mod service;
pub mod snapshot;
pub mod token;

pub use assembler::{AssemblyInputs, ContextAssembler, SliceOutcome};
pub use intent::{build_request, infer_intent, scope_for, thread_hint};
pub use service::ContextService;
pub use snapshot::StateSnapshot;
