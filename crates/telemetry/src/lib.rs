//! Context assembly telemetry for Sanskara.
//!
//! [`ContextDebugger`] keeps running statistics over assembled contexts
//! (counts by intent and scope, mean serialized size) for offline tuning.
//! The [`inspect`] helpers summarize a single context's shape.
//!
//! Nothing here returns an error: telemetry must never affect a turn.

pub mod debugger;
pub mod inspect;

pub use debugger::{ContextDebugger, Distribution, EfficiencyReport};
pub use inspect::{
    CompletenessReport, ContextKeyReport, debug_context_keys, validate_context_completeness,
};
