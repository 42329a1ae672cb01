//! Plan-state slices and the trait that fetches them.
//!
//! The relational layer (weddings, tasks, budget items, vendors) lives outside
//! this workspace. It is reached through [`StateSource`], whose methods each
//! return one independently-failing slice. Row shapes are owned by that
//! layer, so rows travel as opaque JSON [`Record`]s.

use crate::context::ContextRequest;
use crate::error::SliceError;
use crate::message::ChatTurn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One database row, passed through untouched.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Wedding metadata plus the requesting user's profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanState {
    #[serde(default)]
    pub wedding_data: Record,
    #[serde(default)]
    pub user_display_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

/// Workflows, open tasks, and timeline lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskState {
    pub active_workflows: Vec<Record>,
    pub relevant_tasks: Vec<Record>,
    pub upcoming_events: Vec<Record>,
    pub overdue_tasks: Vec<Record>,
    pub urgent_tasks: Vec<Record>,
    pub upcoming_deadlines: Vec<Record>,
}

/// Budget aggregates as computed by the budget query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetState {
    pub total_budget: f64,
    pub total_spent: f64,
    pub pending_amount: f64,
    pub total_items: u64,
    pub by_category: Vec<Record>,
    pub recent_expenses: Vec<Record>,
}

/// Shortlisted and already-booked vendors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorState {
    pub shortlisted_vendors: Vec<Record>,
    pub bookings: Vec<Record>,
}

/// Items waiting on the requesting side of the couple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingActions {
    pub pending_reviews: Vec<Record>,
    pub awaiting_workflows: Vec<Record>,
}

/// Guest and collaboration aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaborationState {
    pub pending_actions: PendingActions,
    /// Open / pending-review counts per lead party.
    pub collab_status: Record,
    pub guest_context: Record,
}

/// Fetches plan-state slices for one turn.
///
/// Every method is independent: the context service runs them concurrently
/// and a failure in one never affects the others.
#[async_trait]
pub trait StateSource: Send + Sync {
    /// Source name for logs.
    fn name(&self) -> &str;

    async fn plan(&self, request: &ContextRequest) -> Result<PlanState, SliceError>;

    async fn tasks(&self, request: &ContextRequest) -> Result<TaskState, SliceError>;

    async fn budget(&self, request: &ContextRequest) -> Result<BudgetState, SliceError>;

    async fn vendors(&self, request: &ContextRequest) -> Result<VendorState, SliceError>;

    async fn collaboration(
        &self,
        request: &ContextRequest,
    ) -> Result<CollaborationState, SliceError>;

    /// Most recent `limit` chat turns, oldest first.
    async fn recent_messages(
        &self,
        request: &ContextRequest,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, SliceError>;
}
