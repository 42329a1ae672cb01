//! A [`StateSource`] backed by a JSON snapshot.
//!
//! Used by the CLI and tests in place of the database layer. A slice absent
//! from the snapshot is reported as unavailable, which the assembler turns
//! into an empty slice.

use async_trait::async_trait;
use sanskara_core::context::ContextRequest;
use sanskara_core::error::{Error, SliceError};
use sanskara_core::message::ChatTurn;
use sanskara_core::state::{
    BudgetState, CollaborationState, PlanState, StateSource, TaskState, VendorState,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSnapshot {
    pub plan: Option<PlanState>,
    pub tasks: Option<TaskState>,
    pub budget: Option<BudgetState>,
    pub vendors: Option<VendorState>,
    pub collaboration: Option<CollaborationState>,
    /// Oldest first.
    pub recent_messages: Option<Vec<ChatTurn>>,
}

impl StateSnapshot {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Snapshot {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }
}

fn present<T: Clone>(slice: &Option<T>, name: &str) -> Result<T, SliceError> {
    slice
        .clone()
        .ok_or_else(|| SliceError::Unavailable(name.to_owned()))
}

#[async_trait]
impl StateSource for StateSnapshot {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn plan(&self, _request: &ContextRequest) -> Result<PlanState, SliceError> {
        present(&self.plan, "plan")
    }

    async fn tasks(&self, _request: &ContextRequest) -> Result<TaskState, SliceError> {
        present(&self.tasks, "tasks")
    }

    async fn budget(&self, _request: &ContextRequest) -> Result<BudgetState, SliceError> {
        present(&self.budget, "budget")
    }

    async fn vendors(&self, _request: &ContextRequest) -> Result<VendorState, SliceError> {
        present(&self.vendors, "vendors")
    }

    async fn collaboration(
        &self,
        _request: &ContextRequest,
    ) -> Result<CollaborationState, SliceError> {
        present(&self.collaboration, "collaboration")
    }

    async fn recent_messages(
        &self,
        _request: &ContextRequest,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, SliceError> {
        let turns = self
            .recent_messages
            .as_ref()
            .ok_or_else(|| SliceError::Unavailable("recent_messages".into()))?;
        let skip = turns.len().saturating_sub(limit);
        Ok(turns[skip..].to_vec())
    }
}
