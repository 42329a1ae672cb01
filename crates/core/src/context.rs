//! Context request and assembled orchestrator context.
//!
//! A [`ContextRequest`] is built once per turn by the dispatch layer and never
//! changes afterwards. The [`OrchestratorContext`] is the payload handed to the
//! orchestrator model: every slice has an empty default, so a context is never
//! malformed, only thinner.

use crate::message::ChatTurn;
use crate::state::{PendingActions, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_K_TURNS: usize = 6;
pub const DEFAULT_TOP_K: usize = 5;
pub const CONTEXT_VERSION: &str = "v1";

/// What the user is trying to do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    VendorSearch,
    BudgetManagement,
    TimelinePlanning,
    TaskManagement,
    RitualInquiry,
    GeneralPlanning,
    StatusCheck,
    /// Greetings and near-empty messages.
    ProactiveGreeting,
    /// Vague questions that need a proactive answer.
    OpenEnded,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VendorSearch => "vendor_search",
            Self::BudgetManagement => "budget_management",
            Self::TimelinePlanning => "timeline_planning",
            Self::TaskManagement => "task_management",
            Self::RitualInquiry => "ritual_inquiry",
            Self::GeneralPlanning => "general_planning",
            Self::StatusCheck => "status_check",
            Self::ProactiveGreeting => "proactive_greeting",
            Self::OpenEnded => "open_ended",
        }
    }

    /// Intents answered from a full view of the plan.
    pub fn is_proactive(&self) -> bool {
        matches!(
            self,
            Self::ProactiveGreeting | Self::OpenEnded | Self::StatusCheck | Self::GeneralPlanning
        )
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which plan-state slices a turn needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextScope {
    /// Wedding basics and user info only.
    Minimal,
    Workflow,
    Budget,
    Vendor,
    Timeline,
    Proactive,
    Full,
}

impl ContextScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Workflow => "workflow",
            Self::Budget => "budget",
            Self::Vendor => "vendor",
            Self::Timeline => "timeline",
            Self::Proactive => "proactive",
            Self::Full => "full",
        }
    }

    pub fn wants_tasks(&self) -> bool {
        matches!(
            self,
            Self::Workflow | Self::Timeline | Self::Proactive | Self::Full
        )
    }

    pub fn wants_budget(&self) -> bool {
        matches!(
            self,
            Self::Budget | Self::Vendor | Self::Proactive | Self::Full
        )
    }

    pub fn wants_vendors(&self) -> bool {
        matches!(
            self,
            Self::Budget | Self::Vendor | Self::Proactive | Self::Full
        )
    }
}

impl std::fmt::Display for ContextScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn's request for context. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextRequest {
    wedding_id: String,
    user_id: String,
    user_role: Option<String>,
    session_id: Option<String>,
    message: String,
    intent: Intent,
    scope: ContextScope,
    k_turns: usize,
    top_k: usize,
}

impl ContextRequest {
    pub fn new(
        wedding_id: impl Into<String>,
        user_id: impl Into<String>,
        intent: Intent,
        scope: ContextScope,
    ) -> Self {
        Self {
            wedding_id: wedding_id.into(),
            user_id: user_id.into(),
            user_role: None,
            session_id: None,
            message: String::new(),
            intent,
            scope,
            k_turns: DEFAULT_K_TURNS,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.user_role = Some(role.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// The user utterance; also the semantic recall query.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_k_turns(mut self, k_turns: usize) -> Self {
        self.k_turns = k_turns;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn wedding_id(&self) -> &str {
        &self.wedding_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn user_role(&self) -> Option<&str> {
        self.user_role.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn scope(&self) -> ContextScope {
        self.scope
    }

    pub fn k_turns(&self) -> usize {
        self.k_turns
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

/// Provenance of one recalled fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySource {
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Recalled facts with their sources, most relevant (or most recent) first.
///
/// `facts` and `sources` are parallel: the only way to add to one is
/// [`SemanticMemory::push`], which adds to both.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SemanticMemory {
    facts: Vec<String>,
    sources: Vec<MemorySource>,
}

impl SemanticMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fact: impl Into<String>, source: MemorySource) {
        self.facts.push(fact.into());
        self.sources.push(source);
    }

    pub fn facts(&self) -> &[String] {
        &self.facts
    }

    pub fn sources(&self) -> &[MemorySource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Keep the first `len` facts (and their sources).
    pub fn truncate(&mut self, len: usize) {
        self.facts.truncate(len);
        self.sources.truncate(len);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MemorySource)> {
        self.facts.iter().zip(self.sources.iter())
    }
}

/// Which retrieval path served the semantic memory slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallPath {
    Vector,
    Fallback,
    #[default]
    Empty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetTotals {
    pub total_budget: f64,
    pub total_spent: f64,
    pub remaining_budget: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_budget: f64,
    pub total_spent: f64,
    pub pending_amount: f64,
    pub total_items: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSummary {
    pub upcoming_count: usize,
    pub overdue_count: usize,
    pub urgent_count: usize,
}

/// Assembly metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMeta {
    pub intent: Option<Intent>,
    pub scope: Option<ContextScope>,
    pub k_turns: usize,
    pub top_k: usize,
    pub context_version: &'static str,
    pub assembled_at: DateTime<Utc>,
    /// Advisory token estimate of the serialized context.
    pub token_estimate: Option<usize>,
    pub recall_path: RecallPath,
    /// Slices whose fetch failed and were replaced by their empty value.
    pub defaulted_slices: Vec<String>,
    /// Slices shortened to fit the soft token budget.
    pub truncated: Vec<String>,
}

impl Default for ContextMeta {
    fn default() -> Self {
        Self {
            intent: None,
            scope: None,
            k_turns: DEFAULT_K_TURNS,
            top_k: DEFAULT_TOP_K,
            context_version: CONTEXT_VERSION,
            assembled_at: Utc::now(),
            token_estimate: None,
            recall_path: RecallPath::Empty,
            defaulted_slices: Vec::new(),
            truncated: Vec::new(),
        }
    }
}

/// The assembled payload handed to the orchestrator model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestratorContext {
    // Core identifiers
    pub current_wedding_id: Option<String>,
    pub current_user_id: Option<String>,
    pub current_user_role: Option<String>,
    pub user_display_name: Option<String>,
    pub user_email: Option<String>,
    pub wedding_data: Record,

    // Vendors
    pub shortlisted_vendors: Vec<Record>,
    pub bookings: Vec<Record>,

    // Budget
    pub budget_by_category: Vec<Record>,
    pub budget_totals: BudgetTotals,
    pub budget_summary: BudgetSummary,
    pub recent_expenses: Vec<Record>,

    // Tasks and timeline
    pub active_workflows: Vec<Record>,
    pub relevant_tasks: Vec<Record>,
    pub upcoming_events: Vec<Record>,
    pub overdue_tasks: Vec<Record>,
    pub urgent_tasks: Vec<Record>,
    pub upcoming_deadlines: Vec<Record>,
    pub timeline_summary: TimelineSummary,

    // Guests and collaboration
    pub pending_actions: PendingActions,
    pub collab_status: Record,
    pub guest_context: Record,

    /// Topic hint derived from the latest user message.
    pub thread_hint: Record,

    // Conversation memory
    pub recent_messages: Vec<ChatTurn>,
    pub semantic_memory: SemanticMemory,

    pub meta: ContextMeta,
}
