//! Context assembly: merge fetched slices into one bounded context.
//!
//! Every slice is handled on its own. A slice that failed to load is
//! replaced by its empty value and named in `meta.defaulted_slices`; the
//! rest of the context is unaffected. After merging:
//!
//! - list slices are capped ([`ListCaps`])
//! - `recent_messages` keeps the newest `k_turns` turns, oldest first
//! - semantic facts are bounded by `top_k`
//! - the serialized size is estimated in tokens and, if it exceeds the soft
//!   budget, recent messages (oldest first) then semantic facts (least
//!   relevant first) are dropped until it fits or both are empty
//!
//! Assembly itself never fails.

use crate::intent::thread_hint;
use crate::token;
use chrono::{DateTime, Utc};
use sanskara_config::{ContextConfig, ListCaps};
use sanskara_core::context::{
    BudgetSummary, BudgetTotals, ContextMeta, ContextRequest, OrchestratorContext,
    TimelineSummary,
};
use sanskara_core::error::SliceError;
use sanskara_core::message::ChatTurn;
use sanskara_core::state::{
    BudgetState, CollaborationState, PlanState, Record, TaskState, VendorState,
};
use sanskara_memory::RecallOutcome;
use tracing::{debug, warn};

pub const SLICE_PLAN: &str = "plan";
pub const SLICE_TASKS: &str = "tasks";
pub const SLICE_BUDGET: &str = "budget";
pub const SLICE_VENDORS: &str = "vendors";
pub const SLICE_COLLABORATION: &str = "collaboration";
pub const SLICE_RECENT_MESSAGES: &str = "recent_messages";
pub const SLICE_SEMANTIC_MEMORY: &str = "semantic_memory";

/// Upper bound on re-estimates while the stored estimate settles.
const MEASURE_ROUNDS: usize = 4;

/// What became of one slice fetch.
#[derive(Debug, Clone)]
pub enum SliceOutcome<T> {
    Ready(T),
    /// Not requested for this scope; empty, and not a failure.
    Skipped,
    Failed(SliceError),
}

impl<T> SliceOutcome<T> {
    pub fn from_result(result: Result<T, SliceError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => Self::Failed(e),
        }
    }
}

impl<T> Default for SliceOutcome<T> {
    fn default() -> Self {
        Self::Skipped
    }
}

/// Everything fetched for one turn.
#[derive(Debug, Clone, Default)]
pub struct AssemblyInputs {
    pub plan: SliceOutcome<PlanState>,
    pub tasks: SliceOutcome<TaskState>,
    pub budget: SliceOutcome<BudgetState>,
    pub vendors: SliceOutcome<VendorState>,
    pub collaboration: SliceOutcome<CollaborationState>,
    pub recent_messages: SliceOutcome<Vec<ChatTurn>>,
    pub semantic: SliceOutcome<RecallOutcome>,
}

/// The context assembler. Stateless apart from its limits; create one and
/// reuse it.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    caps: ListCaps,
    max_tokens: usize,
    chars_per_token: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(&ContextConfig::default())
    }
}

fn cap(mut list: Vec<Record>, max: usize) -> Vec<Record> {
    list.truncate(max);
    list
}

/// Unwrap a slice, noting failures in `defaulted`.
fn take<T>(outcome: SliceOutcome<T>, name: &str, defaulted: &mut Vec<String>) -> Option<T> {
    match outcome {
        SliceOutcome::Ready(value) => Some(value),
        SliceOutcome::Skipped => None,
        SliceOutcome::Failed(e) => {
            warn!(slice = name, error = %e, "Slice unavailable, using empty default");
            defaulted.push(name.to_owned());
            None
        }
    }
}

impl ContextAssembler {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            caps: config.caps.clone(),
            max_tokens: config.max_tokens,
            chars_per_token: config.chars_per_token.max(1),
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Assemble, stamping the context with the current time.
    pub fn assemble(&self, request: &ContextRequest, inputs: AssemblyInputs) -> OrchestratorContext {
        self.assemble_at(request, inputs, Utc::now())
    }

    /// Assemble with an explicit timestamp. Identical arguments give
    /// identical output.
    pub fn assemble_at(
        &self,
        request: &ContextRequest,
        inputs: AssemblyInputs,
        now: DateTime<Utc>,
    ) -> OrchestratorContext {
        let mut defaulted = Vec::new();
        let mut ctx = OrchestratorContext {
            current_wedding_id: Some(request.wedding_id().to_owned()),
            current_user_id: Some(request.user_id().to_owned()),
            current_user_role: request.user_role().map(str::to_owned),
            thread_hint: thread_hint(request.message()),
            ..Default::default()
        };

        if let Some(plan) = take(inputs.plan, SLICE_PLAN, &mut defaulted) {
            ctx.wedding_data = plan.wedding_data;
            ctx.user_display_name = plan.user_display_name;
            ctx.user_email = plan.user_email;
        }

        if let Some(tasks) = take(inputs.tasks, SLICE_TASKS, &mut defaulted) {
            ctx.timeline_summary = TimelineSummary {
                upcoming_count: tasks.upcoming_events.len(),
                overdue_count: tasks.overdue_tasks.len(),
                urgent_count: tasks.urgent_tasks.len(),
            };
            ctx.active_workflows = cap(tasks.active_workflows, self.caps.active_workflows);
            ctx.relevant_tasks = cap(tasks.relevant_tasks, self.caps.relevant_tasks);
            ctx.upcoming_events = cap(tasks.upcoming_events, self.caps.upcoming_events);
            ctx.overdue_tasks = cap(tasks.overdue_tasks, self.caps.overdue_tasks);
            ctx.urgent_tasks = cap(tasks.urgent_tasks, self.caps.urgent_tasks);
            ctx.upcoming_deadlines = cap(tasks.upcoming_deadlines, self.caps.upcoming_deadlines);
        }

        if let Some(budget) = take(inputs.budget, SLICE_BUDGET, &mut defaulted) {
            ctx.budget_totals = BudgetTotals {
                total_budget: budget.total_budget,
                total_spent: budget.total_spent,
                remaining_budget: budget.total_budget - budget.total_spent,
            };
            ctx.budget_summary = BudgetSummary {
                total_budget: budget.total_budget,
                total_spent: budget.total_spent,
                pending_amount: budget.pending_amount,
                total_items: budget.total_items,
            };
            ctx.budget_by_category = budget.by_category;
            ctx.recent_expenses = cap(budget.recent_expenses, self.caps.recent_expenses);
        }

        if let Some(vendors) = take(inputs.vendors, SLICE_VENDORS, &mut defaulted) {
            ctx.shortlisted_vendors = cap(vendors.shortlisted_vendors, self.caps.shortlisted_vendors);
            ctx.bookings = cap(vendors.bookings, self.caps.bookings);
        }

        if let Some(collab) = take(inputs.collaboration, SLICE_COLLABORATION, &mut defaulted) {
            ctx.pending_actions = collab.pending_actions;
            ctx.collab_status = collab.collab_status;
            ctx.guest_context = collab.guest_context;
        }

        if let Some(turns) = take(inputs.recent_messages, SLICE_RECENT_MESSAGES, &mut defaulted) {
            ctx.recent_messages = window(turns, request.k_turns());
        }

        if let Some(outcome) = take(inputs.semantic, SLICE_SEMANTIC_MEMORY, &mut defaulted) {
            ctx.meta.recall_path = outcome.path();
            let mut memory = outcome.into_memory();
            memory.truncate(request.top_k());
            ctx.semantic_memory = memory;
        }

        ctx.meta = ContextMeta {
            intent: Some(request.intent()),
            scope: Some(request.scope()),
            k_turns: request.k_turns(),
            top_k: request.top_k(),
            assembled_at: now,
            defaulted_slices: defaulted,
            ..std::mem::take(&mut ctx.meta)
        };

        self.fit_budget(&mut ctx);
        ctx
    }

    /// Estimate tokens and trim until under `max_tokens`, recording the
    /// estimate and the trimmed slices in `meta`.
    fn fit_budget(&self, ctx: &mut OrchestratorContext) {
        let mut estimate = self.measure(ctx);

        if estimate > self.max_tokens && !ctx.recent_messages.is_empty() {
            ctx.meta.truncated.push(SLICE_RECENT_MESSAGES.to_owned());
            while estimate > self.max_tokens && !ctx.recent_messages.is_empty() {
                ctx.recent_messages.remove(0);
                estimate = self.measure(ctx);
            }
        }

        if estimate > self.max_tokens && !ctx.semantic_memory.is_empty() {
            ctx.meta.truncated.push(SLICE_SEMANTIC_MEMORY.to_owned());
            while estimate > self.max_tokens && !ctx.semantic_memory.is_empty() {
                ctx.semantic_memory.truncate(ctx.semantic_memory.len() - 1);
                estimate = self.measure(ctx);
            }
        }

        if estimate > self.max_tokens {
            debug!(
                estimate,
                max_tokens = self.max_tokens,
                "Context still over soft budget after trimming"
            );
        }
    }

    /// Estimate `ctx` and store the result in `meta.token_estimate`.
    ///
    /// The stored number is part of what gets serialized, so estimating
    /// repeats until the value stops changing.
    fn measure(&self, ctx: &mut OrchestratorContext) -> usize {
        let mut estimate = token::estimate_serialized_tokens(ctx, self.chars_per_token);
        for _ in 0..MEASURE_ROUNDS {
            ctx.meta.token_estimate = Some(estimate);
            let next = token::estimate_serialized_tokens(ctx, self.chars_per_token);
            if next == estimate {
                break;
            }
            estimate = next;
        }
        ctx.meta.token_estimate = Some(estimate);
        estimate
    }
}

/// The newest `k` turns in ascending time order.
fn window(mut turns: Vec<ChatTurn>, k: usize) -> Vec<ChatTurn> {
    turns.sort_by_key(|t| t.created_at);
    let skip = turns.len().saturating_sub(k);
    turns.drain(..skip);
    turns
}
