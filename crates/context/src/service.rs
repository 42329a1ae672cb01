//! Per-turn context building: concurrent slice fetches, assembly, telemetry.

use crate::assembler::{
    AssemblyInputs, ContextAssembler, SLICE_BUDGET, SLICE_COLLABORATION, SLICE_PLAN,
    SLICE_RECENT_MESSAGES, SLICE_SEMANTIC_MEMORY, SLICE_TASKS, SLICE_VENDORS, SliceOutcome,
};
use sanskara_config::ContextConfig;
use sanskara_core::context::{ContextRequest, OrchestratorContext};
use sanskara_core::error::SliceError;
use sanskara_core::state::StateSource;
use sanskara_memory::SemanticRecall;
use sanskara_telemetry::ContextDebugger;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Builds one [`OrchestratorContext`] per turn.
///
/// Slice fetches run concurrently and share nothing; each is bounded by the
/// fetch timeout. Dropping the future returned by [`Self::build_context`]
/// cancels every fetch still in flight.
pub struct ContextService {
    source: Arc<dyn StateSource>,
    recall: Arc<SemanticRecall>,
    assembler: ContextAssembler,
    debugger: Arc<ContextDebugger>,
    fetch_timeout: Duration,
}

impl ContextService {
    pub fn new(
        source: Arc<dyn StateSource>,
        recall: Arc<SemanticRecall>,
        config: &ContextConfig,
    ) -> Self {
        Self {
            source,
            recall,
            assembler: ContextAssembler::new(config),
            debugger: Arc::new(ContextDebugger::new()),
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
        }
    }

    /// Share a debugger with other services.
    pub fn with_debugger(mut self, debugger: Arc<ContextDebugger>) -> Self {
        self.debugger = debugger;
        self
    }

    pub fn debugger(&self) -> &Arc<ContextDebugger> {
        &self.debugger
    }

    /// Fetch, assemble, and hand the result to telemetry in the background.
    pub async fn build_context(&self, request: &ContextRequest) -> OrchestratorContext {
        let scope = request.scope();
        info!(
            wedding_id = request.wedding_id(),
            intent = %request.intent(),
            scope = %scope,
            source = self.source.name(),
            "Building context"
        );

        let wants_recall = !request.message().trim().is_empty();
        let (plan, tasks, budget, vendors, collaboration, recent_messages, semantic) = tokio::join!(
            self.guarded(SLICE_PLAN, true, self.source.plan(request)),
            self.guarded(SLICE_TASKS, scope.wants_tasks(), self.source.tasks(request)),
            self.guarded(SLICE_BUDGET, scope.wants_budget(), self.source.budget(request)),
            self.guarded(SLICE_VENDORS, scope.wants_vendors(), self.source.vendors(request)),
            self.guarded(
                SLICE_COLLABORATION,
                true,
                self.source.collaboration(request)
            ),
            self.guarded(
                SLICE_RECENT_MESSAGES,
                true,
                self.source.recent_messages(request, request.k_turns())
            ),
            self.recall_slice(request, wants_recall),
        );

        let inputs = AssemblyInputs {
            plan,
            tasks,
            budget,
            vendors,
            collaboration,
            recent_messages,
            semantic,
        };
        let context = self.assembler.assemble(request, inputs);
        debug!(
            token_estimate = ?context.meta.token_estimate,
            recall_path = ?context.meta.recall_path,
            defaulted = ?context.meta.defaulted_slices,
            "Context assembled"
        );

        self.observe(request, &context);
        context
    }

    /// Run `fetch` if `enabled`, bounded by the fetch timeout. The future is
    /// never polled when disabled.
    async fn guarded<T, F>(&self, name: &str, enabled: bool, fetch: F) -> SliceOutcome<T>
    where
        F: Future<Output = Result<T, SliceError>>,
    {
        if !enabled {
            return SliceOutcome::Skipped;
        }
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => SliceOutcome::from_result(result),
            Err(_) => SliceOutcome::Failed(SliceError::Timeout {
                slice: name.to_owned(),
                timeout_ms: self.fetch_timeout.as_millis() as u64,
            }),
        }
    }

    /// Semantic recall is bounded internally, per backend call.
    async fn recall_slice(
        &self,
        request: &ContextRequest,
        enabled: bool,
    ) -> SliceOutcome<sanskara_memory::RecallOutcome> {
        if !enabled {
            return SliceOutcome::Skipped;
        }
        self.recall
            .recall(request.wedding_id(), request.message(), request.top_k())
            .await
            .map_or_else(
                |e| {
                    SliceOutcome::Failed(SliceError::Failed {
                        slice: SLICE_SEMANTIC_MEMORY.to_owned(),
                        reason: e.to_string(),
                    })
                },
                SliceOutcome::Ready,
            )
    }

    /// Record the context off the critical path.
    fn observe(&self, request: &ContextRequest, context: &OrchestratorContext) {
        let debugger = Arc::clone(&self.debugger);
        let request = request.clone();
        let context = context.clone();
        tokio::spawn(async move {
            debugger.record(&request, &context);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sanskara_core::context::{ContextScope, Intent, RecallPath};
    use sanskara_core::error::MemoryError;
    use sanskara_core::memory::{MemoryBackend, MemoryEntry, MemoryScope};
    use sanskara_core::message::ChatTurn;
    use sanskara_core::state::{
        BudgetState, CollaborationState, PlanState, TaskState, VendorState,
    };
    use sanskara_memory::{InMemoryBackend, NoopMemory};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Source with scripted failures and call counting.
    #[derive(Default)]
    struct ScriptedSource {
        fail_budget: bool,
        hang_plan: bool,
        calls: AtomicUsize,
        plan_dropped: Arc<AtomicBool>,
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl StateSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn plan(&self, _request: &ContextRequest) -> Result<PlanState, SliceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _flag = DropFlag(self.plan_dropped.clone());
            if self.hang_plan {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(PlanState {
                user_display_name: Some("Riya".into()),
                ..Default::default()
            })
        }

        async fn tasks(&self, _request: &ContextRequest) -> Result<TaskState, SliceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TaskState::default())
        }

        async fn budget(&self, _request: &ContextRequest) -> Result<BudgetState, SliceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_budget {
                return Err(SliceError::Failed {
                    slice: "budget".into(),
                    reason: "db down".into(),
                });
            }
            Ok(BudgetState {
                total_budget: 100.0,
                total_spent: 40.0,
                ..Default::default()
            })
        }

        async fn vendors(&self, _request: &ContextRequest) -> Result<VendorState, SliceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(VendorState::default())
        }

        async fn collaboration(
            &self,
            _request: &ContextRequest,
        ) -> Result<CollaborationState, SliceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CollaborationState::default())
        }

        async fn recent_messages(
            &self,
            _request: &ContextRequest,
            limit: usize,
        ) -> Result<Vec<ChatTurn>, SliceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..limit).map(|i| ChatTurn::user(format!("turn {i}"))).collect())
        }
    }

    struct BrokenVectors;

    #[async_trait]
    impl MemoryBackend for BrokenVectors {
        fn name(&self) -> &str {
            "broken"
        }
        async fn store(&self, _entry: MemoryEntry) -> Result<String, MemoryError> {
            Err(MemoryError::Storage("read-only".into()))
        }
        async fn search_similar(
            &self,
            _scope: &MemoryScope,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<MemoryEntry>, MemoryError> {
            Err(MemoryError::QueryFailed("index offline".into()))
        }
        async fn recent(
            &self,
            scope: &MemoryScope,
            limit: usize,
        ) -> Result<Vec<MemoryEntry>, MemoryError> {
            Ok((0..limit)
                .map(|i| MemoryEntry::new(scope.clone(), format!("memory {i}"), chrono::Utc::now()))
                .collect())
        }
        async fn count(&self, _scope: &MemoryScope) -> Result<usize, MemoryError> {
            Ok(0)
        }
    }

    fn service(source: ScriptedSource, backend: Arc<dyn MemoryBackend>) -> ContextService {
        let recall = Arc::new(SemanticRecall::new(backend, "SanskaraAI"));
        ContextService::new(Arc::new(source), recall, &ContextConfig::default())
    }

    fn request(scope: ContextScope) -> ContextRequest {
        ContextRequest::new("wedding-1", "user-1", Intent::StatusCheck, scope)
            .with_message("How is the planning going?")
            .with_k_turns(3)
            .with_top_k(2)
    }

    async fn wait_for_records(debugger: &ContextDebugger, n: u64) {
        for _ in 0..100 {
            if debugger.total_requests() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn failing_slice_is_isolated() {
        let svc = service(
            ScriptedSource {
                fail_budget: true,
                ..Default::default()
            },
            Arc::new(NoopMemory),
        );
        let ctx = svc.build_context(&request(ContextScope::Full)).await;

        assert_eq!(ctx.meta.defaulted_slices, ["budget"]);
        assert_eq!(ctx.budget_totals.total_budget, 0.0);
        assert_eq!(ctx.user_display_name.as_deref(), Some("Riya"));
        assert_eq!(ctx.recent_messages.len(), 3);
    }

    #[tokio::test]
    async fn minimal_scope_skips_unneeded_slices() {
        let source = ScriptedSource::default();
        let recall = Arc::new(SemanticRecall::new(Arc::new(NoopMemory), "SanskaraAI"));
        let source = Arc::new(source);
        let svc = ContextService::new(source.clone(), recall, &ContextConfig::default());

        let ctx = svc.build_context(&request(ContextScope::Minimal)).await;
        // plan, collaboration, recent messages
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert!(ctx.meta.defaulted_slices.is_empty());
        assert_eq!(ctx.budget_totals.remaining_budget, 0.0);
    }

    #[tokio::test]
    async fn budget_scope_fetches_budget_and_vendors() {
        let svc = service(ScriptedSource::default(), Arc::new(NoopMemory));
        let ctx = svc.build_context(&request(ContextScope::Budget)).await;
        assert_eq!(ctx.budget_totals.remaining_budget, 60.0);
    }

    #[tokio::test]
    async fn vector_failure_surfaces_as_fallback_path() {
        let svc = service(ScriptedSource::default(), Arc::new(BrokenVectors));
        let ctx = svc.build_context(&request(ContextScope::Proactive)).await;

        assert_eq!(ctx.meta.recall_path, RecallPath::Fallback);
        assert_eq!(ctx.semantic_memory.len(), 2);
        assert!(ctx.meta.defaulted_slices.is_empty());
    }

    #[tokio::test]
    async fn empty_message_skips_recall() {
        let backend = Arc::new(InMemoryBackend::new());
        let svc = service(ScriptedSource::default(), backend);
        let req = ContextRequest::new("w1", "u1", Intent::ProactiveGreeting, ContextScope::Proactive);
        let ctx = svc.build_context(&req).await;
        assert_eq!(ctx.meta.recall_path, RecallPath::Empty);
        assert!(ctx.meta.defaulted_slices.is_empty());
    }

    #[tokio::test]
    async fn invalid_top_k_defaults_semantic_slice() {
        let svc = service(ScriptedSource::default(), Arc::new(NoopMemory));
        let req = request(ContextScope::Proactive).with_top_k(0);
        let ctx = svc.build_context(&req).await;
        assert_eq!(ctx.meta.defaulted_slices, ["semantic_memory"]);
        assert!(ctx.semantic_memory.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_slice_times_out() {
        let svc = service(
            ScriptedSource {
                hang_plan: true,
                ..Default::default()
            },
            Arc::new(NoopMemory),
        );
        let ctx = svc.build_context(&request(ContextScope::Full)).await;
        assert_eq!(ctx.meta.defaulted_slices, ["plan"]);
        assert!(ctx.user_display_name.is_none());
        assert_eq!(ctx.recent_messages.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_turn_cancels_fetches() {
        let dropped = Arc::new(AtomicBool::new(false));
        let svc = service(
            ScriptedSource {
                hang_plan: true,
                plan_dropped: dropped.clone(),
                ..Default::default()
            },
            Arc::new(NoopMemory),
        );

        let req = request(ContextScope::Full);
        let turn = tokio::time::timeout(Duration::from_millis(10), svc.build_context(&req)).await;
        assert!(turn.is_err());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn every_turn_is_recorded() {
        let svc = service(ScriptedSource::default(), Arc::new(NoopMemory));
        svc.build_context(&request(ContextScope::Budget)).await;
        svc.build_context(&request(ContextScope::Budget)).await;

        wait_for_records(svc.debugger(), 2).await;
        let report = svc.debugger().report();
        assert_eq!(report.total_requests, 2);
        assert_eq!(report.most_common_scope, Some(("budget".into(), 2)));
    }
}
