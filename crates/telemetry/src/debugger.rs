//! Running statistics over assembled contexts.

use sanskara_core::context::{ContextRequest, OrchestratorContext};
use serde::{Serialize, Serializer};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Counts per label, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distribution(Vec<(String, u64)>);

impl Distribution {
    pub fn increment(&mut self, label: &str) {
        match self.0.iter_mut().find(|(name, _)| name == label) {
            Some((_, count)) => *count += 1,
            None => self.0.push((label.to_owned(), 1)),
        }
    }

    pub fn get(&self, label: &str) -> u64 {
        self.0
            .iter()
            .find(|(name, _)| name == label)
            .map_or(0, |(_, count)| *count)
    }

    /// Highest count; on ties, the label seen first.
    pub fn most_common(&self) -> Option<(&str, u64)> {
        self.0
            .iter()
            .fold(None, |best: Option<(&str, u64)>, (name, count)| match best {
                Some((_, top)) if top >= *count => best,
                _ => Some((name.as_str(), *count)),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[derive(Debug, Default)]
struct ContextStats {
    total_requests: u64,
    by_intent: Distribution,
    by_scope: Distribution,
    avg_context_size: f64,
}

/// Snapshot returned by [`ContextDebugger::report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyReport {
    pub total_requests: u64,
    pub most_common_intent: Option<(String, u64)>,
    pub most_common_scope: Option<(String, u64)>,
    /// Rounded to two decimals.
    pub avg_context_size_chars: f64,
    pub intent_distribution: Distribution,
    pub scope_distribution: Distribution,
}

/// Passive observer of context assembly.
///
/// Owned by the context service and shared by reference; there is no reset
/// short of dropping it. All methods take `&self` and never panic: a
/// poisoned lock is recovered, since the stats stay internally consistent
/// between updates.
#[derive(Debug, Default)]
pub struct ContextDebugger {
    stats: Mutex<ContextStats>,
}

impl ContextDebugger {
    pub fn new() -> Self {
        Self::default()
    }

    fn stats(&self) -> MutexGuard<'_, ContextStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one assembled context. Its size is the character count of its
    /// JSON serialization (0 if it cannot be serialized).
    pub fn record(&self, request: &ContextRequest, context: &OrchestratorContext) {
        let size = serde_json::to_string(context).map_or(0, |s| s.chars().count());
        self.record_size(request.intent().as_str(), request.scope().as_str(), size);
    }

    /// Record one assembly by label and size.
    pub fn record_size(&self, intent: &str, scope: &str, size: usize) {
        {
            let mut stats = self.stats();
            stats.total_requests += 1;
            stats.by_intent.increment(intent);
            stats.by_scope.increment(scope);
            let n = stats.total_requests as f64;
            stats.avg_context_size += (size as f64 - stats.avg_context_size) / n;
        }
        info!(intent, scope, size, "Context request logged");
    }

    pub fn total_requests(&self) -> u64 {
        self.stats().total_requests
    }

    /// Unrounded running mean of recorded sizes.
    pub fn average_size(&self) -> f64 {
        self.stats().avg_context_size
    }

    pub fn report(&self) -> EfficiencyReport {
        let stats = self.stats();
        let owned = |(name, count): (&str, u64)| (name.to_owned(), count);
        EfficiencyReport {
            total_requests: stats.total_requests,
            most_common_intent: stats.by_intent.most_common().map(owned),
            most_common_scope: stats.by_scope.most_common().map(owned),
            avg_context_size_chars: (stats.avg_context_size * 100.0).round() / 100.0,
            intent_distribution: stats.by_intent.clone(),
            scope_distribution: stats.by_scope.clone(),
        }
    }

    /// Log how much smaller a new context is than an old one; returns the
    /// reduction in percent (0 when `old_size` is 0).
    pub fn log_context_comparison(&self, old_size: usize, new_size: usize, intent: &str) -> f64 {
        let reduction = if old_size > 0 {
            (old_size as f64 - new_size as f64) / old_size as f64 * 100.0
        } else {
            0.0
        };
        info!(
            intent,
            old_size,
            new_size,
            reduction_percent = %format!("{reduction:.1}"),
            "Context size comparison"
        );
        reduction
    }
}
