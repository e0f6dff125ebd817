//! Heuristic recommendation use-case service.
//!
//! # Responsibility
//! - Turn aggregate statistics over a user's recent tasks into categorized
//!   recommendations.
//! - Expose owner-scoped listing and read-marking.
//!
//! # Invariants
//! - All four checks run independently on every generation pass.
//! - Each emission is its own store write; earlier writes are kept when a
//!   later one fails, and re-running may repeat a category.
//! - Read-marking never touches a recommendation owned by another user.

use crate::config::RecommendationPolicy;
use crate::model::recommendation::{Recommendation, RecommendationCategory, RecommendationId};
use crate::model::task::Task;
use crate::model::{epoch_day, now_epoch_ms};
use crate::repo::recommendation_repo::RecommendationStore;
use crate::repo::task_repo::{RepoResult, TaskHistoryStore};
use log::{error, info};
use std::collections::BTreeMap;

const PRODUCTIVITY_TEXT: &str = "Your task completion rate is below 50%. Consider breaking \
complex tasks into smaller subtasks to make steadier progress.";
const BALANCE_TEXT: &str = "Your workload was spread unevenly across the week. Try distributing \
tasks more evenly for a more balanced schedule.";
const COMPLEXITY_TEXT: &str = "You have many complex tasks with lots of steps. Consider \
delegating some of them or splitting them into smaller pieces.";

/// Aggregate statistics over the tasks in one analysis window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats {
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
    /// Task count per UTC calendar day of creation, keyed by epoch day.
    pub tasks_per_day: BTreeMap<i64, usize>,
    /// Tasks whose plan exceeds the policy step threshold.
    pub complex: usize,
}

impl WindowStats {
    /// Computes window statistics at evaluation time `now`.
    pub fn compute(tasks: &[Task], now: i64, policy: &RecommendationPolicy) -> Self {
        let mut tasks_per_day = BTreeMap::new();
        for task in tasks {
            *tasks_per_day.entry(epoch_day(task.created_at)).or_insert(0) += 1;
        }

        Self {
            total: tasks.len(),
            completed: tasks.iter().filter(|task| task.is_completed).count(),
            overdue: tasks.iter().filter(|task| task.is_overdue(now)).count(),
            tasks_per_day,
            complex: tasks
                .iter()
                .filter(|task| {
                    task.step_count()
                        .is_some_and(|steps| steps > policy.complex_task_min_steps)
                })
                .count(),
        }
    }

    /// Completed share of all tasks; `0.0` for an empty window.
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Difference between the busiest and quietest creation day.
    pub fn daily_spread(&self) -> usize {
        let max = self.tasks_per_day.values().max().copied().unwrap_or(0);
        let min = self.tasks_per_day.values().min().copied().unwrap_or(0);
        max - min
    }
}

/// A recommendation the policy wants emitted, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub category: RecommendationCategory,
    pub text: String,
}

fn deadline_text(overdue: usize) -> String {
    let noun = if overdue == 1 { "task" } else { "tasks" };
    format!(
        "Last week you had {overdue} overdue {noun}. Try planning your time more carefully \
and setting more realistic deadlines."
    )
}

/// Applies the policy thresholds to window statistics.
///
/// Returns findings in category evaluation order: deadline, productivity,
/// balance, complexity.
pub fn evaluate(stats: &WindowStats, policy: &RecommendationPolicy) -> Vec<Finding> {
    let mut findings = Vec::new();

    if stats.overdue > 0 {
        findings.push(Finding {
            category: RecommendationCategory::Deadline,
            text: deadline_text(stats.overdue),
        });
    }

    if stats.completion_rate() < policy.min_completion_rate {
        findings.push(Finding {
            category: RecommendationCategory::Productivity,
            text: PRODUCTIVITY_TEXT.to_string(),
        });
    }

    if stats.daily_spread() > policy.max_daily_spread {
        findings.push(Finding {
            category: RecommendationCategory::Balance,
            text: BALANCE_TEXT.to_string(),
        });
    }

    if stats.complex > policy.max_complex_tasks {
        findings.push(Finding {
            category: RecommendationCategory::Complexity,
            text: COMPLEXITY_TEXT.to_string(),
        });
    }

    findings
}

/// Recommendation service over task history and recommendation stores.
pub struct RecommendationService<T: TaskHistoryStore, R: RecommendationStore> {
    tasks: T,
    recommendations: R,
    policy: RecommendationPolicy,
}

impl<T: TaskHistoryStore, R: RecommendationStore> RecommendationService<T, R> {
    /// Creates a service with the default policy.
    pub fn new(tasks: T, recommendations: R) -> Self {
        Self::with_policy(tasks, recommendations, RecommendationPolicy::default())
    }

    pub fn with_policy(tasks: T, recommendations: R, policy: RecommendationPolicy) -> Self {
        Self {
            tasks,
            recommendations,
            policy,
        }
    }

    pub fn policy(&self) -> &RecommendationPolicy {
        &self.policy
    }

    /// Analyzes the trailing window ending now and persists findings.
    pub fn generate_recommendations(&self, user_id: &str) -> RepoResult<Vec<Recommendation>> {
        self.generate_recommendations_at(user_id, now_epoch_ms())
    }

    /// Analyzes the window ending at `now` and persists one recommendation
    /// per finding.
    ///
    /// An empty window is a successful no-op. Store failures propagate; any
    /// recommendation already inserted during this call stays persisted.
    pub fn generate_recommendations_at(
        &self,
        user_id: &str,
        now: i64,
    ) -> RepoResult<Vec<Recommendation>> {
        let since = self.policy.window_start(now);
        let tasks = self.tasks.fetch_tasks_for_user(user_id, since)?;
        if tasks.is_empty() {
            info!("event=recommendations_generate module=service status=ok tasks=0 emitted=0");
            return Ok(Vec::new());
        }

        let stats = WindowStats::compute(&tasks, now, &self.policy);
        let mut stored = Vec::new();
        for finding in evaluate(&stats, &self.policy) {
            let recommendation = Recommendation::new(user_id, finding.category, finding.text, now);
            match self.recommendations.insert(&recommendation) {
                Ok(saved) => stored.push(saved),
                Err(err) => {
                    error!(
                        "event=recommendations_generate module=service status=error category={} emitted={} error={err}",
                        finding.category.as_str(),
                        stored.len()
                    );
                    return Err(err);
                }
            }
        }

        info!(
            "event=recommendations_generate module=service status=ok tasks={} emitted={}",
            stats.total,
            stored.len()
        );
        Ok(stored)
    }

    /// Lists the user's recommendations, newest first.
    pub fn get_user_recommendations(&self, user_id: &str) -> RepoResult<Vec<Recommendation>> {
        self.recommendations.list_by_user(user_id)
    }

    /// Marks one owned recommendation as read.
    ///
    /// Returns `false` without mutation when the id does not exist or is
    /// owned by someone else.
    pub fn mark_as_read(&self, id: RecommendationId, user_id: &str) -> RepoResult<bool> {
        let Some(mut recommendation) = self.recommendations.find_by_id(id, user_id)? else {
            return Ok(false);
        };
        if !recommendation.is_owned_by(user_id) {
            return Ok(false);
        }

        recommendation.mark_read();
        self.recommendations.save(&recommendation)?;
        Ok(true)
    }
}
