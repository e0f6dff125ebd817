//! Interaction feature builder and proxy rating.

use crate::model::task::{Task, TaskId};
use crate::model::UserId;
use crate::repo::task_repo::{RepoResult, TaskHistoryStore};

pub const BASE_RATING: f64 = 0.5;
pub const COMPLETED_BONUS: f64 = 0.3;
pub const STEP_BONUS: f64 = 0.1;
pub const MAX_STEP_BONUS: f64 = 0.2;
pub const OPEN_DEADLINE_BONUS: f64 = 0.2;
/// Rating placeholder for pairs whose rating is being predicted.
pub const UNKNOWN_RATING: f64 = 0.0;

/// One (user, task) training or scoring sample.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub task_id: TaskId,
    /// Proxy label in `[0, 1]`.
    pub rating: f64,
    /// Task creation time, epoch milliseconds.
    pub timestamp: i64,
}

impl InteractionRecord {
    /// Builds the training sample for one task.
    pub fn from_task(task: &Task, now: i64) -> Self {
        Self {
            user_id: task.user_id.clone(),
            task_id: task.id,
            rating: task_rating(task, now),
            timestamp: task.created_at,
        }
    }

    /// Builds a scoring query for a pairing that may never have been observed.
    pub fn query(user_id: &str, task: &Task) -> Self {
        Self {
            user_id: user_id.to_string(),
            task_id: task.id,
            rating: UNKNOWN_RATING,
            timestamp: task.created_at,
        }
    }
}

/// Derives the proxy engagement rating for a task at evaluation time `now`.
///
/// Base 0.5, plus completion, plan-size and open-deadline bonuses, clamped to
/// `[0, 1]`.
pub fn task_rating(task: &Task, now: i64) -> f64 {
    let mut rating = BASE_RATING;
    if task.is_completed {
        rating += COMPLETED_BONUS;
    }
    if let Some(steps) = task.step_count() {
        rating += (steps as f64 * STEP_BONUS).min(MAX_STEP_BONUS);
    }
    if task.deadline > now {
        rating += OPEN_DEADLINE_BONUS;
    }
    rating.clamp(0.0, 1.0)
}

/// Builds one interaction record per task, in corpus order.
pub fn build_interactions(tasks: &[Task], now: i64) -> Vec<InteractionRecord> {
    tasks
        .iter()
        .map(|task| InteractionRecord::from_task(task, now))
        .collect()
}

/// Fetches the full task corpus and builds its interaction set.
pub fn collect_interactions<S: TaskHistoryStore + ?Sized>(
    store: &S,
    now: i64,
) -> RepoResult<Vec<InteractionRecord>> {
    let tasks = store.fetch_all_tasks()?;
    Ok(build_interactions(&tasks, now))
}

#[cfg(test)]
mod tests {
    use super::{build_interactions, task_rating, InteractionRecord, UNKNOWN_RATING};
    use crate::model::task::{Plan, Task};

    const NOW: i64 = 1_000_000;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn open_task_with_past_deadline_keeps_base_rating() {
        let task = Task::new("u1", "t", 0, NOW - 1);
        assert_close(task_rating(&task, NOW), 0.5);
    }

    #[test]
    fn deadline_equal_to_now_is_not_in_the_future() {
        let task = Task::new("u1", "t", 0, NOW);
        assert_close(task_rating(&task, NOW), 0.5);
    }

    #[test]
    fn completed_future_task_with_two_or_more_steps_clamps_at_one() {
        for steps in [2, 3, 10] {
            let mut task = Task::new("u1", "t", 0, NOW + 1);
            task.is_completed = true;
            task.plan = Some(Plan::from_descriptions(vec!["s"; steps]));
            assert_close(task_rating(&task, NOW), 1.0);
        }
    }

    #[test]
    fn step_bonus_is_capped() {
        let mut task = Task::new("u1", "t", 0, NOW - 1);
        task.plan = Some(Plan::from_descriptions(["a"]));
        assert_close(task_rating(&task, NOW), 0.6);

        task.plan = Some(Plan::from_descriptions(vec!["a"; 7]));
        assert_close(task_rating(&task, NOW), 0.7);

        task.plan = Some(Plan::default());
        assert_close(task_rating(&task, NOW), 0.5);
    }

    #[test]
    fn completed_with_past_deadline_and_one_step() {
        let mut task = Task::new("u1", "t", 0, NOW - 1);
        task.is_completed = true;
        task.plan = Some(Plan::from_descriptions(["a"]));
        assert_close(task_rating(&task, NOW), 0.9);
    }

    #[test]
    fn build_interactions_covers_every_task_and_uses_creation_time() {
        let first = Task::new("u1", "a", 10, NOW + 1);
        let second = Task::new("u2", "b", 20, NOW - 1);
        let records = build_interactions(&[first.clone(), second.clone()], NOW);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_id, "u1");
        assert_eq!(records[0].task_id, first.id);
        assert_eq!(records[0].timestamp, 10);
        assert_close(records[0].rating, 0.7);
        assert_eq!(records[1].user_id, "u2");
        assert_eq!(records[1].timestamp, 20);
        assert_close(records[1].rating, 0.5);
    }

    #[test]
    fn query_record_uses_placeholder_rating() {
        let task = Task::new("owner", "a", 10, NOW + 1);
        let record = InteractionRecord::query("someone-else", &task);
        assert_eq!(record.user_id, "someone-else");
        assert_eq!(record.rating, UNKNOWN_RATING);
    }
}
