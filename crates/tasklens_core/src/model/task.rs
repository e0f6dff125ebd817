//! Task history model.
//!
//! # Responsibility
//! - Carry task records (with optional plans) from storage into analytics.
//!
//! # Invariants
//! - Tasks are read-only to analytics and ranking code.
//! - Plan steps keep their stored order.

use super::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// One unit of work owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub deadline: i64,
    pub is_completed: bool,
    pub plan: Option<Plan>,
}

/// Ordered breakdown of a task into steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
}

impl Task {
    /// Creates an open task with a generated id and no plan.
    pub fn new(
        user_id: impl Into<UserId>,
        title: impl Into<String>,
        created_at: i64,
        deadline: i64,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), user_id, title, created_at, deadline)
    }

    /// Creates an open task with a caller-provided id.
    ///
    /// Used by import paths and fixtures where identity already exists.
    pub fn with_id(
        id: TaskId,
        user_id: impl Into<UserId>,
        title: impl Into<String>,
        created_at: i64,
        deadline: i64,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            title: title.into(),
            created_at,
            deadline,
            is_completed: false,
            plan: None,
        }
    }

    /// Number of plan steps, or `None` when no plan is attached.
    pub fn step_count(&self) -> Option<usize> {
        self.plan.as_ref().map(|plan| plan.steps.len())
    }

    /// Whether the deadline has passed at `now` without completion.
    pub fn is_overdue(&self, now: i64) -> bool {
        self.deadline < now && !self.is_completed
    }
}

impl Plan {
    /// Builds a plan whose steps carry the given descriptions in order.
    pub fn from_descriptions<I, S>(descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: descriptions
                .into_iter()
                .map(|description| PlanStep {
                    description: description.into(),
                })
                .collect(),
        }
    }
}
