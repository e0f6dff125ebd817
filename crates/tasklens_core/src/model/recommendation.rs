//! Recommendation model.
//!
//! # Responsibility
//! - Define the persisted, user-facing recommendation record.
//!
//! # Invariants
//! - `is_read` is the only field mutated after creation.
//! - A recommendation is owned by exactly one user and never moves.

use super::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a recommendation.
pub type RecommendationId = Uuid;

/// Fixed set of recommendation categories.
///
/// Serialized in PascalCase (`"Deadline"`) to match the external API naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendationCategory {
    /// Overdue, incomplete tasks in the analysis window.
    Deadline,
    /// Low completion rate.
    Productivity,
    /// Uneven distribution of tasks across days.
    Balance,
    /// Many tasks with long plans.
    Complexity,
}

impl RecommendationCategory {
    /// All categories in evaluation order.
    pub const ALL: [Self; 4] = [
        Self::Deadline,
        Self::Productivity,
        Self::Balance,
        Self::Complexity,
    ];

    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deadline => "deadline",
            Self::Productivity => "productivity",
            Self::Balance => "balance",
            Self::Complexity => "complexity",
        }
    }

    /// Parses a storage value produced by [`Self::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
    }
}

/// Persisted recommendation shown to its owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub user_id: UserId,
    pub text: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub is_read: bool,
    pub category: RecommendationCategory,
}

impl Recommendation {
    /// Creates an unread recommendation with a generated id.
    pub fn new(
        user_id: impl Into<UserId>,
        category: RecommendationCategory,
        text: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            text: text.into(),
            created_at,
            is_read: false,
            category,
        }
    }

    /// Whether `user_id` owns this recommendation.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}
