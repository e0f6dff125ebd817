//! Core analytics for TaskLens.
//!
//! Turns a user's task history into categorized, human-readable
//! recommendations and a per-user ranking of relevant tasks. Storage is
//! reached only through the collaborator traits in [`repo`].

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scoring;
pub mod service;

pub use config::{ConfigError, EngineConfig, RecommendationPolicy, ScoringConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::recommendation::{Recommendation, RecommendationCategory, RecommendationId};
pub use model::task::{Plan, PlanStep, Task, TaskId};
pub use model::{now_epoch_ms, UserId};
pub use repo::recommendation_repo::{RecommendationStore, SqliteRecommendationRepository};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskHistoryStore};
pub use scoring::features::{build_interactions, task_rating, InteractionRecord};
pub use scoring::model::ModelSnapshot;
pub use scoring::ranker::{ModelState, RankedTask, TaskRanker, DEFAULT_TOP_K};
pub use service::recommendation_service::RecommendationService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
