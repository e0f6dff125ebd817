//! Task ranking over a shared, swappable model snapshot.
//!
//! # Responsibility
//! - Own the process-wide trained model and its lifecycle.
//! - Rank the full task corpus for one user.
//!
//! # Invariants
//! - State machine: `Untrained -> Training -> Trained`; a retrain moves
//!   `Trained -> Training -> Trained` and keeps serving the old snapshot
//!   until the new one is swapped in.
//! - Scoring captures one `Arc<ModelSnapshot>` per call and never observes a
//!   partially replaced model.
//! - Ranking without a snapshot trains first; it never reports "untrained".
//!   Concurrent lazy trainings are collapsed into one.
//! - Each training takes a generation when it starts. A finished training is
//!   installed only if no later-started training has been installed already.
//! - Results are sorted by descending score, ties by ascending task id.

use crate::config::ScoringConfig;
use crate::model::now_epoch_ms;
use crate::model::task::Task;
use crate::repo::task_repo::{RepoResult, TaskHistoryStore};
use crate::scoring::features::{collect_interactions, InteractionRecord};
use crate::scoring::model::ModelSnapshot;
use log::{debug, error, info};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

/// Number of tasks returned when callers do not specify one.
pub const DEFAULT_TOP_K: usize = 5;

/// Observable lifecycle state of the ranker's model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// No snapshot has been trained yet.
    Untrained,
    /// At least one training pass is in flight.
    Training,
    /// A snapshot is available and no training is in flight.
    Trained,
}

/// One ranked candidate with its predicted score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTask {
    pub task: Task,
    pub score: f64,
}

#[derive(Debug, Default)]
struct ModelSlot {
    snapshot: Option<Arc<ModelSnapshot>>,
    /// Generation of `snapshot`; 0 while untrained.
    installed_generation: u64,
    next_generation: u64,
    trainings_in_flight: usize,
}

/// Trainable task ranker backed by a task history store.
pub struct TaskRanker<S: TaskHistoryStore> {
    store: S,
    config: ScoringConfig,
    slot: RwLock<ModelSlot>,
    lazy_training: Mutex<()>,
}

impl<S: TaskHistoryStore> TaskRanker<S> {
    /// Creates an untrained ranker.
    pub fn new(store: S, config: ScoringConfig) -> Self {
        Self {
            store,
            config,
            slot: RwLock::new(ModelSlot::default()),
            lazy_training: Mutex::new(()),
        }
    }

    pub fn state(&self) -> ModelState {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        if slot.trainings_in_flight > 0 {
            ModelState::Training
        } else if slot.snapshot.is_some() {
            ModelState::Trained
        } else {
            ModelState::Untrained
        }
    }

    /// Returns the current snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<ModelSnapshot>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// Retrains from the full task corpus using the current time.
    pub fn train(&self) -> RepoResult<Arc<ModelSnapshot>> {
        self.train_at(now_epoch_ms())
    }

    /// Retrains from the full task corpus, deriving ratings at `now`.
    ///
    /// The previous snapshot keeps serving readers until the swap. On error
    /// the previous snapshot stays in place.
    ///
    /// Returns the snapshot serving after this call. When a training that
    /// started later has already been installed, the result of this one is
    /// discarded and the installed snapshot is returned instead.
    pub fn train_at(&self, now: i64) -> RepoResult<Arc<ModelSnapshot>> {
        let started_at = Instant::now();
        let generation = {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            slot.trainings_in_flight += 1;
            slot.next_generation += 1;
            slot.next_generation
        };

        let result = collect_interactions(&self.store, now)
            .map(|records| Arc::new(ModelSnapshot::train(&records, &self.config, now)));

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.trainings_in_flight -= 1;
        match result {
            Ok(snapshot) => {
                let serving = match slot.snapshot.clone() {
                    Some(current) if slot.installed_generation > generation => current,
                    _ => {
                        slot.snapshot = Some(Arc::clone(&snapshot));
                        slot.installed_generation = generation;
                        Arc::clone(&snapshot)
                    }
                };
                let status = if Arc::ptr_eq(&serving, &snapshot) {
                    "ok"
                } else {
                    "superseded"
                };
                drop(slot);
                info!(
                    "event=model_train module=scoring status={status} generation={generation} interactions={} users={} tasks={} duration_ms={}",
                    snapshot.interaction_count(),
                    snapshot.user_count(),
                    snapshot.task_count(),
                    started_at.elapsed().as_millis()
                );
                Ok(serving)
            }
            Err(err) => {
                drop(slot);
                error!(
                    "event=model_train module=scoring status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Returns up to `top_k` tasks most relevant to `user_id`.
    pub fn rank(&self, user_id: &str, top_k: usize) -> RepoResult<Vec<Task>> {
        self.rank_at(user_id, top_k, now_epoch_ms())
    }

    /// [`Self::rank`] with an explicit evaluation time.
    pub fn rank_at(&self, user_id: &str, top_k: usize, now: i64) -> RepoResult<Vec<Task>> {
        Ok(self
            .rank_scored_at(user_id, top_k, now)?
            .into_iter()
            .map(|ranked| ranked.task)
            .collect())
    }

    /// Ranks candidates and keeps their scores.
    pub fn rank_scored_at(
        &self,
        user_id: &str,
        top_k: usize,
        now: i64,
    ) -> RepoResult<Vec<RankedTask>> {
        let snapshot = match self.fresh_snapshot(now) {
            Some(snapshot) => snapshot,
            None => self.train_lazily(now)?,
        };

        let candidates = self.store.fetch_all_tasks()?;
        let candidate_count = candidates.len();
        let mut ranked: Vec<RankedTask> = candidates
            .into_iter()
            .map(|task| {
                let score = snapshot.score(&InteractionRecord::query(user_id, &task));
                RankedTask { task, score }
            })
            .collect();
        ranked.sort_by(compare_ranked);
        ranked.truncate(top_k);

        debug!(
            "event=rank module=scoring status=ok candidates={candidate_count} returned={} top_k={top_k}",
            ranked.len()
        );
        Ok(ranked)
    }
}

impl<S: TaskHistoryStore> TaskRanker<S> {
    fn fresh_snapshot(&self, now: i64) -> Option<Arc<ModelSnapshot>> {
        self.snapshot()
            .filter(|snapshot| !snapshot.is_stale(now, self.config.stale_after_ms))
    }

    /// Trains on behalf of `rank`, unless another ranking call already did
    /// while this one waited.
    fn train_lazily(&self, now: i64) -> RepoResult<Arc<ModelSnapshot>> {
        let _guard = self
            .lazy_training
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match self.fresh_snapshot(now) {
            Some(snapshot) => Ok(snapshot),
            None => self.train_at(now),
        }
    }
}

fn compare_ranked(left: &RankedTask, right: &RankedTask) -> Ordering {
    right
        .score
        .total_cmp(&left.score)
        .then_with(|| left.task.id.cmp(&right.task.id))
}
