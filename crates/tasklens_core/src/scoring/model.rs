//! Identity-feature logistic scorer.
//!
//! The model reconstructs proxy ratings from user and task identity alone:
//! `score = sigmoid(bias + user_weight[user] + task_weight[task])`, fit by
//! deterministic full-batch gradient descent on soft labels. It memorizes the
//! training corpus; ids never seen in training contribute a zero weight.
//!
//! # Invariants
//! - A snapshot is immutable once built.
//! - Training on an empty corpus yields a valid snapshot scoring `0.5`.
//! - Training the same records with the same config yields identical weights.

use crate::config::ScoringConfig;
use crate::model::task::TaskId;
use crate::model::UserId;
use crate::scoring::features::InteractionRecord;
use std::collections::HashMap;

/// Trained, read-only scoring model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    bias: f64,
    user_weights: HashMap<UserId, f64>,
    task_weights: HashMap<TaskId, f64>,
    trained_at: i64,
    interaction_count: usize,
}

impl ModelSnapshot {
    /// Fits a new snapshot to `records`.
    pub fn train(records: &[InteractionRecord], config: &ScoringConfig, trained_at: i64) -> Self {
        let mut user_index: HashMap<&str, usize> = HashMap::new();
        let mut task_index: HashMap<TaskId, usize> = HashMap::new();
        let mut samples = Vec::with_capacity(records.len());
        for record in records {
            let next_user = user_index.len();
            let user = *user_index.entry(record.user_id.as_str()).or_insert(next_user);
            let next_task = task_index.len();
            let task = *task_index.entry(record.task_id).or_insert(next_task);
            samples.push((user, task, record.rating.clamp(0.0, 1.0)));
        }

        let mut bias = 0.0;
        let mut users = vec![0.0; user_index.len()];
        let mut tasks = vec![0.0; task_index.len()];

        if !samples.is_empty() {
            let mut user_counts = vec![0.0_f64; users.len()];
            let mut task_counts = vec![0.0_f64; tasks.len()];
            for &(user, task, _) in &samples {
                user_counts[user] += 1.0;
                task_counts[task] += 1.0;
            }
            let sample_count = samples.len() as f64;
            let rate = config.learning_rate;
            let l2 = config.l2_penalty;

            let mut user_grads = vec![0.0; users.len()];
            let mut task_grads = vec![0.0; tasks.len()];
            for _ in 0..config.epochs {
                let mut bias_grad = 0.0;
                user_grads.iter_mut().for_each(|grad| *grad = 0.0);
                task_grads.iter_mut().for_each(|grad| *grad = 0.0);

                for &(user, task, label) in &samples {
                    let residual = sigmoid(bias + users[user] + tasks[task]) - label;
                    bias_grad += residual;
                    user_grads[user] += residual;
                    task_grads[task] += residual;
                }

                bias -= rate * bias_grad / sample_count;
                for (index, weight) in users.iter_mut().enumerate() {
                    *weight -= rate * (user_grads[index] / user_counts[index] + l2 * *weight);
                }
                for (index, weight) in tasks.iter_mut().enumerate() {
                    *weight -= rate * (task_grads[index] / task_counts[index] + l2 * *weight);
                }
            }
        }

        Self {
            bias,
            user_weights: user_index
                .into_iter()
                .map(|(user, index)| (user.to_string(), users[index]))
                .collect(),
            task_weights: task_index
                .into_iter()
                .map(|(task, index)| (task, tasks[index]))
                .collect(),
            trained_at,
            interaction_count: samples.len(),
        }
    }

    /// Predicted relevance in `(0, 1)`. The record's rating is ignored.
    pub fn score(&self, record: &InteractionRecord) -> f64 {
        let user = self
            .user_weights
            .get(record.user_id.as_str())
            .copied()
            .unwrap_or(0.0);
        let task = self.task_weights.get(&record.task_id).copied().unwrap_or(0.0);
        sigmoid(self.bias + user + task)
    }

    /// Epoch milliseconds at which this snapshot was trained.
    pub fn trained_at(&self) -> i64 {
        self.trained_at
    }

    pub fn interaction_count(&self) -> usize {
        self.interaction_count
    }

    pub fn user_count(&self) -> usize {
        self.user_weights.len()
    }

    pub fn task_count(&self) -> usize {
        self.task_weights.len()
    }

    /// Whether the snapshot is older than `max_age_ms` at `now`.
    pub fn is_stale(&self, now: i64, max_age_ms: Option<i64>) -> bool {
        max_age_ms.is_some_and(|max_age| now.saturating_sub(self.trained_at) > max_age)
    }
}

fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}
