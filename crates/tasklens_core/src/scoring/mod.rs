//! Task relevance scoring.
//!
//! # Responsibility
//! - Derive interaction records (proxy ratings) from task history.
//! - Train an identity-feature scoring model and rank tasks per user.
//!
//! # Invariants
//! - Interaction records are rebuilt on every training pass, never persisted.
//! - Scoring always reads an immutable model snapshot.

pub mod features;
pub mod model;
pub mod ranker;
