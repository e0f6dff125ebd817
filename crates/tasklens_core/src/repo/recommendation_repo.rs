//! Recommendation store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist generated recommendations and their read state.
//! - Scope every lookup and mutation to the owning user.
//!
//! # Invariants
//! - Listing order is `created_at DESC`, newest insert first on ties.
//! - `save` only persists `is_read`; all other fields are immutable.

use crate::model::recommendation::{Recommendation, RecommendationCategory, RecommendationId};
use crate::repo::task_repo::{RepoError, RepoResult};
use crate::repo::{bool_to_int, ensure_connection_ready, int_to_bool, parse_uuid};
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECOMMENDATION_SELECT_SQL: &str = "SELECT
    uuid,
    user_id,
    text,
    created_at,
    is_read,
    category
FROM recommendations";

/// Persistence contract for recommendation records.
pub trait RecommendationStore {
    /// Persists a new record and returns it as stored.
    fn insert(&self, recommendation: &Recommendation) -> RepoResult<Recommendation>;
    /// Finds a record by id, visible only to its owner.
    fn find_by_id(
        &self,
        id: RecommendationId,
        user_id: &str,
    ) -> RepoResult<Option<Recommendation>>;
    fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Recommendation>>;
    /// Persists an in-place mutation of an existing record.
    fn save(&self, recommendation: &Recommendation) -> RepoResult<()>;
}

impl<S: RecommendationStore + ?Sized> RecommendationStore for &S {
    fn insert(&self, recommendation: &Recommendation) -> RepoResult<Recommendation> {
        (**self).insert(recommendation)
    }

    fn find_by_id(
        &self,
        id: RecommendationId,
        user_id: &str,
    ) -> RepoResult<Option<Recommendation>> {
        (**self).find_by_id(id, user_id)
    }

    fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Recommendation>> {
        (**self).list_by_user(user_id)
    }

    fn save(&self, recommendation: &Recommendation) -> RepoResult<()> {
        (**self).save(recommendation)
    }
}

/// SQLite-backed recommendation repository.
pub struct SqliteRecommendationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecommendationRepository<'conn> {
    /// Binds to a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["recommendations"])?;
        Ok(Self { conn })
    }
}

impl RecommendationStore for SqliteRecommendationRepository<'_> {
    fn insert(&self, recommendation: &Recommendation) -> RepoResult<Recommendation> {
        if recommendation.user_id.trim().is_empty() {
            return Err(RepoError::Validation(
                "recommendation user_id cannot be empty".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO recommendations (
                uuid,
                user_id,
                text,
                created_at,
                is_read,
                category
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                recommendation.id.to_string(),
                recommendation.user_id.as_str(),
                recommendation.text.as_str(),
                recommendation.created_at,
                bool_to_int(recommendation.is_read),
                recommendation.category.as_str(),
            ],
        )?;

        self.find_by_id(recommendation.id, &recommendation.user_id)?
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "recommendation {} missing after insert",
                    recommendation.id
                ))
            })
    }

    fn find_by_id(
        &self,
        id: RecommendationId,
        user_id: &str,
    ) -> RepoResult<Option<Recommendation>> {
        let row = self
            .conn
            .query_row(
                &format!("{RECOMMENDATION_SELECT_SQL} WHERE uuid = ?1 AND user_id = ?2;"),
                params![id.to_string(), user_id],
                |row| Ok(parse_recommendation_row(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Recommendation>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECOMMENDATION_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut recommendations = Vec::new();
        while let Some(row) = rows.next()? {
            recommendations.push(parse_recommendation_row(row)?);
        }
        Ok(recommendations)
    }

    fn save(&self, recommendation: &Recommendation) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE recommendations
             SET is_read = ?1
             WHERE uuid = ?2 AND user_id = ?3;",
            params![
                bool_to_int(recommendation.is_read),
                recommendation.id.to_string(),
                recommendation.user_id.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(recommendation.id));
        }
        Ok(())
    }
}

fn parse_recommendation_row(row: &Row<'_>) -> RepoResult<Recommendation> {
    let uuid_text: String = row.get("uuid")?;
    let category_text: String = row.get("category")?;
    let category = RecommendationCategory::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in recommendations.category"
        ))
    })?;

    Ok(Recommendation {
        id: parse_uuid(&uuid_text, "recommendations.uuid")?,
        user_id: row.get("user_id")?,
        text: row.get("text")?,
        created_at: row.get("created_at")?,
        is_read: int_to_bool(row.get("is_read")?, "recommendations.is_read")?,
        category,
    })
}
