//! Task history contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide read access to task history (with nested plans) for analytics.
//! - Provide create/update paths used by import and fixtures.
//!
//! # Invariants
//! - Task lists are ordered by `created_at ASC, uuid ASC`.
//! - A task's plan and its steps are written in the same transaction as the
//!   task row.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::task::{Plan, PlanStep, Task, TaskId};
use crate::repo::{bool_to_int, ensure_connection_ready, int_to_bool, parse_uuid};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    user_id,
    title,
    created_at,
    deadline,
    is_completed
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by task and recommendation stores.
#[derive(Debug)]
pub enum RepoError {
    /// Store unavailable or query failed.
    Db(DbError),
    NotFound(Uuid),
    /// Write input rejected before reaching SQL.
    Validation(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Validation(message) => write!(f, "invalid input: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "repository requires table `{table}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read contract over a user's task history.
pub trait TaskHistoryStore {
    /// Returns the user's tasks with `created_at >= since`.
    fn fetch_tasks_for_user(&self, user_id: &str, since: i64) -> RepoResult<Vec<Task>>;
    /// Returns every task of every user.
    fn fetch_all_tasks(&self) -> RepoResult<Vec<Task>>;
}

impl<S: TaskHistoryStore + ?Sized> TaskHistoryStore for &S {
    fn fetch_tasks_for_user(&self, user_id: &str, since: i64) -> RepoResult<Vec<Task>> {
        (**self).fetch_tasks_for_user(user_id, since)
    }

    fn fetch_all_tasks(&self) -> RepoResult<Vec<Task>> {
        (**self).fetch_all_tasks()
    }
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Binds to a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["tasks", "plans", "plan_steps"])?;
        Ok(Self { conn })
    }

    /// Inserts a task together with its plan.
    pub fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        validate_task(task)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO tasks (
                uuid,
                user_id,
                title,
                created_at,
                deadline,
                is_completed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                task.id.to_string(),
                task.user_id.as_str(),
                task.title.as_str(),
                task.created_at,
                task.deadline,
                bool_to_int(task.is_completed),
            ],
        )?;
        write_plan(&tx, task)?;
        tx.commit()?;

        Ok(task.id)
    }

    /// Replaces task fields and its plan by stable id.
    pub fn update_task(&self, task: &Task) -> RepoResult<()> {
        validate_task(task)?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE tasks
             SET
                user_id = ?1,
                title = ?2,
                created_at = ?3,
                deadline = ?4,
                is_completed = ?5
             WHERE uuid = ?6;",
            params![
                task.user_id.as_str(),
                task.title.as_str(),
                task.created_at,
                task.deadline,
                bool_to_int(task.is_completed),
                task.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(task.id));
        }

        tx.execute("DELETE FROM plans WHERE task_uuid = ?1;", [task.id.to_string()])?;
        write_plan(&tx, task)?;
        tx.commit()?;
        Ok(())
    }

    /// Gets one task by id.
    pub fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut task = parse_task_row(row)?;
            task.plan = load_plan(self.conn, &task.id)?;
            return Ok(Some(task));
        }
        Ok(None)
    }

    fn query_tasks(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        for task in &mut tasks {
            task.plan = load_plan(self.conn, &task.id)?;
        }
        Ok(tasks)
    }
}

impl TaskHistoryStore for SqliteTaskRepository<'_> {
    fn fetch_tasks_for_user(&self, user_id: &str, since: i64) -> RepoResult<Vec<Task>> {
        self.query_tasks(
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE user_id = ?1
                   AND created_at >= ?2
                 ORDER BY created_at ASC, uuid ASC;"
            ),
            params![user_id, since],
        )
    }

    fn fetch_all_tasks(&self) -> RepoResult<Vec<Task>> {
        self.query_tasks(
            &format!("{TASK_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"),
            [],
        )
    }
}

fn validate_task(task: &Task) -> RepoResult<()> {
    if task.user_id.trim().is_empty() {
        return Err(RepoError::Validation(format!(
            "task {} has an empty user_id",
            task.id
        )));
    }
    Ok(())
}

fn write_plan(conn: &Connection, task: &Task) -> RepoResult<()> {
    let Some(plan) = task.plan.as_ref() else {
        return Ok(());
    };

    let task_uuid = task.id.to_string();
    conn.execute("INSERT INTO plans (task_uuid) VALUES (?1);", [task_uuid.as_str()])?;
    for (position, step) in plan.steps.iter().enumerate() {
        let position = i64::try_from(position)
            .map_err(|_| RepoError::Validation(format!("too many plan steps on task {task_uuid}")))?;
        conn.execute(
            "INSERT INTO plan_steps (task_uuid, position, description) VALUES (?1, ?2, ?3);",
            params![task_uuid.as_str(), position, step.description.as_str()],
        )?;
    }
    Ok(())
}

/// Loads the plan for one task; `None` when no plan row exists.
fn load_plan(conn: &Connection, task_id: &TaskId) -> RepoResult<Option<Plan>> {
    let mut stmt = conn.prepare_cached(
        "SELECT s.description
         FROM plans p
         LEFT JOIN plan_steps s ON s.task_uuid = p.task_uuid
         WHERE p.task_uuid = ?1
         ORDER BY s.position ASC;",
    )?;
    let mut rows = stmt.query([task_id.to_string()])?;

    let mut plan: Option<Plan> = None;
    while let Some(row) = rows.next()? {
        let steps = &mut plan.get_or_insert_with(Plan::default).steps;
        if let Some(description) = row.get::<_, Option<String>>(0)? {
            steps.push(PlanStep { description });
        }
    }
    Ok(plan)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Task {
        id: parse_uuid(&uuid_text, "tasks.uuid")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
        deadline: row.get("deadline")?,
        is_completed: int_to_bool(row.get("is_completed")?, "tasks.is_completed")?,
        plan: None,
    })
}
