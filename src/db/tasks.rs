//! Task CRUD operations.

use super::{Database, StoreError, StoreResult, is_unique_violation, now_ms};
use crate::types::{NewTask, Task, TaskId, TaskPatch};
use crate::validation::{
    ValidationErrors, check_description, check_title, compute_title_hash, normalize_new,
};
use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};

const TASK_COLUMNS: &str =
    "id, title, title_hash, description, completed, created_at, updated_at";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let id: String = row.get("id")?;
    let id = TaskId::parse(&id).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("invalid task id in database: {}", id).into(),
        )
    })?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;

    Ok(Task {
        id,
        title: row.get("title")?,
        title_hash: row.get("title_hash")?,
        description: row.get("description")?,
        completed: row.get("completed")?,
        created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_default(),
        updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_default(),
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, id: &TaskId) -> StoreResult<Option<Task>> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    let task = conn
        .query_row(&sql, params![id.to_string()], parse_task_row)
        .optional()?;
    Ok(task)
}

/// Map a write error, turning UNIQUE violations into `DuplicateKey`.
fn map_write_error(err: rusqlite::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::DuplicateKey
    } else {
        StoreError::Sqlite(err)
    }
}

impl Database {
    /// All tasks, newest first.
    pub fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM tasks ORDER BY created_at DESC, rowid DESC",
                TASK_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    /// Number of stored tasks.
    pub fn count_tasks(&self) -> StoreResult<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    /// Get a task by id.
    pub fn get_task(&self, id: &TaskId) -> StoreResult<Task> {
        self.with_conn(|conn| get_task_internal(conn, id)?.ok_or(StoreError::NotFound))
    }

    /// Find the task holding a title hash, optionally ignoring one id.
    pub fn find_task_by_hash(
        &self,
        title_hash: &str,
        exclude: Option<&TaskId>,
    ) -> StoreResult<Option<Task>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM tasks WHERE title_hash = ?1 AND (?2 IS NULL OR id != ?2)",
                TASK_COLUMNS
            );
            let task = conn
                .query_row(
                    &sql,
                    params![title_hash, exclude.map(|id| id.to_string())],
                    parse_task_row,
                )
                .optional()?;
            Ok(task)
        })
    }

    /// Insert a new task.
    ///
    /// Trims and validates the input, computes the title hash, and assigns
    /// the id and timestamps. The unique index on `title_hash` decides
    /// duplicates, so two racing inserts cannot both succeed.
    pub fn insert_task(&self, new: NewTask) -> StoreResult<Task> {
        let (title, description) = normalize_new(&new.title, new.description.as_deref())?;
        let title_hash = compute_title_hash(&title);
        let id = TaskId::generate();
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, title, title_hash, description, completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    id.to_string(),
                    title,
                    title_hash,
                    description,
                    new.completed,
                    now
                ],
            )
            .map_err(map_write_error)?;

            get_task_internal(conn, &id)?.ok_or(StoreError::NotFound)
        })
    }

    /// Apply a partial update.
    ///
    /// Only the fields present in the patch are validated. The title hash is
    /// recomputed when the title changes, and `updated_at` always moves
    /// forward, even within the same millisecond.
    pub fn update_task(&self, id: &TaskId, patch: TaskPatch) -> StoreResult<Task> {
        let title = patch.title.map(|t| t.trim().to_string());
        let description = patch
            .description
            .map(|d| d.map(|d| d.trim().to_string()));

        let mut errors = ValidationErrors::new();
        if let Some(ref t) = title {
            check_title(t, &mut errors);
        }
        if let Some(Some(ref d)) = description {
            check_description(d, &mut errors);
        }
        errors.into_result()?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let current = get_task_internal(&tx, id)?.ok_or(StoreError::NotFound)?;

            let (new_title, new_hash) = match title {
                Some(t) if t != current.title => {
                    let hash = compute_title_hash(&t);
                    (t, hash)
                }
                _ => (current.title.clone(), current.title_hash.clone()),
            };
            let new_description = match description {
                Some(d) => d,
                None => current.description.clone(),
            };
            let new_completed = patch.completed.unwrap_or(current.completed);

            tx.execute(
                "UPDATE tasks
                 SET title = ?1, title_hash = ?2, description = ?3, completed = ?4,
                     updated_at = MAX(?5, updated_at + 1)
                 WHERE id = ?6",
                params![
                    new_title,
                    new_hash,
                    new_description,
                    new_completed,
                    now_ms(),
                    id.to_string()
                ],
            )
            .map_err(map_write_error)?;

            let updated = get_task_internal(&tx, id)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;
            Ok(updated)
        })
    }

    /// Delete a task. Returns `NotFound` if no row was removed.
    pub fn delete_task(&self, id: &TaskId) -> StoreResult<()> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
            if removed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }
}
