//! Persistence for reference solutions, hint history and homeworks
//!
//! The [`HomeworkStore`] trait is what the rest of the bot depends on;
//! [`SqliteStore`] is the production implementation.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::info;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error reported by SQLite
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A homework with this KIM already exists
    #[error("Homework with KIM {0} already exists")]
    DuplicateKim(i64),
    /// The connection mutex was poisoned by a panicking holder
    #[error("Database connection lock poisoned")]
    Poisoned,
    /// The blocking database task failed to complete
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// SQL schema applied on every start
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS solutions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL,
    solution TEXT NOT NULL,
    comment TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_solutions_task ON solutions(task_id);

CREATE TABLE IF NOT EXISTS hints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    task_id INTEGER NOT NULL,
    hint_text TEXT NOT NULL,
    hint_type TEXT NOT NULL,
    was_helpful BOOLEAN,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_hints_user ON hints(user_id);
CREATE INDEX IF NOT EXISTS idx_hints_task ON hints(task_id);
CREATE INDEX IF NOT EXISTS idx_hints_created ON hints(created_at);

CREATE TABLE IF NOT EXISTS homeworks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kim INTEGER NOT NULL UNIQUE,
    title TEXT,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
";

/// An admin-curated correct solution for a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSolution {
    /// Row id
    pub id: i64,
    /// Task the solution belongs to
    pub task_id: i64,
    /// Solution source code
    pub solution: String,
    /// Optional admin comment
    pub comment: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Which flow produced a hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintType {
    /// "How do I start?" hint
    Start,
    /// Analysis of submitted code
    Analyze,
}

impl HintType {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Analyze => "analyze",
        }
    }
}

impl fmt::Display for HintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored hint type was not recognised
#[derive(Debug, Error)]
#[error("unknown hint type: {0}")]
pub struct UnknownHintType(String);

impl FromStr for HintType {
    type Err = UnknownHintType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "analyze" => Ok(Self::Analyze),
            other => Err(UnknownHintType(other.to_string())),
        }
    }
}

/// A hint shown to a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    /// Row id
    pub id: i64,
    /// Telegram user id of the student
    pub user_id: i64,
    /// Task the hint is about
    pub task_id: i64,
    /// Generated text
    pub hint_text: String,
    /// Flow that produced the hint
    pub hint_type: HintType,
    /// Student feedback, `None` until rated
    pub was_helpful: Option<bool>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Fields of a hint before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHint {
    /// Telegram user id of the student
    pub user_id: i64,
    /// Task the hint is about
    pub task_id: i64,
    /// Generated text
    pub hint_text: String,
    /// Flow that produced the hint
    pub hint_type: HintType,
}

/// A homework variant visible (or hidden) to students
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Homework {
    /// Row id
    pub id: i64,
    /// Variant identifier on the content provider
    pub kim: i64,
    /// Optional display title
    pub title: Option<String>,
    /// Whether students can see it
    pub is_active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Homework {
    /// Title, or `KIM {kim}` when none was given
    #[must_use]
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("KIM {}", self.kim))
    }
}

/// Hint feedback counters over a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HintStats {
    /// Length of the period in days
    pub days: i64,
    /// Hints created in the period
    pub total: u64,
    /// Hints rated helpful
    pub helpful: u64,
    /// Hints rated not helpful
    pub not_helpful: u64,
    /// Hints without a rating
    pub not_rated: u64,
}

impl HintStats {
    /// Share of helpful hints among rated ones, in percent with one decimal
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn helpful_percent(&self) -> f64 {
        let rated = self.helpful + self.not_helpful;
        if rated == 0 {
            return 0.0;
        }
        let percent = self.helpful as f64 / rated as f64 * 100.0;
        (percent * 10.0).round() / 10.0
    }
}

/// Interface for the persistence layer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HomeworkStore: Send + Sync {
    /// Store a new reference solution
    async fn add_solution(
        &self,
        task_id: i64,
        solution: String,
        comment: Option<String>,
    ) -> Result<ReferenceSolution, StorageError>;
    /// Get a reference solution by id
    async fn get_solution(&self, id: i64) -> Result<Option<ReferenceSolution>, StorageError>;
    /// All reference solutions in insertion order
    async fn list_solutions(&self) -> Result<Vec<ReferenceSolution>, StorageError>;
    /// Reference solutions of one task in insertion order
    async fn solutions_by_task(&self, task_id: i64)
        -> Result<Vec<ReferenceSolution>, StorageError>;
    /// Number of reference solutions of one task
    async fn count_solutions(&self, task_id: i64) -> Result<u64, StorageError>;
    /// Replace the fields that are `Some`, returns the updated solution if it exists
    async fn update_solution(
        &self,
        id: i64,
        solution: Option<String>,
        comment: Option<String>,
    ) -> Result<Option<ReferenceSolution>, StorageError>;
    /// Delete a reference solution, returns false if it did not exist
    async fn delete_solution(&self, id: i64) -> Result<bool, StorageError>;

    /// Record a hint shown to a student
    async fn add_hint(&self, hint: NewHint) -> Result<Hint, StorageError>;
    /// Most recent hint of a student
    async fn latest_hint_for_user(&self, user_id: i64) -> Result<Option<Hint>, StorageError>;
    /// Store the student's rating, returns the updated hint if it exists
    async fn mark_helpful(
        &self,
        hint_id: i64,
        was_helpful: bool,
    ) -> Result<Option<Hint>, StorageError>;
    /// Most recent hints of one student, newest first
    async fn hints_for_user(&self, user_id: i64, limit: usize)
        -> Result<Vec<Hint>, StorageError>;
    /// All hints given for one task, newest first
    async fn hints_for_task(&self, task_id: i64) -> Result<Vec<Hint>, StorageError>;
    /// Most recent hints of all students, newest first
    async fn recent_hints(&self, limit: usize) -> Result<Vec<Hint>, StorageError>;
    /// Rating counters over the last `days` days
    async fn hint_stats(&self, days: i64) -> Result<HintStats, StorageError>;

    /// Add an active homework
    async fn add_homework(
        &self,
        kim: i64,
        title: Option<String>,
    ) -> Result<Homework, StorageError>;
    /// All homeworks, newest first
    async fn list_homeworks(&self) -> Result<Vec<Homework>, StorageError>;
    /// Active homeworks, newest first
    async fn active_homeworks(&self) -> Result<Vec<Homework>, StorageError>;
    /// Homework by KIM
    async fn get_homework(&self, kim: i64) -> Result<Option<Homework>, StorageError>;
    /// Set or clear the title, returns the updated homework if it exists
    async fn update_homework_title(
        &self,
        kim: i64,
        title: Option<String>,
    ) -> Result<Option<Homework>, StorageError>;
    /// Flip `is_active`, returns the updated homework if it exists
    async fn toggle_homework(&self, kim: i64) -> Result<Option<Homework>, StorageError>;
    /// Delete a homework, returns false if it did not exist
    async fn delete_homework(&self, kim: i64) -> Result<bool, StorageError>;
}

/// SQLite-backed [`HomeworkStore`]
///
/// Calls run on the blocking pool; the single connection is shared behind a
/// mutex so every operation is atomic with respect to the others.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        info!("Opened SQLite database at {}", path.as_ref().display());
        Self::init(conn)
    }

    /// Open an in-memory database
    ///
    /// # Errors
    ///
    /// Returns an error if the schema fails.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StorageError::Poisoned)?;
            f(&guard)
        })
        .await?
    }
}

// Fixed-width UTC strings keep lexicographic order equal to time order
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn solution_from_row(row: &Row<'_>) -> rusqlite::Result<ReferenceSolution> {
    Ok(ReferenceSolution {
        id: row.get(0)?,
        task_id: row.get(1)?,
        solution: row.get(2)?,
        comment: row.get(3)?,
        created_at: time_at(row, 4)?,
    })
}

fn hint_from_row(row: &Row<'_>) -> rusqlite::Result<Hint> {
    let raw_type: String = row.get(4)?;
    let hint_type = raw_type
        .parse::<HintType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(Hint {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_id: row.get(2)?,
        hint_text: row.get(3)?,
        hint_type,
        was_helpful: row.get(5)?,
        created_at: time_at(row, 6)?,
    })
}

fn homework_from_row(row: &Row<'_>) -> rusqlite::Result<Homework> {
    Ok(Homework {
        id: row.get(0)?,
        kim: row.get(1)?,
        title: row.get(2)?,
        is_active: row.get(3)?,
        created_at: time_at(row, 4)?,
    })
}

const SOLUTION_COLUMNS: &str = "id, task_id, solution, comment, created_at";
const HINT_COLUMNS: &str = "id, user_id, task_id, hint_text, hint_type, was_helpful, created_at";
const HOMEWORK_COLUMNS: &str = "id, kim, title, is_active, created_at";

fn query_solution(conn: &Connection, id: i64) -> Result<Option<ReferenceSolution>, StorageError> {
    let sql = format!("SELECT {SOLUTION_COLUMNS} FROM solutions WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id], solution_from_row)
        .optional()?)
}

fn query_hint(conn: &Connection, id: i64) -> Result<Option<Hint>, StorageError> {
    let sql = format!("SELECT {HINT_COLUMNS} FROM hints WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], hint_from_row).optional()?)
}

fn query_homework(conn: &Connection, kim: i64) -> Result<Option<Homework>, StorageError> {
    let sql = format!("SELECT {HOMEWORK_COLUMNS} FROM homeworks WHERE kim = ?1");
    Ok(conn
        .query_row(&sql, params![kim], homework_from_row)
        .optional()?)
}

fn query_hints<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Hint>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, hint_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn count(conn: &Connection, sql: &str, since: &str) -> Result<u64, StorageError> {
    let n: i64 = conn.query_row(sql, params![since], |row| row.get(0))?;
    Ok(u64::try_from(n).unwrap_or_default())
}

#[async_trait]
impl HomeworkStore for SqliteStore {
    async fn add_solution(
        &self,
        task_id: i64,
        solution: String,
        comment: Option<String>,
    ) -> Result<ReferenceSolution, StorageError> {
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO solutions (task_id, solution, comment, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![task_id, solution, comment, format_time(created_at)],
            )?;
            Ok(ReferenceSolution {
                id: conn.last_insert_rowid(),
                task_id,
                solution,
                comment,
                created_at,
            })
        })
        .await
    }

    async fn get_solution(&self, id: i64) -> Result<Option<ReferenceSolution>, StorageError> {
        self.with_conn(move |conn| query_solution(conn, id)).await
    }

    async fn list_solutions(&self) -> Result<Vec<ReferenceSolution>, StorageError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {SOLUTION_COLUMNS} FROM solutions ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], solution_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn solutions_by_task(
        &self,
        task_id: i64,
    ) -> Result<Vec<ReferenceSolution>, StorageError> {
        self.with_conn(move |conn| {
            let sql =
                format!("SELECT {SOLUTION_COLUMNS} FROM solutions WHERE task_id = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![task_id], solution_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn count_solutions(&self, task_id: i64) -> Result<u64, StorageError> {
        self.with_conn(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM solutions WHERE task_id = ?1",
                params![task_id],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(n).unwrap_or_default())
        })
        .await
    }

    async fn update_solution(
        &self,
        id: i64,
        solution: Option<String>,
        comment: Option<String>,
    ) -> Result<Option<ReferenceSolution>, StorageError> {
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE solutions SET solution = COALESCE(?1, solution), comment = COALESCE(?2, comment)
                 WHERE id = ?3",
                params![solution, comment, id],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_solution(conn, id)
        })
        .await
    }

    async fn delete_solution(&self, id: i64) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM solutions WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn add_hint(&self, hint: NewHint) -> Result<Hint, StorageError> {
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO hints (user_id, task_id, hint_text, hint_type, was_helpful, created_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
                params![
                    hint.user_id,
                    hint.task_id,
                    hint.hint_text,
                    hint.hint_type.as_str(),
                    format_time(created_at)
                ],
            )?;
            Ok(Hint {
                id: conn.last_insert_rowid(),
                user_id: hint.user_id,
                task_id: hint.task_id,
                hint_text: hint.hint_text,
                hint_type: hint.hint_type,
                was_helpful: None,
                created_at,
            })
        })
        .await
    }

    async fn latest_hint_for_user(&self, user_id: i64) -> Result<Option<Hint>, StorageError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {HINT_COLUMNS} FROM hints WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1"
            );
            Ok(conn
                .query_row(&sql, params![user_id], hint_from_row)
                .optional()?)
        })
        .await
    }

    async fn mark_helpful(
        &self,
        hint_id: i64,
        was_helpful: bool,
    ) -> Result<Option<Hint>, StorageError> {
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE hints SET was_helpful = ?1 WHERE id = ?2",
                params![was_helpful, hint_id],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_hint(conn, hint_id)
        })
        .await
    }

    async fn hints_for_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<Hint>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {HINT_COLUMNS} FROM hints WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2"
            );
            query_hints(conn, &sql, params![user_id, limit])
        })
        .await
    }

    async fn hints_for_task(&self, task_id: i64) -> Result<Vec<Hint>, StorageError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {HINT_COLUMNS} FROM hints WHERE task_id = ?1
                 ORDER BY created_at DESC, id DESC"
            );
            query_hints(conn, &sql, params![task_id])
        })
        .await
    }

    async fn recent_hints(&self, limit: usize) -> Result<Vec<Hint>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {HINT_COLUMNS} FROM hints ORDER BY created_at DESC, id DESC LIMIT ?1"
            );
            query_hints(conn, &sql, params![limit])
        })
        .await
    }

    async fn hint_stats(&self, days: i64) -> Result<HintStats, StorageError> {
        self.with_conn(move |conn| {
            let since = format_time(Utc::now() - TimeDelta::days(days));
            let total = count(
                conn,
                "SELECT COUNT(*) FROM hints WHERE created_at >= ?1",
                &since,
            )?;
            let helpful = count(
                conn,
                "SELECT COUNT(*) FROM hints WHERE created_at >= ?1 AND was_helpful = 1",
                &since,
            )?;
            let not_helpful = count(
                conn,
                "SELECT COUNT(*) FROM hints WHERE created_at >= ?1 AND was_helpful = 0",
                &since,
            )?;
            Ok(HintStats {
                days,
                total,
                helpful,
                not_helpful,
                not_rated: total.saturating_sub(helpful + not_helpful),
            })
        })
        .await
    }

    async fn add_homework(
        &self,
        kim: i64,
        title: Option<String>,
    ) -> Result<Homework, StorageError> {
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            let inserted = conn.execute(
                "INSERT INTO homeworks (kim, title, is_active, created_at) VALUES (?1, ?2, 1, ?3)",
                params![kim, title, format_time(created_at)],
            );
            match inserted {
                Ok(_) => Ok(Homework {
                    id: conn.last_insert_rowid(),
                    kim,
                    title,
                    is_active: true,
                    created_at,
                }),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StorageError::DuplicateKim(kim))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn list_homeworks(&self) -> Result<Vec<Homework>, StorageError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {HOMEWORK_COLUMNS} FROM homeworks ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], homework_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn active_homeworks(&self) -> Result<Vec<Homework>, StorageError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {HOMEWORK_COLUMNS} FROM homeworks WHERE is_active = 1
                 ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], homework_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn get_homework(&self, kim: i64) -> Result<Option<Homework>, StorageError> {
        self.with_conn(move |conn| query_homework(conn, kim)).await
    }

    async fn update_homework_title(
        &self,
        kim: i64,
        title: Option<String>,
    ) -> Result<Option<Homework>, StorageError> {
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE homeworks SET title = ?1 WHERE kim = ?2",
                params![title, kim],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_homework(conn, kim)
        })
        .await
    }

    async fn toggle_homework(&self, kim: i64) -> Result<Option<Homework>, StorageError> {
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE homeworks SET is_active = NOT is_active WHERE kim = ?1",
                params![kim],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_homework(conn, kim)
        })
        .await
    }

    async fn delete_homework(&self, kim: i64) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM homeworks WHERE kim = ?1", params![kim])?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("in-memory database")
    }

    fn new_hint(user_id: i64, task_id: i64, hint_type: HintType) -> NewHint {
        NewHint {
            user_id,
            task_id,
            hint_text: format!("hint for {task_id}"),
            hint_type,
        }
    }

    #[tokio::test]
    async fn test_solution_crud() -> Result<(), StorageError> {
        let store = store();

        let first = store
            .add_solution(42, "print(1)".to_string(), None)
            .await?;
        let second = store
            .add_solution(42, "print(2)".to_string(), Some("faster".to_string()))
            .await?;
        store.add_solution(7, "x = 1".to_string(), None).await?;

        assert_eq!(store.count_solutions(42).await?, 2);
        assert_eq!(store.count_solutions(1).await?, 0);

        let by_task = store.solutions_by_task(42).await?;
        assert_eq!(by_task, vec![first.clone(), second.clone()]);

        assert_eq!(store.get_solution(second.id).await?, Some(second.clone()));
        assert_eq!(store.list_solutions().await?.len(), 3);

        assert!(store.delete_solution(first.id).await?);
        assert!(!store.delete_solution(first.id).await?);
        assert_eq!(store.get_solution(first.id).await?, None);
        assert_eq!(store.count_solutions(42).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_solution_keeps_unset_fields() -> Result<(), StorageError> {
        let store = store();
        let added = store
            .add_solution(42, "print(1)".to_string(), Some("slow".to_string()))
            .await?;

        let code_only = store
            .update_solution(added.id, Some("print(2)".to_string()), None)
            .await?
            .expect("updated");
        assert_eq!(code_only.solution, "print(2)");
        assert_eq!(code_only.comment.as_deref(), Some("slow"));
        assert_eq!(code_only.created_at, added.created_at);

        let comment_only = store
            .update_solution(added.id, None, Some("fast".to_string()))
            .await?
            .expect("updated");
        assert_eq!(comment_only.solution, "print(2)");
        assert_eq!(comment_only.comment.as_deref(), Some("fast"));

        assert_eq!(store.get_solution(added.id).await?, Some(comment_only));
        assert_eq!(store.update_solution(9_999, None, None).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_hints_by_user_and_task() -> Result<(), StorageError> {
        let store = store();
        let first = store.add_hint(new_hint(1, 10, HintType::Start)).await?;
        let second = store.add_hint(new_hint(1, 11, HintType::Analyze)).await?;
        let third = store.add_hint(new_hint(1, 10, HintType::Analyze)).await?;
        let other = store.add_hint(new_hint(2, 10, HintType::Start)).await?;

        let ids = |hints: Vec<Hint>| hints.into_iter().map(|h| h.id).collect::<Vec<_>>();

        assert_eq!(
            ids(store.hints_for_user(1, 10).await?),
            vec![third.id, second.id, first.id]
        );
        assert_eq!(ids(store.hints_for_user(1, 2).await?), vec![third.id, second.id]);
        assert!(store.hints_for_user(3, 10).await?.is_empty());

        assert_eq!(
            ids(store.hints_for_task(10).await?),
            vec![other.id, third.id, first.id]
        );
        assert!(store.hints_for_task(99).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_latest_hint_and_feedback() -> Result<(), StorageError> {
        let store = store();

        assert_eq!(store.latest_hint_for_user(1).await?, None);

        store.add_hint(new_hint(1, 10, HintType::Start)).await?;
        let latest = store.add_hint(new_hint(1, 11, HintType::Analyze)).await?;
        store.add_hint(new_hint(2, 10, HintType::Start)).await?;

        let found = store.latest_hint_for_user(1).await?;
        assert_eq!(found.as_ref().map(|h| h.id), Some(latest.id));

        let rated = store.mark_helpful(latest.id, true).await?;
        assert_eq!(rated.and_then(|h| h.was_helpful), Some(true));

        assert_eq!(store.mark_helpful(9_999, true).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_recent_hints_newest_first() -> Result<(), StorageError> {
        let store = store();
        for task in 0..12 {
            store.add_hint(new_hint(1, task, HintType::Start)).await?;
        }

        let recent = store.recent_hints(10).await?;
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].task_id, 11);
        assert_eq!(recent[9].task_id, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_hint_stats() -> Result<(), StorageError> {
        let store = store();
        let a = store.add_hint(new_hint(1, 1, HintType::Start)).await?;
        let b = store.add_hint(new_hint(1, 2, HintType::Start)).await?;
        let c = store.add_hint(new_hint(2, 3, HintType::Analyze)).await?;
        store.add_hint(new_hint(3, 4, HintType::Analyze)).await?;

        store.mark_helpful(a.id, true).await?;
        store.mark_helpful(b.id, true).await?;
        store.mark_helpful(c.id, false).await?;

        let stats = store.hint_stats(7).await?;
        assert_eq!(
            stats,
            HintStats {
                days: 7,
                total: 4,
                helpful: 2,
                not_helpful: 1,
                not_rated: 1,
            }
        );
        assert!((stats.helpful_percent() - 66.7).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn test_helpful_percent_without_ratings() {
        let stats = HintStats {
            days: 7,
            total: 3,
            not_rated: 3,
            ..HintStats::default()
        };
        assert!(stats.helpful_percent().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_homework_lifecycle() -> Result<(), StorageError> {
        let store = store();

        let first = store.add_homework(100, None).await?;
        let second = store.add_homework(200, Some("Variant 2".to_string())).await?;
        assert!(first.is_active);
        assert_eq!(first.display_title(), "KIM 100");
        assert_eq!(second.display_title(), "Variant 2");

        let all = store.list_homeworks().await?;
        assert_eq!(
            all.iter().map(|h| h.kim).collect::<Vec<_>>(),
            vec![200, 100]
        );

        let toggled = store.toggle_homework(100).await?;
        assert_eq!(toggled.map(|h| h.is_active), Some(false));

        let active = store.active_homeworks().await?;
        assert_eq!(active.iter().map(|h| h.kim).collect::<Vec<_>>(), vec![200]);

        assert_eq!(store.toggle_homework(300).await?, None);

        let renamed = store
            .update_homework_title(100, Some("Variant 1".to_string()))
            .await?;
        assert_eq!(renamed.map(|h| h.display_title()).as_deref(), Some("Variant 1"));
        let cleared = store
            .update_homework_title(100, None)
            .await?
            .expect("homework 100");
        assert_eq!(cleared.title, None);
        assert_eq!(store.update_homework_title(300, None).await?, None);

        assert!(store.delete_homework(200).await?);
        assert!(!store.delete_homework(200).await?);
        assert_eq!(store.get_homework(200).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_kim_rejected() -> Result<(), StorageError> {
        let store = store();
        store.add_homework(100, None).await?;

        let err = store.add_homework(100, Some("again".to_string())).await;
        assert!(matches!(err, Err(StorageError::DuplicateKim(100))));
        Ok(())
    }

    #[test]
    fn test_hint_type_round_trip() {
        assert_eq!("start".parse::<HintType>().ok(), Some(HintType::Start));
        assert_eq!("analyze".parse::<HintType>().ok(), Some(HintType::Analyze));
        assert!("other".parse::<HintType>().is_err());
    }
}
