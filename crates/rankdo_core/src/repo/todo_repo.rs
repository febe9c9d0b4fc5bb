//! Ordered todo store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide rank-ordered reads and rank-keyed writes over `todos`.
//! - Persist the collection-wide current bucket in `collection_meta`.
//! - Apply rebalance plans as a single all-or-nothing rewrite.
//!
//! # Invariants
//! - Reads are ordered by `rank ASC` under SQLite's binary collation, which is
//!   the same order as `Rank`.
//! - A UNIQUE violation on `todos.rank` surfaces as `RepoError::DuplicateRank`.
//! - Persisted rows that do not parse back into valid domain values are
//!   reported as `InvalidData`, never silently skipped.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::lexorank::{Bucket, Rank, RebalancePlan};
use crate::model::todo::{TodoId, TodoItem};
use log::error;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    todo_id,
    description,
    rank,
    created_at,
    updated_at
FROM todos";

const CURRENT_BUCKET_KEY: &str = "current_bucket";

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-level error for todo persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Referenced todo does not exist.
    NotFound(TodoId),
    /// Another todo already holds this rank.
    DuplicateRank(String),
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::DuplicateRank(rank) => write!(f, "rank already in use: {rank}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "todo store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "todo store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "todo store requires column `{column}` in table `{table}`"
            ),
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

/// Ordered reads and rank-keyed writes the reorder logic depends on.
pub trait OrderedStore {
    /// Lists todos ascending by rank, optionally capped at `limit` rows.
    /// `Some(0)` yields no rows; `None` means no cap.
    fn list_ordered(&self, limit: Option<u32>) -> RepoResult<Vec<TodoItem>>;
    /// Todo with the lowest rank.
    fn get_first(&self) -> RepoResult<Option<TodoItem>>;
    /// Todo with the highest rank.
    fn get_last(&self) -> RepoResult<Option<TodoItem>>;
    /// Loads one todo or fails with `NotFound`.
    fn get_by_id(&self, id: TodoId) -> RepoResult<TodoItem>;
    /// Inserts a new todo at `rank`.
    fn insert(&self, description: &str, rank: &Rank) -> RepoResult<TodoItem>;
    /// Moves one todo to `rank`.
    fn update_rank(&self, id: TodoId, rank: &Rank) -> RepoResult<TodoItem>;
    /// Replaces the description of one todo.
    fn update_description(&self, id: TodoId, description: &str) -> RepoResult<TodoItem>;
    /// Deletes one todo. Deleting an absent id fails with `NotFound`.
    fn delete(&self, id: TodoId) -> RepoResult<()>;
    /// Bucket fresh first-inserts are placed in.
    fn current_bucket(&self) -> RepoResult<Bucket>;
    /// Rewrites every rank and the current bucket in one atomic step.
    ///
    /// The plan must cover every stored todo exactly once.
    fn apply_rebalance(&self, plan: &RebalancePlan<TodoId>) -> RepoResult<()>;
    /// Runs `f` inside one exclusive write scope.
    ///
    /// Everything `f` reads and writes through this store commits together,
    /// or not at all when `f` fails.
    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed ordered todo store.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Creates a store from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` / `MissingRequired*` when `conn` was not
    ///   opened through `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_todo_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl OrderedStore for SqliteTodoRepository<'_> {
    fn list_ordered(&self, limit: Option<u32>) -> RepoResult<Vec<TodoItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TODO_SELECT_SQL}
             ORDER BY rank ASC
             LIMIT ?1;"
        ))?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, i64::from);
        let mut rows = stmt.query([limit])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_todo_row(row)?);
        }
        Ok(items)
    }

    fn get_first(&self) -> RepoResult<Option<TodoItem>> {
        load_edge(self.conn, "ASC")
    }

    fn get_last(&self) -> RepoResult<Option<TodoItem>> {
        load_edge(self.conn, "DESC")
    }

    fn get_by_id(&self, id: TodoId) -> RepoResult<TodoItem> {
        load_required_todo(self.conn, id)
    }

    fn insert(&self, description: &str, rank: &Rank) -> RepoResult<TodoItem> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO todos (todo_id, description, rank) VALUES (?1, ?2, ?3);",
                params![id.to_string(), description, rank.to_string()],
            )
            .map_err(|err| map_rank_write_error(err, rank))?;
        load_required_todo(self.conn, id)
    }

    fn update_rank(&self, id: TodoId, rank: &Rank) -> RepoResult<TodoItem> {
        let changed = self
            .conn
            .execute(
                "UPDATE todos
                 SET rank = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE todo_id = ?1;",
                params![id.to_string(), rank.to_string()],
            )
            .map_err(|err| map_rank_write_error(err, rank))?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        load_required_todo(self.conn, id)
    }

    fn update_description(&self, id: TodoId, description: &str) -> RepoResult<TodoItem> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET description = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE todo_id = ?1;",
            params![id.to_string(), description],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        load_required_todo(self.conn, id)
    }

    fn delete(&self, id: TodoId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE todo_id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn current_bucket(&self) -> RepoResult<Bucket> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM collection_meta WHERE key = ?1;",
                [CURRENT_BUCKET_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let value = value.ok_or_else(|| {
            RepoError::InvalidData("missing `current_bucket` in collection_meta".to_string())
        })?;
        let mut chars = value.chars();
        match (chars.next().and_then(Bucket::from_char), chars.next()) {
            (Some(bucket), None) => Ok(bucket),
            _ => Err(RepoError::InvalidData(format!(
                "invalid bucket `{value}` in collection_meta.current_bucket"
            ))),
        }
    }

    fn apply_rebalance(&self, plan: &RebalancePlan<TodoId>) -> RepoResult<()> {
        with_savepoint(self.conn, "rebalance", || {
            let stored: i64 = self
                .conn
                .query_row("SELECT COUNT(*) FROM todos;", [], |row| row.get(0))?;
            if usize::try_from(stored).ok() != Some(plan.assignments.len()) {
                return Err(RepoError::InvalidData(format!(
                    "rebalance plan covers {} todos but {stored} are stored",
                    plan.assignments.len()
                )));
            }

            // Park every row on a key no rank can take ('~' sorts after the
            // alphabet) so the final writes never trip the UNIQUE index.
            self.conn
                .execute("UPDATE todos SET rank = '~' || todo_id;", [])?;

            for (id, rank) in &plan.assignments {
                let changed = self
                    .conn
                    .execute(
                        "UPDATE todos
                         SET rank = ?2,
                             updated_at = (strftime('%s', 'now') * 1000)
                         WHERE todo_id = ?1;",
                        params![id.to_string(), rank.to_string()],
                    )
                    .map_err(|err| map_rank_write_error(err, rank))?;
                if changed == 0 {
                    return Err(RepoError::NotFound(*id));
                }
            }

            self.conn.execute(
                "INSERT INTO collection_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
                params![CURRENT_BUCKET_KEY, plan.target_bucket.as_char().to_string()],
            )?;
            Ok(())
        })
    }

    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let value = f(self)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}

fn load_required_todo(conn: &Connection, id: TodoId) -> RepoResult<TodoItem> {
    let mut stmt = conn.prepare(&format!("{TODO_SELECT_SQL} WHERE todo_id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_todo_row(row);
    }
    Err(RepoError::NotFound(id))
}

fn load_edge(conn: &Connection, direction: &'static str) -> RepoResult<Option<TodoItem>> {
    let mut stmt = conn.prepare(&format!(
        "{TODO_SELECT_SQL} ORDER BY rank {direction} LIMIT 1;"
    ))?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_todo_row(row)?)),
        None => Ok(None),
    }
}

/// Runs `body` inside a named savepoint so it nests under `atomically` and
/// still commits as one unit when called on its own.
fn with_savepoint<T>(
    conn: &Connection,
    name: &'static str,
    body: impl FnOnce() -> RepoResult<T>,
) -> RepoResult<T> {
    conn.execute_batch(&format!("SAVEPOINT {name};"))?;
    match body() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {name};"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) =
                conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name};"))
            {
                error!(
                    "event=savepoint_rollback module=repo status=error savepoint={name} error={rollback_err}"
                );
            }
            Err(err)
        }
    }
}

fn map_rank_write_error(err: rusqlite::Error, rank: &Rank) -> RepoError {
    let is_rank_conflict = matches!(
        &err,
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && message.contains("todos.rank")
    );
    if is_rank_conflict {
        return RepoError::DuplicateRank(rank.to_string());
    }
    err.into()
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<TodoItem> {
    let id_text: String = row.get("todo_id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid `{id_text}` in todos.todo_id"))
    })?;

    let rank_text: String = row.get("rank")?;
    let rank = rank_text
        .parse::<Rank>()
        .map_err(|err| RepoError::InvalidData(format!("{err} in todos.rank")))?;

    Ok(TodoItem {
        id,
        description: row.get("description")?,
        rank,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn ensure_todo_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 2] = [
        (
            "todos",
            &["todo_id", "description", "rank", "created_at", "updated_at"],
        ),
        ("collection_meta", &["key", "value"]),
    ];
    for (table, columns) in required {
        let present = table_columns(conn, table)?;
        if present.is_empty() {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for column in columns {
            if !present.iter().any(|name| name.as_str() == *column) {
                return Err(RepoError::MissingRequiredColumn {
                    table,
                    column: *column,
                });
            }
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}
