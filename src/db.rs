use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{CivicError, Result};
use crate::models::{
    ActivityDraft, ActivityEntry, Category, Coordinates, Issue, IssueId, Location, ReporterId,
    Status,
};
use crate::store::{CommitOutcome, IssueStore};
use crate::validate::ValidatedIssueDraft;

const SCHEMA_VERSION: i32 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ISSUE_COLUMNS: &str = "id, title, description, category, status, address, latitude, longitude, image_url, reporter, created_at";

/// Idle read connections kept for reuse.
const MAX_IDLE_READERS: usize = 4;

/// SQLite-backed issue store.
///
/// Writes go through one connection inside `IMMEDIATE` transactions. File
/// databases run in WAL mode and serve reads from separate `query_only`
/// connections, so readers never queue behind the writer or each other and
/// each read sees a committed snapshot. An in-memory database has a single
/// connection that reads share with writes.
pub struct Database {
    path: Option<PathBuf>,
    writer: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
}

impl From<rusqlite::Error> for CivicError {
    fn from(err: rusqlite::Error) -> Self {
        CivicError::StorageUnavailable(err.to_string())
    }
}

fn poisoned() -> CivicError {
    CivicError::StorageUnavailable("database lock poisoned".to_string())
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Database {
            path,
            writer: Mutex::new(conn),
            readers: Mutex::new(Vec::new()),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer.lock().map_err(|_| poisoned())
    }

    /// Runs `f` on a read connection. The reader pool lock is held only to
    /// check a connection out and back in.
    fn read<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let Some(path) = &self.path else {
            let mut conn = self.writer()?;
            return f(&mut *conn);
        };

        let pooled = self.readers.lock().map_err(|_| poisoned())?.pop();
        let mut conn = match pooled {
            Some(conn) => conn,
            None => open_reader(path)?,
        };
        let result = f(&mut conn);

        if let Ok(mut idle) = self.readers.lock() {
            if idle.len() < MAX_IDLE_READERS {
                idle.push(conn);
            }
        }
        result
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.writer()?;
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    category TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending',
                    address TEXT,
                    latitude REAL,
                    longitude REAL,
                    image_url TEXT,
                    reporter TEXT,
                    created_at TEXT NOT NULL,
                    CHECK ((latitude IS NULL) = (longitude IS NULL))
                );

                -- Append-only timeline, one row per event
                CREATE TABLE IF NOT EXISTS activity (
                    issue_id INTEGER NOT NULL,
                    seq INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    action TEXT NOT NULL,
                    description TEXT NOT NULL,
                    PRIMARY KEY (issue_id, seq),
                    FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
                CREATE INDEX IF NOT EXISTS idx_issues_category ON issues(category);
                CREATE INDEX IF NOT EXISTS idx_issues_reporter ON issues(reporter);
                "#,
            )?;

            conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        }

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(())
    }
}

fn open_reader(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA query_only = ON;")?;
    tracing::debug!(path = %path.display(), "opened read connection");
    Ok(conn)
}

fn issue_exists(tx: &Transaction<'_>, id: IssueId) -> Result<bool> {
    let found: Option<i64> = tx
        .query_row("SELECT id FROM issues WHERE id = ?1", [id.0], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn append_in(tx: &Transaction<'_>, id: IssueId, draft: ActivityDraft) -> Result<ActivityEntry> {
    let (last_seq, last_at): (i64, Option<String>) = tx.query_row(
        "SELECT COALESCE(MAX(seq), 0), MAX(created_at) FROM activity WHERE issue_id = ?1",
        [id.0],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let now = Utc::now();
    let timestamp = match last_at.map(parse_datetime).transpose()? {
        Some(last) if last > now => last,
        _ => now,
    };
    let seq = last_seq + 1;

    tx.execute(
        "INSERT INTO activity (issue_id, seq, created_at, action, description) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id.0, seq, format_datetime(timestamp), draft.action, draft.description],
    )?;

    Ok(ActivityEntry {
        issue_id: id,
        seq: seq as u32,
        timestamp,
        action: draft.action,
        description: draft.description,
    })
}

impl IssueStore for Database {
    fn create(&self, draft: ValidatedIssueDraft) -> Result<IssueId> {
        let mut conn = self.writer()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let coords = draft.location().coordinates;
        tx.execute(
            "INSERT INTO issues (title, description, category, status, address, latitude, longitude, image_url, reporter, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                draft.title(),
                draft.description(),
                draft.category().as_str(),
                Status::Pending.as_str(),
                draft.location().address,
                coords.map(|c| c.latitude),
                coords.map(|c| c.longitude),
                draft.image_url(),
                draft.reporter().map(|r| r.as_str()),
                format_datetime(Utc::now()),
            ],
        )?;
        let id = IssueId(tx.last_insert_rowid());
        append_in(&tx, id, ActivityDraft::reported())?;
        tx.commit()?;

        tracing::debug!(issue = %id, "created issue");
        Ok(id)
    }

    fn get(&self, id: IssueId) -> Result<Issue> {
        self.read(|conn| {
            let mut stmt =
                conn.prepare_cached(&format!("SELECT {} FROM issues WHERE id = ?1", ISSUE_COLUMNS))?;
            let issue = stmt.query_row([id.0], issue_from_row).optional()?;
            issue.ok_or(CivicError::NotFound(id))
        })
    }

    fn list(&self) -> Result<Vec<Issue>> {
        self.read(|conn| {
            let mut stmt = conn.prepare_cached(&format!("SELECT {} FROM issues", ISSUE_COLUMNS))?;
            let issues = stmt
                .query_map([], issue_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(issues)
        })
    }

    fn activity(&self, id: IssueId) -> Result<Vec<ActivityEntry>> {
        self.read(|conn| read_activity(conn, id))
    }

    fn append_activity(&self, id: IssueId, draft: ActivityDraft) -> Result<ActivityEntry> {
        let mut conn = self.writer()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !issue_exists(&tx, id)? {
            return Err(CivicError::NotFound(id));
        }
        let entry = append_in(&tx, id, draft)?;
        tx.commit()?;

        tracing::debug!(issue = %id, seq = entry.seq, action = %entry.action, "appended activity");
        Ok(entry)
    }

    fn set_status(&self, id: IssueId, status: Status) -> Result<()> {
        let conn = self.writer()?;
        let rows = conn.execute(
            "UPDATE issues SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.0],
        )?;
        if rows == 0 {
            return Err(CivicError::NotFound(id));
        }
        tracing::debug!(issue = %id, status = status.as_str(), "status overwritten");
        Ok(())
    }

    fn commit_transition(
        &self,
        id: IssueId,
        from: Status,
        to: Status,
        draft: ActivityDraft,
    ) -> Result<CommitOutcome> {
        let mut conn = self.writer()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row("SELECT status FROM issues WHERE id = ?1", [id.0], |row| row.get(0))
            .optional()?;
        let current = match current {
            Some(raw) => parse_status(&raw)?,
            None => return Err(CivicError::NotFound(id)),
        };
        if current != from {
            return Ok(CommitOutcome::Stale { current });
        }

        tx.execute(
            "UPDATE issues SET status = ?1 WHERE id = ?2",
            params![to.as_str(), id.0],
        )?;
        let entry = append_in(&tx, id, draft)?;
        tx.commit()?;

        tracing::debug!(issue = %id, seq = entry.seq, from = from.as_str(), to = to.as_str(), "committed transition");
        Ok(CommitOutcome::Applied(entry))
    }
}

/// Existence check and rows come from one snapshot.
fn read_activity(conn: &mut Connection, id: IssueId) -> Result<Vec<ActivityEntry>> {
    let tx = conn.transaction()?;
    if !issue_exists(&tx, id)? {
        return Err(CivicError::NotFound(id));
    }
    let entries = {
        let mut stmt = tx.prepare(
            "SELECT issue_id, seq, created_at, action, description FROM activity WHERE issue_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([id.0], |row| {
                Ok(ActivityEntry {
                    issue_id: IssueId(row.get(0)?),
                    seq: row.get(1)?,
                    timestamp: parse_datetime_col(row, 2)?,
                    action: row.get(3)?,
                    description: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };
    tx.commit()?;
    Ok(entries)
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    let latitude: Option<f64> = row.get(6)?;
    let longitude: Option<f64> = row.get(7)?;
    let coordinates = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(Issue {
        id: IssueId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        category: parse_col::<Category>(row, 3)?,
        status: parse_col::<Status>(row, 4)?,
        location: Location {
            address: row.get(5)?,
            coordinates,
        },
        image_url: row.get(8)?,
        reporter: row
            .get::<_, Option<String>>(9)?
            .as_deref()
            .and_then(ReporterId::new),
        created_at: parse_datetime_col(row, 10)?,
    })
}

fn parse_col<T: std::str::FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|bad| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized value '{}'", bad).into(),
        )
    })
}

fn parse_status(raw: &str) -> Result<Status> {
    raw.parse()
        .map_err(|bad| CivicError::StorageUnavailable(format!("corrupt status '{}'", bad)))
}

fn parse_datetime_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_datetime(s: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CivicError::StorageUnavailable(format!("corrupt timestamp '{}': {}", s, e)))
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}
