//! Read-only access to the tool's SQLite database.
//!
//! One connection, opened lazily behind a mutex, pinged before reuse and
//! reopened after a ping failure. The upstream database runs in WAL mode;
//! queries carry a five-second busy timeout so a writer holding the lock
//! cannot stall a listing indefinitely.

use crate::error::Result;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::schema::{MessageData, PartData, ProjectRecord};

const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub(crate) struct SessionRow {
    pub id: String,
    pub title: Option<String>,
    pub parent_id: Option<String>,
    pub time_created: i64,
    pub time_updated: i64,
    pub message_count: usize,
}

pub(crate) struct Db {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl Db {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            conn: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Size of the database plus its WAL file, the number a listing reports.
    pub fn file_size(&self) -> Option<u64> {
        let main = std::fs::metadata(&self.path).ok()?.len();
        let wal = std::fs::metadata(self.wal_path())
            .map(|m| m.len())
            .unwrap_or(0);
        Some(main + wal)
    }

    pub fn wal_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str("-wal");
        self.path.with_file_name(name)
    }

    fn open(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(QUERY_TIMEOUT)?;
        Ok(conn)
    }

    /// Run `f` against the pooled connection, pinging first and reopening
    /// once if the connection has gone bad.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let mut guard = self.conn.lock().unwrap();

        let alive = guard
            .as_ref()
            .is_some_and(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).is_ok());
        if !alive {
            *guard = Some(self.open()?);
        }

        let Some(conn) = guard.as_ref() else {
            return Err(crate::error::Error::Adapter(
                "database connection unavailable".to_string(),
            ));
        };

        Ok(f(conn)?)
    }

    pub fn projects(&self) -> Result<Vec<ProjectRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, worktree FROM project")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ProjectRecord {
                        id: row.get(0)?,
                        worktree: row.get(1)?,
                        sandboxes: Vec::new(),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn sessions_for_project(&self, project_id: &str) -> Result<Vec<SessionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT s.id, s.title, s.parent_id, s.time_created, s.time_updated,
                       (SELECT COUNT(*) FROM message m WHERE m.session_id = s.id)
                FROM session s
                WHERE s.project_id = ?1
                ORDER BY s.time_updated DESC
                "#,
            )?;
            let rows = stmt
                .query_map([project_id], |row| {
                    Ok(SessionRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        parent_id: row.get(2)?,
                        time_created: row.get(3)?,
                        time_updated: row.get(4)?,
                        message_count: row.get::<_, i64>(5)? as usize,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Message and part rows for one session, parts grouped per message.
    /// Rows whose `data` column fails to decode are skipped.
    pub fn messages(&self, session_id: &str) -> Result<Vec<(MessageData, Vec<PartData>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, data FROM message
                WHERE session_id = ?1
                ORDER BY time_created ASC, id ASC
                "#,
            )?;
            let mut messages: Vec<(String, MessageData)> = Vec::new();
            let mut rows = stmt.query([session_id])?;
            while let Some(row) = rows.next()? {
                let id: String = row.get(0)?;
                let data: String = row.get(1)?;
                if let Ok(message) = serde_json::from_str::<MessageData>(&data) {
                    messages.push((id, message));
                }
            }

            let mut stmt = conn.prepare(
                r#"
                SELECT message_id, data FROM part
                WHERE session_id = ?1
                ORDER BY message_id ASC, id ASC
                "#,
            )?;
            let mut parts: std::collections::HashMap<String, Vec<PartData>> =
                std::collections::HashMap::new();
            let mut rows = stmt.query([session_id])?;
            while let Some(row) = rows.next()? {
                let message_id: String = row.get(0)?;
                let data: String = row.get(1)?;
                if let Ok(part) = serde_json::from_str::<PartData>(&data) {
                    parts.entry(message_id).or_default().push(part);
                }
            }

            Ok(messages
                .into_iter()
                .map(|(id, message)| {
                    let message_parts = parts.remove(&id).unwrap_or_default();
                    (message, message_parts)
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wal_path_appends_suffix() {
        let db = Db::new(PathBuf::from("/data/opencode.db"));
        assert_eq!(db.wal_path(), PathBuf::from("/data/opencode.db-wal"));
    }

    #[test]
    fn test_missing_database_reports_absent() {
        let db = Db::new(PathBuf::from("/nonexistent/opencode.db"));
        assert!(!db.exists());
        assert!(db.file_size().is_none());
        assert!(db.projects().is_err());
    }
}
