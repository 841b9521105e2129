//! SQLite-based session and zone storage.
//!
//! Provides persistent storage for:
//! - Focus sessions (the engine's session store)
//! - Focus zones (the registry's zone store)
//! - Session statistics (daily and all-time)
//! - Key-value store for process-local state snapshots

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{data_dir, migrations};
use crate::error::{CollaboratorError, DatabaseError, Result};
use crate::session::{FocusSession, SessionKind, SessionStore};
use crate::zone::{FocusZone, ZoneStore};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub completed_sessions: u64,
    pub work_sessions: u64,
    pub work_minutes: u64,
    pub break_sessions: u64,
    pub break_minutes: u64,
}

/// SQLite database for sessions and zones.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/pomozone.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("pomozone.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Most recent sessions first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<FocusSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, start_time, end_time, duration_min, completed, task_id
             FROM sessions
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], session_from_row)?;
        let sessions = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    pub fn get_session(&self, id: i64) -> Result<Option<FocusSession>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, kind, start_time, end_time, duration_min, completed, task_id
                 FROM sessions WHERE id = ?1",
                params![id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Completed sessions that ended today (UTC).
    pub fn stats_today(&self) -> Result<Stats> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.stats_since(Some(format!("{today}T00:00:00+00:00")))
    }

    pub fn stats_all(&self) -> Result<Stats> {
        self.stats_since(None)
    }

    fn stats_since(&self, since: Option<String>) -> Result<Stats> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, COUNT(*), COALESCE(SUM(duration_min), 0)
             FROM sessions
             WHERE completed = 1 AND (?1 IS NULL OR end_time >= ?1)
             GROUP BY kind",
        )?;

        let mut stats = Stats::default();
        let rows = stmt.query_map(params![since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        for row in rows {
            let (kind, count, minutes) = row?;
            let (count, minutes) = (count.max(0) as u64, minutes.max(0) as u64);
            stats.completed_sessions += count;
            match SessionKind::parse(&kind) {
                Some(SessionKind::Work) => {
                    stats.work_sessions += count;
                    stats.work_minutes += minutes;
                }
                Some(SessionKind::ShortBreak | SessionKind::LongBreak) => {
                    stats.break_sessions += count;
                    stats.break_minutes += minutes;
                }
                None => {}
            }
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn collab(err: rusqlite::Error) -> CollaboratorError {
    DatabaseError::from(err).into()
}

fn not_found(table: &'static str, id: impl ToString) -> CollaboratorError {
    DatabaseError::NotFound {
        table,
        id: id.to_string(),
    }
    .into()
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<FocusSession> {
    let kind: String = row.get(1)?;
    let kind = SessionKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown session kind '{kind}'").into(),
        )
    })?;
    let start: String = row.get(2)?;
    let end: Option<String> = row.get(3)?;
    Ok(FocusSession {
        id: row.get(0)?,
        kind,
        start_time: parse_ts(2, &start)?,
        end_time: end.as_deref().map(|s| parse_ts(3, s)).transpose()?,
        duration_minutes: row.get(4)?,
        completed: row.get(5)?,
        task_id: row.get(6)?,
    })
}

fn zone_from_row(row: &Row<'_>) -> rusqlite::Result<FocusZone> {
    Ok(FocusZone {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        address: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        radius_meters: row.get(5)?,
        enabled: row.get(6)?,
        notification_message: row.get(7)?,
    })
}

impl SessionStore for Database {
    fn create(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError> {
        self.conn
            .execute(
                "INSERT INTO sessions (kind, start_time, end_time, duration_min, completed, task_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.kind.as_str(),
                    session.start_time.to_rfc3339(),
                    session.end_time.map(|t| t.to_rfc3339()),
                    session.duration_minutes,
                    session.completed,
                    session.task_id,
                ],
            )
            .map_err(collab)?;
        Ok(FocusSession {
            id: self.conn.last_insert_rowid(),
            ..session.clone()
        })
    }

    fn update(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError> {
        let changed = self
            .conn
            .execute(
                "UPDATE sessions
                 SET kind = ?2, start_time = ?3, end_time = ?4, duration_min = ?5,
                     completed = ?6, task_id = ?7
                 WHERE id = ?1",
                params![
                    session.id,
                    session.kind.as_str(),
                    session.start_time.to_rfc3339(),
                    session.end_time.map(|t| t.to_rfc3339()),
                    session.duration_minutes,
                    session.completed,
                    session.task_id,
                ],
            )
            .map_err(collab)?;
        if changed == 0 {
            return Err(not_found("sessions", session.id));
        }
        Ok(session.clone())
    }
}

impl ZoneStore for Database {
    fn list(&self) -> Result<Vec<FocusZone>, CollaboratorError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, address, latitude, longitude, radius_meters, enabled,
                        notification_message
                 FROM zones
                 ORDER BY rowid",
            )
            .map_err(collab)?;
        let rows = stmt.query_map([], zone_from_row).map_err(collab)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(collab)
    }

    fn create(&self, zone: &FocusZone) -> Result<FocusZone, CollaboratorError> {
        let id = zone
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO zones (id, name, address, latitude, longitude, radius_meters,
                                    enabled, notification_message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    id,
                    zone.name,
                    zone.address,
                    zone.latitude,
                    zone.longitude,
                    zone.radius_meters,
                    zone.enabled,
                    zone.notification_message,
                    now,
                ],
            )
            .map_err(collab)?;
        Ok(FocusZone {
            id: Some(id),
            ..zone.clone()
        })
    }

    fn update(&self, zone: &FocusZone) -> Result<FocusZone, CollaboratorError> {
        let id = zone.id.as_deref().unwrap_or_default();
        let changed = self
            .conn
            .execute(
                "UPDATE zones
                 SET name = ?2, address = ?3, latitude = ?4, longitude = ?5,
                     radius_meters = ?6, enabled = ?7, notification_message = ?8,
                     updated_at = ?9
                 WHERE id = ?1",
                params![
                    id,
                    zone.name,
                    zone.address,
                    zone.latitude,
                    zone.longitude,
                    zone.radius_meters,
                    zone.enabled,
                    zone.notification_message,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(collab)?;
        if changed == 0 {
            return Err(not_found("zones", id));
        }
        Ok(zone.clone())
    }

    fn delete(&self, id: &str) -> Result<(), CollaboratorError> {
        let changed = self
            .conn
            .execute("DELETE FROM zones WHERE id = ?1", params![id])
            .map_err(collab)?;
        if changed == 0 {
            return Err(not_found("zones", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(kind: SessionKind, minutes: u32) -> FocusSession {
        FocusSession::begin(kind, minutes, None).unwrap().finished()
    }

    #[test]
    fn session_create_assigns_id_and_update_persists() {
        let db = Database::open_memory().unwrap();
        let draft = FocusSession::begin(SessionKind::Work, 25, Some("task-9".into())).unwrap();
        let saved = SessionStore::create(&db, &draft).unwrap();
        assert_eq!(saved.id, 1);

        let done = saved.finished();
        SessionStore::update(&db, &done).unwrap();
        let loaded = db.get_session(1).unwrap().unwrap();
        assert!(loaded.completed);
        assert_eq!(loaded.task_id.as_deref(), Some("task-9"));
        assert_eq!(loaded.kind, SessionKind::Work);
        assert!(loaded.end_time.is_some());
    }

    #[test]
    fn session_update_of_unknown_id_fails() {
        let db = Database::open_memory().unwrap();
        let mut ghost = finished(SessionKind::Work, 25);
        ghost.id = 42;
        let err = SessionStore::update(&db, &ghost).unwrap_err();
        assert_eq!(err.service, "sqlite");
        assert!(err.message.contains("not found"));
    }

    #[test]
    fn stats_count_only_completed_sessions() {
        let db = Database::open_memory().unwrap();
        SessionStore::create(&db, &finished(SessionKind::Work, 25)).unwrap();
        SessionStore::create(&db, &finished(SessionKind::ShortBreak, 5)).unwrap();
        SessionStore::create(&db, &finished(SessionKind::LongBreak, 15)).unwrap();
        let running = FocusSession::begin(SessionKind::Work, 50, None).unwrap();
        SessionStore::create(&db, &running).unwrap();

        let stats = db.stats_all().unwrap();
        assert_eq!(stats.completed_sessions, 3);
        assert_eq!(stats.work_minutes, 25);
        assert_eq!(stats.break_sessions, 2);
        assert_eq!(stats.break_minutes, 20);
        assert_eq!(db.stats_today().unwrap(), stats);
    }

    #[test]
    fn list_sessions_most_recent_first() {
        let db = Database::open_memory().unwrap();
        for minutes in [10, 20, 30] {
            SessionStore::create(&db, &finished(SessionKind::Work, minutes)).unwrap();
        }
        let listed = db.list_sessions(2).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].duration_minutes, 30);
        assert_eq!(listed[1].duration_minutes, 20);
    }

    #[test]
    fn zone_crud_keeps_creation_order() {
        let db = Database::open_memory().unwrap();
        let a = ZoneStore::create(&db, &FocusZone::new("A", "x", 1.0, 2.0)).unwrap();
        let b = ZoneStore::create(&db, &FocusZone::new("B", "y", 3.0, 4.0).with_id("fixed")).unwrap();
        assert!(a.id.is_some());
        assert_eq!(b.id.as_deref(), Some("fixed"));

        let mut a2 = a.clone();
        a2.enabled = false;
        a2.radius_meters = 42.5;
        ZoneStore::update(&db, &a2).unwrap();

        let zones = db.list().unwrap();
        assert_eq!(zones, vec![a2, b]);

        db.delete("fixed").unwrap();
        assert_eq!(db.list().unwrap().len(), 1);
        assert!(db.delete("fixed").is_err());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("z.db");
        {
            let db = Database::open_at(&path).unwrap();
            ZoneStore::create(&db, &FocusZone::new("A", "x", 1.0, 2.0)).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.list().unwrap().len(), 1);
    }
}
