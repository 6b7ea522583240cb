//! Append-only audit event repository.
//!
//! # Invariants
//! - Events are never updated or deleted through this repository.
//! - Listing preserves insertion order (SQLite `rowid`).

use crate::model::event::Event;
use crate::model::project::ProjectId;
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use chrono::DateTime;
use rusqlite::{params, Connection, Row};

/// Repository interface for the audit log.
pub trait EventRepository {
    /// Appends one event row.
    fn append_event(&self, event: &Event) -> RepoResult<()>;
    /// Lists events of `(owner, project_id)` in insertion order.
    fn list_events(&self, owner: Option<&str>, project_id: ProjectId) -> RepoResult<Vec<Event>>;
}

/// SQLite-backed audit log.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["events"])?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn append_event(&self, event: &Event) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO events (id, project_id, owner_id, who, what, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                event.id.to_string(),
                event.project_id.to_string(),
                event.owner_id.as_deref(),
                event.who.as_str(),
                event.what.as_str(),
                event.logged_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn list_events(&self, owner: Option<&str>, project_id: ProjectId) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, owner_id, who, what, logged_at
             FROM events
             WHERE owner_id IS ?1
               AND project_id = ?2
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query(params![owner, project_id.to_string()])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    let logged_at_ms: i64 = row.get("logged_at")?;
    let logged_at = DateTime::from_timestamp_millis(logged_at_ms).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{logged_at_ms}` in events.logged_at"
        ))
    })?;

    Ok(Event {
        id: parse_uuid(&id_text, "events.id")?,
        project_id: parse_uuid(&project_text, "events.project_id")?,
        owner_id: row.get("owner_id")?,
        who: row.get("who")?,
        what: row.get("what")?,
        logged_at,
    })
}
