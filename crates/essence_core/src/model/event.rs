//! Audit event record.

use crate::model::project::{OwnerId, ProjectId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable event identifier.
pub type EventId = Uuid;

/// One append-only audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub project_id: ProjectId,
    pub owner_id: Option<OwnerId>,
    /// Who caused the event, or where it happened.
    pub who: String,
    pub what: String,
    pub logged_at: DateTime<Utc>,
}

impl Event {
    /// Creates an event with a generated id.
    pub fn new(
        project_id: ProjectId,
        owner_id: Option<OwnerId>,
        who: impl Into<String>,
        what: impl Into<String>,
        logged_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            owner_id,
            who: who.into(),
            what: what.into(),
            logged_at,
        }
    }

    /// ISO-8601 UTC timestamp with millisecond precision, e.g.
    /// `2013-06-01T09:30:00.000Z`.
    pub fn logged_at_iso(&self) -> String {
        self.logged_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use super::Event;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn logged_at_iso_uses_millis_and_zulu_suffix() {
        let at = Utc.with_ymd_and_hms(2013, 6, 1, 9, 30, 5).unwrap();
        let event = Event::new(Uuid::new_v4(), None, "board", "moved", at);
        assert_eq!(event.logged_at_iso(), "2013-06-01T09:30:05.000Z");
    }
}
