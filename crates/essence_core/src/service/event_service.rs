//! Audit log use-case service.
//!
//! # Responsibility
//! - Validate and append audit events.
//! - Render a project's events as CSV.
//!
//! # Invariants
//! - `project_id`, `who` and `what` are required; empty counts as missing.
//!   Accepted text is stored exactly as given.
//! - CSV rows keep insertion order. Field values are quoted but not escaped,
//!   so embedded `"` or `,` pass through verbatim.

use crate::model::event::Event;
use crate::model::project::ProjectId;
use crate::repo::event_repo::EventRepository;
use crate::service::error::TrackerError;
use crate::service::{ensure_project_id, require_text};
use chrono::{DateTime, Utc};
use log::{error, info};

/// Header line of every CSV export.
pub const CSV_HEADER: &str = "WHEN,WHO,WHAT\n";

/// Audit log service.
pub struct EventLogService<R: EventRepository> {
    repo: R,
}

impl<R: EventRepository> EventLogService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Appends an event stamped with the current time.
    pub fn log_event(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
        who: &str,
        what: &str,
    ) -> Result<bool, TrackerError> {
        self.log_event_at(owner, project_id, who, what, Utc::now())
    }

    /// Appends an event stamped with `logged_at`.
    pub fn log_event_at(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
        who: &str,
        what: &str,
        logged_at: DateTime<Utc>,
    ) -> Result<bool, TrackerError> {
        ensure_project_id(project_id)?;
        let who = require_text("who", who)?;
        let what = require_text("what", what)?;

        let event = Event::new(
            project_id,
            owner.map(str::to_string),
            who,
            what,
            logged_at,
        );
        if let Err(err) = self.repo.append_event(&event) {
            error!(
                "event=audit_append module=service status=error project_id={project_id} error_code=append_failed error={err}"
            );
            return Err(err.into());
        }
        info!(
            "event=audit_append module=service status=ok project_id={project_id} event_id={}",
            event.id
        );
        Ok(true)
    }

    /// Exports the events of `(owner, project_id)` as CSV.
    pub fn export_events_csv(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
    ) -> Result<String, TrackerError> {
        ensure_project_id(project_id)?;
        let events = self.repo.list_events(owner, project_id)?;
        info!(
            "event=audit_export module=service status=ok project_id={project_id} rows={}",
            events.len()
        );
        Ok(render_events_csv(&events))
    }
}

/// Renders `WHEN,WHO,WHAT` CSV, one newline-terminated row per event.
pub fn render_events_csv(events: &[Event]) -> String {
    events.iter().fold(CSV_HEADER.to_string(), |mut buffer, event| {
        buffer.push_str(&format!(
            "\"{}\",\"{}\",\"{}\"\n",
            event.logged_at_iso(),
            event.who,
            event.what
        ));
        buffer
    })
}

#[cfg(test)]
mod tests {
    use super::render_events_csv;
    use crate::model::event::Event;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn empty_log_renders_header_only() {
        assert_eq!(render_events_csv(&[]), "WHEN,WHO,WHAT\n");
    }

    #[test]
    fn rows_are_quoted_without_escaping() {
        let project_id = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2013, 11, 4, 16, 0, 0).unwrap();
        let events = vec![
            Event::new(project_id, None, "Team", "moved to Formed", at),
            Event::new(project_id, None, "board", "said \"hi\", twice", at),
        ];

        assert_eq!(
            render_events_csv(&events),
            "WHEN,WHO,WHAT\n\
             \"2013-11-04T16:00:00.000Z\",\"Team\",\"moved to Formed\"\n\
             \"2013-11-04T16:00:00.000Z\",\"board\",\"said \"hi\", twice\"\n"
        );
    }
}
