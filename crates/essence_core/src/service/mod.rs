//! Core use-case services.
//!
//! # Responsibility
//! - Validate caller input and owner scope above the repository layer.
//! - Orchestrate seeding, completion recompute and the audit log.
//!
//! # Invariants
//! - Owner identity is always an explicit argument; there is no ambient
//!   session user.
//! - Services depend on repository traits only, never on SQLite directly.

pub mod completion_service;
pub mod error;
pub mod event_service;
pub mod project_service;

use crate::model::project::ProjectId;
use error::TrackerError;
use uuid::Uuid;

/// Parses a caller-supplied project id; blank and malformed ids are
/// rejected as `InvalidArgument`.
pub fn parse_project_id(value: &str) -> Result<ProjectId, TrackerError> {
    let value = require_text("project_id", value.trim())?;
    let id = Uuid::parse_str(value).map_err(|_| TrackerError::InvalidArgument("project_id"))?;
    ensure_project_id(id)?;
    Ok(id)
}

pub(crate) fn ensure_project_id(project_id: ProjectId) -> Result<(), TrackerError> {
    if project_id.is_nil() {
        return Err(TrackerError::InvalidArgument("project_id"));
    }
    Ok(())
}

/// Empty and missing values are both treated as missing. Accepted values are
/// returned untouched, padding included.
pub(crate) fn require_text<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, TrackerError> {
    if value.is_empty() {
        return Err(TrackerError::InvalidArgument(field));
    }
    Ok(value)
}

pub(crate) fn require_owner(owner: Option<&str>) -> Result<&str, TrackerError> {
    match owner.map(str::trim) {
        Some(owner) if !owner.is_empty() => Ok(owner),
        _ => Err(TrackerError::Unauthenticated),
    }
}
