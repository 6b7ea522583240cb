//! Core domain logic for the Essence project tracker.
//! Seeds project hierarchies from the kernel taxonomy, aggregates completion
//! and keeps the audit log.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogSettings};
pub use model::event::{Event, EventId};
pub use model::project::{
    Alpha, AlphaId, AlphaOverview, Concern, ConcernId, ConcernOverview, OwnerId, Project,
    ProjectId, ProjectOverview, ProjectTree, State, StateId,
};
pub use model::taxonomy::{AlphaDef, ConcernDef, Taxonomy, TaxonomyError};
pub use repo::event_repo::{EventRepository, SqliteEventRepository};
pub use repo::progress_repo::{
    AlphaProgress, CompletionSet, ConcernProgress, ProgressRepository, ProgressSnapshot,
    SqliteProgressRepository, StateTransition,
};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::{RepoError, RepoResult};
pub use service::completion_service::{
    alpha_completion, compute_alpha_completions, compute_concern_completions, concern_completion,
    CompletionService,
};
pub use service::error::TrackerError;
pub use service::event_service::{render_events_csv, EventLogService, CSV_HEADER};
pub use service::parse_project_id;
pub use service::project_service::{
    plan_project_tree, ProjectService, DEFAULT_PROJECT_DESCRIPTION, DEFAULT_PROJECT_NAME,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
