//! Service-level error taxonomy.

use crate::model::taxonomy::TaxonomyError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors surfaced by tracker services.
#[derive(Debug)]
pub enum TrackerError {
    /// Required input is missing, empty or malformed. Carries the field name.
    InvalidArgument(&'static str),
    /// A non-demo operation was attempted without an owner.
    Unauthenticated,
    /// A seeding invariant is violated in persisted data. Not recoverable by
    /// the caller.
    DataIntegrity(String),
    /// Target record does not exist in the caller's scope.
    NotFound(String),
    /// The seeding taxonomy is structurally invalid.
    Taxonomy(TaxonomyError),
    /// Repository-level failure.
    Repo(RepoError),
}

impl TrackerError {
    /// Stable code used in structured log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Unauthenticated => "unauthenticated",
            Self::DataIntegrity(_) => "data_integrity",
            Self::NotFound(_) => "not_found",
            Self::Taxonomy(_) => "invalid_taxonomy",
            Self::Repo(_) => "repo_failure",
        }
    }
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(field) => write!(f, "missing or invalid argument: {field}"),
            Self::Unauthenticated => write!(f, "an authenticated owner is required"),
            Self::DataIntegrity(message) => write!(f, "data integrity violation: {message}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Taxonomy(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Taxonomy(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TrackerError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(what) => Self::NotFound(what),
            other => Self::Repo(other),
        }
    }
}

impl From<TaxonomyError> for TrackerError {
    fn from(value: TaxonomyError) -> Self {
        Self::Taxonomy(value)
    }
}
