//! Project hierarchy records.
//!
//! # Invariants
//! - `Concern::order` and `Alpha::order` are 1-based and contiguous per project.
//! - `State::order` is 1-based and contiguous per alpha.
//! - `Alpha::current_state_id`, when set, points at a state of the same alpha.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable project identifier.
pub type ProjectId = Uuid;
/// Stable concern identifier.
pub type ConcernId = Uuid;
/// Stable alpha identifier.
pub type AlphaId = Uuid;
/// Stable state identifier.
pub type StateId = Uuid;
/// Opaque user id handed over by the caller's auth layer.
pub type OwnerId = String;

/// Root of one tracked hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub is_demo: bool,
    /// `None` for the shared demo scope.
    pub owner_id: Option<OwnerId>,
}

impl Project {
    /// Creates a project record with a generated id.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        is_demo: bool,
        owner_id: Option<OwnerId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            is_demo,
            owner_id,
        }
    }
}

/// Top-level tracking area inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concern {
    pub id: ConcernId,
    pub project_id: ProjectId,
    pub owner_id: Option<OwnerId>,
    pub name: String,
    pub description: String,
    pub order: u32,
    /// Mean of child alpha completions, 0..=100.
    pub completion: f64,
}

/// Trackable dimension of progress inside a concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alpha {
    pub id: AlphaId,
    pub project_id: ProjectId,
    pub concern_id: ConcernId,
    pub owner_id: Option<OwnerId>,
    pub name: String,
    pub description: String,
    /// Project-wide position, not reset per concern.
    pub order: u32,
    pub current_state_id: Option<StateId>,
    /// Position of the current state over the state count, 0..=100.
    pub completion: f64,
}

/// Milestone an alpha can occupy. Higher `order` means further progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    pub project_id: ProjectId,
    pub alpha_id: AlphaId,
    pub owner_id: Option<OwnerId>,
    pub name: String,
    pub description: String,
    pub order: u32,
}

/// Fully planned hierarchy for one new project, persisted as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTree {
    pub project: Project,
    pub concerns: Vec<Concern>,
    pub alphas: Vec<Alpha>,
    pub states: Vec<State>,
}

/// Read model of one alpha with its states resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaOverview {
    pub alpha: Alpha,
    /// Ordered by `State::order`.
    pub states: Vec<State>,
}

impl AlphaOverview {
    /// Name of the current state, if one is selected.
    pub fn current_state_name(&self) -> Option<&str> {
        let current = self.alpha.current_state_id?;
        self.states
            .iter()
            .find(|state| state.id == current)
            .map(|state| state.name.as_str())
    }
}

/// Read model of one concern with its alphas.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcernOverview {
    pub concern: Concern,
    /// Ordered by `Alpha::order`.
    pub alphas: Vec<AlphaOverview>,
}

/// Read model of a whole project hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOverview {
    pub project: Project,
    /// Ordered by `Concern::order`.
    pub concerns: Vec<ConcernOverview>,
}
