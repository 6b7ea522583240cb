//! Project seeding use-case service.
//!
//! # Responsibility
//! - Validate project creation input and resolve the owning scope.
//! - Expand the taxonomy into a complete concern/alpha/state tree.
//! - Expose owner-scoped project listings and the hierarchy overview.
//!
//! # Invariants
//! - Concern order is the 1-based taxonomy position.
//! - Alpha order is a project-wide running counter from 1, not reset per
//!   concern.
//! - State order is the 1-based position within its alpha.
//! - A project is persisted together with its full tree or not at all.

use crate::model::project::{
    Alpha, AlphaOverview, Concern, ConcernOverview, Project, ProjectId, ProjectOverview,
    ProjectTree, State,
};
use crate::model::taxonomy::Taxonomy;
use crate::repo::project_repo::ProjectRepository;
use crate::service::error::TrackerError;
use crate::service::{ensure_project_id, require_owner, require_text};
use log::{error, info};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

/// Name of the project created for owners who have none yet.
pub const DEFAULT_PROJECT_NAME: &str = "Default Project";
/// Description of the project created for owners who have none yet.
pub const DEFAULT_PROJECT_DESCRIPTION: &str =
    "This is the default description of the project. Feel free to edit it.";

/// Project seeding and read service.
pub struct ProjectService<'t, R: ProjectRepository> {
    repo: R,
    taxonomy: &'t Taxonomy,
}

impl<'t, R: ProjectRepository> ProjectService<'t, R> {
    /// Creates a service seeding projects from `taxonomy`.
    pub fn new(repo: R, taxonomy: &'t Taxonomy) -> Self {
        Self { repo, taxonomy }
    }

    /// Creates a project and seeds its whole hierarchy.
    ///
    /// # Contract
    /// - `name` and `description` must not be empty (`InvalidArgument`); both
    ///   are stored exactly as given.
    /// - Demo projects are owner-less; other projects require `owner`
    ///   (`Unauthenticated`).
    /// - Nothing is written when validation fails.
    pub fn create_project(
        &self,
        owner: Option<&str>,
        name: &str,
        description: &str,
        is_demo: bool,
    ) -> Result<ProjectId, TrackerError> {
        let started_at = Instant::now();
        let name = require_text("name", name)?;
        let description = require_text("description", description)?;
        let owner_id = if is_demo {
            None
        } else {
            Some(require_owner(owner)?.to_string())
        };
        self.taxonomy.validate()?;

        let tree = plan_project_tree(
            self.taxonomy,
            Project::new(name, description, is_demo, owner_id),
        );
        let project_id = tree.project.id;

        if let Err(err) = self.repo.insert_project_tree(&tree) {
            error!(
                "event=project_create module=service status=error project_id={project_id} duration_ms={} error_code=seed_failed error={err}",
                started_at.elapsed().as_millis()
            );
            return Err(err.into());
        }

        info!(
            "event=project_create module=service status=ok project_id={project_id} demo={is_demo} concerns={} alphas={} states={} duration_ms={}",
            tree.concerns.len(),
            tree.alphas.len(),
            tree.states.len(),
            started_at.elapsed().as_millis()
        );
        Ok(project_id)
    }

    /// Returns the owner's first non-demo project, creating the default
    /// project when the owner has none.
    pub fn ensure_default_project(&self, owner: Option<&str>) -> Result<ProjectId, TrackerError> {
        let owner = require_owner(owner)?;
        let existing = self
            .repo
            .list_projects(Some(owner))?
            .into_iter()
            .find(|project| !project.is_demo);
        if let Some(project) = existing {
            return Ok(project.id);
        }
        self.create_project(
            Some(owner),
            DEFAULT_PROJECT_NAME,
            DEFAULT_PROJECT_DESCRIPTION,
            false,
        )
    }

    /// Loads the shared demo project, if one was seeded.
    pub fn find_demo_project(&self) -> Result<Option<Project>, TrackerError> {
        self.repo.find_demo_project().map_err(Into::into)
    }

    /// Lists projects visible to `owner` in creation order.
    pub fn list_projects(&self, owner: Option<&str>) -> Result<Vec<Project>, TrackerError> {
        self.repo.list_projects(owner).map_err(Into::into)
    }

    /// Loads a project together with its ordered hierarchy.
    pub fn project_overview(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
    ) -> Result<ProjectOverview, TrackerError> {
        ensure_project_id(project_id)?;
        let project = self
            .repo
            .get_project(owner, project_id)?
            .ok_or_else(|| TrackerError::NotFound(format!("project {project_id}")))?;

        let mut states_by_alpha: HashMap<Uuid, Vec<State>> = HashMap::new();
        for state in self.repo.list_states(owner, project_id)? {
            states_by_alpha.entry(state.alpha_id).or_default().push(state);
        }

        let mut alphas_by_concern: HashMap<Uuid, Vec<AlphaOverview>> = HashMap::new();
        for alpha in self.repo.list_alphas(owner, project_id)? {
            let states = states_by_alpha.remove(&alpha.id).unwrap_or_default();
            alphas_by_concern
                .entry(alpha.concern_id)
                .or_default()
                .push(AlphaOverview { alpha, states });
        }

        let concerns = self
            .repo
            .list_concerns(owner, project_id)?
            .into_iter()
            .map(|concern| ConcernOverview {
                alphas: alphas_by_concern.remove(&concern.id).unwrap_or_default(),
                concern,
            })
            .collect();

        Ok(ProjectOverview { project, concerns })
    }
}

/// Expands `taxonomy` into the full hierarchy of `project`.
///
/// Pure: generates ids and orders but performs no I/O. Missing side-table
/// descriptions become empty strings; validated taxonomies have none.
pub fn plan_project_tree(taxonomy: &Taxonomy, project: Project) -> ProjectTree {
    let mut concerns = Vec::with_capacity(taxonomy.concern_count());
    let mut alphas = Vec::with_capacity(taxonomy.alpha_count());
    let mut states = Vec::with_capacity(taxonomy.state_count());
    let mut alpha_counter: u32 = 0;

    for (concern_index, concern_def) in taxonomy.concerns.iter().enumerate() {
        let concern = Concern {
            id: Uuid::new_v4(),
            project_id: project.id,
            owner_id: project.owner_id.clone(),
            name: concern_def.name.clone(),
            description: concern_def.description.clone(),
            order: position(concern_index),
            completion: 0.0,
        };

        for alpha_def in &concern_def.alphas {
            alpha_counter += 1;
            let alpha = Alpha {
                id: Uuid::new_v4(),
                project_id: project.id,
                concern_id: concern.id,
                owner_id: project.owner_id.clone(),
                name: alpha_def.name.clone(),
                description: taxonomy
                    .alpha_description(&alpha_def.name)
                    .unwrap_or_default()
                    .to_string(),
                order: alpha_counter,
                current_state_id: None,
                completion: 0.0,
            };

            for (state_index, state_name) in alpha_def.states.iter().enumerate() {
                states.push(State {
                    id: Uuid::new_v4(),
                    project_id: project.id,
                    alpha_id: alpha.id,
                    owner_id: project.owner_id.clone(),
                    name: state_name.clone(),
                    description: taxonomy
                        .state_description(&alpha_def.name, state_name)
                        .unwrap_or_default()
                        .to_string(),
                    order: position(state_index),
                });
            }
            alphas.push(alpha);
        }
        concerns.push(concern);
    }

    ProjectTree {
        project,
        concerns,
        alphas,
        states,
    }
}

fn position(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}
