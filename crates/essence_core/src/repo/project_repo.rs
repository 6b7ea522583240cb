//! Project hierarchy repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist a fully planned project tree atomically.
//! - Provide ordered, owner-scoped reads of projects, concerns, alphas and
//!   states.
//!
//! # Invariants
//! - `insert_project_tree` writes the project row and every child row in one
//!   immediate transaction; a failure anywhere leaves no rows behind.
//! - Child listings are ordered by `sort_order ASC`.

use crate::model::project::{
    Alpha, AlphaId, Concern, Project, ProjectId, ProjectTree, State, StateId,
};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_order, parse_uuid, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    is_demo,
    owner_id
FROM projects";

const CONCERN_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    owner_id,
    name,
    description,
    sort_order,
    completion
FROM concerns";

pub(crate) const ALPHA_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    concern_id,
    owner_id,
    name,
    description,
    sort_order,
    current_state_id,
    completion
FROM alphas";

pub(crate) const STATE_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    alpha_id,
    owner_id,
    name,
    description,
    sort_order
FROM states";

const REQUIRED_TABLES: &[&str] = &["projects", "concerns", "alphas", "states"];

/// Repository interface for project hierarchy persistence.
pub trait ProjectRepository {
    /// Persists the project and its whole hierarchy as one unit.
    fn insert_project_tree(&self, tree: &ProjectTree) -> RepoResult<()>;
    /// Loads one project visible to `owner`.
    fn get_project(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
    ) -> RepoResult<Option<Project>>;
    /// Lists projects visible to `owner` in creation order.
    fn list_projects(&self, owner: Option<&str>) -> RepoResult<Vec<Project>>;
    /// Loads the first owner-less demo project, if any.
    fn find_demo_project(&self) -> RepoResult<Option<Project>>;
    /// Lists concerns of a project ordered by `order`.
    fn list_concerns(&self, owner: Option<&str>, project_id: ProjectId)
        -> RepoResult<Vec<Concern>>;
    /// Lists alphas of a project ordered by their project-wide `order`.
    fn list_alphas(&self, owner: Option<&str>, project_id: ProjectId) -> RepoResult<Vec<Alpha>>;
    /// Lists states of a project ordered by alpha, then state `order`.
    fn list_states(&self, owner: Option<&str>, project_id: ProjectId) -> RepoResult<Vec<State>>;
}

/// SQLite-backed project hierarchy repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn insert_project_tree(&self, tree: &ProjectTree) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let project = &tree.project;
        tx.execute(
            "INSERT INTO projects (id, name, description, is_demo, owner_id)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                project.id.to_string(),
                project.name.as_str(),
                project.description.as_str(),
                bool_to_int(project.is_demo),
                project.owner_id.as_deref(),
            ],
        )?;

        {
            let mut insert_concern = tx.prepare(
                "INSERT INTO concerns (
                    id, project_id, owner_id, name, description, sort_order, completion
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            )?;
            for concern in &tree.concerns {
                insert_concern.execute(params![
                    concern.id.to_string(),
                    concern.project_id.to_string(),
                    concern.owner_id.as_deref(),
                    concern.name.as_str(),
                    concern.description.as_str(),
                    concern.order,
                    concern.completion,
                ])?;
            }

            let mut insert_alpha = tx.prepare(
                "INSERT INTO alphas (
                    id, project_id, concern_id, owner_id, name, description,
                    sort_order, current_state_id, completion
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            )?;
            for alpha in &tree.alphas {
                insert_alpha.execute(params![
                    alpha.id.to_string(),
                    alpha.project_id.to_string(),
                    alpha.concern_id.to_string(),
                    alpha.owner_id.as_deref(),
                    alpha.name.as_str(),
                    alpha.description.as_str(),
                    alpha.order,
                    alpha.current_state_id.map(|id| id.to_string()),
                    alpha.completion,
                ])?;
            }

            let mut insert_state = tx.prepare(
                "INSERT INTO states (
                    id, project_id, alpha_id, owner_id, name, description, sort_order
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            )?;
            for state in &tree.states {
                insert_state.execute(params![
                    state.id.to_string(),
                    state.project_id.to_string(),
                    state.alpha_id.to_string(),
                    state.owner_id.as_deref(),
                    state.name.as_str(),
                    state.description.as_str(),
                    state.order,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_project(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
    ) -> RepoResult<Option<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE id = ?1
               AND owner_id IS ?2;"
        ))?;
        let mut rows = stmt.query(params![project_id.to_string(), owner])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(&self, owner: Option<&str>) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE owner_id IS ?1
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![owner])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn find_demo_project(&self) -> RepoResult<Option<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE is_demo = 1
               AND owner_id IS NULL
             ORDER BY rowid ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_concerns(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
    ) -> RepoResult<Vec<Concern>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONCERN_SELECT_SQL}
             WHERE owner_id IS ?1
               AND project_id = ?2
             ORDER BY sort_order ASC;"
        ))?;
        let mut rows = stmt.query(params![owner, project_id.to_string()])?;
        let mut concerns = Vec::new();
        while let Some(row) = rows.next()? {
            concerns.push(parse_concern_row(row)?);
        }
        Ok(concerns)
    }

    fn list_alphas(&self, owner: Option<&str>, project_id: ProjectId) -> RepoResult<Vec<Alpha>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ALPHA_SELECT_SQL}
             WHERE owner_id IS ?1
               AND project_id = ?2
             ORDER BY sort_order ASC;"
        ))?;
        let mut rows = stmt.query(params![owner, project_id.to_string()])?;
        let mut alphas = Vec::new();
        while let Some(row) = rows.next()? {
            alphas.push(parse_alpha_row(row)?);
        }
        Ok(alphas)
    }

    fn list_states(&self, owner: Option<&str>, project_id: ProjectId) -> RepoResult<Vec<State>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                s.id AS id,
                s.project_id AS project_id,
                s.alpha_id AS alpha_id,
                s.owner_id AS owner_id,
                s.name AS name,
                s.description AS description,
                s.sort_order AS sort_order
             FROM states s
             INNER JOIN alphas a ON a.id = s.alpha_id
             WHERE s.owner_id IS ?1
               AND s.project_id = ?2
             ORDER BY a.sort_order ASC, s.sort_order ASC;",
        )?;
        let mut rows = stmt.query(params![owner, project_id.to_string()])?;
        let mut states = Vec::new();
        while let Some(row) = rows.next()? {
            states.push(parse_state_row(row)?);
        }
        Ok(states)
    }
}

/// Loads one alpha in `owner`'s scope.
pub(crate) fn load_alpha(
    conn: &Connection,
    owner: Option<&str>,
    alpha_id: AlphaId,
) -> RepoResult<Option<Alpha>> {
    let mut stmt = conn.prepare(&format!(
        "{ALPHA_SELECT_SQL}
         WHERE id = ?1
           AND owner_id IS ?2;"
    ))?;
    let mut rows = stmt.query(params![alpha_id.to_string(), owner])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_alpha_row(row)?));
    }
    Ok(None)
}

/// Loads one state in `owner`'s scope.
pub(crate) fn load_state(
    conn: &Connection,
    owner: Option<&str>,
    state_id: StateId,
) -> RepoResult<Option<State>> {
    let mut stmt = conn.prepare(&format!(
        "{STATE_SELECT_SQL}
         WHERE id = ?1
           AND owner_id IS ?2;"
    ))?;
    let state = stmt
        .query_row(params![state_id.to_string(), owner], |row| {
            Ok(parse_state_row(row))
        })
        .optional()?;
    state.transpose()
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id_text: String = row.get("id")?;
    Ok(Project {
        id: parse_uuid(&id_text, "projects.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        is_demo: parse_bool(row.get("is_demo")?, "projects.is_demo")?,
        owner_id: row.get("owner_id")?,
    })
}

fn parse_concern_row(row: &Row<'_>) -> RepoResult<Concern> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    Ok(Concern {
        id: parse_uuid(&id_text, "concerns.id")?,
        project_id: parse_uuid(&project_text, "concerns.project_id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        order: parse_order(row.get("sort_order")?, "concerns.sort_order")?,
        completion: row.get("completion")?,
    })
}

pub(crate) fn parse_alpha_row(row: &Row<'_>) -> RepoResult<Alpha> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    let concern_text: String = row.get("concern_id")?;
    let current_state_id = row
        .get::<_, Option<String>>("current_state_id")?
        .map(|value| parse_uuid(&value, "alphas.current_state_id"))
        .transpose()?;

    Ok(Alpha {
        id: parse_uuid(&id_text, "alphas.id")?,
        project_id: parse_uuid(&project_text, "alphas.project_id")?,
        concern_id: parse_uuid(&concern_text, "alphas.concern_id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        order: parse_order(row.get("sort_order")?, "alphas.sort_order")?,
        current_state_id,
        completion: row.get("completion")?,
    })
}

pub(crate) fn parse_state_row(row: &Row<'_>) -> RepoResult<State> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    let alpha_text: String = row.get("alpha_id")?;
    Ok(State {
        id: parse_uuid(&id_text, "states.id")?,
        project_id: parse_uuid(&project_text, "states.project_id")?,
        alpha_id: parse_uuid(&alpha_text, "states.alpha_id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        order: parse_order(row.get("sort_order")?, "states.sort_order")?,
    })
}
