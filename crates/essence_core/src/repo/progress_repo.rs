//! Progress repository: current-state transitions and completion storage.
//!
//! # Responsibility
//! - Move an alpha to a new current state.
//! - Read a progress snapshot of one project and write recomputed alpha and
//!   concern completions back.
//!
//! # Invariants
//! - Transition, snapshot read and completion writes share one immediate
//!   transaction. A failure at any step rolls all of them back.
//! - `current_state_order` is only resolved through a state of the same alpha
//!   and owner; anything else reads as `None`.

use crate::model::project::{Alpha, AlphaId, ConcernId, ProjectId, State, StateId};
use crate::repo::project_repo::{load_alpha, load_state};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

const REQUIRED_TABLES: &[&str] = &["projects", "concerns", "alphas", "states"];

/// Progress inputs of one alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaProgress {
    pub alpha_id: AlphaId,
    pub concern_id: ConcernId,
    /// Number of states owned by this alpha.
    pub state_count: u32,
    pub current_state_id: Option<StateId>,
    /// Order of the current state; `None` when unset or unresolvable.
    pub current_state_order: Option<u32>,
    /// Completion as last persisted.
    pub completion: f64,
}

/// Alpha membership of one concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcernProgress {
    pub concern_id: ConcernId,
    /// Ordered by alpha `order`.
    pub alpha_ids: Vec<AlphaId>,
}

/// Point-in-time progress view of one project.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressSnapshot {
    /// Ordered by alpha `order`.
    pub alphas: Vec<AlphaProgress>,
    /// Ordered by concern `order`.
    pub concerns: Vec<ConcernProgress>,
}

/// Recomputed completion values ready to persist.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionSet {
    pub alphas: Vec<(AlphaId, f64)>,
    pub concerns: Vec<(ConcernId, f64)>,
}

/// Current-state change applied at the start of a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub alpha_id: AlphaId,
    /// `None` clears the current state.
    pub state_id: Option<StateId>,
}

/// Repository interface for progress tracking.
pub trait ProgressRepository {
    /// Loads one alpha in `owner`'s scope.
    fn get_alpha(&self, owner: Option<&str>, alpha_id: AlphaId) -> RepoResult<Option<Alpha>>;
    /// Loads one state in `owner`'s scope.
    fn get_state(&self, owner: Option<&str>, state_id: StateId) -> RepoResult<Option<State>>;
    /// Applies `transition`, reads the project snapshot, derives completions
    /// with `compute` and stores them, all in one immediate transaction.
    ///
    /// Returns `Ok(None)` when the project is not in `owner`'s scope. Any
    /// error, including one from `compute`, leaves the store untouched.
    fn update_progress<E, F>(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
        transition: Option<StateTransition>,
        compute: F,
    ) -> Result<Option<CompletionSet>, E>
    where
        E: From<RepoError>,
        F: FnOnce(&ProgressSnapshot) -> Result<CompletionSet, E>;
}

/// SQLite-backed progress repository.
pub struct SqliteProgressRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProgressRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl ProgressRepository for SqliteProgressRepository<'_> {
    fn get_alpha(&self, owner: Option<&str>, alpha_id: AlphaId) -> RepoResult<Option<Alpha>> {
        load_alpha(self.conn, owner, alpha_id)
    }

    fn get_state(&self, owner: Option<&str>, state_id: StateId) -> RepoResult<Option<State>> {
        load_state(self.conn, owner, state_id)
    }

    fn update_progress<E, F>(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
        transition: Option<StateTransition>,
        compute: F,
    ) -> Result<Option<CompletionSet>, E>
    where
        E: From<RepoError>,
        F: FnOnce(&ProgressSnapshot) -> Result<CompletionSet, E>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        if !project_in_scope(&tx, owner, project_id)? {
            return Ok(None);
        }
        if let Some(transition) = transition {
            write_current_state(&tx, owner, project_id, transition)?;
        }

        let snapshot = read_snapshot(&tx, owner, project_id)?;
        let completions = compute(&snapshot)?;
        write_completions(&tx, owner, &completions)?;

        tx.commit().map_err(RepoError::from)?;
        Ok(Some(completions))
    }
}

fn project_in_scope(
    conn: &Connection,
    owner: Option<&str>,
    project_id: ProjectId,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM projects
            WHERE id = ?1
              AND owner_id IS ?2
        );",
        params![project_id.to_string(), owner],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn write_current_state(
    conn: &Connection,
    owner: Option<&str>,
    project_id: ProjectId,
    transition: StateTransition,
) -> RepoResult<()> {
    let alpha_id = transition.alpha_id;
    let changed = conn.execute(
        "UPDATE alphas
         SET current_state_id = ?4
         WHERE id = ?1
           AND owner_id IS ?2
           AND project_id = ?3;",
        params![
            alpha_id.to_string(),
            owner,
            project_id.to_string(),
            transition.state_id.map(|id| id.to_string())
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound(format!("alpha {alpha_id}")));
    }
    Ok(())
}

fn read_snapshot(
    conn: &Connection,
    owner: Option<&str>,
    project_id: ProjectId,
) -> RepoResult<ProgressSnapshot> {
    let project_key = project_id.to_string();
    let mut snapshot = ProgressSnapshot::default();

    let mut stmt = conn.prepare(
        "SELECT
            a.id AS id,
            a.concern_id AS concern_id,
            a.current_state_id AS current_state_id,
            a.completion AS completion,
            (
                SELECT COUNT(*)
                FROM states s
                WHERE s.alpha_id = a.id
                  AND s.owner_id IS a.owner_id
            ) AS state_count,
            (
                SELECT cs.sort_order
                FROM states cs
                WHERE cs.id = a.current_state_id
                  AND cs.alpha_id = a.id
                  AND cs.owner_id IS a.owner_id
            ) AS current_state_order
         FROM alphas a
         WHERE a.owner_id IS ?1
           AND a.project_id = ?2
         ORDER BY a.sort_order ASC;",
    )?;
    let mut rows = stmt.query(params![owner, project_key])?;
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        let concern_text: String = row.get("concern_id")?;
        let current_state_id = row
            .get::<_, Option<String>>("current_state_id")?
            .map(|value| parse_uuid(&value, "alphas.current_state_id"))
            .transpose()?;
        let state_count: i64 = row.get("state_count")?;
        let current_state_order = row
            .get::<_, Option<i64>>("current_state_order")?
            .map(|value| {
                u32::try_from(value).map_err(|_| {
                    RepoError::InvalidData(format!("invalid order `{value}` in states.sort_order"))
                })
            })
            .transpose()?;

        snapshot.alphas.push(AlphaProgress {
            alpha_id: parse_uuid(&id_text, "alphas.id")?,
            concern_id: parse_uuid(&concern_text, "alphas.concern_id")?,
            state_count: u32::try_from(state_count).map_err(|_| {
                RepoError::InvalidData(format!("invalid state count `{state_count}`"))
            })?,
            current_state_id,
            current_state_order,
            completion: row.get("completion")?,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT id
         FROM concerns
         WHERE owner_id IS ?1
           AND project_id = ?2
         ORDER BY sort_order ASC;",
    )?;
    let mut rows = stmt.query(params![owner, project_key])?;
    while let Some(row) = rows.next()? {
        let id_text: String = row.get(0)?;
        let concern_id = parse_uuid(&id_text, "concerns.id")?;
        let alpha_ids = snapshot
            .alphas
            .iter()
            .filter(|alpha| alpha.concern_id == concern_id)
            .map(|alpha| alpha.alpha_id)
            .collect();
        snapshot.concerns.push(ConcernProgress {
            concern_id,
            alpha_ids,
        });
    }

    Ok(snapshot)
}

fn write_completions(
    conn: &Connection,
    owner: Option<&str>,
    completions: &CompletionSet,
) -> RepoResult<()> {
    let mut update_alpha = conn.prepare(
        "UPDATE alphas
         SET completion = ?3
         WHERE id = ?1
           AND owner_id IS ?2;",
    )?;
    for (alpha_id, completion) in &completions.alphas {
        if update_alpha.execute(params![alpha_id.to_string(), owner, completion])? == 0 {
            return Err(RepoError::NotFound(format!("alpha {alpha_id}")));
        }
    }

    let mut update_concern = conn.prepare(
        "UPDATE concerns
         SET completion = ?3
         WHERE id = ?1
           AND owner_id IS ?2;",
    )?;
    for (concern_id, completion) in &completions.concerns {
        if update_concern.execute(params![concern_id.to_string(), owner, completion])? == 0 {
            return Err(RepoError::NotFound(format!("concern {concern_id}")));
        }
    }
    Ok(())
}
