//! Completion aggregation and state transitions.
//!
//! # Responsibility
//! - Derive alpha completion from the position of its current state.
//! - Derive concern completion as the mean of its alphas.
//! - Recompute a project after every current-state change.
//!
//! # Invariants
//! - Alpha completion is computed before concern completion, and concern
//!   values are always derived from the alpha values of the same pass.
//! - A dangling current state, an alpha without states or a concern without
//!   alphas aborts the whole recompute; nothing is written, including the
//!   current-state change that triggered it.
//! - Recompute is a pure function of stored state, so repeating it is a no-op.

use crate::model::project::{Alpha, AlphaId, ConcernId, ProjectId, StateId};
use crate::repo::progress_repo::{
    CompletionSet, ProgressRepository, ProgressSnapshot, StateTransition,
};
use crate::service::ensure_project_id;
use crate::service::error::TrackerError;
use log::{error, info};
use std::collections::HashMap;
use std::time::Instant;

/// Completion recompute service.
pub struct CompletionService<R: ProgressRepository> {
    repo: R,
}

impl<R: ProgressRepository> CompletionService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Recomputes every alpha, then every concern, of one project and stores
    /// both passes in one transaction.
    pub fn recompute_completions(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
    ) -> Result<CompletionSet, TrackerError> {
        let started_at = Instant::now();
        let completions = self.update(owner, project_id, None, compute_completions)?;
        info!(
            "event=completion_recompute module=service status=ok project_id={project_id} alphas={} concerns={} duration_ms={}",
            completions.alphas.len(),
            completions.concerns.len(),
            started_at.elapsed().as_millis()
        );
        Ok(completions)
    }

    /// Recomputes and stores alpha completions only.
    pub fn recompute_alpha_completions(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
    ) -> Result<Vec<(AlphaId, f64)>, TrackerError> {
        let completions = self.update(owner, project_id, None, |snapshot| {
            Ok(CompletionSet {
                alphas: compute_alpha_completions(snapshot)?,
                concerns: Vec::new(),
            })
        })?;
        Ok(completions.alphas)
    }

    /// Recomputes and stores concern completions from the alpha completions
    /// currently persisted. Run `recompute_alpha_completions` first.
    pub fn recompute_concern_completions(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
    ) -> Result<Vec<(ConcernId, f64)>, TrackerError> {
        let completions = self.update(owner, project_id, None, |snapshot| {
            let stored: Vec<(AlphaId, f64)> = snapshot
                .alphas
                .iter()
                .map(|alpha| (alpha.alpha_id, alpha.completion))
                .collect();
            Ok(CompletionSet {
                alphas: Vec::new(),
                concerns: compute_concern_completions(snapshot, &stored)?,
            })
        })?;
        Ok(completions.concerns)
    }

    /// Moves an alpha to `state_id` (or clears it with `None`) and recomputes
    /// the alpha's project in the same transaction.
    ///
    /// # Contract
    /// - The state must belong to the same alpha (`InvalidArgument`).
    /// - When the recompute fails the transition is not persisted either.
    /// - Returns the alpha as stored after the recompute.
    pub fn set_current_state(
        &self,
        owner: Option<&str>,
        alpha_id: AlphaId,
        state_id: Option<StateId>,
    ) -> Result<Alpha, TrackerError> {
        let alpha = self
            .repo
            .get_alpha(owner, alpha_id)?
            .ok_or_else(|| TrackerError::NotFound(format!("alpha {alpha_id}")))?;

        if let Some(state_id) = state_id {
            let belongs = self
                .repo
                .get_state(owner, state_id)?
                .is_some_and(|state| state.alpha_id == alpha_id);
            if !belongs {
                return Err(TrackerError::InvalidArgument("state_id"));
            }
        }

        let transition = StateTransition { alpha_id, state_id };
        self.update(
            owner,
            alpha.project_id,
            Some(transition),
            compute_completions,
        )?;
        info!(
            "event=alpha_transition module=service status=ok alpha_id={alpha_id} project_id={} cleared={}",
            alpha.project_id,
            state_id.is_none()
        );

        self.repo
            .get_alpha(owner, alpha_id)?
            .ok_or_else(|| TrackerError::NotFound(format!("alpha {alpha_id}")))
    }

    fn update<F>(
        &self,
        owner: Option<&str>,
        project_id: ProjectId,
        transition: Option<StateTransition>,
        compute: F,
    ) -> Result<CompletionSet, TrackerError>
    where
        F: FnOnce(&ProgressSnapshot) -> Result<CompletionSet, TrackerError>,
    {
        ensure_project_id(project_id)?;
        let result = self
            .repo
            .update_progress(owner, project_id, transition, compute)
            .and_then(|completions| {
                completions
                    .ok_or_else(|| TrackerError::NotFound(format!("project {project_id}")))
            });
        if let Err(err) = &result {
            error!(
                "event=completion_recompute module=service status=error project_id={project_id} error_code={} error={err}",
                err.code()
            );
        }
        result
    }
}

/// Full pass: alphas first, then concerns from those alpha values.
fn compute_completions(snapshot: &ProgressSnapshot) -> Result<CompletionSet, TrackerError> {
    let alphas = compute_alpha_completions(snapshot)?;
    let concerns = compute_concern_completions(snapshot, &alphas)?;
    Ok(CompletionSet { alphas, concerns })
}

/// Completion of one alpha: `position / state_count * 100`.
///
/// `position` is the order of the current state, 0 when none is selected.
pub fn alpha_completion(position: u32, state_count: u32) -> Result<f64, TrackerError> {
    if state_count == 0 {
        return Err(TrackerError::DataIntegrity(
            "alpha has no states".to_string(),
        ));
    }
    if position > state_count {
        return Err(TrackerError::DataIntegrity(format!(
            "state position {position} exceeds state count {state_count}"
        )));
    }
    Ok(f64::from(position) / f64::from(state_count) * 100.0)
}

/// Completion of one concern: arithmetic mean of its alpha completions.
pub fn concern_completion(alpha_completions: &[f64]) -> Result<f64, TrackerError> {
    if alpha_completions.is_empty() {
        return Err(TrackerError::DataIntegrity(
            "concern has no alphas".to_string(),
        ));
    }
    let total: f64 = alpha_completions.iter().sum();
    Ok(total / alpha_completions.len() as f64)
}

/// Alpha pass over a snapshot, in alpha order.
pub fn compute_alpha_completions(
    snapshot: &ProgressSnapshot,
) -> Result<Vec<(AlphaId, f64)>, TrackerError> {
    snapshot
        .alphas
        .iter()
        .map(|alpha| {
            let position = match (alpha.current_state_id, alpha.current_state_order) {
                (None, _) => 0,
                (Some(_), Some(order)) => order,
                (Some(state_id), None) => {
                    return Err(TrackerError::DataIntegrity(format!(
                        "alpha {} points at unknown state {state_id}",
                        alpha.alpha_id
                    )));
                }
            };
            let completion = alpha_completion(position, alpha.state_count)
                .map_err(|err| scoped(format!("alpha {}", alpha.alpha_id), err))?;
            Ok((alpha.alpha_id, completion))
        })
        .collect()
}

/// Concern pass over a snapshot using the given alpha completions.
pub fn compute_concern_completions(
    snapshot: &ProgressSnapshot,
    alpha_completions: &[(AlphaId, f64)],
) -> Result<Vec<(ConcernId, f64)>, TrackerError> {
    let by_alpha: HashMap<AlphaId, f64> = alpha_completions.iter().copied().collect();

    snapshot
        .concerns
        .iter()
        .map(|concern| {
            let values = concern
                .alpha_ids
                .iter()
                .map(|alpha_id| {
                    by_alpha.get(alpha_id).copied().ok_or_else(|| {
                        TrackerError::DataIntegrity(format!(
                            "alpha {alpha_id} of concern {} has no completion",
                            concern.concern_id
                        ))
                    })
                })
                .collect::<Result<Vec<f64>, TrackerError>>()?;
            let completion = concern_completion(&values)
                .map_err(|err| scoped(format!("concern {}", concern.concern_id), err))?;
            Ok((concern.concern_id, completion))
        })
        .collect()
}

fn scoped(scope: String, err: TrackerError) -> TrackerError {
    match err {
        TrackerError::DataIntegrity(message) => {
            TrackerError::DataIntegrity(format!("{scope}: {message}"))
        }
        other => other,
    }
}
