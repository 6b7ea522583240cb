//! Static concern/alpha/state taxonomy used to seed new projects.
//!
//! # Responsibility
//! - Describe the ordered concern -> alpha -> state tree and its description
//!   side tables.
//! - Load and validate taxonomies from JSON, including the built-in kernel.
//!
//! # Invariants
//! - A validated taxonomy has at least one concern, every concern has at
//!   least one alpha and every alpha at least one state.
//! - Alpha names are unique across the taxonomy; state names are unique per
//!   alpha (both compared case-insensitively).
//! - Side-table keys are lowercase and cover every alpha and state.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const BUILTIN_KERNEL_JSON: &str = include_str!("../../taxonomy/essence_kernel.json");

static BUILTIN_KERNEL: OnceCell<Taxonomy> = OnceCell::new();

/// Errors raised while loading or validating a taxonomy.
#[derive(Debug)]
pub enum TaxonomyError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    NoConcerns,
    BlankName(&'static str),
    DuplicateConcern(String),
    ConcernWithoutAlphas(String),
    DuplicateAlpha(String),
    AlphaWithoutStates(String),
    DuplicateState { alpha: String, state: String },
    MissingAlphaDescription(String),
    MissingStateDescription { alpha: String, state: String },
}

impl Display for TaxonomyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read taxonomy `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid taxonomy json: {err}"),
            Self::NoConcerns => write!(f, "taxonomy must define at least one concern"),
            Self::BlankName(kind) => write!(f, "taxonomy contains a blank {kind} name"),
            Self::DuplicateConcern(name) => write!(f, "duplicate concern `{name}`"),
            Self::ConcernWithoutAlphas(name) => write!(f, "concern `{name}` has no alphas"),
            Self::DuplicateAlpha(name) => write!(f, "duplicate alpha `{name}`"),
            Self::AlphaWithoutStates(name) => write!(f, "alpha `{name}` has no states"),
            Self::DuplicateState { alpha, state } => {
                write!(f, "duplicate state `{state}` in alpha `{alpha}`")
            }
            Self::MissingAlphaDescription(name) => {
                write!(f, "no description for alpha `{name}`")
            }
            Self::MissingStateDescription { alpha, state } => {
                write!(f, "no description for state `{state}` of alpha `{alpha}`")
            }
        }
    }
}

impl Error for TaxonomyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TaxonomyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// One concern definition with its ordered alphas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcernDef {
    pub name: String,
    pub description: String,
    pub alphas: Vec<AlphaDef>,
}

/// One alpha definition with its ordered state names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphaDef {
    pub name: String,
    pub states: Vec<String>,
}

/// Ordered taxonomy plus description side tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub concerns: Vec<ConcernDef>,
    /// Keyed by lowercase alpha name.
    #[serde(default)]
    pub alpha_descriptions: BTreeMap<String, String>,
    /// Keyed by lowercase alpha name, then lowercase state name.
    #[serde(default)]
    pub state_descriptions: BTreeMap<String, BTreeMap<String, String>>,
}

impl Taxonomy {
    /// Returns the built-in Essence kernel, parsed once per process.
    pub fn builtin() -> Result<&'static Taxonomy, TaxonomyError> {
        BUILTIN_KERNEL.get_or_try_init(|| Self::from_json_str(BUILTIN_KERNEL_JSON))
    }

    /// Parses and validates a taxonomy document.
    ///
    /// Side-table keys are lowercased before validation so documents may use
    /// any casing.
    pub fn from_json_str(json: &str) -> Result<Self, TaxonomyError> {
        let mut taxonomy: Taxonomy = serde_json::from_str(json)?;
        taxonomy.normalize_keys();
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// Reads, parses and validates a taxonomy file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Checks the structural invariants seeding relies on.
    pub fn validate(&self) -> Result<(), TaxonomyError> {
        if self.concerns.is_empty() {
            return Err(TaxonomyError::NoConcerns);
        }

        let mut concern_names = BTreeSet::new();
        let mut alpha_names = BTreeSet::new();
        for concern in &self.concerns {
            if concern.name.trim().is_empty() {
                return Err(TaxonomyError::BlankName("concern"));
            }
            if !concern_names.insert(concern.name.to_lowercase()) {
                return Err(TaxonomyError::DuplicateConcern(concern.name.clone()));
            }
            if concern.alphas.is_empty() {
                return Err(TaxonomyError::ConcernWithoutAlphas(concern.name.clone()));
            }

            for alpha in &concern.alphas {
                if alpha.name.trim().is_empty() {
                    return Err(TaxonomyError::BlankName("alpha"));
                }
                if !alpha_names.insert(alpha.name.to_lowercase()) {
                    return Err(TaxonomyError::DuplicateAlpha(alpha.name.clone()));
                }
                if alpha.states.is_empty() {
                    return Err(TaxonomyError::AlphaWithoutStates(alpha.name.clone()));
                }
                if self.alpha_description(&alpha.name).is_none() {
                    return Err(TaxonomyError::MissingAlphaDescription(alpha.name.clone()));
                }

                let mut state_names = BTreeSet::new();
                for state in &alpha.states {
                    if state.trim().is_empty() {
                        return Err(TaxonomyError::BlankName("state"));
                    }
                    if !state_names.insert(state.to_lowercase()) {
                        return Err(TaxonomyError::DuplicateState {
                            alpha: alpha.name.clone(),
                            state: state.clone(),
                        });
                    }
                    if self.state_description(&alpha.name, state).is_none() {
                        return Err(TaxonomyError::MissingStateDescription {
                            alpha: alpha.name.clone(),
                            state: state.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Looks up an alpha description by case-insensitive name.
    pub fn alpha_description(&self, alpha: &str) -> Option<&str> {
        self.alpha_descriptions
            .get(&alpha.to_lowercase())
            .map(String::as_str)
    }

    /// Looks up a state description by case-insensitive alpha and state name.
    pub fn state_description(&self, alpha: &str, state: &str) -> Option<&str> {
        self.state_descriptions
            .get(&alpha.to_lowercase())?
            .get(&state.to_lowercase())
            .map(String::as_str)
    }

    pub fn concern_count(&self) -> usize {
        self.concerns.len()
    }

    pub fn alpha_count(&self) -> usize {
        self.concerns.iter().map(|concern| concern.alphas.len()).sum()
    }

    pub fn state_count(&self) -> usize {
        self.concerns
            .iter()
            .flat_map(|concern| concern.alphas.iter())
            .map(|alpha| alpha.states.len())
            .sum()
    }

    fn normalize_keys(&mut self) {
        self.alpha_descriptions = std::mem::take(&mut self.alpha_descriptions)
            .into_iter()
            .map(|(alpha, text)| (alpha.to_lowercase(), text))
            .collect();
        self.state_descriptions = std::mem::take(&mut self.state_descriptions)
            .into_iter()
            .map(|(alpha, states)| {
                let states = states
                    .into_iter()
                    .map(|(state, text)| (state.to_lowercase(), text))
                    .collect();
                (alpha.to_lowercase(), states)
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::{Taxonomy, TaxonomyError};

    fn minimal_json(states: &str) -> String {
        format!(
            r#"{{
                "concerns": [
                    {{
                        "name": "Customer",
                        "description": "Customer side",
                        "alphas": [{{ "name": "Stakeholders", "states": {states} }}]
                    }}
                ],
                "alpha_descriptions": {{ "Stakeholders": "People with a stake" }},
                "state_descriptions": {{
                    "Stakeholders": {{ "Recognized": "Identified", "Represented": "Delegated" }}
                }}
            }}"#
        )
    }

    #[test]
    fn builtin_kernel_matches_essence_shape() {
        let kernel = Taxonomy::builtin().expect("builtin taxonomy should load");
        assert_eq!(kernel.concern_count(), 3);
        assert_eq!(kernel.alpha_count(), 7);
        assert_eq!(kernel.state_count(), 41);
        assert_eq!(kernel.concerns[0].name, "Customer");
        assert_eq!(kernel.concerns[2].alphas[2].name, "Way of Working");
    }

    #[test]
    fn side_table_lookup_is_case_insensitive() {
        let taxonomy = Taxonomy::from_json_str(&minimal_json(r#"["Recognized", "Represented"]"#))
            .expect("minimal taxonomy should load");
        assert_eq!(
            taxonomy.alpha_description("STAKEHOLDERS"),
            Some("People with a stake")
        );
        assert_eq!(
            taxonomy.state_description("stakeholders", "represented"),
            Some("Delegated")
        );
    }

    #[test]
    fn alpha_without_states_is_rejected() {
        let err = Taxonomy::from_json_str(&minimal_json("[]")).unwrap_err();
        assert!(matches!(err, TaxonomyError::AlphaWithoutStates(name) if name == "Stakeholders"));
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let err = Taxonomy::from_json_str(&minimal_json(r#"["Recognized", "recognized"]"#))
            .unwrap_err();
        assert!(matches!(err, TaxonomyError::DuplicateState { .. }));
    }

    #[test]
    fn state_without_description_is_rejected() {
        let err = Taxonomy::from_json_str(&minimal_json(r#"["Recognized", "Involved"]"#))
            .unwrap_err();
        assert!(matches!(
            err,
            TaxonomyError::MissingStateDescription { state, .. } if state == "Involved"
        ));
    }

    #[test]
    fn empty_concern_list_is_rejected() {
        let err = Taxonomy::from_json_str(r#"{ "concerns": [] }"#).unwrap_err();
        assert!(matches!(err, TaxonomyError::NoConcerns));
    }
}
