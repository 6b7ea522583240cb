//! Domain model for the Essence project hierarchy.
//!
//! # Responsibility
//! - Define project/concern/alpha/state/event records shared by all layers.
//! - Define the static taxonomy that every new project is seeded from.
//!
//! # Invariants
//! - Every child record carries the owner and project of its project root.
//! - Completion values are derived, never set from user input.

pub mod event;
pub mod project;
pub mod taxonomy;
