//! Change classification.
//!
//! Compares a new entity state (or collection) against the previous one and
//! emits at most one record per entity:
//!
//! - `add` when there is no previous state
//! - `full` when any tracked field differs
//! - `soft` when only soft-update fields differ
//! - `removal` when an id drops out of a collection
//!
//! Field paths are validated once, when the classifier is built.

mod classifier;
mod config;
mod path;

pub use classifier::{values_equal, ChangeClassifier};
pub use config::{ChangeConfig, ClassifierConfig};
pub use path::FieldPath;
