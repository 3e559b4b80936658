//! Normalized Records and Chunks

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Bounds on a typed entity id.
///
/// Grouping and ordering use the typed value; `Display` only derives the
/// string key used for bookkeeping.
pub trait EntityId: Clone + Eq + Hash + Ord + Display + Debug + Send + Sync {}

impl<T> EntityId for T where T: Clone + Eq + Hash + Ord + Display + Debug + Send + Sync {}

/// One observation of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord<I> {
    pub entity_id: I,
    pub kind: String,
    pub value: f64,
}

impl<I> NormalizedRecord<I> {
    pub fn new(entity_id: I, kind: impl Into<String>, value: f64) -> Self {
        Self {
            entity_id,
            kind: kind.into(),
            value,
        }
    }
}

/// One complete (entity, kind) series, the unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<I> {
    /// Typed id, returned to the caller
    pub entity_id: I,
    /// Derived string form, bookkeeping only
    pub entity_key: String,
    pub kind: String,
    /// Values in input order
    pub values: Vec<f64>,
}

impl<I: EntityId> Chunk<I> {
    pub fn new(entity_id: I, kind: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            entity_key: entity_id.to_string(),
            entity_id,
            kind: kind.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
