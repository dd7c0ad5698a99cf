//! Snapshots: one category's entities for one scope on one date.
//!
//! A scope is either a single question or the synthetic aggregate
//! pseudo-question produced by the cross-query merger. Entities live in a
//! map keyed by their normalized identity, so the "no duplicate keys"
//! invariant is enforced by construction: inserting a colliding entity
//! folds it into the existing one instead of appending.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entity::{normalize_key, Entity};

/// Wire name of the synthetic aggregate scope.
pub const AGGREGATE_SCOPE: &str = "aggregate";

/// A question scope or the synthetic project-level aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueryScope {
    /// One question, by its identifier.
    Query(String),

    /// The project-level rollup across all questions.
    Aggregate,
}

impl QueryScope {
    /// Creates a question scope.
    #[must_use]
    pub fn query(id: impl Into<String>) -> Self {
        Self::Query(id.into())
    }

    /// Wire representation: the question id, or `"aggregate"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Query(id) => id,
            Self::Aggregate => AGGREGATE_SCOPE,
        }
    }

    /// Returns true for the aggregate scope.
    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate)
    }
}

impl From<String> for QueryScope {
    fn from(value: String) -> Self {
        if value == AGGREGATE_SCOPE {
            Self::Aggregate
        } else {
            Self::Query(value)
        }
    }
}

impl From<QueryScope> for String {
    fn from(scope: QueryScope) -> Self {
        scope.as_str().to_string()
    }
}

impl std::fmt::Display for QueryScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one snapshot series: project + scope + category.
///
/// Dated snapshots of the same key form the history the trend tracker
/// walks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeKey {
    /// Project identifier.
    pub project: String,

    /// Question or aggregate scope.
    pub scope: QueryScope,

    /// Category name.
    pub category: String,
}

impl ScopeKey {
    /// Creates a scope key.
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        scope: QueryScope,
        category: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            scope,
            category: category.into(),
        }
    }
}

/// All entities of one category for one scope on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Project identifier.
    pub project: String,

    /// Question or aggregate scope.
    pub scope: QueryScope,

    /// Category name.
    pub category: String,

    /// Snapshot date (`YYYY-MM-DD` on the wire).
    pub date: NaiveDate,

    #[serde(default)]
    entities: BTreeMap<String, Entity>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        scope: QueryScope,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            project: project.into(),
            scope,
            category: category.into(),
            date,
            entities: BTreeMap::new(),
        }
    }

    /// Creates a snapshot from an extracted entity list.
    ///
    /// Duplicate identity keys are folded together on the way in.
    #[must_use]
    pub fn from_entities(
        project: impl Into<String>,
        scope: QueryScope,
        category: impl Into<String>,
        date: NaiveDate,
        entities: Vec<Entity>,
    ) -> Self {
        let mut snapshot = Self::new(project, scope, category, date);
        for entity in entities {
            snapshot.insert(entity);
        }
        snapshot
    }

    /// Inserts an entity, folding it into an existing same-key entity.
    pub fn insert(&mut self, entity: Entity) {
        let key = entity.key();
        match self.entities.get_mut(&key) {
            Some(existing) => existing.absorb(entity),
            None => {
                self.entities.insert(key, entity);
            }
        }
    }

    /// Looks up an entity by its normalized identity key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Entity> {
        self.entities.get(&normalize_key(key))
    }

    /// Iterates over entities in identity-key order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Mutably iterates over entities in identity-key order.
    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Consumes the snapshot, returning its entities in key order.
    #[must_use]
    pub fn into_entities(self) -> Vec<Entity> {
        self.entities.into_values().collect()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the snapshot holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The snapshot's series key (project + scope + category).
    #[must_use]
    pub fn scope_key(&self) -> ScopeKey {
        ScopeKey::new(self.project.clone(), self.scope.clone(), self.category.clone())
    }
}
