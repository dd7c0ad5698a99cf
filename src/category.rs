//! Entity categories and the open/closed normalization registry.
//!
//! Influence normalization is category-dependent: most categories are
//! *open* (any number of entities can coexist, scores are rescaled so the
//! top entity reads 1.0), while a *closed* category partitions its members
//! into a fixed small set, so scores are rescaled into a market-share
//! distribution summing to 1.0. Which rule applies is configuration, not
//! something inferred from a category's name; a new category added
//! without a registered kind is a hard error, never a silent guess.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known category names used by the standard registry.
pub mod names {
    /// Products mentioned in answers.
    pub const PRODUCTS: &str = "products";
    /// Organizations and companies.
    pub const ORGANIZATIONS: &str = "organizations";
    /// People.
    pub const PERSONS: &str = "persons";
    /// Free-standing keywords.
    pub const KEYWORDS: &str = "keywords";
    /// Geographic places.
    pub const PLACES: &str = "places";
    /// Events.
    pub const EVENTS: &str = "events";
    /// Raw hyperlinks.
    pub const LINKS: &str = "links";
    /// Links grouped by classified type (closed partition of `links`).
    pub const LINK_TYPES: &str = "linkTypes";
    /// Links grouped by registrable domain.
    pub const LINK_DOMAINS: &str = "linkDomains";
}

/// How influence scores are normalized within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Open-ended membership; the top entity is rescaled to 1.0.
    Open,

    /// Closed, mutually-exclusive partition; scores sum to 1.0.
    Closed,
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Explicit category-name → kind configuration.
///
/// Supplied by the caller alongside the source configuration. The engine
/// refuses to score a category absent from the registry
/// ([`EngineError::ConfigurationGap`](crate::error::EngineError::ConfigurationGap)).
///
/// # Examples
///
/// ```
/// use mentionlens::category::{names, CategoryKind, CategoryRegistry};
///
/// let registry = CategoryRegistry::standard()
///     .with_category("competitors", CategoryKind::Open);
///
/// assert_eq!(registry.kind_of(names::LINK_TYPES), Some(CategoryKind::Closed));
/// assert_eq!(registry.kind_of("competitors"), Some(CategoryKind::Open));
/// assert_eq!(registry.kind_of("unregistered"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRegistry {
    kinds: BTreeMap<String, CategoryKind>,
}

impl CategoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the registry of the nine standard categories.
    ///
    /// `linkTypes` is the only closed category: the link-type classifier
    /// assigns every link to exactly one type, so its influence is a
    /// share-of-whole distribution.
    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .with_category(names::PRODUCTS, CategoryKind::Open)
            .with_category(names::ORGANIZATIONS, CategoryKind::Open)
            .with_category(names::PERSONS, CategoryKind::Open)
            .with_category(names::KEYWORDS, CategoryKind::Open)
            .with_category(names::PLACES, CategoryKind::Open)
            .with_category(names::EVENTS, CategoryKind::Open)
            .with_category(names::LINKS, CategoryKind::Open)
            .with_category(names::LINK_TYPES, CategoryKind::Closed)
            .with_category(names::LINK_DOMAINS, CategoryKind::Open)
    }

    /// Registers (or overrides) a category's kind.
    #[must_use]
    pub fn with_category(mut self, name: impl Into<String>, kind: CategoryKind) -> Self {
        self.kinds.insert(name.into(), kind);
        self
    }

    /// Looks up the kind registered for a category name.
    #[must_use]
    pub fn kind_of(&self, category: &str) -> Option<CategoryKind> {
        self.kinds.get(category).copied()
    }

    /// Iterates over registered `(name, kind)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, CategoryKind)> {
        self.kinds.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Number of registered categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns true if no category is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
