//! AI source configuration and weight normalization.
//!
//! A source is one AI model/provider whose answers are scanned for entity
//! mentions. Each source carries a raw, non-negative weight (default 1)
//! expressing how much its answers should count; scoring consumes the
//! *normalized* form, a probability-like distribution summing to 1.0.
//! Normalized weights are a pure function of the configuration and can be
//! computed once per date and reused across every category and question.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default raw weight for a source with no explicit weight configured.
pub const DEFAULT_SOURCE_WEIGHT: f64 = 1.0;

fn default_weight() -> f64 {
    DEFAULT_SOURCE_WEIGHT
}

/// One configured AI source (model/provider) for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Stable source identifier, e.g. `"gpt-4o"` or `"claude"`.
    pub id: String,

    /// Raw weight. Negative values are clamped to zero on normalization.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl SourceConfig {
    /// Creates a source with the default weight of 1.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight: DEFAULT_SOURCE_WEIGHT,
        }
    }

    /// Creates a source with an explicit raw weight.
    #[must_use]
    pub fn weighted(id: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }
}

/// Normalized source weights: non-negative, summing to 1.0 when any
/// source is configured.
///
/// # Examples
///
/// ```
/// use mentionlens::source::{SourceConfig, SourceWeights};
///
/// let weights = SourceWeights::normalize(&[
///     SourceConfig::weighted("gpt", 3.0),
///     SourceConfig::weighted("claude", 1.0),
/// ]);
/// assert!((weights.get("gpt") - 0.75).abs() < 1e-9);
/// assert!((weights.get("claude") - 0.25).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceWeights {
    weights: BTreeMap<String, f64>,
}

impl SourceWeights {
    /// Normalizes raw source weights into a distribution.
    ///
    /// - At least one positive raw weight: each weight is divided by the
    ///   total, so the result sums to 1.0.
    /// - All raw weights zero: every source gets the equal share `1/N`.
    /// - Empty source list: empty mapping.
    #[must_use]
    pub fn normalize(sources: &[SourceConfig]) -> Self {
        if sources.is_empty() {
            return Self::default();
        }

        let raw: Vec<(String, f64)> = sources
            .iter()
            .map(|s| (s.id.clone(), s.weight.max(0.0)))
            .collect();
        let total: f64 = raw.iter().map(|(_, w)| w).sum();

        let weights = if total > 0.0 {
            raw.into_iter().map(|(id, w)| (id, w / total)).collect()
        } else {
            let share = 1.0 / sources.len() as f64;
            raw.into_iter().map(|(id, _)| (id, share)).collect()
        };

        Self { weights }
    }

    /// Normalized weight for a source, 0.0 if the source is not configured.
    #[must_use]
    pub fn get(&self, source: &str) -> f64 {
        self.weights.get(source).copied().unwrap_or(0.0)
    }

    /// Iterates over `(source, weight)` pairs in source-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(id, w)| (id.as_str(), *w))
    }

    /// Number of configured sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns true if no source is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
