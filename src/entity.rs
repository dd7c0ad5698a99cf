//! The entity record: the unit of analysis within one category.
//!
//! Identity is the display value, trimmed and lowercased; two entities
//! with the same key in the same category are the same entity and are
//! merged, never duplicated. All derived fields are recomputed wholesale
//! on every pipeline run; nothing is partially updated.
//!
//! Appearance order uses two sentinels:
//! - [`NEVER_APPEARED`] (-1): the entity has zero mentions.
//! - [`UNRANKED`] (999): the entity has mentions but no recorded ordinal
//!   position.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::trend::TrendStats;

/// Appearance-order sentinel for an entity with zero mentions.
pub const NEVER_APPEARED: f64 = -1.0;

/// Appearance-order sentinel for a mentioned entity with no recorded
/// ordinal position.
pub const UNRANKED: f64 = 999.0;

/// Canonical identity key: display value, trimmed and lowercased.
///
/// No further normalization is applied: `"Acme Corp"` and `"acme corp"`
/// collide, `"Acme-Corp"` does not.
#[must_use]
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Returns true for an appearance order that is a real observed position
/// rather than one of the sentinels.
#[must_use]
pub fn is_valid_order(order: f64) -> bool {
    (1.0..UNRANKED).contains(&order)
}

fn never_appeared() -> f64 {
    NEVER_APPEARED
}

/// Per-question bookkeeping attached to rolled-up entities.
///
/// Keys of the outer maps are question identifiers. These fields exist on
/// aggregate-scope entities only; per-question snapshots never carry them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBreakdown {
    /// Mention count contributed by each question.
    pub mentions_by_question: BTreeMap<String, u64>,

    /// Influence the entity had within each question's snapshot.
    pub influence_by_question: BTreeMap<String, f64>,

    /// Appearance order within each question's snapshot.
    pub appearance_order_by_question: BTreeMap<String, f64>,

    /// Per-source mention counts, per question.
    pub mentions_by_source_by_question: BTreeMap<String, BTreeMap<String, u64>>,

    /// Free-text excerpts, tagged by originating question.
    pub excerpts_by_question: BTreeMap<String, Vec<String>>,
}

/// One tracked named thing within a category.
///
/// The upstream extractor populates `mentions`, `mentions_by_source`,
/// `appearance_order` and `appearance_order_by_source`; the influence
/// scorer fills `influence` and `influence_by_source`; the trend tracker
/// fills `trends`; the cross-query merger fills `rollup` on aggregate
/// entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Display value, as extracted. Identity is [`normalize_key`] of this.
    pub value: String,

    /// Total observed mentions. At question scope this equals the sum of
    /// `mentions_by_source`; at rollup scope it is the peak-per-source
    /// capped total, which is deliberately a different number.
    #[serde(default)]
    pub mentions: u64,

    /// Mentions per source. Sources with zero mentions are absent.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mentions_by_source: BTreeMap<String, u64>,

    /// Ordinal position of first appearance (averaged when aggregated),
    /// or a sentinel.
    #[serde(default = "never_appeared")]
    pub appearance_order: f64,

    /// Appearance order per source, same semantics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub appearance_order_by_source: BTreeMap<String, f64>,

    /// Normalized importance within the category scope.
    #[serde(default)]
    pub influence: f64,

    /// Influence contribution per source.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub influence_by_source: BTreeMap<String, f64>,

    /// Count of sources with a positive mention count.
    #[serde(default)]
    pub unique_source_count: u32,

    /// Legacy duplicate of `unique_source_count`, kept on the wire.
    #[serde(default)]
    pub source_count: u32,

    /// Free-text answer excerpts mentioning the entity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excerpts: Vec<String>,

    /// Per-question bookkeeping, present on rolled-up entities only.
    #[serde(flatten)]
    pub rollup: Option<QuestionBreakdown>,

    /// Trend fields, present after the trend tracker has run.
    #[serde(flatten)]
    pub trends: Option<TrendStats>,
}

impl Entity {
    /// Creates an empty entity with zero mentions.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            mentions: 0,
            mentions_by_source: BTreeMap::new(),
            appearance_order: NEVER_APPEARED,
            appearance_order_by_source: BTreeMap::new(),
            influence: 0.0,
            influence_by_source: BTreeMap::new(),
            unique_source_count: 0,
            source_count: 0,
            excerpts: Vec::new(),
            rollup: None,
            trends: None,
        }
    }

    /// Creates an entity from per-source mentions and appearance orders,
    /// deriving the totals. Test and ingest convenience.
    #[must_use]
    pub fn from_sources(
        value: impl Into<String>,
        mentions_by_source: BTreeMap<String, u64>,
        appearance_order_by_source: BTreeMap<String, f64>,
    ) -> Self {
        let mut entity = Self::new(value);
        entity.mentions = mentions_by_source.values().sum();
        entity.mentions_by_source = mentions_by_source;
        let valid: Vec<f64> = appearance_order_by_source
            .values()
            .copied()
            .filter(|o| is_valid_order(*o))
            .collect();
        entity.appearance_order = if entity.mentions == 0 {
            NEVER_APPEARED
        } else if valid.is_empty() {
            UNRANKED
        } else {
            valid.iter().sum::<f64>() / valid.len() as f64
        };
        entity.appearance_order_by_source = appearance_order_by_source;
        entity.recount_sources();
        entity
    }

    /// Canonical identity key for this entity.
    #[must_use]
    pub fn key(&self) -> String {
        normalize_key(&self.value)
    }

    /// Recomputes `unique_source_count`/`source_count` from the per-source
    /// mention map, counting only positive entries.
    pub fn recount_sources(&mut self) {
        let count = self
            .mentions_by_source
            .values()
            .filter(|m| **m > 0)
            .count() as u32;
        self.unique_source_count = count;
        self.source_count = count;
    }

    /// Folds a duplicate-key entity into this one.
    ///
    /// Mention counts sum (overall and per source); the earliest valid
    /// appearance order wins per scope; excerpts are concatenated.
    /// Derived fields are reset; scoring runs after ingest.
    pub fn absorb(&mut self, other: Entity) {
        self.mentions += other.mentions;
        for (source, count) in other.mentions_by_source {
            *self.mentions_by_source.entry(source).or_insert(0) += count;
        }

        self.appearance_order = earliest(self.appearance_order, other.appearance_order);
        for (source, order) in other.appearance_order_by_source {
            let merged = match self.appearance_order_by_source.get(&source) {
                Some(existing) => earliest(*existing, order),
                None => order,
            };
            self.appearance_order_by_source.insert(source, merged);
        }
        if self.mentions > 0 && !is_valid_order(self.appearance_order) {
            self.appearance_order = UNRANKED;
        }

        self.excerpts.extend(other.excerpts);
        self.influence = 0.0;
        self.influence_by_source.clear();
        self.trends = None;
        self.recount_sources();
    }
}

/// Earlier of two appearance orders, preferring valid positions over
/// sentinels.
fn earliest(a: f64, b: f64) -> f64 {
    match (is_valid_order(a), is_valid_order(b)) {
        (true, true) => a.min(b),
        (true, false) => a,
        (false, true) => b,
        (false, false) => a.max(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_trimmed_and_lowercased() {
        let entity = Entity::new("  Acme Corp ");
        assert_eq!(entity.key(), "acme corp");
        assert_eq!(normalize_key("ACME corp"), "acme corp");
    }

    #[test]
    fn sentinels_are_not_valid_orders() {
        assert!(!is_valid_order(NEVER_APPEARED));
        assert!(!is_valid_order(UNRANKED));
        assert!(!is_valid_order(0.0));
        assert!(is_valid_order(1.0));
        assert!(is_valid_order(42.5));
    }

    #[test]
    fn from_sources_derives_totals() {
        let entity = Entity::from_sources(
            "Acme",
            BTreeMap::from([("gpt".into(), 3), ("claude".into(), 2)]),
            BTreeMap::from([("gpt".into(), 1.0), ("claude".into(), 3.0)]),
        );
        assert_eq!(entity.mentions, 5);
        assert_eq!(entity.unique_source_count, 2);
        assert_eq!(entity.source_count, 2);
        assert!((entity.appearance_order - 2.0).abs() < 1e-9);
    }

    #[test]
    fn from_sources_with_no_mentions_uses_never_appeared() {
        let entity = Entity::from_sources("ghost", BTreeMap::new(), BTreeMap::new());
        assert_eq!(entity.mentions, 0);
        assert_eq!(entity.appearance_order, NEVER_APPEARED);
    }

    #[test]
    fn from_sources_with_no_order_samples_is_unranked() {
        let entity = Entity::from_sources(
            "Acme",
            BTreeMap::from([("gpt".into(), 2)]),
            BTreeMap::new(),
        );
        assert_eq!(entity.appearance_order, UNRANKED);
    }

    #[test]
    fn absorb_sums_mentions_and_keeps_earliest_order() {
        let mut a = Entity::from_sources(
            "Acme",
            BTreeMap::from([("gpt".into(), 3)]),
            BTreeMap::from([("gpt".into(), 4.0)]),
        );
        let b = Entity::from_sources(
            " ACME ",
            BTreeMap::from([("gpt".into(), 2), ("claude".into(), 1)]),
            BTreeMap::from([("gpt".into(), 2.0), ("claude".into(), 6.0)]),
        );
        a.absorb(b);

        assert_eq!(a.mentions, 6);
        assert_eq!(a.mentions_by_source["gpt"], 5);
        assert_eq!(a.mentions_by_source["claude"], 1);
        assert!((a.appearance_order_by_source["gpt"] - 2.0).abs() < 1e-9);
        assert_eq!(a.unique_source_count, 2);
    }

    #[test]
    fn absorb_prefers_valid_order_over_sentinel() {
        let mut a = Entity::from_sources(
            "Acme",
            BTreeMap::from([("gpt".into(), 1)]),
            BTreeMap::new(),
        );
        assert_eq!(a.appearance_order, UNRANKED);

        let b = Entity::from_sources(
            "acme",
            BTreeMap::from([("claude".into(), 1)]),
            BTreeMap::from([("claude".into(), 5.0)]),
        );
        a.absorb(b);
        assert!((a.appearance_order - 5.0).abs() < 1e-9);
    }

    #[test]
    fn serde_uses_camel_case_wire_names() {
        let mut entity = Entity::from_sources(
            "Acme",
            BTreeMap::from([("gpt".into(), 3)]),
            BTreeMap::from([("gpt".into(), 1.0)]),
        );
        entity.influence = 0.5;
        entity.influence_by_source.insert("gpt".into(), 0.5);

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["mentionsBySource"]["gpt"], 3);
        assert_eq!(json["appearanceOrderBySource"]["gpt"], 1.0);
        assert_eq!(json["influenceBySource"]["gpt"], 0.5);
        assert_eq!(json["uniqueSourceCount"], 1);
        assert_eq!(json["sourceCount"], 1);
        assert!(json.get("mentionsByQuestion").is_none());
    }

    #[test]
    fn entity_round_trips_through_json() {
        let entity = Entity::from_sources(
            "Acme",
            BTreeMap::from([("gpt".into(), 3), ("claude".into(), 1)]),
            BTreeMap::from([("gpt".into(), 2.0)]),
        );
        let json = serde_json::to_string(&entity).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(entity, back);
    }
}
