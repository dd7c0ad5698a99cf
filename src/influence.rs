//! Influence scoring.
//!
//! Influence rewards entities that are mentioned by more (and more
//! heavily weighted) sources, appear earlier within answers, and are
//! mentioned more often. Mention counts are normalized against the
//! scope-wide maximum so one outlier entity cannot compress every other
//! score toward zero.
//!
//! Scores are comparable only within one category+scope, and the final
//! rescale depends on the category kind: open categories peg the top
//! entity at 1.0, closed categories form a share-of-whole distribution
//! summing to 1.0.
//!
//! Scoring is a pure recomputation from mentions and appearance orders;
//! running it twice over an unchanged snapshot yields identical results.

use crate::category::{CategoryKind, CategoryRegistry};
use crate::entity::UNRANKED;
use crate::error::{EngineError, EngineResult};
use crate::snapshot::Snapshot;
use crate::source::SourceWeights;

/// Share of a per-source score carried by the mention count.
pub const MENTION_WEIGHT: f64 = 0.6;

/// Share of a per-source score carried by the appearance position.
pub const POSITION_WEIGHT: f64 = 0.4;

/// Prominence credit for an appearance order: reciprocal position.
///
/// The unranked sentinel (999) naturally lands near zero: mentioned but
/// with unknown prominence still beats not mentioned at all. Sub-1 values
/// (the never-appeared sentinel) earn nothing.
fn position_score(order: f64) -> f64 {
    if order >= 1.0 {
        1.0 / order
    } else {
        0.0
    }
}

/// Scores every entity in the snapshot, filling `influence` and
/// `influence_by_source`.
///
/// # Errors
///
/// [`EngineError::ConfigurationGap`] when the snapshot's category has no
/// registered kind, so the normalization rule cannot be chosen safely.
pub fn score_snapshot(
    snapshot: &mut Snapshot,
    weights: &SourceWeights,
    registry: &CategoryRegistry,
) -> EngineResult<()> {
    let kind = registry
        .kind_of(&snapshot.category)
        .ok_or_else(|| EngineError::ConfigurationGap {
            category: snapshot.category.clone(),
        })?;

    let max_mentions = snapshot.entities().map(|e| e.mentions).max().unwrap_or(0);

    for entity in snapshot.entities_mut() {
        entity.influence = 0.0;
        entity.influence_by_source.clear();
        entity.recount_sources();

        if entity.mentions == 0 || max_mentions == 0 {
            continue;
        }

        let mut total = 0.0;
        for (source, count) in &entity.mentions_by_source {
            if *count == 0 {
                continue;
            }
            let weight = weights.get(source);
            let order = entity
                .appearance_order_by_source
                .get(source)
                .copied()
                .unwrap_or(UNRANKED);
            let mention_component = *count as f64 / max_mentions as f64;
            let score = weight
                * (MENTION_WEIGHT * mention_component + POSITION_WEIGHT * position_score(order));
            entity.influence_by_source.insert(source.clone(), score);
            total += score;
        }
        entity.influence = total;
    }

    rescale(snapshot, kind);
    Ok(())
}

/// Rescales raw scores into the category's comparable range. A scope
/// where every entity scored zero is left untouched.
fn rescale(snapshot: &mut Snapshot, kind: CategoryKind) {
    let denominator = match kind {
        CategoryKind::Open => snapshot
            .entities()
            .map(|e| e.influence)
            .fold(0.0_f64, f64::max),
        CategoryKind::Closed => snapshot.entities().map(|e| e.influence).sum(),
    };
    if denominator <= 0.0 {
        return;
    }
    for entity in snapshot.entities_mut() {
        entity.influence /= denominator;
        for score in entity.influence_by_source.values_mut() {
            *score /= denominator;
        }
    }
}
