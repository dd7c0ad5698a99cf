//! Cross-query merging.
//!
//! Folds the per-question snapshots for one project, date, and category
//! into a single aggregate snapshot with no duplicate entities and
//! internally consistent derived fields.
//!
//! The rolled-up `mentions` total is intentionally non-additive across
//! questions: per source, only the *peak* per-question count survives,
//! and the total is the sum of those peaks. A source repeating the same
//! entity across many unrelated questions therefore does not inflate it.
//! `mentions_by_source` stays a straight sum across questions for the
//! per-source display views; the two numbers deliberately differ.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::warn;

use crate::entity::{is_valid_order, Entity, QuestionBreakdown, NEVER_APPEARED, UNRANKED};
use crate::error::{EngineError, EngineResult};
use crate::snapshot::{QueryScope, Snapshot};

/// Multiplier in the suspicious-aggregate ceiling:
/// `sources × questions × 10`.
const CEILING_FACTOR: u64 = 10;

#[derive(Default)]
struct Fold {
    value: String,
    peak_by_source: BTreeMap<String, u64>,
    summed_by_source: BTreeMap<String, u64>,
    order_samples: Vec<f64>,
    order_samples_by_source: BTreeMap<String, Vec<f64>>,
    breakdown: QuestionBreakdown,
}

/// Merges per-question snapshots into one aggregate-scope snapshot.
///
/// Zero inputs produce an empty rollup. The result still needs influence
/// scoring and trend tracking; the pipeline runs both over it.
///
/// # Errors
///
/// [`EngineError::MixedBatch`] when an input disagrees on project,
/// category, or date, is itself an aggregate, or repeats a question id.
pub fn merge_question_snapshots(
    project: &str,
    category: &str,
    date: NaiveDate,
    inputs: &[Snapshot],
    configured_sources: usize,
) -> EngineResult<Snapshot> {
    let mut seen_questions = BTreeSet::new();
    for input in inputs {
        let question = match &input.scope {
            QueryScope::Query(id) => id.clone(),
            QueryScope::Aggregate => {
                return Err(EngineError::MixedBatch {
                    reason: "aggregate snapshot given as merger input".into(),
                })
            }
        };
        if input.project != project || input.category != category || input.date != date {
            return Err(EngineError::MixedBatch {
                reason: format!(
                    "snapshot for {}/{}/{} folded into rollup {project}/{category}/{date}",
                    input.project, input.category, input.date
                ),
            });
        }
        if !seen_questions.insert(question.clone()) {
            return Err(EngineError::MixedBatch {
                reason: format!("question '{question}' supplied twice"),
            });
        }
    }

    let mut folds: BTreeMap<String, Fold> = BTreeMap::new();

    for input in inputs {
        let question = input.scope.as_str().to_string();
        for entity in input.entities() {
            let fold = folds.entry(entity.key()).or_insert_with(|| Fold {
                value: entity.value.clone(),
                ..Fold::default()
            });

            fold.breakdown
                .mentions_by_question
                .insert(question.clone(), entity.mentions);
            fold.breakdown
                .influence_by_question
                .insert(question.clone(), entity.influence);
            fold.breakdown
                .appearance_order_by_question
                .insert(question.clone(), entity.appearance_order);
            fold.breakdown
                .mentions_by_source_by_question
                .insert(question.clone(), entity.mentions_by_source.clone());
            if !entity.excerpts.is_empty() {
                fold.breakdown
                    .excerpts_by_question
                    .insert(question.clone(), entity.excerpts.clone());
            }

            for (source, count) in &entity.mentions_by_source {
                let peak = fold.peak_by_source.entry(source.clone()).or_insert(0);
                *peak = (*peak).max(*count);
                *fold.summed_by_source.entry(source.clone()).or_insert(0) += count;
            }

            if is_valid_order(entity.appearance_order) {
                fold.order_samples.push(entity.appearance_order);
            }
            for (source, order) in &entity.appearance_order_by_source {
                if is_valid_order(*order) {
                    fold.order_samples_by_source
                        .entry(source.clone())
                        .or_default()
                        .push(*order);
                }
            }
        }
    }

    let ceiling = configured_sources as u64 * inputs.len() as u64 * CEILING_FACTOR;
    let mut rollup = Snapshot::new(project, QueryScope::Aggregate, category, date);

    for fold in folds.into_values() {
        let mut entity = Entity::new(fold.value);
        entity.mentions = fold.peak_by_source.values().sum();
        entity.mentions_by_source = fold.summed_by_source;
        entity.recount_sources();

        entity.appearance_order = mean_or_sentinel(&fold.order_samples, entity.mentions);
        entity.appearance_order_by_source = entity
            .mentions_by_source
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(source, _)| {
                let order = fold
                    .order_samples_by_source
                    .get(source)
                    .map_or(UNRANKED, |samples| mean(samples).unwrap_or(UNRANKED));
                (source.clone(), order)
            })
            .collect();

        if entity.mentions > ceiling {
            warn!(
                entity = %entity.value,
                category,
                mentions = entity.mentions,
                ceiling,
                by_source = ?entity.mentions_by_source,
                "rolled-up mention count exceeds heuristic ceiling; \
                 likely an upstream extraction bug"
            );
        }

        entity.rollup = Some(fold.breakdown);
        rollup.insert(entity);
    }

    Ok(rollup)
}

fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

fn mean_or_sentinel(samples: &[f64], mentions: u64) -> f64 {
    if mentions == 0 {
        NEVER_APPEARED
    } else {
        mean(samples).unwrap_or(UNRANKED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::names;
    use std::collections::BTreeMap as Map;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn question_snapshot(question: &str, entities: Vec<Entity>) -> Snapshot {
        Snapshot::from_entities(
            "proj",
            QueryScope::query(question),
            names::PRODUCTS,
            d("2026-08-05"),
            entities,
        )
    }

    fn acme(counts: &[(&str, u64)], orders: &[(&str, f64)]) -> Entity {
        Entity::from_sources(
            "Acme",
            counts.iter().map(|(s, m)| (s.to_string(), *m)).collect(),
            orders.iter().map(|(s, o)| (s.to_string(), *o)).collect(),
        )
    }

    #[test]
    fn peak_rule_caps_mentions_while_by_source_sums() {
        let q1 = question_snapshot("q1", vec![acme(&[("gpt", 3)], &[("gpt", 1.0)])]);
        let q2 = question_snapshot("q2", vec![acme(&[("gpt", 5)], &[("gpt", 2.0)])]);

        let rollup =
            merge_question_snapshots("proj", names::PRODUCTS, d("2026-08-05"), &[q1, q2], 2)
                .unwrap();

        let entity = rollup.get("acme").unwrap();
        assert_eq!(entity.mentions, 5);
        assert_eq!(entity.mentions_by_source["gpt"], 8);
    }

    #[test]
    fn merging_a_single_snapshot_is_lossless() {
        let original = acme(&[("gpt", 3), ("claude", 2)], &[("gpt", 2.0), ("claude", 4.0)]);
        let q1 = question_snapshot("q1", vec![original.clone()]);

        let rollup =
            merge_question_snapshots("proj", names::PRODUCTS, d("2026-08-05"), &[q1], 2).unwrap();

        let merged = rollup.get("acme").unwrap();
        assert_eq!(merged.mentions, original.mentions);
        assert_eq!(merged.mentions_by_source, original.mentions_by_source);
        assert!((merged.appearance_order - original.appearance_order).abs() < 1e-9);
        assert_eq!(
            merged.appearance_order_by_source,
            original.appearance_order_by_source
        );
    }

    #[test]
    fn appearance_orders_average_across_questions() {
        let q1 = question_snapshot("q1", vec![acme(&[("gpt", 1)], &[("gpt", 2.0)])]);
        let q2 = question_snapshot("q2", vec![acme(&[("gpt", 1)], &[("gpt", 4.0)])]);

        let rollup =
            merge_question_snapshots("proj", names::PRODUCTS, d("2026-08-05"), &[q1, q2], 1)
                .unwrap();

        let entity = rollup.get("acme").unwrap();
        assert!((entity.appearance_order - 3.0).abs() < 1e-9);
        assert!((entity.appearance_order_by_source["gpt"] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn mentioned_entity_without_order_samples_is_unranked() {
        let q1 = question_snapshot("q1", vec![acme(&[("gpt", 2)], &[])]);
        let rollup =
            merge_question_snapshots("proj", names::PRODUCTS, d("2026-08-05"), &[q1], 1).unwrap();

        let entity = rollup.get("acme").unwrap();
        assert_eq!(entity.appearance_order, UNRANKED);
        assert_eq!(entity.appearance_order_by_source["gpt"], UNRANKED);
    }

    #[test]
    fn entity_in_one_question_only_is_carried_through() {
        let q1 = question_snapshot("q1", vec![acme(&[("gpt", 2)], &[("gpt", 1.0)])]);
        let q2 = question_snapshot(
            "q2",
            vec![Entity::from_sources(
                "Umbrella",
                Map::from([("claude".to_string(), 4)]),
                Map::from([("claude".to_string(), 2.0)]),
            )],
        );

        let rollup =
            merge_question_snapshots("proj", names::PRODUCTS, d("2026-08-05"), &[q1, q2], 2)
                .unwrap();

        assert_eq!(rollup.len(), 2);
        let umbrella = rollup.get("umbrella").unwrap();
        assert_eq!(umbrella.mentions, 4);
        assert_eq!(umbrella.unique_source_count, 1);
        let breakdown = umbrella.rollup.as_ref().unwrap();
        assert_eq!(breakdown.mentions_by_question.len(), 1);
        assert_eq!(breakdown.mentions_by_question["q2"], 4);
    }

    #[test]
    fn breakdown_records_every_contributing_question() {
        let mut with_excerpt = acme(&[("gpt", 3)], &[("gpt", 1.0)]);
        with_excerpt.excerpts.push("Acme tops the list.".into());
        with_excerpt.influence = 0.8;
        let q1 = question_snapshot("q1", vec![with_excerpt]);
        let q2 = question_snapshot("q2", vec![acme(&[("claude", 1)], &[("claude", 5.0)])]);

        let rollup =
            merge_question_snapshots("proj", names::PRODUCTS, d("2026-08-05"), &[q1, q2], 2)
                .unwrap();

        let breakdown = rollup.get("acme").unwrap().rollup.as_ref().unwrap();
        assert_eq!(breakdown.mentions_by_question["q1"], 3);
        assert_eq!(breakdown.mentions_by_question["q2"], 1);
        assert!((breakdown.influence_by_question["q1"] - 0.8).abs() < 1e-9);
        assert_eq!(breakdown.mentions_by_source_by_question["q1"]["gpt"], 3);
        assert_eq!(
            breakdown.excerpts_by_question["q1"],
            vec!["Acme tops the list.".to_string()]
        );
        assert!(!breakdown.excerpts_by_question.contains_key("q2"));
    }

    #[test]
    fn zero_inputs_yield_an_empty_rollup() {
        let rollup =
            merge_question_snapshots("proj", names::PRODUCTS, d("2026-08-05"), &[], 3).unwrap();
        assert!(rollup.is_empty());
        assert!(rollup.scope.is_aggregate());
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let wrong_date = question_snapshot("q1", vec![]);
        let err = merge_question_snapshots(
            "proj",
            names::PRODUCTS,
            d("2026-08-06"),
            &[wrong_date],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MixedBatch { .. }));

        let aggregate = Snapshot::new(
            "proj",
            QueryScope::Aggregate,
            names::PRODUCTS,
            d("2026-08-05"),
        );
        let err = merge_question_snapshots(
            "proj",
            names::PRODUCTS,
            d("2026-08-05"),
            &[aggregate],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MixedBatch { .. }));
    }

    #[test]
    fn duplicate_question_ids_are_rejected() {
        let a = question_snapshot("q1", vec![]);
        let b = question_snapshot("q1", vec![]);
        let err =
            merge_question_snapshots("proj", names::PRODUCTS, d("2026-08-05"), &[a, b], 1)
                .unwrap_err();
        assert!(matches!(err, EngineError::MixedBatch { .. }));
    }
}
