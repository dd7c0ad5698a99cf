//! Engine façade.
//!
//! Wires the weight normalizer, influence scorer, cross-query merger and
//! trend tracker into the per-question → rollup control flow. Source
//! weights are normalized once at construction and reused for every
//! category and question processed with this engine; they are a pure
//! function of the configuration.
//!
//! The engine returns updated snapshots; persisting them (and loading
//! history) happens through the injected [`SnapshotStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info_span};

use crate::category::CategoryRegistry;
use crate::error::{EngineError, EngineResult};
use crate::influence::score_snapshot;
use crate::merge::merge_question_snapshots;
use crate::snapshot::Snapshot;
use crate::source::{SourceConfig, SourceWeights};
use crate::store::SnapshotStore;
use crate::tracker::{TrendTracker, DEFAULT_HISTORY_WINDOW};

/// Engine configuration: sources, categories, and history depth.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Active sources with raw weights.
    pub sources: Vec<SourceConfig>,

    /// Category → open/closed registry.
    pub registry: CategoryRegistry,

    /// Prior snapshots consulted per trend lookup.
    pub history_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            registry: CategoryRegistry::standard(),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

/// Output of one category run: the scored-and-tracked question
/// snapshots (in request order) plus the aggregate rollup.
#[derive(Debug, Clone)]
pub struct CategoryRun {
    /// Per-question snapshots after scoring and trend tracking.
    pub questions: Vec<Snapshot>,

    /// The merged aggregate snapshot, scored and tracked.
    pub rollup: Snapshot,
}

/// The entity analytics engine.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use mentionlens::{AnalyticsEngine, EngineConfig, MemorySnapshotStore, SourceConfig};
///
/// let config = EngineConfig {
///     sources: vec![SourceConfig::new("gpt"), SourceConfig::new("claude")],
///     ..EngineConfig::default()
/// };
/// let engine = AnalyticsEngine::new(config, Arc::new(MemorySnapshotStore::new()));
/// assert!((engine.weights().get("gpt") - 0.5).abs() < 1e-9);
/// ```
#[derive(Clone)]
pub struct AnalyticsEngine {
    weights: SourceWeights,
    registry: CategoryRegistry,
    window: usize,
    source_count: usize,
    store: Arc<dyn SnapshotStore>,
}

impl AnalyticsEngine {
    /// Builds an engine, normalizing source weights once.
    #[must_use]
    pub fn new(config: EngineConfig, store: Arc<dyn SnapshotStore>) -> Self {
        let weights = SourceWeights::normalize(&config.sources);
        Self {
            weights,
            registry: config.registry,
            window: config.history_window,
            source_count: config.sources.len(),
            store,
        }
    }

    /// The normalized source weights in use.
    #[must_use]
    pub fn weights(&self) -> &SourceWeights {
        &self.weights
    }

    /// Scores one snapshot and annotates it with trends against its own
    /// scope's history.
    ///
    /// # Errors
    ///
    /// [`EngineError::ConfigurationGap`] for an unregistered category.
    pub fn process_question(&self, snapshot: &mut Snapshot) -> EngineResult<()> {
        score_snapshot(snapshot, &self.weights, &self.registry)?;
        TrendTracker::new(self.store.as_ref(), self.window).annotate(snapshot);
        Ok(())
    }

    /// Runs one category for one project and date: scores and tracks
    /// every expected question snapshot, merges them into the aggregate
    /// rollup, then scores and tracks the rollup against the aggregate
    /// scope's own history.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingUpstreamData`] when a question listed in
    ///   `questions` has no snapshot in `supplied`.
    /// - [`EngineError::MixedBatch`] when a supplied snapshot belongs to
    ///   a different project, category, or date.
    /// - [`EngineError::ConfigurationGap`] for an unregistered category.
    pub fn run_category(
        &self,
        project: &str,
        category: &str,
        date: NaiveDate,
        questions: &[String],
        supplied: Vec<Snapshot>,
    ) -> EngineResult<CategoryRun> {
        let span = info_span!("run_category", project, category, date = %date);
        let _guard = span.enter();

        let mut by_question: BTreeMap<String, Snapshot> = supplied
            .into_iter()
            .map(|snapshot| (snapshot.scope.as_str().to_string(), snapshot))
            .collect();

        let mut question_snapshots = Vec::with_capacity(questions.len());
        for question in questions {
            let mut snapshot = by_question.remove(question).ok_or_else(|| {
                EngineError::MissingUpstreamData {
                    project: project.to_string(),
                    question: question.clone(),
                    category: category.to_string(),
                    date,
                }
            })?;
            self.process_question(&mut snapshot)?;
            question_snapshots.push(snapshot);
        }
        if !by_question.is_empty() {
            debug!(
                ignored = by_question.len(),
                "supplied snapshots for unlisted questions were ignored"
            );
        }

        let mut rollup = merge_question_snapshots(
            project,
            category,
            date,
            &question_snapshots,
            self.source_count,
        )?;
        score_snapshot(&mut rollup, &self.weights, &self.registry)?;
        TrendTracker::new(self.store.as_ref(), self.window).annotate(&mut rollup);

        Ok(CategoryRun {
            questions: question_snapshots,
            rollup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::names;
    use crate::entity::Entity;
    use crate::snapshot::QueryScope;
    use crate::store::MemorySnapshotStore;
    use std::collections::BTreeMap as Map;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn engine() -> AnalyticsEngine {
        let config = EngineConfig {
            sources: vec![SourceConfig::new("gpt"), SourceConfig::new("claude")],
            ..EngineConfig::default()
        };
        AnalyticsEngine::new(config, Arc::new(MemorySnapshotStore::new()))
    }

    fn question_snapshot(question: &str, value: &str, mentions: u64) -> Snapshot {
        Snapshot::from_entities(
            "proj",
            QueryScope::query(question),
            names::PRODUCTS,
            d("2026-08-05"),
            vec![Entity::from_sources(
                value,
                Map::from([("gpt".to_string(), mentions)]),
                Map::from([("gpt".to_string(), 1.0)]),
            )],
        )
    }

    #[test]
    fn run_category_scores_questions_and_rollup() {
        let run = engine()
            .run_category(
                "proj",
                names::PRODUCTS,
                d("2026-08-05"),
                &["q1".to_string(), "q2".to_string()],
                vec![
                    question_snapshot("q1", "Acme", 3),
                    question_snapshot("q2", "Acme", 5),
                ],
            )
            .unwrap();

        assert_eq!(run.questions.len(), 2);
        for question in &run.questions {
            let acme = question.get("acme").unwrap();
            assert!(acme.influence > 0.0);
            assert!(acme.trends.is_some());
        }

        let acme = run.rollup.get("acme").unwrap();
        assert_eq!(acme.mentions, 5);
        assert_eq!(acme.mentions_by_source["gpt"], 8);
        assert!((acme.influence - 1.0).abs() < 1e-9);
        assert!(acme.trends.is_some());
        assert!(acme.rollup.is_some());
    }

    #[test]
    fn missing_question_snapshot_is_fatal() {
        let err = engine()
            .run_category(
                "proj",
                names::PRODUCTS,
                d("2026-08-05"),
                &["q1".to_string(), "q2".to_string()],
                vec![question_snapshot("q1", "Acme", 3)],
            )
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::MissingUpstreamData { question, .. } if question == "q2"
        ));
    }

    #[test]
    fn empty_question_list_produces_an_empty_rollup() {
        let run = engine()
            .run_category("proj", names::PRODUCTS, d("2026-08-05"), &[], vec![])
            .unwrap();
        assert!(run.questions.is_empty());
        assert!(run.rollup.is_empty());
        assert!(run.rollup.scope.is_aggregate());
    }
}
