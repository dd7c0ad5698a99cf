//! Temporal trend tracking.
//!
//! For one snapshot, walks up to K prior snapshots of the same scope
//! (same project, same question-or-aggregate, same category; dates
//! strictly before the current one, newest first) and annotates every
//! current entity with trend classifications and time-series statistics.
//!
//! Prior snapshots are read, never mutated. A missing or unreadable prior
//! snapshot means "no data for that date" and is skipped; with zero
//! usable history the tracker still produces valid output, classifying
//! everything against no prior data.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::entity::Entity;
use crate::snapshot::Snapshot;
use crate::store::SnapshotStore;
use crate::trend::{
    calculate_trend, change_percent, volatility, MentionsPoint, Trend, TrendPoint, TrendStats,
};

/// Default number of prior snapshots consulted.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Hard cap on the history window.
pub const MAX_HISTORY_WINDOW: usize = 30;

/// Annotates snapshots with trend data read from a snapshot store.
pub struct TrendTracker<'a> {
    store: &'a dyn SnapshotStore,
    window: usize,
}

impl<'a> TrendTracker<'a> {
    /// Creates a tracker over `store` consulting up to `window` prior
    /// snapshots (clamped to `1..=MAX_HISTORY_WINDOW`).
    #[must_use]
    pub fn new(store: &'a dyn SnapshotStore, window: usize) -> Self {
        Self {
            store,
            window: window.clamp(1, MAX_HISTORY_WINDOW),
        }
    }

    /// Fills the trend fields of every entity in `snapshot`.
    ///
    /// History failures are recoverable by design: any date that cannot
    /// be listed or loaded contributes no points, and classification
    /// falls back to "no prior data".
    pub fn annotate(&self, snapshot: &mut Snapshot) {
        let key = snapshot.scope_key();
        let dates = match self.store.dates_before(&key, snapshot.date, self.window) {
            Ok(dates) => dates,
            Err(err) => {
                debug!(error = %err, "history listing failed; tracking with no prior snapshots");
                Vec::new()
            }
        };

        let mut history: Vec<Snapshot> = Vec::with_capacity(dates.len());
        for date in dates {
            match self.store.load(&key, date) {
                Ok(Some(prior)) => history.push(prior),
                Ok(None) => {}
                Err(err) => {
                    debug!(error = %err, %date, "skipping unreadable prior snapshot");
                }
            }
        }

        let current_date = snapshot.date;
        for entity in snapshot.entities_mut() {
            annotate_entity(entity, current_date, &history);
        }
    }
}

fn annotate_entity(entity: &mut Entity, current_date: NaiveDate, history: &[Snapshot]) {
    let key = entity.key();
    let matched: Vec<(NaiveDate, &Entity)> = history
        .iter()
        .filter_map(|snapshot| snapshot.get(&key).map(|e| (snapshot.date, e)))
        .collect();
    // Classification reads the single most-recent prior snapshot, whether
    // or not the entity appears in it.
    let prior = history.first().and_then(|snapshot| snapshot.get(&key));

    let series = |current: f64, metric: &dyn Fn(&Entity) -> f64| -> Vec<TrendPoint> {
        let mut points = Vec::with_capacity(matched.len() + 1);
        points.push(TrendPoint::new(current_date, current));
        points.extend(matched.iter().map(|(date, e)| TrendPoint::new(*date, metric(e))));
        points
    };
    let classify = |current: f64, metric: &dyn Fn(&Entity) -> f64| -> Trend {
        calculate_trend(current, prior.map(|e| metric(e)))
    };

    let mentions_f = |e: &Entity| e.mentions as f64;
    let influence_f = |e: &Entity| e.influence;
    let order_f = |e: &Entity| e.appearance_order;
    let sources_f = |e: &Entity| f64::from(e.unique_source_count);

    let mentions_trend = classify(entity.mentions as f64, &mentions_f);
    let influence_trend = classify(entity.influence, &influence_f);
    let appearance_order_trend = classify(entity.appearance_order, &order_f);
    let unique_source_count_trend =
        classify(f64::from(entity.unique_source_count), &sources_f);

    let mentions_trend_vals = series(entity.mentions as f64, &mentions_f);
    let influence_trend_vals = series(entity.influence, &influence_f);
    let appearance_order_trend_vals = series(entity.appearance_order, &order_f);
    let unique_source_count_trend_vals =
        series(f64::from(entity.unique_source_count), &sources_f);

    // Sources that matter per-source: everything the entity has now plus
    // whatever the immediately prior snapshot had, so a vanished source
    // still reads DISAPPEARED without resurrecting long-dead ones.
    let mut source_ids: BTreeSet<String> = entity.mentions_by_source.keys().cloned().collect();
    if let Some(prev) = prior {
        source_ids.extend(prev.mentions_by_source.keys().cloned());
    }

    let mut mentions_by_model_trend = BTreeMap::new();
    let mut mentions_by_model_trend_vals = BTreeMap::new();
    let mut influence_by_model_trend = BTreeMap::new();
    let mut influence_by_model_trend_vals = BTreeMap::new();
    let mut appearance_order_by_model_trend = BTreeMap::new();
    let mut appearance_order_by_model_trend_vals = BTreeMap::new();

    for source in source_ids {
        let per_source = |e: &Entity, pick: PerSourceMetric| -> Option<f64> {
            match pick {
                PerSourceMetric::Mentions => {
                    e.mentions_by_source.get(&source).map(|m| *m as f64)
                }
                PerSourceMetric::Influence => e.influence_by_source.get(&source).copied(),
                PerSourceMetric::Order => e.appearance_order_by_source.get(&source).copied(),
            }
        };

        for pick in [
            PerSourceMetric::Mentions,
            PerSourceMetric::Influence,
            PerSourceMetric::Order,
        ] {
            let current = per_source(entity, pick).unwrap_or(0.0);
            let previous = prior.map(|p| per_source(p, pick).unwrap_or(0.0));
            let trend = calculate_trend(current, previous);

            let mut points = vec![TrendPoint::new(current_date, current)];
            for (date, e) in &matched {
                if let Some(value) = per_source(e, pick) {
                    points.push(TrendPoint::new(*date, value));
                }
            }

            let (trends, vals) = match pick {
                PerSourceMetric::Mentions => {
                    (&mut mentions_by_model_trend, &mut mentions_by_model_trend_vals)
                }
                PerSourceMetric::Influence => {
                    (&mut influence_by_model_trend, &mut influence_by_model_trend_vals)
                }
                PerSourceMetric::Order => (
                    &mut appearance_order_by_model_trend,
                    &mut appearance_order_by_model_trend_vals,
                ),
            };
            trends.insert(source.clone(), trend);
            vals.insert(source.clone(), points);
        }
    }

    let previous_mentions = prior.map_or(0, |e| e.mentions);
    let mentions_history: Vec<MentionsPoint> = {
        let mut points = Vec::with_capacity(matched.len() + 1);
        points.push(MentionsPoint::new(current_date, entity.mentions));
        points.extend(
            matched
                .iter()
                .map(|(date, e)| MentionsPoint::new(*date, e.mentions)),
        );
        points
    };
    let counts: Vec<f64> = mentions_history.iter().map(|p| p.mentions as f64).collect();

    entity.trends = Some(TrendStats {
        trend: mentions_trend,
        mentions_trend,
        influence_trend,
        appearance_order_trend,
        unique_source_count_trend,
        mentions_trend_vals,
        influence_trend_vals,
        appearance_order_trend_vals,
        unique_source_count_trend_vals,
        mentions_by_model_trend,
        mentions_by_model_trend_vals,
        influence_by_model_trend,
        influence_by_model_trend_vals,
        appearance_order_by_model_trend,
        appearance_order_by_model_trend_vals,
        previous_mentions,
        mentions_change: entity.mentions as i64 - previous_mentions as i64,
        change_percent: change_percent(entity.mentions, previous_mentions),
        mentions_history,
        first_seen: matched.last().map_or(current_date, |(date, _)| *date),
        last_seen: current_date,
        volatility: volatility(&counts),
    });
}

#[derive(Clone, Copy)]
enum PerSourceMetric {
    Mentions,
    Influence,
    Order,
}
