//! Trend classification and time-series statistics.
//!
//! A trend compares an entity's current metric value against the value in
//! the immediately prior snapshot of the same scope. The comparison is a
//! raw numeric one for every metric, including appearance order: there
//! `Up` means the number went up, which for an ordinal position is a
//! *loss* of prominence. Callers own the sign interpretation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discrete trajectory of a metric versus the immediately prior snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    /// No prior value (or prior zero) and the current value is positive.
    New,

    /// No prior value (or prior zero) and the current value is zero.
    #[default]
    Unknown,

    /// Prior value was positive, current value is zero.
    Disappeared,

    /// Current value exceeds the prior value.
    Up,

    /// Current value is below the prior value.
    Down,

    /// Current and prior values are equal and positive.
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Disappeared => write!(f, "DISAPPEARED"),
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Stable => write!(f, "STABLE"),
        }
    }
}

/// Classifies `current` against the immediately prior value.
///
/// `previous` is `None` when the entity had no match in the prior
/// snapshot (or no prior snapshot exists); a prior of zero is treated the
/// same way.
///
/// # Examples
///
/// ```
/// use mentionlens::trend::{calculate_trend, Trend};
///
/// assert_eq!(calculate_trend(5.0, None), Trend::New);
/// assert_eq!(calculate_trend(0.0, Some(7.0)), Trend::Disappeared);
/// assert_eq!(calculate_trend(9.0, Some(4.0)), Trend::Up);
/// ```
#[must_use]
pub fn calculate_trend(current: f64, previous: Option<f64>) -> Trend {
    let prior = previous.unwrap_or(0.0);
    if prior <= 0.0 {
        return if current > 0.0 {
            Trend::New
        } else {
            Trend::Unknown
        };
    }
    if current == 0.0 {
        Trend::Disappeared
    } else if current > prior {
        Trend::Up
    } else if current < prior {
        Trend::Down
    } else {
        Trend::Stable
    }
}

/// Percent change of the mention count versus the prior snapshot.
///
/// A count appearing out of nothing reads as +100%; two zero counts read
/// as no change.
#[must_use]
pub fn change_percent(current: u64, previous: u64) -> f64 {
    if previous == 0 {
        if current > 0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current as f64 - previous as f64) / previous as f64 * 100.0
    }
}

/// Population standard deviation of a value series; 0.0 below 2 points.
#[must_use]
pub fn volatility(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// One dated value in a metric time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Snapshot date.
    pub date: NaiveDate,

    /// Metric value on that date.
    pub value: f64,
}

impl TrendPoint {
    /// Creates a dated point.
    #[must_use]
    pub const fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// One dated mention count in an entity's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionsPoint {
    /// Snapshot date.
    pub date: NaiveDate,

    /// Mention count on that date.
    pub mentions: u64,
}

impl MentionsPoint {
    /// Creates a dated count.
    #[must_use]
    pub const fn new(date: NaiveDate, mentions: u64) -> Self {
        Self { date, mentions }
    }
}

/// Everything the trend tracker attaches to an entity.
///
/// Series are ordered newest-first: the current date, then every matched
/// prior date. `trend` mirrors `mentions_trend`; mentions are the
/// headline metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendStats {
    /// Headline trajectory (mention count versus the prior snapshot).
    pub trend: Trend,

    /// Mention-count trajectory.
    pub mentions_trend: Trend,

    /// Influence trajectory.
    pub influence_trend: Trend,

    /// Appearance-order trajectory (raw numeric sense, lower is better).
    pub appearance_order_trend: Trend,

    /// Unique-source-count trajectory.
    pub unique_source_count_trend: Trend,

    /// Mention counts over the window, newest first.
    pub mentions_trend_vals: Vec<TrendPoint>,

    /// Influence over the window, newest first.
    pub influence_trend_vals: Vec<TrendPoint>,

    /// Appearance order over the window, newest first.
    pub appearance_order_trend_vals: Vec<TrendPoint>,

    /// Unique source counts over the window, newest first.
    pub unique_source_count_trend_vals: Vec<TrendPoint>,

    /// Per-source mention trajectories.
    pub mentions_by_model_trend: BTreeMap<String, Trend>,

    /// Per-source mention series, newest first.
    pub mentions_by_model_trend_vals: BTreeMap<String, Vec<TrendPoint>>,

    /// Per-source influence trajectories.
    pub influence_by_model_trend: BTreeMap<String, Trend>,

    /// Per-source influence series, newest first.
    pub influence_by_model_trend_vals: BTreeMap<String, Vec<TrendPoint>>,

    /// Per-source appearance-order trajectories.
    pub appearance_order_by_model_trend: BTreeMap<String, Trend>,

    /// Per-source appearance-order series, newest first.
    pub appearance_order_by_model_trend_vals: BTreeMap<String, Vec<TrendPoint>>,

    /// Mention count in the immediately prior snapshot (0 if unmatched).
    pub previous_mentions: u64,

    /// Current minus previous mention count.
    pub mentions_change: i64,

    /// Percent change of the mention count (see [`change_percent`]).
    pub change_percent: f64,

    /// Dated mention counts, newest first; input to [`volatility`].
    pub mentions_history: Vec<MentionsPoint>,

    /// Oldest date in the window with data for this entity.
    pub first_seen: NaiveDate,

    /// Current snapshot date.
    pub last_seen: NaiveDate,

    /// Population standard deviation of `mentions_history`.
    pub volatility: f64,
}
