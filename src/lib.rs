//! # Mentionlens: entity analytics for AI answers
//!
//! Mentionlens tracks how often named entities (products, organizations,
//! people, keywords, places, events, and classified hyperlinks) are
//! mentioned by multiple AI sources answering the same questions, and
//! turns those raw mention counts into comparable, historically-aware
//! analytics.
//!
//! ## Core Concepts
//!
//! - **Entity**: a tracked named thing within one category, identified by
//!   its trimmed, lowercased display value
//! - **Snapshot**: one category's entities for one scope
//!   (question or aggregate) on one date
//! - **Influence**: normalized importance within a scope, from weighted
//!   per-source mention counts and appearance positions
//! - **Trend**: discrete trajectory versus the immediately prior snapshot
//! - **Rollup**: the aggregate snapshot merged from all question
//!   snapshots for a date, with anti-inflation mention capping
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mentionlens::{
//!     AnalyticsEngine, EngineConfig, MemorySnapshotStore, SourceConfig,
//! };
//!
//! let engine = AnalyticsEngine::new(
//!     EngineConfig {
//!         sources: vec![SourceConfig::new("gpt"), SourceConfig::new("claude")],
//!         ..EngineConfig::default()
//!     },
//!     Arc::new(MemorySnapshotStore::new()),
//! );
//!
//! // Per-question snapshots come from the upstream extractor; the engine
//! // scores them, rolls them up, and tracks trends against history.
//! let run = engine.run_category("acme-site", "products", date, &questions, snapshots)?;
//! ```
//!
//! The engine is a pure, synchronous, in-memory transform: no I/O, no
//! network, no internal threading. History reads go through the
//! [`SnapshotStore`] trait; persistence of results is the caller's job.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod category;
pub mod entity;
pub mod error;
pub mod influence;
pub mod links;
pub mod merge;
pub mod pipeline;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod tracker;
pub mod trend;

// Re-export primary types at crate root for convenience
pub use category::{CategoryKind, CategoryRegistry};
pub use entity::{Entity, QuestionBreakdown, NEVER_APPEARED, UNRANKED};
pub use error::{EngineError, EngineResult};
pub use influence::score_snapshot;
pub use links::{classify_link, derive_link_domains, derive_link_types, link_domain};
pub use merge::merge_question_snapshots;
pub use pipeline::{AnalyticsEngine, CategoryRun, EngineConfig};
pub use snapshot::{QueryScope, ScopeKey, Snapshot};
pub use source::{SourceConfig, SourceWeights};
pub use store::{MemorySnapshotStore, SnapshotStore, StoreError};
pub use tracker::{TrendTracker, DEFAULT_HISTORY_WINDOW, MAX_HISTORY_WINDOW};
pub use trend::{
    calculate_trend, change_percent, volatility, MentionsPoint, Trend, TrendPoint, TrendStats,
};
