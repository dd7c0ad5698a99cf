//! Error types for the analytics engine.
//!
//! All errors are strongly typed with thiserror and carry enough scope
//! context (project, date, category, question) for a caller to decide
//! whether to halt or skip. Absent *historical* snapshots are not errors:
//! the trend tracker degrades to fewer history points. Absent
//! *current-date* snapshots are fatal to that scope's processing.

use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required current-date question snapshot was not supplied.
    #[error(
        "missing snapshot for project '{project}', question '{question}', \
         category '{category}' on {date}"
    )]
    MissingUpstreamData {
        /// Project whose processing failed.
        project: String,
        /// Question with no snapshot.
        question: String,
        /// Category being processed.
        category: String,
        /// Current processing date.
        date: NaiveDate,
    },

    /// A category was processed without a registered open/closed kind,
    /// so the influence normalization rule cannot be chosen.
    #[error("category '{category}' has no registered kind; cannot pick a normalization rule")]
    ConfigurationGap {
        /// The unregistered category name.
        category: String,
    },

    /// Merger inputs disagree on project, category, date, or scope kind.
    #[error("mismatched merger input: {reason}")]
    MixedBatch {
        /// What disagreed.
        reason: String,
    },

    /// Snapshot store failure outside the recoverable history path.
    #[error(transparent)]
    Store(#[from] StoreError),
}
