//! Rich diagnostic error types for knowledge migration.
//!
//! Only failures that make the whole run pointless surface here. A single
//! record whose write is refused is accumulated in the
//! [`MigrationReport`](super::MigrationReport) instead.

use miette::Diagnostic;
use thiserror::Error;

use crate::error::StoreError;

/// Errors that abort a migration run.
#[derive(Debug, Error, Diagnostic)]
pub enum MigrationError {
    #[error("graph store failed during migration: {source}")]
    #[diagnostic(
        code(selene::migrate::store),
        help(
            "The graph store became unusable mid-run. Passages already written are \
             valid; re-run the full migration once the store is back."
        )
    )]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("corpus could not be read: {message}")]
    #[diagnostic(
        code(selene::migrate::corpus),
        help("Check that the corpus file exists and is JSON Lines, one record per line.")
    )]
    Corpus { message: String },

    #[error("corpus I/O error at {path}")]
    #[diagnostic(
        code(selene::migrate::corpus_io),
        help("Ensure the corpus file exists and is readable.")
    )]
    CorpusIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("migration cancelled after {migrated}/{total} records")]
    #[diagnostic(
        code(selene::migrate::cancelled),
        help("The graph is valid but incomplete. Re-run the migration to finish it.")
    )]
    Cancelled { migrated: usize, total: usize },

    #[error("migration deadline exceeded after {migrated}/{total} records")]
    #[diagnostic(
        code(selene::migrate::deadline),
        help(
            "The graph is valid but incomplete. Re-run with a longer deadline; \
             records already written are merged, not duplicated."
        )
    )]
    DeadlineExceeded { migrated: usize, total: usize },
}

/// Result type for migration operations.
pub type MigrationResult<T> = std::result::Result<T, MigrationError>;
