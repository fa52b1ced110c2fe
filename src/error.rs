//! Rich diagnostic error types for the selene engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so operators know exactly
//! which step failed and whether a re-run is safe.

use miette::Diagnostic;
use thiserror::Error;

use crate::builder::BuildStep;
use crate::config::ConfigError;
use crate::context::Interrupt;
use crate::migrate::error::MigrationError;

/// Top-level error type for the selene engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, sources) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum SeleneError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("derived {relation} for {planet} is {derived}, but the traditional table says {listed}")]
    #[diagnostic(
        code(selene::ontology::derived_mismatch),
        help(
            "Detriment and fall are derived as the sign opposite the domicile or \
             exaltation. A mismatch means either the sign ordinals or the traditional \
             table drifted. Fix the catalog before building the graph."
        )
    )]
    DerivedMismatch {
        relation: &'static str,
        planet: String,
        derived: String,
        listed: String,
    },

    #[error("traditional {relation} {planet} -> {sign} has no derived counterpart")]
    #[diagnostic(
        code(selene::ontology::missing_derived),
        help(
            "Every hand-listed detriment/fall must follow from a domicile or exaltation \
             on the opposite sign. Remove the entry or add the missing dignity."
        )
    )]
    MissingDerived {
        relation: &'static str,
        planet: String,
        sign: String,
    },

    #[error("{catalog} has {actual} entries, expected {expected}")]
    #[diagnostic(
        code(selene::ontology::cardinality),
        help("The static catalogs have fixed cardinalities. Restore the missing or extra entries.")
    )]
    Cardinality {
        catalog: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{catalog} entry \"{entry}\" references unknown {kind} \"{reference}\"")]
    #[diagnostic(
        code(selene::ontology::unknown_reference),
        help("Catalog cross-references must name an id defined in the referenced catalog.")
    )]
    UnknownReference {
        catalog: &'static str,
        entry: String,
        kind: &'static str,
        reference: String,
    },

    #[error("duplicate key \"{key}\" in {catalog}")]
    #[diagnostic(
        code(selene::ontology::duplicate_key),
        help("Natural keys must be unique within their catalog.")
    )]
    DuplicateKey { catalog: &'static str, key: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("graph store unavailable: {message}")]
    #[diagnostic(
        code(selene::store::unavailable),
        help(
            "The graph store could not be reached. Construction is idempotent, \
             so re-run the whole step once the store is back."
        )
    )]
    Unavailable { message: String },

    #[error("graph lock poisoned")]
    #[diagnostic(
        code(selene::store::poisoned),
        help("A writer panicked while holding the graph lock. Reopen the engine.")
    )]
    Poisoned,

    #[error("write rejected: {message}")]
    #[diagnostic(
        code(selene::store::rejected),
        help("The store refused this individual write. Other writes are unaffected.")
    )]
    Rejected { message: String },

    #[error("redb error: {message}")]
    #[diagnostic(
        code(selene::store::redb),
        help(
            "The snapshot database encountered an error. \
             Try running with a fresh data directory and rebuild the graph."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(selene::store::serde),
        help(
            "Failed to serialize or deserialize a graph record. \
             The snapshot format may have changed between versions; rebuild the graph."
        )
    )]
    Serialization { message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(selene::store::io),
        help("Check that the data directory exists, is writable and the disk is not full.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Whether the error means the store itself is unusable, as opposed to
    /// a single write being refused.
    pub fn is_connectivity(&self) -> bool {
        !matches!(self, StoreError::Rejected { .. })
    }
}

// ---------------------------------------------------------------------------
// Build errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error("structural build failed at step \"{step}\"")]
    #[diagnostic(
        code(selene::build::step_failed),
        help("The build aborted. It is safe to re-run the full build once the cause is fixed.")
    )]
    Step {
        step: BuildStep,
        #[source]
        source: StoreError,
    },

    #[error("step \"{step}\" tried to write {edge} but an endpoint is missing")]
    #[diagnostic(
        code(selene::build::missing_endpoint),
        help("Nodes must be written before the edges that reference them.")
    )]
    MissingEndpoint { step: BuildStep, edge: String },
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("query failed: {source}")]
    #[diagnostic(
        code(selene::query::store),
        help("The graph store failed while answering. An empty result is never reported this way.")
    )]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("query cancelled")]
    #[diagnostic(code(selene::query::cancelled))]
    Cancelled,

    #[error("query deadline exceeded")]
    #[diagnostic(
        code(selene::query::deadline),
        help("The graph store was too slow for the caller's deadline. Retry with a longer deadline.")
    )]
    DeadlineExceeded,
}

impl From<Interrupt> for QueryError {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Cancelled => QueryError::Cancelled,
            Interrupt::DeadlineExceeded => QueryError::DeadlineExceeded,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(selene::engine::invalid_config),
        help("Check the engine configuration fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("data directory error: {path}")]
    #[diagnostic(
        code(selene::engine::data_dir),
        help(
            "The data directory could not be accessed. \
             Ensure the path exists and has read/write permissions."
        )
    )]
    DataDir { path: String },
}

/// Convenience alias for functions returning selene results.
pub type SeleneResult<T> = std::result::Result<T, SeleneError>;

/// Result type for structural graph construction.
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Result type for retrieval queries.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Result type for ontology checks.
pub type OntologyResult<T> = std::result::Result<T, OntologyError>;
