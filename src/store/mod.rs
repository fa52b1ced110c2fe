//! Persistence for the knowledge graph.
//!
//! The live graph is always the in-memory [`KnowledgeGraph`](crate::graph::KnowledgeGraph);
//! [`DurableStore`] keeps a redb snapshot of it so a built and migrated graph
//! survives restarts.

pub mod durable;

use crate::error::StoreError;

pub use durable::DurableStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
