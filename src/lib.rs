// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # selene
//!
//! A knowledge graph engine for traditional astrology: a fixed structural
//! ontology of planets, signs, houses and their dignities, with an
//! interpretive corpus of attributed passages hung off it.
//!
//! ## Architecture
//!
//! - **Ontology** (`ontology`): static catalogs and derived dignity tables
//! - **Graph** (`graph`): typed nodes and relations over a petgraph store
//! - **Builder** (`builder`): idempotent structural construction
//! - **Migration** (`migrate`): paged corpus import with per-record reporting
//! - **Retrieval** (`query`): read-only queries and the chart battery
//! - **Persistence** (`store`): redb snapshots of the whole graph
//!
//! ## Library usage
//!
//! ```no_run
//! use selene::context::Context;
//! use selene::engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.build_structure().unwrap();
//! let web = engine.rulership_web("aries", &Context::background()).unwrap();
//! assert_eq!(web.unwrap().ruler.as_deref(), Some("Mars"));
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod graph;
pub mod migrate;
pub mod ontology;
pub mod query;
pub mod store;
