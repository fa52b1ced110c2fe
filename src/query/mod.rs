//! Read-only retrieval over the knowledge graph.
//!
//! Every operation takes a [`Context`](crate::context::Context) and returns
//! an empty result, never an error, when nothing matches. Errors mean the
//! store failed or the caller's context interrupted the query.
//!
//! - [`rulership`]: structural profile of a sign
//! - [`condition`]: dignity of a planet in a sign with its passages
//! - [`filter`]: composable passage filters
//! - [`chart`]: the chart-grounded query battery
//! - [`stats`]: verification and corpus statistics

pub mod chart;
pub mod condition;
pub mod filter;
pub mod rulership;
pub mod stats;

pub use chart::{
    BatteryKind, ChartInput, ChartPlacement, DignityCondition, GroundedQuery, ReleasingPeriod,
    chart_grounded_knowledge,
};
pub use condition::{
    DignityFlags, LayerPassages, PlanetCondition, interpret_placement, planet_condition,
};
pub use filter::{PassageHit, PassagePredicate, PassageQuery, SearchFilters, filtered_search};
pub use rulership::{RulershipWeb, rulership_web};
pub use stats::{KnowledgeStats, VerificationReport, knowledge_stats, verify_graph};
