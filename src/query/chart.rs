//! Chart-grounded knowledge: a fixed battery of passage queries per placement.
//!
//! The battery is planned up front in a deterministic order, then executed on
//! a rayon pool. Results are collected positionally, so output order never
//! depends on which query finished first.

use std::collections::BTreeMap;

use rayon::ThreadPool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::QueryResult;
use crate::graph::{GraphStore, NodeKey};
use crate::ontology;

use super::condition::dignity_flags;
use super::filter::{PassageHit, PassageQuery};

/// Smallest number of passages a battery query may return.
pub const MIN_RESULTS_PER_QUERY: usize = 1;
/// Largest number of passages a battery query may return.
pub const MAX_RESULTS_PER_QUERY: usize = 5;

/// A planet's resolved position in a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPlacement {
    pub planet: String,
    pub sign: String,
    #[serde(default)]
    pub house: Option<u8>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl ChartPlacement {
    pub fn new(planet: impl Into<String>, sign: impl Into<String>, house: Option<u8>) -> Self {
        Self {
            planet: planet.into(),
            sign: sign.into(),
            house,
            longitude: None,
        }
    }
}

/// Essential dignity conditions reported by the chart service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DignityCondition {
    Domicile,
    Exaltation,
    Detriment,
    Fall,
}

/// The active zodiacal-releasing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasingPeriod {
    pub sign: String,
    /// Lord of the period. When set, a second releasing query looks for
    /// passages on that planet.
    #[serde(default)]
    pub ruler: Option<String>,
}

/// A chart as produced by the external chart service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartInput {
    pub placements: Vec<ChartPlacement>,
    /// Day chart (`true`) or night chart. When known, a planet without a
    /// major dignity still gets an archetypal query if it rules the
    /// triplicity of its sign for the chart's sect.
    #[serde(default)]
    pub is_day: Option<bool>,
    /// Conditions per planet. A planet listed here uses these flags instead
    /// of the dignities read from the graph.
    #[serde(default)]
    pub dignities: BTreeMap<String, Vec<DignityCondition>>,
    /// Annual-profection ruling planet (lord of the year).
    #[serde(default)]
    pub lord_of_year: Option<String>,
    #[serde(default)]
    pub releasing: Option<ReleasingPeriod>,
}

/// Which battery slot produced a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryKind {
    TechnicalBySign,
    PsychologicalByHouse,
    ReferenceBySign,
    ArchetypalByDignity,
    Profection,
    Releasing,
    ReleasingRuler,
}

/// One executed query and what it found. Queries with no hits are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundedQuery {
    pub kind: BatteryKind,
    pub description: String,
    pub passages: Vec<PassageHit>,
}

/// A planned battery query.
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    pub kind: BatteryKind,
    pub description: String,
    pub query: PassageQuery,
}

/// Plan the battery for `chart`, each query capped at `results_per_query`
/// clamped to `MIN_RESULTS_PER_QUERY..=MAX_RESULTS_PER_QUERY`.
pub fn plan_battery<G: GraphStore + ?Sized>(
    store: &G,
    chart: &ChartInput,
    results_per_query: usize,
    ctx: &Context,
) -> QueryResult<Vec<PlannedQuery>> {
    let results_per_query =
        results_per_query.clamp(MIN_RESULTS_PER_QUERY, MAX_RESULTS_PER_QUERY);
    let mut plan = Vec::new();
    let mut push = |kind, description: String, query: PassageQuery| {
        plan.push(PlannedQuery {
            kind,
            description,
            query,
        });
    };

    for placement in &chart.placements {
        ctx.check()?;
        let planet = ontology::planet_key(&placement.planet);
        let sign = ontology::normalize_id(&placement.sign);
        let base = PassageQuery::new(results_per_query).planet(&planet);

        push(
            BatteryKind::TechnicalBySign,
            format!("{planet} in {sign} (technical)"),
            base.clone().sign(&sign).layer("technical"),
        );
        if let Some(house) = placement.house {
            push(
                BatteryKind::PsychologicalByHouse,
                format!("{planet} in house {house} (psychological)"),
                base.clone().house(house).layer("psychological"),
            );
        }
        push(
            BatteryKind::ReferenceBySign,
            format!("{planet} in {sign} (reference)"),
            base.clone().sign(&sign).layer("reference"),
        );
        if let Some(condition) = notable_condition(store, chart, &planet, &sign)? {
            push(
                BatteryKind::ArchetypalByDignity,
                format!("{planet} in {condition} (archetypal)"),
                base.layer("archetypal"),
            );
        }
    }

    if let Some(lord) = &chart.lord_of_year {
        let planet = ontology::planet_key(lord);
        push(
            BatteryKind::Profection,
            format!("profection year ruled by {planet}"),
            PassageQuery::new(results_per_query)
                .technique("profections")
                .planet(&planet),
        );
    }
    if let Some(period) = &chart.releasing {
        let sign = ontology::normalize_id(&period.sign);
        push(
            BatteryKind::Releasing,
            format!("zodiacal releasing period in {sign}"),
            PassageQuery::new(results_per_query)
                .technique("zodiacal_releasing")
                .sign(&sign),
        );
        if let Some(ruler) = &period.ruler {
            let planet = ontology::planet_key(ruler);
            push(
                BatteryKind::ReleasingRuler,
                format!("zodiacal releasing period ruled by {planet}"),
                PassageQuery::new(results_per_query)
                    .technique("zodiacal_releasing")
                    .planet(&planet),
            );
        }
    }
    Ok(plan)
}

/// The first notable condition of `planet`: from the chart if it lists the
/// planet, otherwise from the graph's dignity edges for its sign. Failing
/// both, a known sect makes the sect's triplicity rulership notable.
fn notable_condition<G: GraphStore + ?Sized>(
    store: &G,
    chart: &ChartInput,
    planet: &str,
    sign: &str,
) -> QueryResult<Option<&'static str>> {
    let flags = dignity_flags(store, &NodeKey::planet(planet), &NodeKey::sign(sign))?;
    let listed = chart
        .dignities
        .iter()
        .find(|(name, _)| ontology::planet_key(name) == planet);
    let major = match listed {
        Some((_, conditions)) => conditions.first().map(|c| match c {
            DignityCondition::Domicile => "domicile",
            DignityCondition::Exaltation => "exaltation",
            DignityCondition::Detriment => "detriment",
            DignityCondition::Fall => "fall",
        }),
        None if flags.domicile => Some("domicile"),
        None if flags.exaltation => Some("exaltation"),
        None if flags.detriment => Some("detriment"),
        None if flags.fall => Some("fall"),
        None => None,
    };
    if major.is_some() {
        return Ok(major);
    }
    Ok(match chart.is_day {
        Some(true) if flags.triplicity_day => Some("day triplicity"),
        Some(false) if flags.triplicity_night => Some("night triplicity"),
        _ => None,
    })
}

/// Run the battery for `chart` on `pool`.
///
/// `results_per_query` bounds every individual query, not the total, and is
/// clamped to `MIN_RESULTS_PER_QUERY..=MAX_RESULTS_PER_QUERY`. The output
/// follows the plan order: placements in input order, then the profection
/// and releasing queries.
pub fn chart_grounded_knowledge<G: GraphStore + ?Sized>(
    store: &G,
    chart: &ChartInput,
    results_per_query: usize,
    pool: &ThreadPool,
    ctx: &Context,
) -> QueryResult<Vec<GroundedQuery>> {
    let plan = plan_battery(store, chart, results_per_query, ctx)?;
    tracing::debug!(
        placements = chart.placements.len(),
        queries = plan.len(),
        workers = pool.current_num_threads(),
        "chart battery planned"
    );

    let groups = pool.install(|| {
        plan.par_iter()
            .map(|planned| {
                planned.query.execute(store, ctx).map(|passages| GroundedQuery {
                    kind: planned.kind,
                    description: planned.description.clone(),
                    passages,
                })
            })
            .collect::<QueryResult<Vec<_>>>()
    })?;

    tracing::info!(
        queries = groups.len(),
        passages = groups.iter().map(|g| g.passages.len()).sum::<usize>(),
        "chart-grounded knowledge"
    );
    Ok(groups)
}
