//! Structural graph construction.
//!
//! [`build_structural_graph`] writes every static entity and classical
//! relationship from the ontology. Every write is a merge by natural key, so
//! the build can be re-run any number of times; a second run reports only
//! existing nodes and edges.
//!
//! Any store failure aborts the build at the step that failed. Nothing is
//! rolled back: the partial graph is valid, and re-running the full build is
//! the recovery path.

use serde::Serialize;

use crate::error::{BuildError, BuildResult, OntologyResult};
use crate::graph::{
    AspectProps, EdgeMerge, GraphStore, HouseProps, LayerProps, NodeKey, NodeLabel, NodeMerge,
    NodeProps, PlanetProps, Relation, SignProps, TechniqueProps,
};
use crate::ontology::catalog::{self, ASPECTS, HOUSES, LAYERS, PLANETS, SECT_TEAMS, SIGNS, TECHNIQUES};
use crate::ontology::{self, Element, Modality, OntologyReport, derive};

/// The ordered steps of a structural build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuildStep {
    Constraints,
    Lookups,
    Planets,
    Signs,
    Houses,
    Aspects,
    Techniques,
    Layers,
    Dignities,
    Triplicities,
    Oppositions,
    SectTeams,
}

impl BuildStep {
    pub const ALL: [BuildStep; 12] = [
        BuildStep::Constraints,
        BuildStep::Lookups,
        BuildStep::Planets,
        BuildStep::Signs,
        BuildStep::Houses,
        BuildStep::Aspects,
        BuildStep::Techniques,
        BuildStep::Layers,
        BuildStep::Dignities,
        BuildStep::Triplicities,
        BuildStep::Oppositions,
        BuildStep::SectTeams,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BuildStep::Constraints => "constraints",
            BuildStep::Lookups => "lookups",
            BuildStep::Planets => "planets",
            BuildStep::Signs => "signs",
            BuildStep::Houses => "houses",
            BuildStep::Aspects => "aspects",
            BuildStep::Techniques => "techniques",
            BuildStep::Layers => "layers",
            BuildStep::Dignities => "dignities",
            BuildStep::Triplicities => "triplicities",
            BuildStep::Oppositions => "oppositions",
            BuildStep::SectTeams => "sect_teams",
        }
    }
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a build wrote. On a re-run `nodes_created` and `edges_created` are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub nodes_created: usize,
    pub nodes_existing: usize,
    pub edges_created: usize,
    pub edges_existing: usize,
    pub steps_completed: Vec<BuildStep>,
}

impl BuildReport {
    pub fn nodes_total(&self) -> usize {
        self.nodes_created + self.nodes_existing
    }

    pub fn edges_total(&self) -> usize {
        self.edges_created + self.edges_existing
    }
}

// ── Step writer ─────────────────────────────────────────────────────────

/// Writes for one build step, tagging every failure with the step.
struct StepWriter<'a, G: GraphStore + ?Sized> {
    store: &'a G,
    step: BuildStep,
    report: &'a mut BuildReport,
}

impl<G: GraphStore + ?Sized> StepWriter<'_, G> {
    fn node(&mut self, key: NodeKey, props: NodeProps) -> BuildResult<()> {
        let merge = self
            .store
            .merge_node(key, props)
            .map_err(|source| BuildError::Step {
                step: self.step,
                source,
            })?;
        match merge {
            NodeMerge::Created => self.report.nodes_created += 1,
            NodeMerge::Updated | NodeMerge::Unchanged => self.report.nodes_existing += 1,
        }
        Ok(())
    }

    fn edge(&mut self, from: &NodeKey, relation: Relation, to: &NodeKey) -> BuildResult<()> {
        let merge = self
            .store
            .merge_edge(from, relation, to)
            .map_err(|source| BuildError::Step {
                step: self.step,
                source,
            })?;
        match merge {
            EdgeMerge::Created => self.report.edges_created += 1,
            EdgeMerge::Existing => self.report.edges_existing += 1,
            EdgeMerge::MissingEndpoint => {
                return Err(BuildError::MissingEndpoint {
                    step: self.step,
                    edge: format!("{from} -[{relation}]-> {to}"),
                });
            }
        }
        Ok(())
    }
}

// ── Build ───────────────────────────────────────────────────────────────

/// Build the structural graph from the ontology.
///
/// The ontology consistency check runs first; if it fails nothing is written.
pub fn build_structural_graph<G: GraphStore + ?Sized>(store: &G) -> BuildResult<BuildReport> {
    build_with_check(store, ontology::verify)
}

/// [`build_structural_graph`] gated on a caller-supplied consistency check.
pub fn build_with_check<G, F>(store: &G, check: F) -> BuildResult<BuildReport>
where
    G: GraphStore + ?Sized,
    F: FnOnce() -> OntologyResult<OntologyReport>,
{
    let ontology = check()?;
    tracing::debug!(?ontology, "ontology verified");

    let mut report = BuildReport::default();
    for step in BuildStep::ALL {
        let before = (report.nodes_created, report.edges_created);
        let mut writer = StepWriter {
            store,
            step,
            report: &mut report,
        };
        run_step(&mut writer)?;
        report.steps_completed.push(step);
        tracing::info!(
            step = %step,
            nodes_created = report.nodes_created - before.0,
            edges_created = report.edges_created - before.1,
            "build step complete"
        );
    }

    tracing::info!(
        nodes = report.nodes_total(),
        edges = report.edges_total(),
        nodes_created = report.nodes_created,
        edges_created = report.edges_created,
        "structural graph built"
    );
    Ok(report)
}

fn run_step<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    match w.step {
        BuildStep::Constraints => constraints(w),
        BuildStep::Lookups => lookups(w),
        BuildStep::Planets => planets(w),
        BuildStep::Signs => signs(w),
        BuildStep::Houses => houses(w),
        BuildStep::Aspects => aspects(w),
        BuildStep::Techniques => techniques(w),
        BuildStep::Layers => layers(w),
        BuildStep::Dignities => dignities(w),
        BuildStep::Triplicities => triplicities(w),
        BuildStep::Oppositions => oppositions(w),
        BuildStep::SectTeams => sect_teams(w),
    }
}

fn constraints<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for label in NodeLabel::ALL {
        w.store
            .ensure_unique(label)
            .map_err(|source| BuildError::Step {
                step: w.step,
                source,
            })?;
    }
    Ok(())
}

fn lookups<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for element in Element::ALL {
        w.node(
            NodeKey::Element(element.as_str().to_owned()),
            NodeProps::Lookup {
                name: element.name().to_owned(),
            },
        )?;
    }
    for modality in Modality::ALL {
        w.node(
            NodeKey::Modality(modality.as_str().to_owned()),
            NodeProps::Lookup {
                name: modality.name().to_owned(),
            },
        )?;
    }
    Ok(())
}

fn planets<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for p in &PLANETS {
        w.node(
            NodeKey::planet(p.id),
            NodeProps::Planet(PlanetProps {
                name: p.name.to_owned(),
                category: p.category.to_owned(),
                sect: p.sect.to_owned(),
                symbol: p.symbol.to_owned(),
            }),
        )?;
    }
    Ok(())
}

fn signs<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for s in &SIGNS {
        let key = NodeKey::sign(s.id);
        w.node(
            key.clone(),
            NodeProps::Sign(SignProps {
                name: s.name.to_owned(),
                element: s.element.as_str().to_owned(),
                modality: s.modality.as_str().to_owned(),
                polarity: s.polarity.to_owned(),
                ordinal: s.ordinal,
                symbol: s.symbol.to_owned(),
            }),
        )?;
        w.edge(
            &key,
            Relation::OfElement,
            &NodeKey::Element(s.element.as_str().to_owned()),
        )?;
        w.edge(
            &key,
            Relation::OfModality,
            &NodeKey::Modality(s.modality.as_str().to_owned()),
        )?;
    }
    for d in derive::domiciles() {
        w.edge(&NodeKey::planet(d.planet), Relation::Rules, &NodeKey::sign(d.sign))?;
    }
    Ok(())
}

fn houses<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for h in &HOUSES {
        let key = NodeKey::house(h.number);
        w.node(
            key.clone(),
            NodeProps::House(HouseProps {
                classical_name: h.classical_name.to_owned(),
                modern_name: h.modern_name.to_owned(),
                angularity: h.angularity.to_owned(),
                topics: h.topics.to_owned(),
            }),
        )?;
        if let Some(planet) = h.joy {
            w.edge(&NodeKey::planet(planet), Relation::JoyIn, &key)?;
        }
        // Natural house: the sign whose ordinal equals the house number.
        if let Some(sign) = catalog::sign_by_ordinal(h.number) {
            w.edge(&NodeKey::sign(sign.id), Relation::NaturalHouse, &key)?;
        }
    }
    Ok(())
}

fn aspects<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for a in &ASPECTS {
        w.node(
            NodeKey::aspect(a.id),
            NodeProps::Aspect(AspectProps {
                name: a.name.to_owned(),
                degrees: a.degrees,
                quality: a.quality.to_owned(),
                symbol: a.symbol.to_owned(),
            }),
        )?;
    }
    Ok(())
}

fn techniques<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for t in &TECHNIQUES {
        w.node(
            NodeKey::technique(t.id),
            NodeProps::Technique(TechniqueProps {
                name: t.name.to_owned(),
                tradition: t.tradition.to_owned(),
                description: t.description.to_owned(),
            }),
        )?;
    }
    Ok(())
}

fn layers<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for l in &LAYERS {
        w.node(
            NodeKey::layer(l.id),
            NodeProps::Layer(LayerProps {
                name: l.name.to_owned(),
                color: l.color.to_owned(),
                description: l.description.to_owned(),
            }),
        )?;
    }
    Ok(())
}

fn dignities<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    let tables = [
        (Relation::ExaltedIn, derive::exaltations()),
        (Relation::DetrimentIn, derive::detriments()),
        (Relation::FallIn, derive::falls()),
    ];
    for (relation, dignities) in tables {
        for d in dignities {
            w.edge(&NodeKey::planet(d.planet), relation, &NodeKey::sign(d.sign))?;
        }
    }
    Ok(())
}

fn triplicities<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for t in derive::triplicity_assignments() {
        w.edge(
            &NodeKey::planet(t.planet),
            Relation::TriplicityRuler(t.role),
            &NodeKey::sign(t.sign),
        )?;
    }
    Ok(())
}

fn oppositions<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for (a, b) in derive::oppositions() {
        w.edge(&NodeKey::sign(a), Relation::Opposes, &NodeKey::sign(b))?;
    }
    Ok(())
}

fn sect_teams<G: GraphStore + ?Sized>(w: &mut StepWriter<'_, G>) -> BuildResult<()> {
    for team in &SECT_TEAMS {
        w.node(
            NodeKey::SectTeam(team.id.to_owned()),
            NodeProps::Lookup {
                name: team.name.to_owned(),
            },
        )?;
    }
    for m in derive::sect_memberships() {
        w.edge(
            &NodeKey::planet(m.planet),
            Relation::SectTeam(m.role),
            &NodeKey::SectTeam(m.team.to_owned()),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OntologyError;
    use crate::graph::{Direction, KnowledgeGraph, RelationKind};

    #[test]
    fn first_build_creates_everything() {
        let kg = KnowledgeGraph::new();
        let report = build_structural_graph(&kg).unwrap();
        assert_eq!(report.steps_completed, BuildStep::ALL.to_vec());
        assert_eq!(report.nodes_existing, 0);
        assert_eq!(report.edges_existing, 0);
        // 4 elements + 3 modalities + 14 planets + 12 signs + 12 houses
        // + 5 aspects + 9 techniques + 5 layers + 2 sect teams
        assert_eq!(report.nodes_created, 66);
        assert_eq!(kg.node_count().unwrap(), 66);
        assert_eq!(kg.edge_count().unwrap(), report.edges_created);
    }

    #[test]
    fn second_build_writes_nothing_new() {
        let kg = KnowledgeGraph::new();
        let first = build_structural_graph(&kg).unwrap();
        let second = build_structural_graph(&kg).unwrap();
        assert_eq!(second.nodes_created, 0);
        assert_eq!(second.edges_created, 0);
        assert_eq!(second.nodes_existing, first.nodes_created);
        assert_eq!(second.edges_existing, first.edges_created);
    }

    #[test]
    fn relation_cardinalities() {
        let kg = KnowledgeGraph::new();
        build_structural_graph(&kg).unwrap();
        let count = |kind| kg.count_relation(kind).unwrap();
        assert_eq!(count(RelationKind::Rules), 12);
        assert_eq!(count(RelationKind::ExaltedIn), 7);
        assert_eq!(count(RelationKind::DetrimentIn), 12);
        assert_eq!(count(RelationKind::FallIn), 7);
        assert_eq!(count(RelationKind::TriplicityRuler), 36);
        assert_eq!(count(RelationKind::JoyIn), 7);
        assert_eq!(count(RelationKind::NaturalHouse), 12);
        assert_eq!(count(RelationKind::OfElement), 12);
        assert_eq!(count(RelationKind::OfModality), 12);
        assert_eq!(count(RelationKind::Opposes), 12);
        assert_eq!(count(RelationKind::SectTeam), 6);
    }

    #[test]
    fn every_sign_has_three_triplicity_rulers() {
        let kg = KnowledgeGraph::new();
        build_structural_graph(&kg).unwrap();
        for s in &SIGNS {
            let rulers = kg
                .neighbors(
                    &NodeKey::sign(s.id),
                    RelationKind::TriplicityRuler,
                    Direction::Incoming,
                )
                .unwrap();
            assert_eq!(rulers.len(), 3, "{}", s.id);
        }
    }

    #[test]
    fn failed_ontology_check_writes_nothing() {
        let kg = KnowledgeGraph::new();
        let err = build_with_check(&kg, || {
            Err(OntologyError::MissingDerived {
                relation: "detriment",
                planet: "mars".into(),
                sign: "libra".into(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, BuildError::Ontology(OntologyError::MissingDerived { .. })));
        assert_eq!(kg.node_count().unwrap(), 0);
        assert_eq!(kg.edge_count().unwrap(), 0);

        // The real catalog passes and the same store then builds normally.
        let report = build_with_check(&kg, ontology::verify).unwrap();
        assert_eq!(report.steps_completed, BuildStep::ALL.to_vec());
    }

    #[test]
    fn steps_render_lowercase() {
        assert_eq!(BuildStep::SectTeams.to_string(), "sect_teams");
        assert_eq!(BuildStep::Dignities.to_string(), "dignities");
    }
}
