//! Planet-in-sign condition and layered placement interpretation.

use serde::Serialize;

use crate::context::Context;
use crate::error::QueryResult;
use crate::graph::{Direction, GraphStore, NodeKey, NodeLabel, Relation, RelationKind};
use crate::ontology::{self, SectRole, catalog::LAYERS};

use super::filter::{PassageHit, PassageQuery};
use super::rulership::display_name;

/// Essential dignity of a planet in a sign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DignityFlags {
    pub domicile: bool,
    pub exaltation: bool,
    pub detriment: bool,
    pub fall: bool,
    pub triplicity_day: bool,
    pub triplicity_night: bool,
    pub triplicity_participating: bool,
}

impl DignityFlags {
    pub fn triplicity(&self) -> bool {
        self.triplicity_day || self.triplicity_night || self.triplicity_participating
    }

    /// Domicile, exaltation, detriment or fall.
    pub fn any_notable(&self) -> bool {
        self.domicile || self.exaltation || self.detriment || self.fall
    }
}

/// Passages of one interpretive layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerPassages {
    pub layer: String,
    pub passages: Vec<PassageHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanetCondition {
    pub planet: String,
    pub planet_name: String,
    pub sign: String,
    pub sign_name: String,
    pub flags: DignityFlags,
    /// Grouped in layer catalog order; best trust tier first within a layer.
    pub passages: Vec<LayerPassages>,
}

/// Read the dignity edges between `planet` and `sign`.
pub fn dignity_flags<G: GraphStore + ?Sized>(
    store: &G,
    planet: &NodeKey,
    sign: &NodeKey,
) -> QueryResult<DignityFlags> {
    let has = |relation| store.has_edge(planet, relation, sign);
    Ok(DignityFlags {
        domicile: has(Relation::Rules)?,
        exaltation: has(Relation::ExaltedIn)?,
        detriment: has(Relation::DetrimentIn)?,
        fall: has(Relation::FallIn)?,
        triplicity_day: has(Relation::TriplicityRuler(SectRole::Day))?,
        triplicity_night: has(Relation::TriplicityRuler(SectRole::Night))?,
        triplicity_participating: has(Relation::TriplicityRuler(SectRole::Participating))?,
    })
}

/// Condition of `planet` in `sign` with up to `limit` passages describing
/// that exact pair. `None` if either entity does not exist.
pub fn planet_condition<G: GraphStore + ?Sized>(
    store: &G,
    planet: &str,
    sign: &str,
    limit: usize,
    ctx: &Context,
) -> QueryResult<Option<PlanetCondition>> {
    ctx.check()?;
    let planet_key = NodeKey::planet(ontology::planet_key(planet));
    let sign_key = NodeKey::sign(ontology::normalize_id(sign));
    if store.node(&planet_key)?.is_none() || store.node(&sign_key)?.is_none() {
        return Ok(None);
    }

    let flags = dignity_flags(store, &planet_key, &sign_key)?;
    let hits = PassageQuery::new(limit)
        .planet(&planet_key.id())
        .sign(&sign_key.id())
        .execute(store, ctx)?;

    Ok(Some(PlanetCondition {
        planet_name: display_name(store, &planet_key)?,
        sign_name: display_name(store, &sign_key)?,
        planet: planet_key.id(),
        sign: sign_key.id(),
        flags,
        passages: group_by_layer(hits),
    }))
}

/// Split hits into layer groups, keeping their order within each group.
fn group_by_layer(hits: Vec<PassageHit>) -> Vec<LayerPassages> {
    let mut groups: Vec<LayerPassages> = LAYERS
        .iter()
        .map(|l| LayerPassages {
            layer: l.id.to_owned(),
            passages: Vec::new(),
        })
        .collect();
    for hit in hits {
        let layer = hit.layer.clone().unwrap_or_default();
        match groups.iter_mut().find(|g| g.layer == layer) {
            Some(group) => group.passages.push(hit),
            None => groups.push(LayerPassages {
                layer,
                passages: vec![hit],
            }),
        }
    }
    groups.retain(|g| !g.passages.is_empty());
    groups
}

/// Layers consulted by [`interpret_placement`], in output order.
pub const PLACEMENT_LAYERS: [&str; 4] = ["technical", "psychological", "reference", "archetypal"];

/// Up to `per_layer` passages per layer for a planet with an optional sign
/// and house. Layers with no match are omitted.
pub fn interpret_placement<G: GraphStore + ?Sized>(
    store: &G,
    planet: &str,
    sign: Option<&str>,
    house: Option<u8>,
    per_layer: usize,
    ctx: &Context,
) -> QueryResult<Vec<LayerPassages>> {
    let mut out = Vec::new();
    for layer in PLACEMENT_LAYERS {
        let mut query = PassageQuery::new(per_layer).planet(planet).layer(layer);
        if let Some(sign) = sign {
            query = query.sign(sign);
        }
        if let Some(house) = house {
            query = query.house(house);
        }
        let passages = query.execute(store, ctx)?;
        if !passages.is_empty() {
            out.push(LayerPassages {
                layer: layer.to_owned(),
                passages,
            });
        }
    }
    Ok(out)
}

/// Signs where `planet` has the given dignity relation, by id.
pub fn signs_with<G: GraphStore + ?Sized>(
    store: &G,
    planet: &str,
    kind: RelationKind,
) -> QueryResult<Vec<String>> {
    let key = NodeKey::planet(ontology::planet_key(planet));
    Ok(store
        .neighbors(&key, kind, Direction::Outgoing)?
        .into_iter()
        .filter(|(_, k)| k.label() == NodeLabel::Sign)
        .map(|(_, k)| k.id())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_structural_graph;
    use crate::graph::KnowledgeGraph;
    use crate::migrate::{CorpusRecord, VecCorpus, migrate_knowledge};

    fn graph(records: Vec<CorpusRecord>) -> KnowledgeGraph {
        let kg = KnowledgeGraph::new();
        build_structural_graph(&kg).unwrap();
        migrate_knowledge(&kg, &mut VecCorpus::new(records), 10, &Context::background()).unwrap();
        kg
    }

    #[test]
    fn flags_for_classic_pairs() {
        let kg = graph(vec![]);
        let ctx = Context::background();
        let mars_aries = planet_condition(&kg, "mars", "aries", 5, &ctx).unwrap().unwrap();
        assert!(mars_aries.flags.domicile);
        assert!(!mars_aries.flags.exaltation);

        let saturn_aries = planet_condition(&kg, "Saturn", "Aries", 5, &ctx).unwrap().unwrap();
        assert!(saturn_aries.flags.fall);
        assert!(saturn_aries.flags.triplicity_participating);
        assert!(saturn_aries.flags.triplicity());

        let venus_aries = planet_condition(&kg, "venus", "aries", 5, &ctx).unwrap().unwrap();
        assert!(venus_aries.flags.detriment);
        assert!(venus_aries.passages.is_empty());
    }

    #[test]
    fn passages_grouped_by_layer_in_catalog_order() {
        let kg = graph(vec![
            CorpusRecord::new("r1", "ref")
                .author("A")
                .layer("reference")
                .trust_tier(1)
                .planets("mars")
                .signs("aries"),
            CorpusRecord::new("t2", "tech, tier 2")
                .author("B")
                .layer("technical")
                .trust_tier(2)
                .planets("mars")
                .signs("aries"),
            CorpusRecord::new("t1", "tech, tier 1")
                .author("C")
                .layer("technical")
                .trust_tier(1)
                .planets("mars")
                .signs("aries"),
        ]);
        let condition = planet_condition(&kg, "mars", "aries", 5, &Context::background())
            .unwrap()
            .unwrap();
        let layers: Vec<_> = condition.passages.iter().map(|g| g.layer.as_str()).collect();
        assert_eq!(layers, vec!["technical", "reference"]);
        let technical: Vec<_> = condition.passages[0]
            .passages
            .iter()
            .map(|h| h.chunk_id.as_str())
            .collect();
        assert_eq!(technical, vec!["t1", "t2"]);
    }

    #[test]
    fn unknown_planet_or_sign_is_none() {
        let kg = graph(vec![]);
        let ctx = Context::background();
        assert!(planet_condition(&kg, "vulcan", "aries", 5, &ctx).unwrap().is_none());
        assert!(planet_condition(&kg, "mars", "ophiuchus", 5, &ctx).unwrap().is_none());
    }

    #[test]
    fn interpret_placement_caps_each_layer() {
        let records = (0..3)
            .flat_map(|i| {
                [
                    CorpusRecord::new(format!("t{i}"), "t")
                        .author("A")
                        .layer("technical")
                        .planets("moon")
                        .houses("4"),
                    CorpusRecord::new(format!("a{i}"), "a")
                        .author("A")
                        .layer("archetypal")
                        .planets("moon")
                        .houses("4"),
                ]
            })
            .collect();
        let kg = graph(records);
        let layers = interpret_placement(&kg, "Moon", None, Some(4), 2, &Context::background()).unwrap();
        let shape: Vec<_> = layers.iter().map(|l| (l.layer.as_str(), l.passages.len())).collect();
        assert_eq!(shape, vec![("technical", 2), ("archetypal", 2)]);
    }

    #[test]
    fn signs_with_dignity() {
        let kg = graph(vec![]);
        let mut ruled = signs_with(&kg, "mars", RelationKind::Rules).unwrap();
        ruled.sort();
        assert_eq!(ruled, vec!["aries", "scorpio"]);
    }
}
