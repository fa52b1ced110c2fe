//! Structural profile of a sign.

use serde::Serialize;

use crate::context::Context;
use crate::error::QueryResult;
use crate::graph::{Direction, GraphStore, NodeKey, NodeProps, Relation, RelationKind};
use crate::ontology::{self, SectRole};

/// Triplicity rulers of a sign by sect role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriplicityRulers {
    pub day: Option<String>,
    pub night: Option<String>,
    pub participating: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NaturalHouse {
    pub number: u8,
    pub classical_name: String,
    pub topics: String,
}

/// Everything the structural graph knows about one sign. Planets are given
/// by display name; element, modality and opposite sign by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulershipWeb {
    pub sign: String,
    pub name: String,
    pub symbol: String,
    pub polarity: String,
    pub ordinal: u8,
    pub ruler: Option<String>,
    pub exaltation_ruler: Option<String>,
    pub detriment_rulers: Vec<String>,
    pub fall_rulers: Vec<String>,
    pub triplicity: TriplicityRulers,
    pub element: Option<String>,
    pub modality: Option<String>,
    pub natural_house: Option<NaturalHouse>,
    pub opposite_sign: Option<String>,
}

/// Profile of `sign` (id or display name). `None` if no such sign exists.
pub fn rulership_web<G: GraphStore + ?Sized>(
    store: &G,
    sign: &str,
    ctx: &Context,
) -> QueryResult<Option<RulershipWeb>> {
    ctx.check()?;
    let key = NodeKey::sign(ontology::normalize_id(sign));
    let Some(node) = store.node(&key)? else {
        return Ok(None);
    };
    let NodeProps::Sign(props) = &node.props else {
        return Ok(None);
    };

    let planet_names = |kind| -> QueryResult<Vec<(Relation, String)>> {
        let mut out = Vec::new();
        for (relation, planet) in store.neighbors(&key, kind, Direction::Incoming)? {
            out.push((relation, display_name(store, &planet)?));
        }
        Ok(out)
    };
    let outgoing_ids = |kind| -> QueryResult<Vec<NodeKey>> {
        Ok(store
            .neighbors(&key, kind, Direction::Outgoing)?
            .into_iter()
            .map(|(_, k)| k)
            .collect())
    };

    let ruler = planet_names(RelationKind::Rules)?.into_iter().next().map(|(_, n)| n);
    let exaltation_ruler = planet_names(RelationKind::ExaltedIn)?
        .into_iter()
        .next()
        .map(|(_, n)| n);
    let detriment_rulers = names_only(planet_names(RelationKind::DetrimentIn)?);
    let fall_rulers = names_only(planet_names(RelationKind::FallIn)?);

    let mut triplicity = TriplicityRulers::default();
    for (relation, name) in planet_names(RelationKind::TriplicityRuler)? {
        match relation {
            Relation::TriplicityRuler(SectRole::Day) => triplicity.day = Some(name),
            Relation::TriplicityRuler(SectRole::Night) => triplicity.night = Some(name),
            Relation::TriplicityRuler(SectRole::Participating) => {
                triplicity.participating = Some(name)
            }
            _ => {}
        }
    }

    ctx.check()?;
    let element = outgoing_ids(RelationKind::OfElement)?.first().map(NodeKey::id);
    let modality = outgoing_ids(RelationKind::OfModality)?.first().map(NodeKey::id);
    let opposite_sign = outgoing_ids(RelationKind::Opposes)?.first().map(NodeKey::id);

    let mut natural_house = None;
    if let Some(house_key) = outgoing_ids(RelationKind::NaturalHouse)?.first() {
        if let (NodeKey::House(number), Some(house)) = (house_key, store.node(house_key)?) {
            if let NodeProps::House(h) = house.props {
                natural_house = Some(NaturalHouse {
                    number: *number,
                    classical_name: h.classical_name,
                    topics: h.topics,
                });
            }
        }
    }

    tracing::debug!(sign = %key.id(), "rulership web");
    Ok(Some(RulershipWeb {
        sign: key.id(),
        name: props.name.clone(),
        symbol: props.symbol.clone(),
        polarity: props.polarity.clone(),
        ordinal: props.ordinal,
        ruler,
        exaltation_ruler,
        detriment_rulers,
        fall_rulers,
        triplicity,
        element,
        modality,
        natural_house,
        opposite_sign,
    }))
}

fn names_only(pairs: Vec<(Relation, String)>) -> Vec<String> {
    pairs.into_iter().map(|(_, n)| n).collect()
}

/// Display name of a node, falling back to its id.
pub(crate) fn display_name<G: GraphStore + ?Sized>(store: &G, key: &NodeKey) -> QueryResult<String> {
    Ok(store
        .node(key)?
        .and_then(|n| n.name().map(str::to_owned))
        .unwrap_or_else(|| key.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_structural_graph;
    use crate::graph::KnowledgeGraph;

    fn web(sign: &str) -> Option<RulershipWeb> {
        let kg = KnowledgeGraph::new();
        build_structural_graph(&kg).unwrap();
        rulership_web(&kg, sign, &Context::background()).unwrap()
    }

    #[test]
    fn aries_profile() {
        let web = web("aries").unwrap();
        assert_eq!(web.ruler.as_deref(), Some("Mars"));
        assert_eq!(web.exaltation_ruler.as_deref(), Some("Sun"));
        assert_eq!(web.detriment_rulers, vec!["Venus"]);
        assert_eq!(web.fall_rulers, vec!["Saturn"]);
        assert_eq!(web.element.as_deref(), Some("fire"));
        assert_eq!(web.modality.as_deref(), Some("cardinal"));
        assert_eq!(web.opposite_sign.as_deref(), Some("libra"));
        assert_eq!(web.natural_house.as_ref().map(|h| h.number), Some(1));
        assert_eq!(web.triplicity.day.as_deref(), Some("Sun"));
        assert_eq!(web.triplicity.night.as_deref(), Some("Jupiter"));
        assert_eq!(web.triplicity.participating.as_deref(), Some("Saturn"));
    }

    #[test]
    fn sign_without_exaltation() {
        let web = web("Gemini").unwrap();
        assert_eq!(web.ruler.as_deref(), Some("Mercury"));
        assert!(web.exaltation_ruler.is_none());
        assert!(web.fall_rulers.is_empty());
    }

    #[test]
    fn unknown_sign_is_none() {
        assert!(web("ophiuchus").is_none());
    }
}
