//! Knowledge graph: typed nodes keyed by natural key, typed relations between them.
//!
//! - [`GraphStore`]: the client interface the builder, migrator and retrieval
//!   layer are written against
//! - [`KnowledgeGraph`]: the in-memory implementation (petgraph + DashMap index)
//!
//! Nodes are merged by their [`NodeKey`]; edges are merged by
//! `(from, relation, to)` including the relation's qualifier, so re-running any
//! construction step never duplicates anything.

pub mod index;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::ontology::{SectRole, TeamRole, TrustTier};

pub use index::KnowledgeGraph;
pub use store::{Direction, EdgeMerge, GraphResult, GraphStore, NodeMerge};

/// Node type namespace. Natural keys are unique within a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    Planet,
    Sign,
    House,
    Aspect,
    Technique,
    Layer,
    Element,
    Modality,
    SectTeam,
    Author,
    Passage,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 11] = [
        NodeLabel::Planet,
        NodeLabel::Sign,
        NodeLabel::House,
        NodeLabel::Aspect,
        NodeLabel::Technique,
        NodeLabel::Layer,
        NodeLabel::Element,
        NodeLabel::Modality,
        NodeLabel::SectTeam,
        NodeLabel::Author,
        NodeLabel::Passage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeLabel::Planet => "Planet",
            NodeLabel::Sign => "Sign",
            NodeLabel::House => "House",
            NodeLabel::Aspect => "Aspect",
            NodeLabel::Technique => "Technique",
            NodeLabel::Layer => "Layer",
            NodeLabel::Element => "Element",
            NodeLabel::Modality => "Modality",
            NodeLabel::SectTeam => "SectTeam",
            NodeLabel::Author => "Author",
            NodeLabel::Passage => "Passage",
        }
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural key of a node: label plus the id that is unique within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKey {
    Planet(String),
    Sign(String),
    House(u8),
    Aspect(String),
    Technique(String),
    Layer(String),
    Element(String),
    Modality(String),
    SectTeam(String),
    Author(String),
    Passage(String),
}

impl NodeKey {
    pub fn planet(id: impl Into<String>) -> Self {
        NodeKey::Planet(id.into())
    }

    pub fn sign(id: impl Into<String>) -> Self {
        NodeKey::Sign(id.into())
    }

    pub fn house(number: u8) -> Self {
        NodeKey::House(number)
    }

    pub fn aspect(id: impl Into<String>) -> Self {
        NodeKey::Aspect(id.into())
    }

    pub fn technique(id: impl Into<String>) -> Self {
        NodeKey::Technique(id.into())
    }

    pub fn layer(id: impl Into<String>) -> Self {
        NodeKey::Layer(id.into())
    }

    pub fn author(name: impl Into<String>) -> Self {
        NodeKey::Author(name.into())
    }

    pub fn passage(chunk_id: impl Into<String>) -> Self {
        NodeKey::Passage(chunk_id.into())
    }

    pub fn label(&self) -> NodeLabel {
        match self {
            NodeKey::Planet(_) => NodeLabel::Planet,
            NodeKey::Sign(_) => NodeLabel::Sign,
            NodeKey::House(_) => NodeLabel::House,
            NodeKey::Aspect(_) => NodeLabel::Aspect,
            NodeKey::Technique(_) => NodeLabel::Technique,
            NodeKey::Layer(_) => NodeLabel::Layer,
            NodeKey::Element(_) => NodeLabel::Element,
            NodeKey::Modality(_) => NodeLabel::Modality,
            NodeKey::SectTeam(_) => NodeLabel::SectTeam,
            NodeKey::Author(_) => NodeLabel::Author,
            NodeKey::Passage(_) => NodeLabel::Passage,
        }
    }

    /// The id part of the key, houses rendered as their number.
    pub fn id(&self) -> String {
        match self {
            NodeKey::House(n) => n.to_string(),
            NodeKey::Planet(s)
            | NodeKey::Sign(s)
            | NodeKey::Aspect(s)
            | NodeKey::Technique(s)
            | NodeKey::Layer(s)
            | NodeKey::Element(s)
            | NodeKey::Modality(s)
            | NodeKey::SectTeam(s)
            | NodeKey::Author(s)
            | NodeKey::Passage(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.label(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetProps {
    pub name: String,
    pub category: String,
    pub sect: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignProps {
    pub name: String,
    pub element: String,
    pub modality: String,
    pub polarity: String,
    pub ordinal: u8,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseProps {
    pub classical_name: String,
    pub modern_name: String,
    pub angularity: String,
    pub topics: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectProps {
    pub name: String,
    pub degrees: u16,
    pub quality: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueProps {
    pub name: String,
    pub tradition: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerProps {
    pub name: String,
    pub color: String,
    pub description: String,
}

/// Scalar fields of a passage. Re-migration overwrites these in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageProps {
    pub text: String,
    pub source_title: String,
    pub trust_tier: TrustTier,
    pub tradition: String,
}

/// Properties carried by a node; the variant must agree with the key's label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeProps {
    Planet(PlanetProps),
    Sign(SignProps),
    House(HouseProps),
    Aspect(AspectProps),
    Technique(TechniqueProps),
    Layer(LayerProps),
    /// Element, modality and sect-team lookups only carry a display name.
    Lookup { name: String },
    Author,
    Passage(PassageProps),
}

impl NodeProps {
    /// Whether these properties may be stored under a key with `label`.
    pub fn fits(&self, label: NodeLabel) -> bool {
        matches!(
            (self, label),
            (NodeProps::Planet(_), NodeLabel::Planet)
                | (NodeProps::Sign(_), NodeLabel::Sign)
                | (NodeProps::House(_), NodeLabel::House)
                | (NodeProps::Aspect(_), NodeLabel::Aspect)
                | (NodeProps::Technique(_), NodeLabel::Technique)
                | (NodeProps::Layer(_), NodeLabel::Layer)
                | (
                    NodeProps::Lookup { .. },
                    NodeLabel::Element | NodeLabel::Modality | NodeLabel::SectTeam
                )
                | (NodeProps::Author, NodeLabel::Author)
                | (NodeProps::Passage(_), NodeLabel::Passage)
        )
    }
}

/// A node as stored: natural key plus properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: NodeKey,
    pub props: NodeProps,
}

impl Node {
    /// Display name for nodes that have one.
    pub fn name(&self) -> Option<&str> {
        match &self.props {
            NodeProps::Planet(p) => Some(&p.name),
            NodeProps::Sign(s) => Some(&s.name),
            NodeProps::House(h) => Some(&h.classical_name),
            NodeProps::Aspect(a) => Some(&a.name),
            NodeProps::Technique(t) => Some(&t.name),
            NodeProps::Layer(l) => Some(&l.name),
            NodeProps::Lookup { name } => Some(name),
            NodeProps::Author | NodeProps::Passage(_) => None,
        }
    }

    pub fn as_passage(&self) -> Option<&PassageProps> {
        match &self.props {
            NodeProps::Passage(p) => Some(p),
            _ => None,
        }
    }
}

/// Relation type without its qualifier. Used for traversal and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationKind {
    Rules,
    ExaltedIn,
    DetrimentIn,
    FallIn,
    TriplicityRuler,
    JoyIn,
    NaturalHouse,
    OfElement,
    OfModality,
    Opposes,
    SectTeam,
    Describes,
    AuthoredBy,
    InLayer,
}

impl RelationKind {
    pub const ALL: [RelationKind; 14] = [
        RelationKind::Rules,
        RelationKind::ExaltedIn,
        RelationKind::DetrimentIn,
        RelationKind::FallIn,
        RelationKind::TriplicityRuler,
        RelationKind::JoyIn,
        RelationKind::NaturalHouse,
        RelationKind::OfElement,
        RelationKind::OfModality,
        RelationKind::Opposes,
        RelationKind::SectTeam,
        RelationKind::Describes,
        RelationKind::AuthoredBy,
        RelationKind::InLayer,
    ];

    /// Relations a passage owns. Re-migration replaces exactly these.
    pub const PASSAGE_ATTACHMENTS: [RelationKind; 3] = [
        RelationKind::Describes,
        RelationKind::AuthoredBy,
        RelationKind::InLayer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Rules => "RULES",
            RelationKind::ExaltedIn => "EXALTED_IN",
            RelationKind::DetrimentIn => "DETRIMENT_IN",
            RelationKind::FallIn => "FALL_IN",
            RelationKind::TriplicityRuler => "TRIPLICITY_RULER",
            RelationKind::JoyIn => "JOY_IN",
            RelationKind::NaturalHouse => "NATURAL_HOUSE",
            RelationKind::OfElement => "OF_ELEMENT",
            RelationKind::OfModality => "OF_MODALITY",
            RelationKind::Opposes => "OPPOSES",
            RelationKind::SectTeam => "SECT_TEAM",
            RelationKind::Describes => "DESCRIBES",
            RelationKind::AuthoredBy => "AUTHORED_BY",
            RelationKind::InLayer => "IN_LAYER",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed edge, carrying its qualifier where the relation has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    /// Domicile rulership (`RULES {type: domicile}`).
    Rules,
    ExaltedIn,
    DetrimentIn,
    FallIn,
    TriplicityRuler(SectRole),
    JoyIn,
    NaturalHouse,
    OfElement,
    OfModality,
    Opposes,
    SectTeam(TeamRole),
    Describes,
    AuthoredBy,
    InLayer,
}

impl Relation {
    pub fn kind(self) -> RelationKind {
        match self {
            Relation::Rules => RelationKind::Rules,
            Relation::ExaltedIn => RelationKind::ExaltedIn,
            Relation::DetrimentIn => RelationKind::DetrimentIn,
            Relation::FallIn => RelationKind::FallIn,
            Relation::TriplicityRuler(_) => RelationKind::TriplicityRuler,
            Relation::JoyIn => RelationKind::JoyIn,
            Relation::NaturalHouse => RelationKind::NaturalHouse,
            Relation::OfElement => RelationKind::OfElement,
            Relation::OfModality => RelationKind::OfModality,
            Relation::Opposes => RelationKind::Opposes,
            Relation::SectTeam(_) => RelationKind::SectTeam,
            Relation::Describes => RelationKind::Describes,
            Relation::AuthoredBy => RelationKind::AuthoredBy,
            Relation::InLayer => RelationKind::InLayer,
        }
    }

    /// The qualifier attribute, if the relation carries one.
    pub fn qualifier(self) -> Option<&'static str> {
        match self {
            Relation::Rules => Some("domicile"),
            Relation::TriplicityRuler(role) => Some(role.as_str()),
            Relation::SectTeam(role) => Some(role.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.qualifier() {
            Some(q) => write!(f, "{}{{{q}}}", self.kind()),
            None => write!(f, "{}", self.kind()),
        }
    }
}

/// A stored edge in snapshot form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: NodeKey,
    pub relation: Relation,
    pub to: NodeKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_with_label() {
        assert_eq!(NodeKey::planet("mars").to_string(), "Planet:mars");
        assert_eq!(NodeKey::house(10).to_string(), "House:10");
    }

    #[test]
    fn props_must_fit_label() {
        let lookup = NodeProps::Lookup {
            name: "Fire".into(),
        };
        assert!(lookup.fits(NodeLabel::Element));
        assert!(lookup.fits(NodeLabel::SectTeam));
        assert!(!lookup.fits(NodeLabel::Planet));
        assert!(NodeProps::Author.fits(NodeLabel::Author));
        assert!(!NodeProps::Author.fits(NodeLabel::Passage));
    }

    #[test]
    fn qualifiers_distinguish_relations_of_the_same_kind() {
        let day = Relation::TriplicityRuler(SectRole::Day);
        let night = Relation::TriplicityRuler(SectRole::Night);
        assert_ne!(day, night);
        assert_eq!(day.kind(), night.kind());
        assert_eq!(day.to_string(), "TRIPLICITY_RULER{day}");
        assert_eq!(Relation::Rules.to_string(), "RULES{domicile}");
        assert_eq!(Relation::Describes.to_string(), "DESCRIBES");
    }
}
