//! In-memory knowledge graph with a natural-key index.
//!
//! Uses `petgraph` for the graph structure and `DashMap` for O(1) lookups
//! by [`NodeKey`] and per-relation edge counts.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

use super::store::{Direction, EdgeMerge, GraphResult, GraphStore, NodeMerge};
use super::{EdgeRecord, Node, NodeKey, NodeLabel, NodeProps, Relation, RelationKind};

/// Serializable image of a whole graph, used by the durable store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub constraints: Vec<NodeLabel>,
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeRecord>,
}

/// In-memory knowledge graph backed by petgraph.
///
/// Nodes are unique by [`NodeKey`]; edges are unique by `(from, relation, to)`.
/// Edge merges check and insert under one write lock, so concurrent merges of
/// the same edge still produce a single edge.
pub struct KnowledgeGraph {
    /// The directed graph: nodes carry key and props, edges carry the relation.
    graph: RwLock<StableDiGraph<Node, Relation>>,
    /// NodeKey → NodeIndex mapping for O(1) node lookups.
    node_index: DashMap<NodeKey, NodeIndex>,
    /// Edge count per relation kind.
    relation_counts: DashMap<RelationKind, usize>,
    constraints: RwLock<BTreeSet<NodeLabel>>,
}

impl KnowledgeGraph {
    /// Create a new empty knowledge graph.
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(StableDiGraph::new()),
            node_index: DashMap::new(),
            relation_counts: DashMap::new(),
            constraints: RwLock::new(BTreeSet::new()),
        }
    }

    fn read(&self) -> GraphResult<RwLockReadGuard<'_, StableDiGraph<Node, Relation>>> {
        self.graph.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> GraphResult<RwLockWriteGuard<'_, StableDiGraph<Node, Relation>>> {
        self.graph.write().map_err(|_| StoreError::Poisoned)
    }

    fn index_of(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.node_index.get(key).map(|idx| *idx.value())
    }

    /// Labels that have a uniqueness constraint declared.
    pub fn constraints(&self) -> GraphResult<Vec<NodeLabel>> {
        let constraints = self.constraints.read().map_err(|_| StoreError::Poisoned)?;
        Ok(constraints.iter().copied().collect())
    }

    /// Every edge in the graph, ordered by (from, relation, to).
    pub fn edges(&self) -> GraphResult<Vec<EdgeRecord>> {
        let graph = self.read()?;
        let mut edges: Vec<EdgeRecord> = graph
            .edge_indices()
            .filter_map(|ei| {
                let (src, dst) = graph.edge_endpoints(ei)?;
                Some(EdgeRecord {
                    from: graph.node_weight(src)?.key.clone(),
                    relation: *graph.edge_weight(ei)?,
                    to: graph.node_weight(dst)?.key.clone(),
                })
            })
            .collect();
        edges.sort_by(|a, b| {
            (&a.from, a.relation, &a.to).cmp(&(&b.from, b.relation, &b.to))
        });
        Ok(edges)
    }

    /// Capture the whole graph.
    pub fn snapshot(&self) -> GraphResult<GraphSnapshot> {
        let constraints = self.constraints()?;
        let mut nodes: Vec<Node> = {
            let graph = self.read()?;
            graph
                .node_indices()
                .filter_map(|idx| graph.node_weight(idx).cloned())
                .collect()
        };
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(GraphSnapshot {
            constraints,
            nodes,
            edges: self.edges()?,
        })
    }

    /// Rebuild a graph from a snapshot. Replaying goes through the merge path,
    /// so a snapshot with duplicate records still restores a well-formed graph.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> GraphResult<Self> {
        let kg = Self::new();
        for label in snapshot.constraints {
            kg.ensure_unique(label)?;
        }
        for node in snapshot.nodes {
            kg.merge_node(node.key, node.props)?;
        }
        for edge in &snapshot.edges {
            if kg.merge_edge(&edge.from, edge.relation, &edge.to)? == EdgeMerge::MissingEndpoint {
                return Err(StoreError::Serialization {
                    message: format!(
                        "snapshot edge {} -[{}]-> {} references a missing node",
                        edge.from, edge.relation, edge.to
                    ),
                });
            }
        }
        Ok(kg)
    }
}

impl GraphStore for KnowledgeGraph {
    fn ensure_unique(&self, label: NodeLabel) -> GraphResult<()> {
        let mut constraints = self.constraints.write().map_err(|_| StoreError::Poisoned)?;
        constraints.insert(label);
        Ok(())
    }

    fn merge_node(&self, key: NodeKey, props: NodeProps) -> GraphResult<NodeMerge> {
        if !props.fits(key.label()) {
            return Err(StoreError::Rejected {
                message: format!("properties do not match label of {key}"),
            });
        }
        let mut graph = self.write()?;
        // Check under the write lock so two writers cannot both create the node.
        if let Some(idx) = self.index_of(&key) {
            let Some(node) = graph.node_weight_mut(idx) else {
                return Err(StoreError::Unavailable {
                    message: format!("index points at a missing node for {key}"),
                });
            };
            if node.props == props {
                return Ok(NodeMerge::Unchanged);
            }
            node.props = props;
            return Ok(NodeMerge::Updated);
        }
        let idx = graph.add_node(Node {
            key: key.clone(),
            props,
        });
        self.node_index.insert(key, idx);
        Ok(NodeMerge::Created)
    }

    fn merge_edge(
        &self,
        from: &NodeKey,
        relation: Relation,
        to: &NodeKey,
    ) -> GraphResult<EdgeMerge> {
        let mut graph = self.write()?;
        let (Some(a), Some(b)) = (self.index_of(from), self.index_of(to)) else {
            return Ok(EdgeMerge::MissingEndpoint);
        };
        let exists = graph
            .edges_directed(a, petgraph::Direction::Outgoing)
            .any(|e| e.target() == b && *e.weight() == relation);
        if exists {
            return Ok(EdgeMerge::Existing);
        }
        graph.add_edge(a, b, relation);
        *self.relation_counts.entry(relation.kind()).or_insert(0) += 1;
        Ok(EdgeMerge::Created)
    }

    fn remove_edges_from(&self, from: &NodeKey, kinds: &[RelationKind]) -> GraphResult<usize> {
        let mut graph = self.write()?;
        let Some(a) = self.index_of(from) else {
            return Ok(0);
        };
        let doomed: Vec<_> = graph
            .edges_directed(a, petgraph::Direction::Outgoing)
            .filter(|e| kinds.contains(&e.weight().kind()))
            .map(|e| e.id())
            .collect();
        for ei in &doomed {
            if let Some(relation) = graph.remove_edge(*ei) {
                if let Some(mut count) = self.relation_counts.get_mut(&relation.kind()) {
                    *count = count.saturating_sub(1);
                }
            }
        }
        Ok(doomed.len())
    }

    fn node(&self, key: &NodeKey) -> GraphResult<Option<Node>> {
        let Some(idx) = self.index_of(key) else {
            return Ok(None);
        };
        let graph = self.read()?;
        Ok(graph.node_weight(idx).cloned())
    }

    fn nodes_with_label(&self, label: NodeLabel) -> GraphResult<Vec<Node>> {
        let mut indices: Vec<(NodeKey, NodeIndex)> = self
            .node_index
            .iter()
            .filter(|e| e.key().label() == label)
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        indices.sort_by(|a, b| a.0.cmp(&b.0));
        let graph = self.read()?;
        Ok(indices
            .into_iter()
            .filter_map(|(_, idx)| graph.node_weight(idx).cloned())
            .collect())
    }

    fn neighbors(
        &self,
        key: &NodeKey,
        kind: RelationKind,
        direction: Direction,
    ) -> GraphResult<Vec<(Relation, NodeKey)>> {
        let Some(idx) = self.index_of(key) else {
            return Ok(Vec::new());
        };
        let graph = self.read()?;
        let dir = match direction {
            Direction::Outgoing => petgraph::Direction::Outgoing,
            Direction::Incoming => petgraph::Direction::Incoming,
        };
        let mut out: Vec<(Relation, NodeKey)> = graph
            .edges_directed(idx, dir)
            .filter(|e| e.weight().kind() == kind)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                Some((*e.weight(), graph.node_weight(other)?.key.clone()))
            })
            .collect();
        out.sort();
        Ok(out)
    }

    fn has_edge(&self, from: &NodeKey, relation: Relation, to: &NodeKey) -> GraphResult<bool> {
        let (Some(a), Some(b)) = (self.index_of(from), self.index_of(to)) else {
            return Ok(false);
        };
        let graph = self.read()?;
        Ok(graph
            .edges_directed(a, petgraph::Direction::Outgoing)
            .any(|e| e.target() == b && *e.weight() == relation))
    }

    fn node_count(&self) -> GraphResult<usize> {
        Ok(self.node_index.len())
    }

    fn edge_count(&self) -> GraphResult<usize> {
        Ok(self.read()?.edge_count())
    }

    fn count_label(&self, label: NodeLabel) -> GraphResult<usize> {
        Ok(self
            .node_index
            .iter()
            .filter(|e| e.key().label() == label)
            .count())
    }

    fn count_relation(&self, kind: RelationKind) -> GraphResult<usize> {
        Ok(self.relation_counts.get(&kind).map(|c| *c).unwrap_or(0))
    }
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KnowledgeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeGraph")
            .field("nodes", &self.node_index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PassageProps;
    use crate::ontology::{SectRole, TrustTier};

    fn planet(kg: &KnowledgeGraph, id: &str) {
        kg.merge_node(
            NodeKey::planet(id),
            NodeProps::Planet(crate::graph::PlanetProps {
                name: id.to_uppercase(),
                category: "traditional".into(),
                sect: "diurnal".into(),
                symbol: "?".into(),
            }),
        )
        .unwrap();
    }

    fn sign(kg: &KnowledgeGraph, id: &str) {
        kg.merge_node(
            NodeKey::sign(id),
            NodeProps::Sign(crate::graph::SignProps {
                name: id.to_uppercase(),
                element: "fire".into(),
                modality: "cardinal".into(),
                polarity: "masculine".into(),
                ordinal: 1,
                symbol: "?".into(),
            }),
        )
        .unwrap();
    }

    #[test]
    fn merge_node_is_idempotent() {
        let kg = KnowledgeGraph::new();
        planet(&kg, "mars");
        planet(&kg, "mars");
        assert_eq!(kg.node_count().unwrap(), 1);
        assert_eq!(kg.count_label(NodeLabel::Planet).unwrap(), 1);
    }

    #[test]
    fn merge_node_overwrites_props() {
        let kg = KnowledgeGraph::new();
        let props = |text: &str| {
            NodeProps::Passage(PassageProps {
                text: text.into(),
                source_title: "t".into(),
                trust_tier: TrustTier::PRIMARY,
                tradition: "hellenistic".into(),
            })
        };
        assert_eq!(
            kg.merge_node(NodeKey::passage("c1"), props("old")).unwrap(),
            NodeMerge::Created
        );
        assert_eq!(
            kg.merge_node(NodeKey::passage("c1"), props("new")).unwrap(),
            NodeMerge::Updated
        );
        assert_eq!(
            kg.merge_node(NodeKey::passage("c1"), props("new")).unwrap(),
            NodeMerge::Unchanged
        );
        let node = kg.node(&NodeKey::passage("c1")).unwrap().unwrap();
        assert_eq!(node.as_passage().unwrap().text, "new");
    }

    #[test]
    fn mismatched_props_are_rejected() {
        let kg = KnowledgeGraph::new();
        let err = kg
            .merge_node(NodeKey::planet("mars"), NodeProps::Author)
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
    }

    #[test]
    fn merge_edge_is_idempotent() {
        let kg = KnowledgeGraph::new();
        planet(&kg, "mars");
        sign(&kg, "aries");
        let mars = NodeKey::planet("mars");
        let aries = NodeKey::sign("aries");
        assert_eq!(
            kg.merge_edge(&mars, Relation::Rules, &aries).unwrap(),
            EdgeMerge::Created
        );
        assert_eq!(
            kg.merge_edge(&mars, Relation::Rules, &aries).unwrap(),
            EdgeMerge::Existing
        );
        assert_eq!(kg.edge_count().unwrap(), 1);
        assert_eq!(kg.count_relation(RelationKind::Rules).unwrap(), 1);
    }

    #[test]
    fn qualifiers_make_distinct_edges() {
        let kg = KnowledgeGraph::new();
        planet(&kg, "sun");
        sign(&kg, "aries");
        let sun = NodeKey::planet("sun");
        let aries = NodeKey::sign("aries");
        kg.merge_edge(&sun, Relation::TriplicityRuler(SectRole::Day), &aries)
            .unwrap();
        kg.merge_edge(&sun, Relation::TriplicityRuler(SectRole::Night), &aries)
            .unwrap();
        assert_eq!(kg.count_relation(RelationKind::TriplicityRuler).unwrap(), 2);
    }

    #[test]
    fn edge_to_missing_node_is_not_written() {
        let kg = KnowledgeGraph::new();
        planet(&kg, "mars");
        let merge = kg
            .merge_edge(&NodeKey::planet("mars"), Relation::Rules, &NodeKey::sign("nowhere"))
            .unwrap();
        assert_eq!(merge, EdgeMerge::MissingEndpoint);
        assert_eq!(kg.edge_count().unwrap(), 0);
    }

    #[test]
    fn neighbors_are_sorted_and_directional() {
        let kg = KnowledgeGraph::new();
        planet(&kg, "mars");
        sign(&kg, "scorpio");
        sign(&kg, "aries");
        let mars = NodeKey::planet("mars");
        kg.merge_edge(&mars, Relation::Rules, &NodeKey::sign("scorpio"))
            .unwrap();
        kg.merge_edge(&mars, Relation::Rules, &NodeKey::sign("aries"))
            .unwrap();

        let out = kg
            .neighbors(&mars, RelationKind::Rules, Direction::Outgoing)
            .unwrap();
        let keys: Vec<_> = out.into_iter().map(|(_, k)| k).collect();
        assert_eq!(keys, vec![NodeKey::sign("aries"), NodeKey::sign("scorpio")]);

        let incoming = kg
            .neighbors(&NodeKey::sign("aries"), RelationKind::Rules, Direction::Incoming)
            .unwrap();
        assert_eq!(incoming, vec![(Relation::Rules, mars.clone())]);
        assert!(kg
            .neighbors(&mars, RelationKind::Rules, Direction::Incoming)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn remove_edges_from_only_touches_requested_kinds() {
        let kg = KnowledgeGraph::new();
        planet(&kg, "mars");
        sign(&kg, "aries");
        sign(&kg, "libra");
        let mars = NodeKey::planet("mars");
        kg.merge_edge(&mars, Relation::Rules, &NodeKey::sign("aries"))
            .unwrap();
        kg.merge_edge(&mars, Relation::DetrimentIn, &NodeKey::sign("libra"))
            .unwrap();

        let removed = kg
            .remove_edges_from(&mars, &[RelationKind::DetrimentIn])
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(kg.edge_count().unwrap(), 1);
        assert_eq!(kg.count_relation(RelationKind::DetrimentIn).unwrap(), 0);
        assert!(kg
            .has_edge(&mars, Relation::Rules, &NodeKey::sign("aries"))
            .unwrap());
    }

    #[test]
    fn snapshot_restores_graph() {
        let kg = KnowledgeGraph::new();
        kg.ensure_unique(NodeLabel::Planet).unwrap();
        planet(&kg, "mars");
        sign(&kg, "aries");
        kg.merge_edge(&NodeKey::planet("mars"), Relation::Rules, &NodeKey::sign("aries"))
            .unwrap();

        let snapshot = kg.snapshot().unwrap();
        let restored = KnowledgeGraph::from_snapshot(snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot().unwrap(), snapshot);
        assert_eq!(restored.constraints().unwrap(), vec![NodeLabel::Planet]);
    }

    #[test]
    fn concurrent_merges_create_one_edge() {
        let kg = std::sync::Arc::new(KnowledgeGraph::new());
        planet(&kg, "mars");
        sign(&kg, "aries");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let kg = kg.clone();
                std::thread::spawn(move || {
                    kg.merge_edge(&NodeKey::planet("mars"), Relation::Rules, &NodeKey::sign("aries"))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(kg.edge_count().unwrap(), 1);
    }
}
