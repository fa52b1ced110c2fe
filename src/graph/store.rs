//! The graph client interface.
//!
//! Everything above the graph (builder, migrator, retrieval) talks to a
//! [`GraphStore`]. All writes are merges keyed by natural key, so any sequence
//! of writes can be replayed without creating duplicates.

use crate::error::StoreError;

use super::{Node, NodeKey, NodeLabel, NodeProps, Relation, RelationKind};

/// Result type for graph store operations.
pub type GraphResult<T> = std::result::Result<T, StoreError>;

/// Outcome of merging a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMerge {
    Created,
    /// The node existed; its properties were overwritten.
    Updated,
    /// The node existed with identical properties.
    Unchanged,
}

/// Outcome of merging an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMerge {
    Created,
    Existing,
    /// One of the endpoints does not exist; nothing was written.
    MissingEndpoint,
}

impl EdgeMerge {
    /// Whether the edge is present in the graph after the merge.
    pub fn is_present(self) -> bool {
        matches!(self, EdgeMerge::Created | EdgeMerge::Existing)
    }
}

/// Edge direction relative to the node being inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// A property graph that supports idempotent merges.
///
/// Implementations use interior mutability so a single store can be shared
/// between the migrator and concurrent readers.
pub trait GraphStore: Send + Sync {
    /// Declare that nodes of `label` are unique by natural key.
    /// Declaring the same constraint twice is a no-op.
    fn ensure_unique(&self, label: NodeLabel) -> GraphResult<()>;

    /// Create the node, or overwrite the properties of the existing one.
    fn merge_node(&self, key: NodeKey, props: NodeProps) -> GraphResult<NodeMerge>;

    /// Create the edge unless an identical `(from, relation, to)` already exists.
    fn merge_edge(&self, from: &NodeKey, relation: Relation, to: &NodeKey)
    -> GraphResult<EdgeMerge>;

    /// Delete every outgoing edge of `from` whose kind is in `kinds`.
    /// Returns the number of edges removed.
    fn remove_edges_from(&self, from: &NodeKey, kinds: &[RelationKind]) -> GraphResult<usize>;

    fn node(&self, key: &NodeKey) -> GraphResult<Option<Node>>;

    /// All nodes with `label`, ordered by key.
    fn nodes_with_label(&self, label: NodeLabel) -> GraphResult<Vec<Node>>;

    /// Nodes linked to `key` by an edge of `kind`, ordered by (relation, key).
    fn neighbors(
        &self,
        key: &NodeKey,
        kind: RelationKind,
        direction: Direction,
    ) -> GraphResult<Vec<(Relation, NodeKey)>>;

    fn has_edge(&self, from: &NodeKey, relation: Relation, to: &NodeKey) -> GraphResult<bool>;

    fn node_count(&self) -> GraphResult<usize>;

    fn edge_count(&self) -> GraphResult<usize>;

    fn count_label(&self, label: NodeLabel) -> GraphResult<usize>;

    fn count_relation(&self, kind: RelationKind) -> GraphResult<usize>;
}

impl<G: GraphStore + ?Sized> GraphStore for std::sync::Arc<G> {
    fn ensure_unique(&self, label: NodeLabel) -> GraphResult<()> {
        (**self).ensure_unique(label)
    }

    fn merge_node(&self, key: NodeKey, props: NodeProps) -> GraphResult<NodeMerge> {
        (**self).merge_node(key, props)
    }

    fn merge_edge(
        &self,
        from: &NodeKey,
        relation: Relation,
        to: &NodeKey,
    ) -> GraphResult<EdgeMerge> {
        (**self).merge_edge(from, relation, to)
    }

    fn remove_edges_from(&self, from: &NodeKey, kinds: &[RelationKind]) -> GraphResult<usize> {
        (**self).remove_edges_from(from, kinds)
    }

    fn node(&self, key: &NodeKey) -> GraphResult<Option<Node>> {
        (**self).node(key)
    }

    fn nodes_with_label(&self, label: NodeLabel) -> GraphResult<Vec<Node>> {
        (**self).nodes_with_label(label)
    }

    fn neighbors(
        &self,
        key: &NodeKey,
        kind: RelationKind,
        direction: Direction,
    ) -> GraphResult<Vec<(Relation, NodeKey)>> {
        (**self).neighbors(key, kind, direction)
    }

    fn has_edge(&self, from: &NodeKey, relation: Relation, to: &NodeKey) -> GraphResult<bool> {
        (**self).has_edge(from, relation, to)
    }

    fn node_count(&self) -> GraphResult<usize> {
        (**self).node_count()
    }

    fn edge_count(&self) -> GraphResult<usize> {
        (**self).edge_count()
    }

    fn count_label(&self, label: NodeLabel) -> GraphResult<usize> {
        (**self).count_label(label)
    }

    fn count_relation(&self, kind: RelationKind) -> GraphResult<usize> {
        (**self).count_relation(kind)
    }
}
