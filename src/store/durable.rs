//! ACID-durable graph snapshots backed by redb.
//!
//! The whole graph is written in one transaction: node and edge tables are
//! dropped and refilled, so a crash mid-save leaves the previous snapshot.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, TableError};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::graph::index::GraphSnapshot;
use crate::graph::{EdgeRecord, Node, NodeLabel};
use crate::store::StoreResult;

/// Node records keyed by their serialized natural key.
const NODES_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("nodes");

/// Edge records keyed by insertion position.
const EDGES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("edges");

/// Snapshot metadata (string keys → binary values).
const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

const CONSTRAINTS_KEY: &str = "constraints";
const FORMAT_KEY: &str = "format_version";
const FORMAT_VERSION: u32 = 1;

/// File name of the snapshot database inside the data directory.
pub const DB_FILE: &str = "selene.redb";

fn redb<E: Display>(context: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{context} failed: {e}"),
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })
}

/// ACID-durable snapshot store using redb.
pub struct DurableStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl DurableStore {
    /// Open or create the snapshot database in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let path = data_dir.join(DB_FILE);
        let db = Database::create(&path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", path.display()),
        })?;
        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored snapshot with `snapshot`.
    pub fn save(&self, snapshot: &GraphSnapshot) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(redb("begin_write"))?;
        txn.delete_table(NODES_TABLE).map_err(redb("delete nodes"))?;
        txn.delete_table(EDGES_TABLE).map_err(redb("delete edges"))?;
        {
            let mut nodes = txn.open_table(NODES_TABLE).map_err(redb("open nodes"))?;
            for node in &snapshot.nodes {
                let key = encode(&node.key)?;
                let value = encode(node)?;
                nodes
                    .insert(key.as_slice(), value.as_slice())
                    .map_err(redb("insert node"))?;
            }

            let mut edges = txn.open_table(EDGES_TABLE).map_err(redb("open edges"))?;
            for (position, edge) in snapshot.edges.iter().enumerate() {
                let value = encode(edge)?;
                edges
                    .insert(position as u64, value.as_slice())
                    .map_err(redb("insert edge"))?;
            }

            let mut meta = txn.open_table(META_TABLE).map_err(redb("open meta"))?;
            let constraints = encode(&snapshot.constraints)?;
            meta.insert(CONSTRAINTS_KEY, constraints.as_slice())
                .map_err(redb("insert meta"))?;
            let version = encode(&FORMAT_VERSION)?;
            meta.insert(FORMAT_KEY, version.as_slice())
                .map_err(redb("insert meta"))?;
        }
        txn.commit().map_err(redb("commit"))?;
        tracing::debug!(
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            path = %self.path.display(),
            "graph snapshot saved"
        );
        Ok(())
    }

    /// Load the stored snapshot. Returns `Ok(None)` if nothing was saved yet.
    pub fn load(&self) -> StoreResult<Option<GraphSnapshot>> {
        let txn = self.db.begin_read().map_err(redb("begin_read"))?;

        let meta = match txn.open_table(META_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(redb("open meta")(e)),
        };
        if let Some(version) = meta.get(FORMAT_KEY).map_err(redb("get meta"))? {
            let version: u32 = decode(version.value())?;
            if version != FORMAT_VERSION {
                return Err(StoreError::Serialization {
                    message: format!(
                        "snapshot format {version} is not supported (expected {FORMAT_VERSION})"
                    ),
                });
            }
        }
        let constraints: Vec<NodeLabel> = match meta.get(CONSTRAINTS_KEY).map_err(redb("get meta"))? {
            Some(bytes) => decode(bytes.value())?,
            None => Vec::new(),
        };

        let nodes_table = txn.open_table(NODES_TABLE).map_err(redb("open nodes"))?;
        let mut nodes = Vec::with_capacity(nodes_table.len().map_err(redb("len nodes"))? as usize);
        for entry in nodes_table.iter().map_err(redb("iter nodes"))? {
            let (_, value) = entry.map_err(redb("read node"))?;
            nodes.push(decode::<Node>(value.value())?);
        }

        let edges_table = txn.open_table(EDGES_TABLE).map_err(redb("open edges"))?;
        let mut edges = Vec::with_capacity(edges_table.len().map_err(redb("len edges"))? as usize);
        for entry in edges_table.iter().map_err(redb("iter edges"))? {
            let (_, value) = entry.map_err(redb("read edge"))?;
            edges.push(decode::<EdgeRecord>(value.value())?);
        }

        Ok(Some(GraphSnapshot {
            constraints,
            nodes,
            edges,
        }))
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{KnowledgeGraph, NodeKey, NodeProps, GraphStore, Relation};
    use tempfile::TempDir;

    fn small_graph() -> KnowledgeGraph {
        let kg = KnowledgeGraph::new();
        kg.ensure_unique(NodeLabel::Author).unwrap();
        kg.merge_node(NodeKey::author("Valens"), NodeProps::Author)
            .unwrap();
        kg.merge_node(
            NodeKey::layer("technical"),
            NodeProps::Layer(crate::graph::LayerProps {
                name: "Technical".into(),
                color: "#4A90D9".into(),
                description: "Mechanics".into(),
            }),
        )
        .unwrap();
        kg
    }

    #[test]
    fn empty_database_has_no_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        let snapshot = small_graph().snapshot().unwrap();

        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.nodes.len(), 2);
        assert_eq!(loaded.constraints, vec![NodeLabel::Author]);
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        let kg = small_graph();
        store.save(&kg.snapshot().unwrap()).unwrap();

        let empty = KnowledgeGraph::new();
        store.save(&empty.snapshot().unwrap()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.nodes.is_empty());
        assert!(loaded.edges.is_empty());
    }

    #[test]
    fn persistence_across_reopens() {
        let dir = TempDir::new().unwrap();
        {
            let kg = small_graph();
            kg.merge_node(NodeKey::passage("c1"), NodeProps::Passage(crate::graph::PassageProps {
                text: "Mars in Aries".into(),
                source_title: "Anthology".into(),
                trust_tier: crate::ontology::TrustTier::PRIMARY,
                tradition: "hellenistic".into(),
            }))
            .unwrap();
            kg.merge_edge(&NodeKey::passage("c1"), Relation::AuthoredBy, &NodeKey::author("Valens"))
                .unwrap();
            let store = DurableStore::open(dir.path()).unwrap();
            store.save(&kg.snapshot().unwrap()).unwrap();
        }

        let store = DurableStore::open(dir.path()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.edges.len(), 1);
        let restored = KnowledgeGraph::from_snapshot(loaded).unwrap();
        assert!(restored
            .has_edge(&NodeKey::passage("c1"), Relation::AuthoredBy, &NodeKey::author("Valens"))
            .unwrap());
    }
}
