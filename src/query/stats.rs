//! Graph verification and knowledge statistics.
//!
//! Both reports are read-only summaries. Distributions are sorted by count
//! descending, ties broken by key so repeated runs print the same table.

use std::collections::HashMap;

use serde::Serialize;

use crate::context::Context;
use crate::error::QueryResult;
use crate::graph::{Direction, GraphStore, NodeKey, NodeLabel, RelationKind};
use crate::ontology::TrustTier;

use super::filter::{PassageHit, PassageQuery};
use super::rulership::display_name;

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationCount {
    pub relation: String,
    pub count: usize,
}

/// Counts per node label and relation kind, with two sample probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub nodes: Vec<LabelCount>,
    pub relations: Vec<RelationCount>,
    pub node_total: usize,
    pub edge_total: usize,
    /// Signs Mars rules, by display name.
    pub mars_rules: Vec<String>,
    /// Best-tier passages describing Saturn.
    pub saturn_passages: Vec<PassageHit>,
}

/// Number of Saturn passages sampled by [`verify_graph`].
pub const SATURN_SAMPLE: usize = 3;

/// Summarize what is in the graph. Labels and relations with no entries are
/// reported with a zero count rather than omitted.
pub fn verify_graph<G: GraphStore + ?Sized>(
    store: &G,
    ctx: &Context,
) -> QueryResult<VerificationReport> {
    ctx.check()?;
    let mut nodes = Vec::with_capacity(NodeLabel::ALL.len());
    for label in NodeLabel::ALL {
        nodes.push(LabelCount {
            label: label.as_str().to_owned(),
            count: store.count_label(label)?,
        });
    }
    let mut relations = Vec::with_capacity(RelationKind::ALL.len());
    for kind in RelationKind::ALL {
        relations.push(RelationCount {
            relation: kind.as_str().to_owned(),
            count: store.count_relation(kind)?,
        });
    }

    ctx.check()?;
    let mars = NodeKey::planet("mars");
    let mut mars_rules = Vec::new();
    for (_, sign) in store.neighbors(&mars, RelationKind::Rules, Direction::Outgoing)? {
        mars_rules.push(display_name(store, &sign)?);
    }
    let saturn_passages = PassageQuery::new(SATURN_SAMPLE)
        .planet("saturn")
        .execute(store, ctx)?;

    let report = VerificationReport {
        node_total: store.node_count()?,
        edge_total: store.edge_count()?,
        nodes,
        relations,
        mars_rules,
        saturn_passages,
    };
    tracing::info!(
        nodes = report.node_total,
        edges = report.edge_total,
        "graph verified"
    );
    Ok(report)
}

impl std::fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "nodes ({} total)", self.node_total)?;
        for c in &self.nodes {
            writeln!(f, "  {:<12} {}", c.label, c.count)?;
        }
        writeln!(f, "relations ({} total)", self.edge_total)?;
        for c in &self.relations {
            writeln!(f, "  {:<18} {}", c.relation, c.count)?;
        }
        writeln!(f, "mars rules: {}", self.mars_rules.join(", "))?;
        writeln!(f, "saturn passages:")?;
        for hit in &self.saturn_passages {
            writeln!(
                f,
                "  [{}] {} ({}, tier {})",
                hit.chunk_id,
                hit.source_title,
                hit.author,
                hit.trust_tier.get()
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Knowledge statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub key: String,
    pub count: usize,
}

/// Passage distribution across the migrated corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeStats {
    pub passages: usize,
    pub authors: usize,
    pub by_layer: Vec<Bucket>,
    /// Keyed by tier label (PRIMARY, BRIDGE, ...).
    pub by_tier: Vec<Bucket>,
    pub by_author: Vec<Bucket>,
    /// Passages with an empty tradition are counted under "unspecified".
    pub by_tradition: Vec<Bucket>,
}

pub fn knowledge_stats<G: GraphStore + ?Sized>(
    store: &G,
    ctx: &Context,
) -> QueryResult<KnowledgeStats> {
    let mut by_layer: HashMap<String, usize> = HashMap::new();
    let mut by_tier: HashMap<TrustTier, usize> = HashMap::new();
    let mut by_author: HashMap<String, usize> = HashMap::new();
    let mut by_tradition: HashMap<String, usize> = HashMap::new();

    let passages = store.nodes_with_label(NodeLabel::Passage)?;
    for node in &passages {
        ctx.check()?;
        let Some(props) = node.as_passage() else {
            continue;
        };
        *by_tier.entry(props.trust_tier).or_default() += 1;
        let tradition = if props.tradition.is_empty() {
            "unspecified".to_owned()
        } else {
            props.tradition.clone()
        };
        *by_tradition.entry(tradition).or_default() += 1;
        for (_, layer) in store.neighbors(&node.key, RelationKind::InLayer, Direction::Outgoing)? {
            *by_layer.entry(layer.id()).or_default() += 1;
        }
        for (_, author) in store.neighbors(&node.key, RelationKind::AuthoredBy, Direction::Outgoing)? {
            *by_author.entry(author.id()).or_default() += 1;
        }
    }

    let stats = KnowledgeStats {
        passages: passages.len(),
        authors: store.count_label(NodeLabel::Author)?,
        by_layer: buckets(by_layer),
        by_tier: buckets(
            by_tier
                .into_iter()
                .map(|(tier, n)| (tier.label().to_owned(), n))
                .collect(),
        ),
        by_author: buckets(by_author),
        by_tradition: buckets(by_tradition),
    };
    tracing::debug!(passages = stats.passages, authors = stats.authors, "knowledge stats");
    Ok(stats)
}

fn buckets(counts: HashMap<String, usize>) -> Vec<Bucket> {
    let mut out: Vec<Bucket> = counts
        .into_iter()
        .map(|(key, count)| Bucket { key, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    out
}

impl std::fmt::Display for KnowledgeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "passages: {}", self.passages)?;
        writeln!(f, "authors:  {}", self.authors)?;
        for (title, buckets) in [
            ("by layer", &self.by_layer),
            ("by trust tier", &self.by_tier),
            ("by author", &self.by_author),
            ("by tradition", &self.by_tradition),
        ] {
            writeln!(f, "{title}:")?;
            for b in buckets {
                writeln!(f, "  {:<24} {}", b.key, b.count)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_structural_graph;
    use crate::graph::KnowledgeGraph;
    use crate::migrate::{CorpusRecord, VecCorpus, migrate_knowledge};

    fn graph() -> KnowledgeGraph {
        let kg = KnowledgeGraph::new();
        build_structural_graph(&kg).unwrap();
        let records = vec![
            CorpusRecord::new("s1", "Saturn, tier 2")
                .author("Valens")
                .layer("technical")
                .trust_tier(2)
                .tradition("hellenistic")
                .planets("saturn"),
            CorpusRecord::new("s2", "Saturn, tier 1")
                .author("Valens")
                .layer("technical")
                .trust_tier(1)
                .tradition("hellenistic")
                .planets("saturn"),
            CorpusRecord::new("s3", "Saturn, archetypal")
                .author("Greene")
                .layer("archetypal")
                .planets("saturn"),
            CorpusRecord::new("s4", "Saturn, psychological")
                .author("Greene")
                .layer("psychological")
                .trust_tier(3)
                .planets("saturn"),
            CorpusRecord::new("m1", "Mars").author("Lilly").planets("mars"),
        ];
        migrate_knowledge(&kg, &mut VecCorpus::new(records), 10, &Context::background()).unwrap();
        kg
    }

    #[test]
    fn verification_counts_and_probes() {
        let kg = graph();
        let report = verify_graph(&kg, &Context::background()).unwrap();
        let count = |label: &str| {
            report
                .nodes
                .iter()
                .find(|c| c.label == label)
                .map(|c| c.count)
        };
        assert_eq!(count("Planet"), Some(14));
        assert_eq!(count("Sign"), Some(12));
        assert_eq!(count("Passage"), Some(5));
        assert_eq!(report.relations.len(), RelationKind::ALL.len());

        let mut rules = report.mars_rules.clone();
        rules.sort();
        assert_eq!(rules, vec!["Aries", "Scorpio"]);

        let ids: Vec<_> = report
            .saturn_passages
            .iter()
            .map(|h| h.chunk_id.as_str())
            .collect();
        assert_eq!(ids, vec!["s2", "s1", "s4"]);
        assert!(report.to_string().contains("mars rules: "));
    }

    #[test]
    fn stats_are_sorted_by_count() {
        let kg = graph();
        let stats = knowledge_stats(&kg, &Context::background()).unwrap();
        assert_eq!(stats.passages, 5);
        assert_eq!(stats.authors, 3);
        assert_eq!(stats.by_layer[0], Bucket { key: "technical".into(), count: 2 });
        // m1 had no layer and fell back to reference; s3 and m1 defaulted to tier 4.
        assert!(stats.by_layer.contains(&Bucket { key: "reference".into(), count: 1 }));
        assert!(stats.by_tier.contains(&Bucket { key: "PERIPHERAL".into(), count: 2 }));
        assert_eq!(stats.by_tradition[0], Bucket { key: "unspecified".into(), count: 3 });
        let authors: Vec<_> = stats.by_author.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(authors, vec!["Greene", "Valens", "Lilly"]);
    }

    #[test]
    fn empty_graph_has_empty_stats() {
        let kg = KnowledgeGraph::new();
        let stats = knowledge_stats(&kg, &Context::background()).unwrap();
        assert_eq!(stats, KnowledgeStats::default());
    }
}
