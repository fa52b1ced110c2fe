//! Knowledge migration: attach a corpus of passages to the structural graph.
//!
//! For every record the migrator merges the author, merges the passage,
//! retracts the passage's previous attachments, and writes fresh
//! `AUTHORED_BY`, `IN_LAYER` and `DESCRIBES` edges. Re-migrating a record
//! therefore always leaves its attachments matching the latest metadata.
//!
//! The corpus is read in bounded pages. A store connectivity failure aborts
//! the run; a refused write for one record is recorded in the
//! [`MigrationReport`] and the run continues. Re-running the whole migration
//! is the recovery path: everything is merged by natural key.

pub mod corpus;
pub mod error;
pub mod tags;

use serde::Serialize;

use crate::context::{Context, Interrupt};
use crate::graph::{
    EdgeMerge, GraphResult, GraphStore, NodeKey, NodeMerge, NodeProps, PassageProps, Relation,
    RelationKind,
};
use crate::ontology::{self, DEFAULT_LAYER, TrustTier, UNKNOWN_AUTHOR, UNKNOWN_TITLE};

pub use corpus::{CorpusMetadata, CorpusRecord, CorpusSource, JsonlCorpus, VecCorpus};
pub use error::{MigrationError, MigrationResult};
pub use tags::{MalformedTag, TagField};

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Progress after each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationProgress {
    pub page: usize,
    pub migrated: usize,
    pub total: usize,
}

/// A record whose writes were refused by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub chunk_id: String,
    /// Which write was refused: `author`, `passage`, `retract`, `authored_by`,
    /// `in_layer`, `describes`, or `decode` for records the source rejected.
    pub stage: &'static str,
    pub message: String,
}

/// What a migration run did, and what it expected to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub total: usize,
    /// Corpus positions processed, including rejected records.
    pub migrated: usize,
    pub pages: usize,
    pub authors_created: usize,
    pub passages_created: usize,
    pub passages_updated: usize,
    /// Attachment edges the run tried to write.
    pub edges_expected: usize,
    /// Attachment edges present after their merge.
    pub edges_written: usize,
    /// Stale attachment edges removed before rewriting.
    pub edges_retracted: usize,
    pub describes_written: usize,
    /// Well-formed tags naming no structural entity; dropped.
    pub unresolved_tags: usize,
    /// Empty slots and non-numeric house tokens; dropped.
    pub malformed_tags: usize,
    /// Missing or invalid metadata fields replaced by their default.
    pub defaulted_fields: usize,
    pub rejected_records: usize,
    pub failures: Vec<RecordFailure>,
}

impl MigrationReport {
    /// No refused writes and no rejected records.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.rejected_records == 0
    }

    pub fn edges_missing(&self) -> usize {
        self.edges_expected.saturating_sub(self.edges_written)
    }
}

type ProgressFn<'a> = Box<dyn FnMut(MigrationProgress) + 'a>;

/// Drives one migration run over a [`GraphStore`].
pub struct Migrator<'a, G: GraphStore + ?Sized> {
    store: &'a G,
    page_size: usize,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a, G: GraphStore + ?Sized> Migrator<'a, G> {
    pub fn new(store: &'a G) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
            on_progress: None,
        }
    }

    /// Records per page. Zero is treated as one.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Called after every page with the running count.
    pub fn on_progress(mut self, f: impl FnMut(MigrationProgress) + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Migrate every record of `source`.
    ///
    /// `ctx` is checked before each record; on cancellation the records
    /// written so far stay in the graph and the error carries the count.
    pub fn run<S: CorpusSource + ?Sized>(
        mut self,
        source: &mut S,
        ctx: &Context,
    ) -> MigrationResult<MigrationReport> {
        let total = source.total()?;
        let mut report = MigrationReport {
            total,
            ..Default::default()
        };
        tracing::info!(total, page_size = self.page_size, "migrating knowledge");

        let mut offset = 0;
        loop {
            let page = source.page(offset, self.page_size)?;
            if page.is_empty() {
                break;
            }
            for rejected in &page.rejected {
                tracing::warn!(position = rejected.position, reason = %rejected.reason, "corpus record rejected");
                report.rejected_records += 1;
                report.failures.push(RecordFailure {
                    chunk_id: format!("#{}", rejected.position),
                    stage: "decode",
                    message: rejected.reason.clone(),
                });
                report.migrated += 1;
            }
            for record in &page.records {
                if let Err(interrupt) = ctx.check() {
                    return Err(interrupted(interrupt, report.migrated, total));
                }
                self.migrate_record(record, &mut report)?;
                report.migrated += 1;
            }
            offset += page.len();
            report.pages += 1;

            let progress = MigrationProgress {
                page: report.pages,
                migrated: report.migrated,
                total,
            };
            tracing::info!(migrated = progress.migrated, total, page = progress.page, "migration progress");
            if let Some(f) = self.on_progress.as_mut() {
                f(progress);
            }
        }

        tracing::info!(
            migrated = report.migrated,
            authors_created = report.authors_created,
            passages_created = report.passages_created,
            edges_written = report.edges_written,
            edges_expected = report.edges_expected,
            unresolved_tags = report.unresolved_tags,
            malformed_tags = report.malformed_tags,
            failures = report.failures.len(),
            "migration complete"
        );
        Ok(report)
    }

    fn migrate_record(
        &mut self,
        record: &CorpusRecord,
        report: &mut MigrationReport,
    ) -> MigrationResult<()> {
        let meta = &record.metadata;
        let passage = NodeKey::passage(record.id.clone());

        let author = field_or_default(&meta.source_author, UNKNOWN_AUTHOR, report);
        let author_key = NodeKey::author(author);
        match accept(record, "author", self.store.merge_node(author_key.clone(), NodeProps::Author), report)? {
            Some(NodeMerge::Created) => report.authors_created += 1,
            Some(_) => {}
            None => return Ok(()),
        }

        let props = PassageProps {
            text: record.text.clone(),
            source_title: field_or_default(&meta.source_title, UNKNOWN_TITLE, report),
            trust_tier: trust_tier(meta, report),
            tradition: meta.tradition.clone().unwrap_or_default(),
        };
        match accept(record, "passage", self.store.merge_node(passage.clone(), NodeProps::Passage(props)), report)? {
            Some(NodeMerge::Created) => report.passages_created += 1,
            Some(_) => report.passages_updated += 1,
            None => return Ok(()),
        }

        let retracted = self
            .store
            .remove_edges_from(&passage, &RelationKind::PASSAGE_ATTACHMENTS);
        match accept(record, "retract", retracted, report)? {
            Some(n) => report.edges_retracted += n,
            None => return Ok(()),
        }

        self.attach(record, "authored_by", &passage, Relation::AuthoredBy, &author_key, report)?;

        let layer = layer_id(meta, report);
        self.attach(record, "in_layer", &passage, Relation::InLayer, &NodeKey::layer(layer), report)?;

        let parsed = tags::parse_tags(meta);
        for tag in &parsed.malformed {
            tracing::debug!(chunk_id = %record.id, field = tag.field.as_str(), token = %tag.token, "malformed tag dropped");
        }
        report.malformed_tags += parsed.malformed.len();
        for (field, token) in &parsed.unresolvable {
            tracing::debug!(chunk_id = %record.id, field = field.as_str(), token = %token, "unresolved tag dropped");
        }
        report.unresolved_tags += parsed.unresolvable.len();

        for target in &parsed.targets {
            let merge = self.store.merge_edge(&passage, Relation::Describes, target);
            match accept(record, "describes", merge, report)? {
                Some(EdgeMerge::MissingEndpoint) => {
                    tracing::debug!(chunk_id = %record.id, tag = %target, "unresolved tag dropped");
                    report.unresolved_tags += 1;
                }
                Some(_) => {
                    report.edges_expected += 1;
                    report.edges_written += 1;
                    report.describes_written += 1;
                }
                None => report.edges_expected += 1,
            }
        }
        Ok(())
    }

    /// Write one required attachment edge. A missing endpoint is a failure:
    /// the author was just merged and layers come from the structural build.
    fn attach(
        &mut self,
        record: &CorpusRecord,
        stage: &'static str,
        passage: &NodeKey,
        relation: Relation,
        target: &NodeKey,
        report: &mut MigrationReport,
    ) -> MigrationResult<()> {
        report.edges_expected += 1;
        let merge = self.store.merge_edge(passage, relation, target);
        match accept(record, stage, merge, report)? {
            Some(EdgeMerge::MissingEndpoint) => {
                tracing::warn!(chunk_id = %record.id, %target, "attachment target missing; build the structural graph first");
                report.failures.push(RecordFailure {
                    chunk_id: record.id.clone(),
                    stage,
                    message: format!("{target} does not exist"),
                });
            }
            Some(_) => report.edges_written += 1,
            None => {}
        }
        Ok(())
    }
}

/// Migrate `source` into `store` with the given page size.
pub fn migrate_knowledge<G, S>(
    store: &G,
    source: &mut S,
    page_size: usize,
    ctx: &Context,
) -> MigrationResult<MigrationReport>
where
    G: GraphStore + ?Sized,
    S: CorpusSource + ?Sized,
{
    Migrator::new(store).page_size(page_size).run(source, ctx)
}

/// Sort a store result into success, a recorded per-record failure, or an
/// abort when the store itself is gone.
fn accept<T>(
    record: &CorpusRecord,
    stage: &'static str,
    result: GraphResult<T>,
    report: &mut MigrationReport,
) -> MigrationResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_connectivity() => Err(e.into()),
        Err(e) => {
            tracing::warn!(chunk_id = %record.id, stage, error = %e, "record write refused");
            report.failures.push(RecordFailure {
                chunk_id: record.id.clone(),
                stage,
                message: e.to_string(),
            });
            Ok(None)
        }
    }
}

fn interrupted(interrupt: Interrupt, migrated: usize, total: usize) -> MigrationError {
    match interrupt {
        Interrupt::Cancelled => MigrationError::Cancelled { migrated, total },
        Interrupt::DeadlineExceeded => MigrationError::DeadlineExceeded { migrated, total },
    }
}

fn field_or_default(value: &Option<String>, default: &str, report: &mut MigrationReport) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => {
            report.defaulted_fields += 1;
            default.to_owned()
        }
    }
}

/// Integer 1..=4, given as a number or numeric string. Anything else is
/// tier 4.
fn trust_tier(meta: &CorpusMetadata, report: &mut MigrationReport) -> TrustTier {
    let parsed = match &meta.trust_tier {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed.and_then(TrustTier::new) {
        Some(tier) => tier,
        None => {
            report.defaulted_fields += 1;
            TrustTier::default()
        }
    }
}

/// Known layer id, or the default layer.
fn layer_id(meta: &CorpusMetadata, report: &mut MigrationReport) -> &'static str {
    let requested = meta
        .layer
        .as_deref()
        .map(|l| l.trim().to_lowercase())
        .unwrap_or_default();
    match ontology::catalog::layer(&requested) {
        Some(layer) => layer.id,
        None => {
            report.defaulted_fields += 1;
            DEFAULT_LAYER
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_structural_graph;
    use crate::context::CancelToken;
    use crate::graph::{Direction, KnowledgeGraph};

    fn built() -> KnowledgeGraph {
        let kg = KnowledgeGraph::new();
        build_structural_graph(&kg).unwrap();
        kg
    }

    fn migrate(kg: &KnowledgeGraph, records: Vec<CorpusRecord>) -> MigrationReport {
        migrate_knowledge(kg, &mut VecCorpus::new(records), 2, &Context::background()).unwrap()
    }

    fn targets(kg: &KnowledgeGraph, chunk: &str, kind: RelationKind) -> Vec<NodeKey> {
        kg.neighbors(&NodeKey::passage(chunk), kind, Direction::Outgoing)
            .unwrap()
            .into_iter()
            .map(|(_, k)| k)
            .collect()
    }

    #[test]
    fn missing_metadata_defaults() {
        let kg = built();
        let report = migrate(&kg, vec![CorpusRecord::new("c1", "bare")]);
        assert_eq!(report.passages_created, 1);
        // author, title, trust tier, layer
        assert_eq!(report.defaulted_fields, 4);
        assert_eq!(
            targets(&kg, "c1", RelationKind::AuthoredBy),
            vec![NodeKey::author(UNKNOWN_AUTHOR)]
        );
        assert_eq!(
            targets(&kg, "c1", RelationKind::InLayer),
            vec![NodeKey::layer(DEFAULT_LAYER)]
        );
        let node = kg.node(&NodeKey::passage("c1")).unwrap().unwrap();
        let props = node.as_passage().unwrap();
        assert_eq!(props.trust_tier, TrustTier::PERIPHERAL);
        assert_eq!(props.source_title, UNKNOWN_TITLE);
        assert_eq!(props.tradition, "");
    }

    #[test]
    fn trust_tier_accepts_numeric_strings_and_rejects_out_of_range() {
        let mut report = MigrationReport::default();
        let meta = |v: serde_json::Value| CorpusMetadata {
            trust_tier: Some(v),
            ..Default::default()
        };
        assert_eq!(trust_tier(&meta(serde_json::json!(2)), &mut report), TrustTier::BRIDGE);
        assert_eq!(trust_tier(&meta(serde_json::json!("1")), &mut report), TrustTier::PRIMARY);
        assert_eq!(trust_tier(&meta(serde_json::json!(3.0)), &mut report), TrustTier::REFERENCE);
        assert_eq!(report.defaulted_fields, 0);
        assert_eq!(trust_tier(&meta(serde_json::json!(9)), &mut report), TrustTier::PERIPHERAL);
        assert_eq!(trust_tier(&meta(serde_json::json!("high")), &mut report), TrustTier::PERIPHERAL);
        assert_eq!(report.defaulted_fields, 2);
    }

    #[test]
    fn unknown_layer_falls_back_to_reference() {
        let kg = built();
        let report = migrate(&kg, vec![CorpusRecord::new("c1", "t").layer("astral")]);
        assert_eq!(
            targets(&kg, "c1", RelationKind::InLayer),
            vec![NodeKey::layer(DEFAULT_LAYER)]
        );
        assert!(report.is_clean());
    }

    #[test]
    fn unresolved_and_malformed_tags_are_counted() {
        let kg = built();
        let report = migrate(
            &kg,
            vec![CorpusRecord::new("c1", "t")
                .signs("aries,invalidsign")
                .houses("10,tenth,13,300,+5")],
        );
        assert_eq!(report.describes_written, 2);
        assert_eq!(report.unresolved_tags, 3);
        assert_eq!(report.malformed_tags, 2);
        assert_eq!(
            targets(&kg, "c1", RelationKind::Describes),
            vec![NodeKey::sign("aries"), NodeKey::house(10)]
        );
        assert_eq!(report.edges_missing(), 0);
    }

    #[test]
    fn remigration_replaces_attachments() {
        let kg = built();
        migrate(
            &kg,
            vec![CorpusRecord::new("c1", "old")
                .author("A")
                .layer("technical")
                .signs("aries")],
        );
        let report = migrate(
            &kg,
            vec![CorpusRecord::new("c1", "new")
                .author("B")
                .layer("psychological")
                .signs("leo")],
        );
        assert_eq!(report.passages_updated, 1);
        assert_eq!(report.edges_retracted, 3);
        assert_eq!(targets(&kg, "c1", RelationKind::AuthoredBy), vec![NodeKey::author("B")]);
        assert_eq!(
            targets(&kg, "c1", RelationKind::InLayer),
            vec![NodeKey::layer("psychological")]
        );
        assert_eq!(targets(&kg, "c1", RelationKind::Describes), vec![NodeKey::sign("leo")]);
        // Authors are never deleted.
        assert!(kg.node(&NodeKey::author("A")).unwrap().is_some());
        let node = kg.node(&NodeKey::passage("c1")).unwrap().unwrap();
        assert_eq!(node.as_passage().unwrap().text, "new");
    }

    #[test]
    fn progress_is_reported_per_page() {
        let kg = built();
        let records: Vec<_> = (0..5)
            .map(|i| CorpusRecord::new(format!("c{i}"), "t"))
            .collect();
        let mut seen = Vec::new();
        let report = Migrator::new(&kg)
            .page_size(2)
            .on_progress(|p| seen.push((p.migrated, p.total)))
            .run(&mut VecCorpus::new(records), &Context::background())
            .unwrap();
        assert_eq!(report.pages, 3);
        assert_eq!(seen, vec![(2, 5), (4, 5), (5, 5)]);
    }

    #[test]
    fn layer_missing_without_structural_graph_is_a_failure() {
        let kg = KnowledgeGraph::new();
        let report = migrate(&kg, vec![CorpusRecord::new("c1", "t")]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, "in_layer");
        assert_eq!(report.edges_missing(), 1);
    }

    #[test]
    fn cancelled_migration_reports_progress() {
        let kg = built();
        let token = CancelToken::new();
        token.cancel();
        let ctx = Context::background().with_token(token);
        let err = migrate_knowledge(
            &kg,
            &mut VecCorpus::new(vec![CorpusRecord::new("c1", "t")]),
            10,
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::Cancelled { migrated: 0, total: 1 }));
    }
}
