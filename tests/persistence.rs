//! Persistence and recovery tests for the selene engine.
//!
//! These tests verify that the structural graph and migrated passages
//! survive engine restart (persist + reopen cycle).

use selene::context::Context;
use selene::engine::{Engine, EngineConfig};
use selene::graph::{Direction, GraphStore, NodeKey, NodeLabel, RelationKind};
use selene::migrate::{CorpusRecord, VecCorpus};

fn persistent_engine(dir: &std::path::Path) -> Engine {
    Engine::new(EngineConfig {
        data_dir: Some(dir.to_path_buf()),
        query_workers: 2,
        ..Default::default()
    })
    .unwrap()
}

fn corpus() -> VecCorpus {
    VecCorpus::new(vec![
        CorpusRecord::new("c1", "Mars in Aries")
            .author("Valens")
            .layer("technical")
            .trust_tier(1)
            .planets("mars")
            .signs("aries"),
        CorpusRecord::new("c2", "Venus in the 7th")
            .author("Lilly")
            .layer("reference")
            .planets("venus")
            .houses("7"),
    ])
}

#[test]
fn graph_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    // First session: build, migrate, persist.
    let (nodes, edges) = {
        let engine = persistent_engine(dir.path());
        engine.build_structure().unwrap();
        engine.migrate(&mut corpus(), &Context::background()).unwrap();
        let info = engine.info().unwrap();
        engine.close().unwrap();
        (info.node_count, info.edge_count)
    };

    // Second session: reopen and query without rebuilding.
    {
        let engine = persistent_engine(dir.path());
        let info = engine.info().unwrap();
        assert_eq!(info.node_count, nodes);
        assert_eq!(info.edge_count, edges);

        let ctx = Context::background();
        let web = engine.rulership_web("aries", &ctx).unwrap().unwrap();
        assert_eq!(web.ruler.as_deref(), Some("Mars"));

        let condition = engine.planet_condition("mars", "aries", &ctx).unwrap().unwrap();
        assert!(condition.flags.domicile);
        assert_eq!(condition.passages[0].passages[0].author, "Valens");

        assert_eq!(
            engine.graph().count_label(NodeLabel::Passage).unwrap(),
            2
        );
    }
}

#[test]
fn rebuild_after_restart_is_idempotent() {
    let dir = tempfile::TempDir::new().unwrap();

    let (nodes, edges) = {
        let engine = persistent_engine(dir.path());
        engine.build_structure().unwrap();
        engine.migrate(&mut corpus(), &Context::background()).unwrap();
        engine.persist().unwrap();
        let info = engine.info().unwrap();
        (info.node_count, info.edge_count)
    };

    let engine = persistent_engine(dir.path());
    let build = engine.build_structure().unwrap();
    assert_eq!(build.nodes_created, 0);
    assert_eq!(build.edges_created, 0);
    let report = engine.migrate(&mut corpus(), &Context::background()).unwrap();
    assert_eq!(report.passages_created, 0);
    assert_eq!(report.passages_updated, 2);

    let info = engine.info().unwrap();
    assert_eq!(info.node_count, nodes);
    assert_eq!(info.edge_count, edges);

    let describes = engine
        .graph()
        .neighbors(&NodeKey::passage("c2"), RelationKind::Describes, Direction::Outgoing)
        .unwrap();
    assert_eq!(describes.len(), 2);
}

#[test]
fn unpersisted_changes_are_lost() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let engine = persistent_engine(dir.path());
        engine.build_structure().unwrap();
        engine.persist().unwrap();
        engine.migrate(&mut corpus(), &Context::background()).unwrap();
        // Dropped without persist or close.
    }
    let engine = persistent_engine(dir.path());
    assert_eq!(engine.graph().count_label(NodeLabel::Passage).unwrap(), 0);
    assert_eq!(engine.graph().count_label(NodeLabel::Sign).unwrap(), 12);
}
