//! Engine facade: top-level API for the selene system.
//!
//! The `Engine` owns the graph client, the optional durable snapshot store and
//! the query worker pool. Nothing is process-global: callers open an engine,
//! use it, and close it.

use std::path::PathBuf;
use std::sync::Arc;

use crate::builder::{self, BuildReport};
use crate::context::Context;
use crate::error::{EngineError, SeleneResult};
use crate::graph::{GraphStore, KnowledgeGraph};
use crate::migrate::{CorpusSource, MigrationProgress, MigrationReport, Migrator};
use crate::query::{
    self, ChartInput, GroundedQuery, KnowledgeStats, LayerPassages, PassageHit, PlanetCondition,
    RulershipWeb, SearchFilters, VerificationReport,
};
use crate::store::DurableStore;

/// Configuration for the selene engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Data directory for the redb snapshot. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Corpus records per migration page.
    pub page_size: usize,
    /// Threads in the chart query pool.
    pub query_workers: usize,
    /// Default per-query bound of the chart battery.
    pub results_per_query: usize,
    /// Default passage count of [`Engine::planet_condition`].
    pub passages_per_condition: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            page_size: crate::migrate::DEFAULT_PAGE_SIZE,
            query_workers: 4,
            results_per_query: 3,
            passages_per_condition: 5,
        }
    }
}

/// The selene knowledge graph engine.
pub struct Engine {
    config: EngineConfig,
    graph: Arc<KnowledgeGraph>,
    durable: Option<DurableStore>,
    pool: rayon::ThreadPool,
}

impl Engine {
    /// Open an engine. With a data directory, the last persisted snapshot is
    /// restored; otherwise the graph starts empty.
    pub fn new(config: EngineConfig) -> SeleneResult<Self> {
        if config.query_workers == 0 {
            return Err(EngineError::InvalidConfig {
                message: "query_workers must be > 0".into(),
            }
            .into());
        }
        if config.page_size == 0 {
            return Err(EngineError::InvalidConfig {
                message: "page_size must be > 0".into(),
            }
            .into());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.query_workers)
            .thread_name(|i| format!("selene-query-{i}"))
            .build()
            .map_err(|e| EngineError::InvalidConfig {
                message: format!("failed to build query pool: {e}"),
            })?;

        let (graph, durable) = if let Some(ref dir) = config.data_dir {
            std::fs::create_dir_all(dir).map_err(|_| EngineError::DataDir {
                path: dir.display().to_string(),
            })?;
            let durable = DurableStore::open(dir)?;
            let graph = match durable.load()? {
                Some(snapshot) => KnowledgeGraph::from_snapshot(snapshot)?,
                None => KnowledgeGraph::new(),
            };
            (graph, Some(durable))
        } else {
            (KnowledgeGraph::new(), None)
        };

        tracing::info!(
            nodes = graph.node_count()?,
            edges = graph.edge_count()?,
            workers = config.query_workers,
            persistent = durable.is_some(),
            "initializing selene engine"
        );

        Ok(Self {
            config,
            graph: Arc::new(graph),
            durable,
            pool,
        })
    }

    /// Build the structural graph. Safe to call repeatedly.
    pub fn build_structure(&self) -> SeleneResult<BuildReport> {
        Ok(builder::build_structural_graph(&*self.graph)?)
    }

    /// Migrate a corpus with the configured page size.
    pub fn migrate<S: CorpusSource + ?Sized>(
        &self,
        source: &mut S,
        ctx: &Context,
    ) -> SeleneResult<MigrationReport> {
        self.migrate_with_progress(source, ctx, |_| {})
    }

    /// Migrate a corpus, reporting progress after every page.
    pub fn migrate_with_progress<'a, S: CorpusSource + ?Sized>(
        &'a self,
        source: &mut S,
        ctx: &Context,
        on_progress: impl FnMut(MigrationProgress) + 'a,
    ) -> SeleneResult<MigrationReport> {
        Ok(Migrator::new(&*self.graph)
            .page_size(self.config.page_size)
            .on_progress(on_progress)
            .run(source, ctx)?)
    }

    pub fn rulership_web(&self, sign: &str, ctx: &Context) -> SeleneResult<Option<RulershipWeb>> {
        Ok(query::rulership_web(&*self.graph, sign, ctx)?)
    }

    /// Planet-in-sign condition with the configured passage count.
    pub fn planet_condition(
        &self,
        planet: &str,
        sign: &str,
        ctx: &Context,
    ) -> SeleneResult<Option<PlanetCondition>> {
        Ok(query::planet_condition(
            &*self.graph,
            planet,
            sign,
            self.config.passages_per_condition,
            ctx,
        )?)
    }

    pub fn filtered_search(
        &self,
        filters: &SearchFilters,
        limit: usize,
        ctx: &Context,
    ) -> SeleneResult<Vec<PassageHit>> {
        Ok(query::filtered_search(&*self.graph, filters, limit, ctx)?)
    }

    pub fn interpret_placement(
        &self,
        planet: &str,
        sign: Option<&str>,
        house: Option<u8>,
        per_layer: usize,
        ctx: &Context,
    ) -> SeleneResult<Vec<LayerPassages>> {
        Ok(query::interpret_placement(
            &*self.graph,
            planet,
            sign,
            house,
            per_layer,
            ctx,
        )?)
    }

    /// Run the chart battery on the engine's query pool. `results_per_query`
    /// falls back to the configured default.
    pub fn chart_grounded_knowledge(
        &self,
        chart: &ChartInput,
        results_per_query: Option<usize>,
        ctx: &Context,
    ) -> SeleneResult<Vec<GroundedQuery>> {
        let per_query = results_per_query.unwrap_or(self.config.results_per_query);
        Ok(query::chart_grounded_knowledge(
            &*self.graph,
            chart,
            per_query,
            &self.pool,
            ctx,
        )?)
    }

    pub fn verify(&self, ctx: &Context) -> SeleneResult<VerificationReport> {
        Ok(query::verify_graph(&*self.graph, ctx)?)
    }

    pub fn knowledge_stats(&self, ctx: &Context) -> SeleneResult<KnowledgeStats> {
        Ok(query::knowledge_stats(&*self.graph, ctx)?)
    }

    /// Get the knowledge graph handle.
    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    /// A shared handle to the graph, for callers running their own threads.
    pub fn shared_graph(&self) -> Arc<KnowledgeGraph> {
        Arc::clone(&self.graph)
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn info(&self) -> SeleneResult<EngineInfo> {
        Ok(EngineInfo {
            node_count: self.graph.node_count()?,
            edge_count: self.graph.edge_count()?,
            query_workers: self.pool.current_num_threads(),
            persistent: self.durable.is_some(),
        })
    }

    /// Write the current graph to the durable store. A no-op in memory-only
    /// mode.
    pub fn persist(&self) -> SeleneResult<()> {
        if let Some(ref durable) = self.durable {
            durable.save(&self.graph.snapshot()?)?;
        }
        Ok(())
    }

    /// Persist and release the store.
    pub fn close(self) -> SeleneResult<()> {
        self.persist()?;
        tracing::debug!(persistent = self.durable.is_some(), "selene engine closed");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EngineInfo {
    pub node_count: usize,
    pub edge_count: usize,
    pub query_workers: usize,
    pub persistent: bool,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "selene engine info")?;
        writeln!(f, "  nodes:        {}", self.node_count)?;
        writeln!(f, "  edges:        {}", self.edge_count)?;
        writeln!(f, "  workers:      {}", self.query_workers)?;
        writeln!(f, "  persistent:   {}", self.persistent)?;
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("graph", &self.graph)
            .field("persistent", &self.durable.is_some())
            .finish()
    }
}
