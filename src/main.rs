//! selene CLI: build, migrate and query the astrology knowledge graph.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use selene::config::SeleneConfig;
use selene::context::Context;
use selene::engine::Engine;
use selene::migrate::JsonlCorpus;
use selene::query::{ChartInput, SearchFilters};

#[derive(Parser)]
#[command(name = "selene", version, about = "Traditional astrology knowledge graph")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the graph snapshot (overrides the config file).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print reports as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the structural graph (ontology nodes and dignity edges).
    Build,

    /// Migrate a JSON Lines corpus into the graph.
    Migrate {
        /// Corpus file, one `{"id", "text", "metadata"}` record per line.
        #[arg(long)]
        corpus: PathBuf,

        /// Records per page (overrides the config file).
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Count nodes and relations and run the sample probes.
    Verify,

    /// Show passage distribution by layer, tier, author and tradition.
    Stats,

    /// Show engine info.
    Info,

    /// Structural profile of a sign.
    Rulership {
        /// Sign id or name, e.g. "aries".
        sign: String,
    },

    /// Dignity of a planet in a sign, with describing passages.
    Condition {
        planet: String,
        sign: String,
    },

    /// Passages matching every supplied filter.
    Search {
        #[arg(long)]
        planet: Option<String>,
        #[arg(long)]
        sign: Option<String>,
        #[arg(long)]
        house: Option<u8>,
        #[arg(long)]
        layer: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        technique: Option<String>,
        #[arg(long)]
        aspect: Option<String>,
        #[arg(long)]
        tradition: Option<String>,
        #[arg(long)]
        trust_tier: Option<u8>,
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Passages per interpretive layer for one placement.
    Interpret {
        planet: String,
        #[arg(long)]
        sign: Option<String>,
        #[arg(long)]
        house: Option<u8>,
        #[arg(long, default_value = "2")]
        per_layer: usize,
    },

    /// Run the chart query battery over a chart JSON file.
    Chart {
        /// Chart file with placements, dignities and timing techniques.
        #[arg(long)]
        file: PathBuf,

        /// Passages per query (overrides the config file).
        #[arg(long)]
        results_per_query: Option<usize>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => SeleneConfig::load(path)?,
        None => SeleneConfig::default(),
    };
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = Some(dir);
    }
    if config.data_dir.is_none() {
        config.data_dir = Some(PathBuf::from(".selene"));
    }
    if let Commands::Migrate {
        page_size: Some(page_size),
        ..
    } = &cli.command
    {
        config.page_size = *page_size;
        config.validate()?;
    }

    let engine = Engine::new(config.to_engine_config())?;
    // Snapshot restore does not count against the query timeout.
    let ctx = config.query_context();

    match cli.command {
        Commands::Build => {
            let report = engine.build_structure()?;
            engine.persist()?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "structural graph: {} nodes ({} new), {} edges ({} new)",
                    report.nodes_total(),
                    report.nodes_created,
                    report.edges_total(),
                    report.edges_created
                );
            }
        }

        Commands::Migrate { corpus, .. } => {
            let mut source = JsonlCorpus::open(&corpus)?;
            // Migration is not bounded by the query deadline.
            let report = engine.migrate(&mut source, &Context::background())?;
            engine.persist()?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "migrated {}/{} records from {}: {} passages created, {} updated, {} authors created",
                    report.migrated,
                    report.total,
                    corpus.display(),
                    report.passages_created,
                    report.passages_updated,
                    report.authors_created
                );
                println!(
                    "edges: {}/{} attachment edges written, {} describes, {} retracted",
                    report.edges_written,
                    report.edges_expected,
                    report.describes_written,
                    report.edges_retracted
                );
                println!(
                    "dropped: {} unresolved tags, {} malformed tags, {} defaulted fields, {} rejected records",
                    report.unresolved_tags,
                    report.malformed_tags,
                    report.defaulted_fields,
                    report.rejected_records
                );
                for failure in &report.failures {
                    eprintln!(
                        "  failed {} at {}: {}",
                        failure.chunk_id, failure.stage, failure.message
                    );
                }
            }
        }

        Commands::Verify => {
            let report = engine.verify(&ctx)?;
            if cli.json {
                print_json(&report)?;
            } else {
                print!("{report}");
            }
        }

        Commands::Stats => {
            let stats = engine.knowledge_stats(&ctx)?;
            if cli.json {
                print_json(&stats)?;
            } else {
                print!("{stats}");
            }
        }

        Commands::Info => {
            let info = engine.info()?;
            if cli.json {
                print_json(&info)?;
            } else {
                print!("{info}");
            }
        }

        Commands::Rulership { sign } => match engine.rulership_web(&sign, &ctx)? {
            Some(web) => print_json(&web)?,
            None => eprintln!("no sign \"{sign}\" in the graph"),
        },

        Commands::Condition { planet, sign } => {
            match engine.planet_condition(&planet, &sign, &ctx)? {
                Some(condition) => print_json(&condition)?,
                None => eprintln!("no planet \"{planet}\" or sign \"{sign}\" in the graph"),
            }
        }

        Commands::Search {
            planet,
            sign,
            house,
            layer,
            author,
            technique,
            aspect,
            tradition,
            trust_tier,
            limit,
        } => {
            let filters = SearchFilters {
                planet,
                sign,
                house,
                layer,
                author,
                technique,
                aspect,
                tradition,
                trust_tier,
            };
            print_json(&engine.filtered_search(&filters, limit, &ctx)?)?;
        }

        Commands::Interpret {
            planet,
            sign,
            house,
            per_layer,
        } => {
            let layers =
                engine.interpret_placement(&planet, sign.as_deref(), house, per_layer, &ctx)?;
            print_json(&layers)?;
        }

        Commands::Chart {
            file,
            results_per_query,
        } => {
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            let chart: ChartInput = serde_json::from_str(&content).into_diagnostic()?;
            let groups = engine.chart_grounded_knowledge(&chart, results_per_query, &ctx)?;
            print_json(&groups)?;
        }
    }

    Ok(())
}
