//! qanat CLI: partial knowledge-graph query answering.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use qanat::rank::build_rank_table;
use qanat::session::{Session, SessionConfig};
use qanat::typeindex::TypeIndex;

#[derive(Parser)]
#[command(name = "qanat", version, about = "Partial knowledge-graph query answering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute entity ranks from a sorted triple file.
    Rank {
        /// Plain-text N-Triples file, grouped by subject.
        #[arg(long)]
        triples: PathBuf,

        /// Fixed PageRank iteration count.
        #[arg(long, default_value = "25")]
        iterations: usize,

        /// Output path for the persisted rank table.
        #[arg(long)]
        out: PathBuf,
    },

    /// Build the type → property-id index from an index export.
    TypeIndex {
        /// JSON index document export.
        #[arg(long)]
        index: PathBuf,

        /// Output path for the persisted type index.
        #[arg(long)]
        out: PathBuf,
    },

    /// Resolve a partial query graph.
    Resolve {
        /// JSON index document export.
        #[arg(long)]
        index: PathBuf,

        /// Persisted type index (built on the fly when omitted).
        #[arg(long)]
        types: Option<PathBuf>,

        /// Persisted rank table applied over stored ranks.
        #[arg(long)]
        ranks: Option<PathBuf>,

        /// Remote SPARQL endpoint URL; local-only when omitted.
        #[arg(long)]
        endpoint: Option<String>,

        /// Sampling seed for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,

        /// JSON query graph file.
        query: PathBuf,
    },

    /// Show index statistics for a session.
    Info {
        /// JSON index document export.
        #[arg(long)]
        index: PathBuf,

        /// Persisted type index.
        #[arg(long)]
        types: Option<PathBuf>,
    },
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
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rank {
            triples,
            iterations,
            out,
        } => {
            let table = build_rank_table(&triples, iterations).into_diagnostic()?;
            table.save(&out).into_diagnostic()?;
            println!(
                "Ranked {} subjects over {iterations} iterations -> {}",
                table.ranks.len(),
                out.display()
            );
        }

        Commands::TypeIndex { index, out } => {
            let session = Session::open(SessionConfig::new(&index)).into_diagnostic()?;
            let types = TypeIndex::build(session.index());
            types.save(&out).into_diagnostic()?;
            println!("Type index written to {}", out.display());
        }

        Commands::Resolve {
            index,
            types,
            ranks,
            endpoint,
            seed,
            query,
        } => {
            let mut config = SessionConfig::new(&index);
            config.types_path = types;
            config.ranks_path = ranks;
            config.endpoint_url = endpoint;
            config.seed = seed;
            let session = Session::open(config).into_diagnostic()?;

            let request = std::fs::read_to_string(&query).into_diagnostic()?;
            let resolution = session.resolve_request(&request).into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&resolution).into_diagnostic()?
            );
        }

        Commands::Info { index, types } => {
            let mut config = SessionConfig::new(&index);
            config.types_path = types;
            let session = Session::open(config).into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&session.info()).into_diagnostic()?
            );
        }
    }

    Ok(())
}
