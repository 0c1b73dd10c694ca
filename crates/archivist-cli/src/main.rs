//! `archivist`: a thin CLI front-end over the indexer and query crates.

mod commands;
mod context;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Symbol graph indexer and authority-weighted hybrid retrieval engine.
#[derive(Parser)]
#[command(name = "archivist", version, about)]
struct Cli {
    /// Increase log verbosity (-v = debug, -vv = trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Explicit config file, outranks the global and project config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a repository, extract symbols, and refresh the metadata,
    /// lexical and vector stores.
    ///
    /// Example: archivist index . --exclude 'target/**'
    Index {
        /// Repository root to index.
        root: PathBuf,
        /// Only index paths matching one of these globs.
        #[arg(long = "include")]
        include: Vec<String>,
        /// Skip paths matching one of these globs.
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        /// Re-index exactly these repo-relative paths instead of walking
        /// the whole tree.
        #[arg(long = "file")]
        files: Vec<String>,
        /// Truncate every store before indexing.
        #[arg(long)]
        force_clean: bool,
        /// Cap on parallel file-extraction workers.
        #[arg(long)]
        max_workers: Option<usize>,
    },

    /// Run a search against an already-indexed repository.
    ///
    /// Example: archivist search --mode hybrid "token refresh retry logic"
    Search {
        /// Repository root that was previously indexed.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Which signal(s) to use.
        #[arg(long, value_enum, default_value_t = commands::search::SearchMode::Hybrid)]
        mode: commands::search::SearchMode,
        query: String,
        /// Number of results to return.
        #[arg(short = 'k', long)]
        limit: Option<usize>,
        /// Restrict results to a single partition.
        #[arg(long = "filter-partition")]
        filter_partition: Option<String>,
        /// Restrict results to a single language.
        #[arg(long = "filter-language")]
        filter_language: Option<String>,
        /// Override the configured `w_semantic,w_lexical` blend (hybrid
        /// mode only), e.g. `0.5,0.5`.
        #[arg(long)]
        weights: Option<String>,
    },

    /// Print store sizes and embedding-status breakdown for a repository.
    Stats {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Classify a path into its authority partition without indexing
    /// anything.
    ///
    /// Example: archivist classify crates/core/src/auth.rs
    Classify { path: String },

    /// Score a labelled query set against an indexed repository and report
    /// Recall@k/MRR/nDCG@k/Precision@k/MAP.
    ///
    /// Example: archivist eval queryset.json --mode hybrid -k 10
    Eval {
        /// Path to a JSON file of `{query, judgments: [{file, relevance}]}`.
        queryset: PathBuf,
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, value_enum, default_value_t = commands::search::SearchMode::Hybrid)]
        mode: commands::search::SearchMode,
        #[arg(short = 'k', long, default_value_t = 10)]
        k: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    install_logging(cli.verbose);

    match cli.command {
        Commands::Index {
            root,
            include,
            exclude,
            files,
            force_clean,
            max_workers,
        } => commands::index::run(&root, cli.config.as_deref(), include, exclude, files, force_clean, max_workers),
        Commands::Search {
            root,
            mode,
            query,
            limit,
            filter_partition,
            filter_language,
            weights,
        } => commands::search::run(
            &root,
            cli.config.as_deref(),
            mode,
            &query,
            limit,
            filter_partition,
            filter_language,
            weights,
        ),
        Commands::Stats { root } => commands::stats::run(&root, cli.config.as_deref()),
        Commands::Classify { path } => commands::classify::run(&path),
        Commands::Eval { queryset, root, mode, k } => {
            commands::eval::run(&root, cli.config.as_deref(), &queryset, mode, k)
        }
    }
}

fn install_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("ARCHIVIST_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
