use crate::context::ProjectContext;
use anyhow::{Context, Result, bail};
use archivist_core::time::{now_iso8601, unix_timestamp_secs};
use archivist_core::types::{IndexOptions, RunOutcome};
use archivist_indexer::{IndexerContext, index_files, index_repository};
use archivist_state::embedding::build_embedding_provider;
use archivist_state::run_log::{IndexRunLog, write_run_log};
use std::path::Path;
use tracing::{info, warn};

#[allow(clippy::too_many_arguments)]
pub fn run(
    root: &Path,
    config_file: Option<&Path>,
    include: Vec<String>,
    exclude: Vec<String>,
    files: Vec<String>,
    force_clean: bool,
    max_workers: Option<usize>,
) -> Result<()> {
    let ctx = ProjectContext::open(root, config_file)?;
    let mut embedder = build_embedding_provider(&ctx.config.search.semantic)?;
    if !embedder.ready() {
        warn!("embedder is not ready, falling back embeddings will be tagged accordingly");
    }

    let effective_max_workers = max_workers.unwrap_or(ctx.config.index.max_workers);
    let options = IndexOptions {
        include,
        exclude,
        files: if files.is_empty() { None } else { Some(files) },
        force_clean,
        max_workers,
    };

    let mut indexer_ctx = IndexerContext {
        conn: &ctx.conn,
        lexical: &ctx.lexical,
        vector: &ctx.vector,
        embedder: embedder.as_mut(),
        max_file_size: ctx.config.index.max_file_size,
        max_workers: effective_max_workers,
        languages: ctx.config.index.languages.clone(),
        embed_batch_size: ctx.config.search.semantic.batch_size,
    };

    let stats = match &options.files {
        Some(paths) => index_files(&mut indexer_ctx, &ctx.root, paths, &options),
        None => index_repository(&mut indexer_ctx, &ctx.root, &options),
    };

    let run_log = IndexRunLog::from_stats(now_iso8601(), &stats);
    let log_path = write_run_log(&ctx.data_dir, &run_log, unix_timestamp_secs())
        .context("failed to write index run log")?;
    info!(path = %log_path.display(), "wrote index run log");

    println!(
        "indexed {} files ({} fresh, {} stale, {} unchanged) in {:.2}s",
        stats.total,
        stats.fresh,
        stats.stale,
        stats.unchanged,
        stats.elapsed_ms as f64 / 1000.0
    );
    println!(
        "embedded {}, deleted {}, cache hit rate {:.1}%",
        stats.embedded,
        stats.deleted,
        stats.cache_hit_rate * 100.0
    );
    for language in &stats.per_language {
        println!("  {}: {} files", language.0, language.1);
    }
    for error in &stats.errors {
        warn!(file = %error.file, error = %error.error, "file failed to index");
    }

    match stats.outcome {
        RunOutcome::Success => Ok(()),
        RunOutcome::Partial => {
            println!("run completed with {} error(s)", stats.errors.len());
            Ok(())
        }
        RunOutcome::Failure => bail!("indexing failed: no files were indexed ({} errors)", stats.errors.len()),
    }
}
