use crate::context::ProjectContext;
use anyhow::{Context, Result, bail};
use archivist_core::constants::DEFAULT_SEARCH_TIMEOUT_MS;
use archivist_core::types::SearchFilter;
use archivist_query::{search_hybrid, search_keyword, search_semantic};
use archivist_state::embedding::build_embedding_provider;
use clap::ValueEnum;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    root: &Path,
    config_file: Option<&Path>,
    mode: SearchMode,
    query: &str,
    limit: Option<usize>,
    filter_partition: Option<String>,
    filter_language: Option<String>,
    weights: Option<String>,
) -> Result<()> {
    let ctx = ProjectContext::open(root, config_file)?;
    let k = limit.unwrap_or(ctx.config.search.default_limit);
    let filter = SearchFilter {
        partition_id: filter_partition,
        language: filter_language,
    };

    let results = match mode {
        SearchMode::Keyword => search_keyword(&ctx.conn, &ctx.lexical, query, k, Some(&filter))?,
        SearchMode::Semantic => {
            let mut embedder = build_embedding_provider(&ctx.config.search.semantic)?;
            search_semantic(&ctx.conn, &ctx.vector, embedder.as_mut(), query, k, Some(&filter))?
        }
        SearchMode::Hybrid => {
            let mut embedder = build_embedding_provider(&ctx.config.search.semantic)?;
            let blend_weights = match &weights {
                Some(raw) => parse_weights(raw)?,
                None => ctx.config.effective_weights(None),
            };
            let response = search_hybrid(
                &ctx.conn,
                &ctx.vector,
                &ctx.lexical,
                embedder.as_mut(),
                query,
                k,
                Some(&filter),
                blend_weights,
                Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS),
            )?;
            if response.partial {
                warn!("one side of the hybrid search timed out; results reflect the other side alone");
            }
            response.results
        }
    };

    if results.is_empty() {
        println!("no results");
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>2}. {:.4}  {}  [{}, authority={:.2}, {:?}]",
            rank + 1,
            result.score,
            result.file_path,
            result.metadata.partition,
            result.metadata.authority_score,
            result.metadata.match_type
        );
        println!("    {}", result.snippet);
    }
    Ok(())
}

/// Parses `w_semantic,w_lexical` and normalizes the pair to sum to 1 so the
/// fusion-bounds property (`final ∈ [0, 1]`) holds regardless of what the
/// caller passed in: `--weights 0.9,0.9` becomes `0.5,0.5` rather than a
/// base score that can exceed 1.
fn parse_weights(raw: &str) -> Result<(f64, f64)> {
    let (s, l) = raw
        .split_once(',')
        .with_context(|| format!("expected `w_semantic,w_lexical`, got `{raw}`"))?;
    let semantic: f64 = s.trim().parse().with_context(|| format!("invalid semantic weight: {s}"))?;
    let lexical: f64 = l.trim().parse().with_context(|| format!("invalid lexical weight: {l}"))?;
    if semantic < 0.0 || lexical < 0.0 {
        bail!("weights must be non-negative");
    }
    let total = semantic + lexical;
    if total <= 0.0 {
        bail!("at least one weight must be positive");
    }
    Ok((semantic / total, lexical / total))
}
