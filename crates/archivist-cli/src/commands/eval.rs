use crate::commands::search::SearchMode;
use crate::context::ProjectContext;
use anyhow::{Context, Result};
use archivist_core::constants::DEFAULT_SEARCH_TIMEOUT_MS;
use archivist_query::{LabeledQuery, evaluate, search_hybrid, search_keyword, search_semantic};
use archivist_state::embedding::build_embedding_provider;
use std::path::Path;
use std::time::Duration;

pub fn run(root: &Path, config_file: Option<&Path>, queryset_path: &Path, mode: SearchMode, k: usize) -> Result<()> {
    let ctx = ProjectContext::open(root, config_file)?;
    let raw = std::fs::read_to_string(queryset_path)
        .with_context(|| format!("failed to read query set: {}", queryset_path.display()))?;
    let queries: Vec<LabeledQuery> =
        serde_json::from_str(&raw).with_context(|| format!("invalid query set JSON: {}", queryset_path.display()))?;
    if queries.is_empty() {
        println!("query set is empty, nothing to evaluate");
        return Ok(());
    }

    let mut embedder = match mode {
        SearchMode::Keyword => None,
        SearchMode::Semantic | SearchMode::Hybrid => Some(build_embedding_provider(&ctx.config.search.semantic)?),
    };
    let weights = ctx.config.effective_weights(None);

    let report = evaluate(&queries, k, |query| {
        let results = match mode {
            SearchMode::Keyword => search_keyword(&ctx.conn, &ctx.lexical, query, k, None),
            SearchMode::Semantic => search_semantic(
                &ctx.conn,
                &ctx.vector,
                embedder.as_deref_mut().expect("semantic embedder initialized"),
                query,
                k,
                None,
            ),
            SearchMode::Hybrid => search_hybrid(
                &ctx.conn,
                &ctx.vector,
                &ctx.lexical,
                embedder.as_deref_mut().expect("hybrid embedder initialized"),
                query,
                k,
                None,
                weights,
                Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS),
            )
            .map(|r| r.results),
        };
        results.map(|rs| rs.into_iter().map(|r| r.file_path).collect()).unwrap_or_default()
    });

    for (query, metrics) in &report.per_query {
        println!(
            "{query}: recall@{k}={:.3} mrr={:.3} ndcg@{k}={:.3} precision@{k}={:.3} ap={:.3}",
            metrics.recall_at_k, metrics.mrr, metrics.ndcg_at_k, metrics.precision_at_k, metrics.average_precision
        );
    }
    println!(
        "mean: recall@{k}={:.3} mrr={:.3} ndcg@{k}={:.3} precision@{k}={:.3} map={:.3}",
        report.mean.recall_at_k,
        report.mean.mrr,
        report.mean.ndcg_at_k,
        report.mean.precision_at_k,
        report.mean.average_precision
    );
    Ok(())
}
