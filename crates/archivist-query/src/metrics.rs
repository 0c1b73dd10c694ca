//! C11 metrics evaluator: Recall@k, MRR, nDCG@k, Precision@k and MAP over a
//! labelled query set.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One judged relevant file for a query. `relevance` follows a
/// three-point scale (1 = marginally relevant, 3 = exactly the file wanted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryJudgment {
    pub file: String,
    pub relevance: u8,
}

/// A single labelled query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledQuery {
    pub query: String,
    pub judgments: Vec<QueryJudgment>,
}

/// The five metrics computed for one query or averaged across a query set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub recall_at_k: f64,
    pub mrr: f64,
    pub ndcg_at_k: f64,
    pub precision_at_k: f64,
    pub average_precision: f64,
}

/// Per-query metrics plus the mean across the query set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub per_query: Vec<(String, QueryMetrics)>,
    pub mean: QueryMetrics,
}

/// Compare retrieved file paths against judged paths by basename, lower-cased
/// so judged paths in a queryset file need not match the indexed repo's
/// exact relative-path casing.
fn normalize_path(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_else(|| path.to_ascii_lowercase())
}

/// Score `retrieved` (already ranked, best first) against `judgments` at
/// cutoff `k`.
pub fn evaluate_query(retrieved: &[String], judgments: &[QueryJudgment], k: usize) -> QueryMetrics {
    let relevance_by_file: std::collections::HashMap<String, u8> = judgments
        .iter()
        .map(|j| (normalize_path(&j.file), j.relevance))
        .collect();

    let top_k: Vec<&String> = retrieved.iter().take(k).collect();
    let retrieved_relevances: Vec<u8> = top_k
        .iter()
        .map(|p| relevance_by_file.get(&normalize_path(p)).copied().unwrap_or(0))
        .collect();

    let total_relevant = judgments.iter().filter(|j| j.relevance > 0).count();
    let hits_at_k = retrieved_relevances.iter().filter(|&&r| r > 0).count();

    let recall_at_k = if total_relevant == 0 {
        0.0
    } else {
        hits_at_k as f64 / total_relevant as f64
    };

    let precision_at_k = if top_k.is_empty() {
        0.0
    } else {
        hits_at_k as f64 / top_k.len() as f64
    };

    let mrr = retrieved_relevances
        .iter()
        .position(|&r| r > 0)
        .map(|idx| 1.0 / (idx as f64 + 1.0))
        .unwrap_or(0.0);

    let dcg: f64 = retrieved_relevances
        .iter()
        .enumerate()
        .map(|(idx, &r)| (r as f64) / (idx as f64 + 2.0).log2())
        .sum();
    let mut ideal_relevances: Vec<u8> = judgments.iter().map(|j| j.relevance).collect();
    ideal_relevances.sort_unstable_by(|a, b| b.cmp(a));
    let idcg: f64 = ideal_relevances
        .iter()
        .take(k)
        .enumerate()
        .map(|(idx, &r)| (r as f64) / (idx as f64 + 2.0).log2())
        .sum();
    let ndcg_at_k = if idcg == 0.0 { 0.0 } else { dcg / idcg };

    let average_precision = if total_relevant == 0 {
        0.0
    } else {
        let mut hits = 0usize;
        let mut sum_precisions = 0.0;
        for (idx, &r) in retrieved_relevances.iter().enumerate() {
            if r > 0 {
                hits += 1;
                sum_precisions += hits as f64 / (idx as f64 + 1.0);
            }
        }
        sum_precisions / total_relevant as f64
    };

    QueryMetrics {
        recall_at_k,
        mrr,
        ndcg_at_k,
        precision_at_k,
        average_precision,
    }
}

/// Evaluate an entire labelled query set, calling `run_query` once per query
/// to get its ranked results (kept free of any store dependency so callers
/// can evaluate `search_semantic`, `search_keyword` or `search_hybrid`
/// interchangeably, since the CLI's `eval` subcommand picks one via `--mode`).
pub fn evaluate(queries: &[LabeledQuery], k: usize, mut run_query: impl FnMut(&str) -> Vec<String>) -> MetricsReport {
    let mut per_query = Vec::with_capacity(queries.len());
    for labeled in queries {
        let retrieved = run_query(&labeled.query);
        let metrics = evaluate_query(&retrieved, &labeled.judgments, k);
        per_query.push((labeled.query.clone(), metrics));
    }
    let mean = mean_metrics(&per_query);
    MetricsReport { per_query, mean }
}

fn mean_metrics(per_query: &[(String, QueryMetrics)]) -> QueryMetrics {
    if per_query.is_empty() {
        return QueryMetrics::default();
    }
    let n = per_query.len() as f64;
    let mut sum = QueryMetrics::default();
    for (_, m) in per_query {
        sum.recall_at_k += m.recall_at_k;
        sum.mrr += m.mrr;
        sum.ndcg_at_k += m.ndcg_at_k;
        sum.precision_at_k += m.precision_at_k;
        sum.average_precision += m.average_precision;
    }
    QueryMetrics {
        recall_at_k: sum.recall_at_k / n,
        mrr: sum.mrr / n,
        ndcg_at_k: sum.ndcg_at_k / n,
        precision_at_k: sum.precision_at_k / n,
        average_precision: sum.average_precision / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judgments(files: &[(&str, u8)]) -> Vec<QueryJudgment> {
        files
            .iter()
            .map(|(f, r)| QueryJudgment { file: f.to_string(), relevance: *r })
            .collect()
    }

    #[test]
    fn perfect_ranking_scores_one_on_everything() {
        let judged = judgments(&[("a.rs", 3), ("b.rs", 2)]);
        let retrieved = vec!["a.rs".to_string(), "b.rs".to_string()];
        let metrics = evaluate_query(&retrieved, &judged, 2);
        assert!((metrics.recall_at_k - 1.0).abs() < 1e-9);
        assert!((metrics.precision_at_k - 1.0).abs() < 1e-9);
        assert!((metrics.mrr - 1.0).abs() < 1e-9);
        assert!((metrics.ndcg_at_k - 1.0).abs() < 1e-9);
        assert!((metrics.average_precision - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_relevant_results_scores_zero() {
        let judged = judgments(&[("a.rs", 3)]);
        let retrieved = vec!["z.rs".to_string(), "y.rs".to_string()];
        let metrics = evaluate_query(&retrieved, &judged, 2);
        assert_eq!(metrics, QueryMetrics::default());
    }

    #[test]
    fn mrr_reflects_rank_of_first_hit() {
        let judged = judgments(&[("b.rs", 1)]);
        let retrieved = vec!["a.rs".to_string(), "b.rs".to_string(), "c.rs".to_string()];
        let metrics = evaluate_query(&retrieved, &judged, 3);
        assert!((metrics.mrr - 0.5).abs() < 1e-9);
    }

    #[test]
    fn path_comparison_ignores_directory_and_case() {
        let judged = judgments(&[("src/Auth.rs", 2)]);
        let retrieved = vec!["repo/src/auth.rs".to_string()];
        let metrics = evaluate_query(&retrieved, &judged, 1);
        assert!((metrics.recall_at_k - 1.0).abs() < 1e-9);
    }

    #[test]
    fn judgments_beyond_k_still_count_toward_recall_denominator() {
        let judged = judgments(&[("a.rs", 2), ("b.rs", 2), ("c.rs", 2)]);
        let retrieved = vec!["a.rs".to_string()];
        let metrics = evaluate_query(&retrieved, &judged, 1);
        assert!((metrics.recall_at_k - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn evaluate_averages_per_query_metrics() {
        let queries = vec![
            LabeledQuery {
                query: "one".into(),
                judgments: judgments(&[("a.rs", 3)]),
            },
            LabeledQuery {
                query: "two".into(),
                judgments: judgments(&[("b.rs", 3)]),
            },
        ];
        let report = evaluate(&queries, 1, |q| {
            if q == "one" {
                vec!["a.rs".to_string()]
            } else {
                vec!["z.rs".to_string()]
            }
        });
        assert_eq!(report.per_query.len(), 2);
        assert!((report.mean.recall_at_k - 0.5).abs() < 1e-9);
    }
}
