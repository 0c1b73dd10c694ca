//! Hybrid retrieval (C10) and IR metrics (C11): query-time consumers of the
//! metadata, lexical and vector stores built by `archivist-state`.

pub mod fusion;
pub mod metrics;
pub mod search;

pub use metrics::{LabeledQuery, MetricsReport, QueryJudgment, QueryMetrics, evaluate, evaluate_query};
pub use search::{SearchResponse, search_hybrid, search_keyword, search_semantic};
