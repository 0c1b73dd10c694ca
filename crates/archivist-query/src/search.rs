//! C10 hybrid search engine: `search_semantic`, `search_keyword` and
//! `search_hybrid`.
//!
//! Each store call is synchronous and blocking (archivist-state's vector and
//! lexical stores already bridge their own async internals), so the
//! semantic/lexical fan-out here runs on two OS threads joined with a
//! timeout rather than an async executor — mirroring the bounded-worker
//! pattern the indexer uses for extraction (`archivist-indexer::orchestrator`).

use archivist_core::constants;
use archivist_core::error::QueryError;
use archivist_core::types::{MatchType, ResultMetadata, SearchFilter, SearchResult};
use archivist_state::embedding::EmbeddingProvider;
use archivist_state::lexical::{LexicalFilter, LexicalMatch, LexicalStore};
use archivist_state::vector_store::{VectorFilter, VectorMatch, VectorStore};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Duration;

use crate::fusion::{apply_authority, blend, normalize_min_max};

/// A completed or partially-completed search.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// `true` when one side (C7 or C8) did not return within the timeout and
    /// the other side's results were used alone.
    pub partial: bool,
}

fn candidate_k(k: usize) -> usize {
    (k * constants::SEARCH_CANDIDATE_MULTIPLIER).max(constants::SEARCH_CANDIDATE_FLOOR)
}

fn snippet_from(text: &str) -> String {
    let truncated: String = text.chars().take(constants::SEARCH_SNIPPET_CHARS).collect();
    match truncated.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 && truncated.len() == constants::SEARCH_SNIPPET_CHARS => {
            truncated[..idx].trim_end().to_string()
        }
        _ => truncated.trim_end().to_string(),
    }
}

fn to_lexical_filter(filter: Option<&SearchFilter>) -> Option<LexicalFilter> {
    filter.map(|f| LexicalFilter {
        partition_id: f.partition_id.clone(),
        language: f.language.clone(),
    })
}

fn to_vector_filter(filter: Option<&SearchFilter>) -> Option<VectorFilter> {
    filter.map(|f| VectorFilter {
        partition_id: f.partition_id.clone(),
        language: f.language.clone(),
    })
}

/// Build a `SearchResult` for `file_id`, looking up its record for the
/// snippet/partition/path. Returns `None` when the file has disappeared from
/// the metadata store between the store hit and this lookup.
fn build_result(
    conn: &Connection,
    file_id: &str,
    original_score: f64,
    final_score: f64,
    match_type: MatchType,
) -> Result<Option<SearchResult>, QueryError> {
    let Some(file) = archivist_state::metadata::find_file_by_id(conn, file_id)? else {
        return Ok(None);
    };
    Ok(Some(SearchResult {
        file_path: file.path,
        score: final_score,
        snippet: snippet_from(&file.embedding_text),
        metadata: ResultMetadata {
            partition: file.partition_id,
            authority_score: file.authority_score,
            original_score,
            match_type,
        },
    }))
}

/// Semantic-only search: embed `query`, fetch the top candidates
/// from C7, weight by authority, rank, truncate to `k`.
pub fn search_semantic(
    conn: &Connection,
    vector_store: &VectorStore,
    embedder: &mut dyn EmbeddingProvider,
    query: &str,
    k: usize,
    filter: Option<&SearchFilter>,
) -> Result<Vec<SearchResult>, QueryError> {
    if query.trim().is_empty() || k == 0 {
        return Ok(Vec::new());
    }
    let mut vectors = embedder.embed_batch(std::slice::from_ref(&query.to_string()))?;
    let Some(query_vector) = vectors.pop() else {
        return Ok(Vec::new());
    };

    let matches = vector_store.search(&query_vector, candidate_k(k), to_vector_filter(filter).as_ref())?;
    rank_vector_matches(conn, &matches, k)
}

/// Keyword-only search: BM25 over C8, weighted by authority.
pub fn search_keyword(
    conn: &Connection,
    lexical_store: &LexicalStore,
    query: &str,
    k: usize,
    filter: Option<&SearchFilter>,
) -> Result<Vec<SearchResult>, QueryError> {
    if query.trim().is_empty() || k == 0 {
        return Ok(Vec::new());
    }
    let matches = lexical_store.search(query, candidate_k(k), to_lexical_filter(filter).as_ref())?;
    rank_lexical_matches(conn, &matches, k)
}

fn rank_vector_matches(conn: &Connection, matches: &[VectorMatch], k: usize) -> Result<Vec<SearchResult>, QueryError> {
    let normalized = normalize_min_max(&matches.iter().map(|m| m.score).collect::<Vec<_>>());
    let mut scored: Vec<(String, f64, f64)> = Vec::with_capacity(matches.len());
    for (m, norm) in matches.iter().zip(normalized.iter()) {
        let authority = authority_of(conn, &m.file_id)?;
        scored.push((m.file_id.clone(), m.score, apply_authority(*norm, authority)));
    }
    finalize_ranking(conn, scored, k, MatchType::Semantic)
}

fn rank_lexical_matches(conn: &Connection, matches: &[LexicalMatch], k: usize) -> Result<Vec<SearchResult>, QueryError> {
    let normalized = normalize_min_max(&matches.iter().map(|m| m.bm25_score).collect::<Vec<_>>());
    let mut scored: Vec<(String, f64, f64)> = Vec::with_capacity(matches.len());
    for (m, norm) in matches.iter().zip(normalized.iter()) {
        let authority = authority_of(conn, &m.file_id)?;
        scored.push((m.file_id.clone(), m.bm25_score, apply_authority(*norm, authority)));
    }
    finalize_ranking(conn, scored, k, MatchType::Lexical)
}

fn authority_of(conn: &Connection, file_id: &str) -> Result<f64, QueryError> {
    Ok(archivist_state::metadata::find_file_by_id(conn, file_id)?
        .map(|f| f.authority_score)
        .unwrap_or(0.0))
}

fn finalize_ranking(
    conn: &Connection,
    mut scored: Vec<(String, f64, f64)>,
    k: usize,
    match_type: MatchType,
) -> Result<Vec<SearchResult>, QueryError> {
    scored.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    let mut results = Vec::with_capacity(k.min(scored.len()));
    for (file_id, original, final_score) in scored.into_iter().take(k) {
        if let Some(result) = build_result(conn, &file_id, original, final_score, match_type)? {
            results.push(result);
        }
    }
    Ok(results)
}

/// Hybrid search: fan out to C7 and C8 in parallel with a
/// timeout, min-max normalize each side, blend with `weights`, multiply by
/// authority, rank, truncate to `k`.
#[allow(clippy::too_many_arguments)]
pub fn search_hybrid(
    conn: &Connection,
    vector_store: &VectorStore,
    lexical_store: &LexicalStore,
    embedder: &mut dyn EmbeddingProvider,
    query: &str,
    k: usize,
    filter: Option<&SearchFilter>,
    weights: (f64, f64),
    timeout: Duration,
) -> Result<SearchResponse, QueryError> {
    if query.trim().is_empty() || k == 0 {
        return Ok(SearchResponse { results: Vec::new(), partial: false });
    }

    let mut vectors = embedder.embed_batch(std::slice::from_ref(&query.to_string()))?;
    let query_vector = vectors.pop().unwrap_or_default();

    let candidates = candidate_k(k);
    let vector_filter = to_vector_filter(filter);
    let lexical_filter = to_lexical_filter(filter);

    let (semantic_tx, semantic_rx) = mpsc::channel();
    let (lexical_tx, lexical_rx) = mpsc::channel();

    std::thread::scope(|scope| {
        scope.spawn(move || {
            let _ = semantic_tx.send(vector_store.search(&query_vector, candidates, vector_filter.as_ref()));
        });
        scope.spawn(move || {
            let _ = lexical_tx.send(lexical_store.search(query, candidates, lexical_filter.as_ref()));
        });

        let semantic = semantic_rx.recv_timeout(timeout);
        let lexical = lexical_rx.recv_timeout(timeout);

        let (semantic_matches, semantic_timed_out) = match semantic {
            Ok(Ok(m)) => (m, false),
            Ok(Err(e)) => return Err(QueryError::from(e)),
            Err(_) => (Vec::new(), true),
        };
        let (lexical_matches, lexical_timed_out) = match lexical {
            Ok(Ok(m)) => (m, false),
            Ok(Err(e)) => return Err(QueryError::from(e)),
            Err(_) => (Vec::new(), true),
        };

        let partial = semantic_timed_out || lexical_timed_out;
        let results = blend_matches(conn, &semantic_matches, &lexical_matches, k, weights)?;
        Ok(SearchResponse { results, partial })
    })
}

fn blend_matches(
    conn: &Connection,
    semantic: &[VectorMatch],
    lexical: &[LexicalMatch],
    k: usize,
    weights: (f64, f64),
) -> Result<Vec<SearchResult>, QueryError> {
    let (w_semantic, w_lexical) = weights;
    let norm_semantic = normalize_min_max(&semantic.iter().map(|m| m.score).collect::<Vec<_>>());
    let norm_lexical = normalize_min_max(&lexical.iter().map(|m| m.bm25_score).collect::<Vec<_>>());

    let mut semantic_by_file: HashMap<&str, f64> = HashMap::new();
    for (m, norm) in semantic.iter().zip(norm_semantic.iter()) {
        semantic_by_file.insert(m.file_id.as_str(), *norm);
    }
    let mut lexical_by_file: HashMap<&str, f64> = HashMap::new();
    for (m, norm) in lexical.iter().zip(norm_lexical.iter()) {
        lexical_by_file.insert(m.file_id.as_str(), *norm);
    }

    let mut file_ids: Vec<&str> = semantic_by_file.keys().chain(lexical_by_file.keys()).copied().collect();
    file_ids.sort_unstable();
    file_ids.dedup();

    let mut scored: Vec<(String, f64, f64)> = Vec::with_capacity(file_ids.len());
    for file_id in file_ids {
        let norm_s = semantic_by_file.get(file_id).copied();
        let norm_l = lexical_by_file.get(file_id).copied();
        let base = blend(norm_s, norm_l, w_semantic, w_lexical);
        let authority = authority_of(conn, file_id)?;
        scored.push((file_id.to_string(), base, apply_authority(base, authority)));
    }

    finalize_ranking(conn, scored, k, MatchType::Hybrid)
}
