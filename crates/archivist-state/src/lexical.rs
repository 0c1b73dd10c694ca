//! C8 lexical store: a single Tantivy index over tokenised symbol names and
//! file paths, scored with Tantivy's built-in BM25 (k1 = 1.2, b = 0.75 —
//! Tantivy's own defaults, so no explicit tuning is needed).

use crate::tokenizers;
use archivist_core::error::StateError;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::*;
use tantivy::{Index, IndexWriter, Term, doc};

const WRITER_HEAP_BYTES: usize = 32 * 1024 * 1024;

/// A lexical document as upserted by the orchestrator.
#[derive(Debug, Clone)]
pub struct LexicalDoc {
    pub file_id: String,
    pub path: String,
    pub symbol_names: Vec<String>,
    pub language: String,
    pub partition_id: String,
    pub authority_score: f64,
}

/// A single match from `search`, before min-max normalisation (done by the
/// query layer, not the store).
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalMatch {
    pub file_id: String,
    pub bm25_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LexicalFilter {
    pub partition_id: Option<String>,
    pub language: Option<String>,
}

struct Fields {
    file_id: Field,
    path: Field,
    symbol_names: Field,
    language: Field,
    partition_id: Field,
    authority_score: Field,
}

pub struct LexicalStore {
    index: Index,
    fields: Fields,
}

impl LexicalStore {
    pub fn open(dir: &Path) -> Result<Self, StateError> {
        std::fs::create_dir_all(dir).map_err(StateError::Io)?;
        let (schema, fields) = build_schema();

        let index = if dir_is_empty(dir)? {
            Index::create_in_dir(dir, schema).map_err(StateError::tantivy)?
        } else {
            Index::open_in_dir(dir).map_err(|e| {
                StateError::CorruptManifest(format!("failed to open lexical index: {e}"))
            })?
        };
        tokenizers::register_tokenizers(index.tokenizers());
        Ok(Self { index, fields })
    }

    fn writer(&self) -> Result<IndexWriter, StateError> {
        self.index
            .writer(WRITER_HEAP_BYTES)
            .map_err(StateError::tantivy)
    }

    /// Replace any prior document for `doc.file_id`.
    pub fn upsert(&self, doc: &LexicalDoc) -> Result<(), StateError> {
        let mut writer = self.writer()?;
        writer.delete_term(Term::from_field_text(self.fields.file_id, &doc.file_id));
        writer
            .add_document(doc!(
                self.fields.file_id => doc.file_id.clone(),
                self.fields.path => doc.path.clone(),
                self.fields.symbol_names => doc.symbol_names.join(" "),
                self.fields.language => doc.language.clone(),
                self.fields.partition_id => doc.partition_id.clone(),
                self.fields.authority_score => doc.authority_score,
            ))
            .map_err(StateError::tantivy)?;
        writer.commit().map_err(StateError::tantivy)?;
        Ok(())
    }

    pub fn delete(&self, file_id: &str) -> Result<(), StateError> {
        let mut writer = self.writer()?;
        writer.delete_term(Term::from_field_text(self.fields.file_id, file_id));
        writer.commit().map_err(StateError::tantivy)?;
        Ok(())
    }

    /// BM25 top-k over `path` and `symbol_names`, deterministically
    /// tie-broken by `file_id` ascending.
    pub fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&LexicalFilter>,
    ) -> Result<Vec<LexicalMatch>, StateError> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let reader = self.index.reader().map_err(StateError::tantivy)?;
        let searcher = reader.searcher();

        let query_parser =
            QueryParser::for_index(&self.index, vec![self.fields.path, self.fields.symbol_names]);
        let parsed = query_parser
            .parse_query(&sanitize_query(query))
            .map_err(|e| StateError::tantivy(format!("invalid query: {e}")))?;

        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(k * 4 + k))
            .map_err(StateError::tantivy)?;

        let mut matches = Vec::new();
        for (score, addr) in top_docs {
            let retrieved = searcher
                .doc::<tantivy::TantivyDocument>(addr)
                .map_err(StateError::tantivy)?;
            let file_id = retrieved
                .get_first(self.fields.file_id)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            if !passes_filter(&retrieved, &self.fields, filter) {
                continue;
            }
            matches.push(LexicalMatch {
                file_id,
                bm25_score: score as f64,
            });
        }

        matches.sort_by(|a, b| {
            b.bm25_score
                .partial_cmp(&a.bm25_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file_id.cmp(&b.file_id))
        });
        matches.truncate(k);
        Ok(matches)
    }

    pub fn count(&self) -> Result<usize, StateError> {
        let reader = self.index.reader().map_err(StateError::tantivy)?;
        Ok(reader.searcher().num_docs() as usize)
    }
}

fn passes_filter(
    doc: &tantivy::TantivyDocument,
    fields: &Fields,
    filter: Option<&LexicalFilter>,
) -> bool {
    let Some(filter) = filter else { return true };
    if let Some(partition) = &filter.partition_id {
        let actual = doc.get_first(fields.partition_id).and_then(|v| v.as_str());
        if actual != Some(partition.as_str()) {
            return false;
        }
    }
    if let Some(language) = &filter.language {
        let actual = doc.get_first(fields.language).and_then(|v| v.as_str());
        if actual != Some(language.as_str()) {
            return false;
        }
    }
    true
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let file_id = builder.add_text_field("file_id", STRING | STORED);

    let path_options = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("code_path")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();
    let path = builder.add_text_field("path", path_options);

    let symbol_options = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("code_identifier")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();
    let symbol_names = builder.add_text_field("symbol_names", symbol_options);

    let language = builder.add_text_field("language", STRING | STORED);
    let partition_id = builder.add_text_field("partition_id", STRING | STORED);
    let authority_score = builder.add_f64_field("authority_score", STORED);

    (
        builder.build(),
        Fields {
            file_id,
            path,
            symbol_names,
            language,
            partition_id,
            authority_score,
        },
    )
}

fn dir_is_empty(path: &Path) -> Result<bool, StateError> {
    let mut entries = std::fs::read_dir(path).map_err(StateError::Io)?;
    Ok(entries.next().is_none())
}

/// Tantivy's query parser treats bare identifier characters like `_` as part
/// of a term but chokes on stray `:` from e.g. `std::io`; normalise those to
/// spaces so callers can pass raw code tokens as a query.
fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .map(|c| if c == ':' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn doc(file_id: &str, path: &str, names: &[&str]) -> LexicalDoc {
        LexicalDoc {
            file_id: file_id.to_string(),
            path: path.to_string(),
            symbol_names: names.iter().map(|s| s.to_string()).collect(),
            language: "rust".to_string(),
            partition_id: "project".to_string(),
            authority_score: 0.35,
        }
    }

    #[test]
    fn upsert_then_search_finds_matching_symbol() {
        let dir = tempdir().unwrap();
        let store = LexicalStore::open(dir.path()).unwrap();
        store
            .upsert(&doc("f1", "src/auth.rs", &["validateToken"]))
            .unwrap();

        let results = store.search("validate", 10, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_id, "f1");
    }

    #[test]
    fn upsert_replaces_prior_document_for_same_file() {
        let dir = tempdir().unwrap();
        let store = LexicalStore::open(dir.path()).unwrap();
        store.upsert(&doc("f1", "src/a.rs", &["foo"])).unwrap();
        store.upsert(&doc("f1", "src/a.rs", &["bar"])).unwrap();

        assert!(store.search("foo", 10, None).unwrap().is_empty());
        assert_eq!(store.search("bar", 10, None).unwrap().len(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn delete_removes_document() {
        let dir = tempdir().unwrap();
        let store = LexicalStore::open(dir.path()).unwrap();
        store.upsert(&doc("f1", "src/a.rs", &["foo"])).unwrap();
        store.delete("f1").unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn search_respects_partition_filter() {
        let dir = tempdir().unwrap();
        let store = LexicalStore::open(dir.path()).unwrap();
        let mut constitutional = doc("f1", "etc/decisions/adr1.md", &["decision"]);
        constitutional.partition_id = "dom0".to_string();
        store.upsert(&constitutional).unwrap();
        store
            .upsert(&doc("f2", "src/decisionEngine.rs", &["decisionEngine"]))
            .unwrap();

        let filter = LexicalFilter {
            partition_id: Some("dom0".to_string()),
            language: None,
        };
        let results = store.search("decision", 10, Some(&filter)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_id, "f1");
    }

    #[test]
    fn search_tie_breaks_by_file_id_ascending() {
        let dir = tempdir().unwrap();
        let store = LexicalStore::open(dir.path()).unwrap();
        store.upsert(&doc("zzz", "src/parse.rs", &["parse"])).unwrap();
        store.upsert(&doc("aaa", "src/parse2.rs", &["parse"])).unwrap();

        let results = store.search("parse", 10, None).unwrap();
        assert_eq!(results.len(), 2);
        // Equal relevance -> deterministic ascending file_id order.
        if (results[0].bm25_score - results[1].bm25_score).abs() < 1e-6 {
            assert_eq!(results[0].file_id, "aaa");
        }
    }
}
