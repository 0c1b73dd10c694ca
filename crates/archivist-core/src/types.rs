use serde::{Deserialize, Serialize};

/// Symbol kinds recognized by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Interface,
    Type,
    Enum,
    Variable,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Method => "method",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Variable => "variable",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        match s {
            "function" | "fn" | "func" | "def" => Some(Self::Function),
            "class" | "struct" => Some(Self::Class),
            "method" => Some(Self::Method),
            "interface" | "trait" => Some(Self::Interface),
            "type" | "type_alias" => Some(Self::Type),
            "enum" => Some(Self::Enum),
            "variable" | "var" | "const" | "constant" => Some(Self::Variable),
            _ => None,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embedding lifecycle state for a file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStatus {
    #[default]
    Pending,
    Embedded,
    Failed,
}

impl EmbeddingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Embedded => "embedded",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "embedded" => Some(Self::Embedded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Per-file freshness classification from the walker (C1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Fresh,
    Stale,
    Unchanged,
}

/// A file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: String,
    pub path: String,
    pub language: String,
    pub content_hash: String,
    pub size: u64,
    pub mtime: Option<i64>,
    pub partition_id: String,
    pub authority_score: f64,
    pub embedding_text: String,
    pub embedding_status: EmbeddingStatus,
    pub embedding_model_id: Option<String>,
    pub indexed_at: String,
}

/// A symbol definition extracted from source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol_id: String,
    pub file_id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub line: u32,
    pub column: u32,
    pub is_exported: bool,
    pub parent_symbol_id: Option<String>,
    pub signature: Option<String>,
}

/// An import edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEdge {
    pub file_id: String,
    pub module_path: String,
    pub imported_name: Option<String>,
    pub is_default: bool,
}

/// Result of classifying a path (C4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub partition_id: String,
    pub authority_score: f64,
    pub reason: String,
}

/// Match type attached to a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Semantic,
    Lexical,
    Hybrid,
}

/// Metadata carried alongside a search result's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub partition: String,
    pub authority_score: f64,
    pub original_score: f64,
    pub match_type: MatchType,
}

/// A ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_path: String,
    pub score: f64,
    pub snippet: String,
    pub metadata: ResultMetadata,
}

/// Per-file error accumulated during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFileError {
    pub file: String,
    pub error: String,
}

/// Outcome of a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Partial,
    Failure,
}

/// Summary of one `index_repository`/`index_files` run (C9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total: usize,
    pub fresh: usize,
    pub stale: usize,
    pub unchanged: usize,
    pub indexed: usize,
    pub embedded: usize,
    pub deleted: usize,
    pub per_language: std::collections::BTreeMap<String, usize>,
    pub errors: Vec<IndexFileError>,
    pub elapsed_ms: u64,
    pub cache_hit_rate: f64,
    pub outcome: RunOutcome,
    /// Repo-relative paths successfully (re)indexed this run, for the run log's
    /// `details.indexed` list.
    pub indexed_files: Vec<String>,
    /// Repo-relative paths left untouched because their content hash matched
    /// the prior run, for the run log's `details.skipped` list.
    pub skipped_files: Vec<String>,
}

impl IndexStats {
    pub fn finalize(&mut self) {
        self.cache_hit_rate = if self.total == 0 {
            0.0
        } else {
            self.unchanged as f64 / self.total as f64
        };
        self.outcome = if self.errors.is_empty() {
            RunOutcome::Success
        } else if self.indexed > 0 || self.total == 0 {
            RunOutcome::Partial
        } else {
            RunOutcome::Failure
        };
    }
}

/// Options accepted by `index_repository`/`index_files`.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub files: Option<Vec<String>>,
    pub force_clean: bool,
    pub max_workers: Option<usize>,
}

/// Filter pushed into C7/C8 searches.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub partition_id: Option<String>,
    pub language: Option<String>,
}

/// Fusion weights for hybrid search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub semantic: f64,
    pub lexical: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            semantic: crate::constants::DEFAULT_SEMANTIC_WEIGHT,
            lexical: crate::constants::DEFAULT_LEXICAL_WEIGHT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_kind_roundtrip() {
        for kind in [
            SymbolKind::Function,
            SymbolKind::Class,
            SymbolKind::Method,
            SymbolKind::Interface,
            SymbolKind::Type,
            SymbolKind::Enum,
            SymbolKind::Variable,
        ] {
            assert_eq!(SymbolKind::parse_kind(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn embedding_status_serde_roundtrip() {
        for (variant, expected) in [
            (EmbeddingStatus::Pending, "\"pending\""),
            (EmbeddingStatus::Embedded, "\"embedded\""),
            (EmbeddingStatus::Failed, "\"failed\""),
        ] {
            let json = serde_json::to_string(&variant).unwrap();
            assert_eq!(json, expected);
            let parsed: EmbeddingStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, variant);
        }
    }

    #[test]
    fn index_stats_finalize_success_with_no_errors() {
        let mut stats = IndexStats {
            total: 10,
            unchanged: 4,
            indexed: 6,
            ..Default::default()
        };
        stats.finalize();
        assert_eq!(stats.outcome, RunOutcome::Success);
        assert!((stats.cache_hit_rate - 0.4).abs() < 1e-9);
    }

    #[test]
    fn index_stats_finalize_partial_with_some_indexed_and_errors() {
        let mut stats = IndexStats {
            total: 5,
            indexed: 3,
            errors: vec![IndexFileError {
                file: "a.rs".into(),
                error: "parse".into(),
            }],
            ..Default::default()
        };
        stats.finalize();
        assert_eq!(stats.outcome, RunOutcome::Partial);
    }

    #[test]
    fn index_stats_finalize_failure_when_nothing_indexed_but_errors_present() {
        let mut stats = IndexStats {
            total: 2,
            indexed: 0,
            errors: vec![
                IndexFileError {
                    file: "a.rs".into(),
                    error: "e".into(),
                },
                IndexFileError {
                    file: "b.rs".into(),
                    error: "e".into(),
                },
            ],
            ..Default::default()
        };
        stats.finalize();
        assert_eq!(stats.outcome, RunOutcome::Failure);
    }

    #[test]
    fn fusion_weights_default_is_point_seven_point_three() {
        let w = FusionWeights::default();
        assert!((w.semantic - 0.7).abs() < 1e-9);
        assert!((w.lexical - 0.3).abs() < 1e-9);
    }
}
