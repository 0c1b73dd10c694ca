//! Per-language symbol/import extraction (C2). Each submodule walks a
//! tree-sitter syntax tree for one language and emits [`ExtractedSymbol`]s
//! and [`ExtractedImport`]s in the shape the metadata store expects.

pub mod go;
pub mod python;
pub mod rust;
pub mod typescript;

use archivist_core::types::SymbolKind;

/// A symbol found by the extractor, before `symbol_id`/`parent_symbol_id`
/// assignment (done by the orchestrator once every symbol in the file has a
/// stable id).
#[derive(Debug, Clone)]
pub struct ExtractedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: u32,
    pub column: u32,
    pub is_exported: bool,
    pub parent_name: Option<String>,
    pub signature: Option<String>,
}

/// An import/use edge found by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImport {
    pub module_path: String,
    pub imported_name: Option<String>,
    pub is_default: bool,
}

/// Extract symbols for a parsed tree. Unsupported languages (or a caller that
/// skipped parsing for a non-indexable language) yield no symbols; this
/// never fails the run.
pub fn extract_symbols(tree: &tree_sitter::Tree, source: &str, language: &str) -> Vec<ExtractedSymbol> {
    match language {
        "rust" => rust::extract(tree, source),
        "python" => python::extract(tree, source),
        "go" => go::extract(tree, source),
        "typescript" => typescript::extract(tree, source),
        _ => Vec::new(),
    }
}

pub fn extract_imports(tree: &tree_sitter::Tree, source: &str, language: &str) -> Vec<ExtractedImport> {
    match language {
        "rust" => rust::extract_imports(tree, source),
        "python" => python::extract_imports(tree, source),
        "go" => go::extract_imports(tree, source),
        "typescript" => typescript::extract_imports(tree, source),
        _ => Vec::new(),
    }
}

pub(crate) fn node_text(node: tree_sitter::Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}
