//! Canonical language detection and the indexable-language set shared by the
//! walker (C1), the symbol extractor (C2), and config validation.

/// Languages with full tree-sitter symbol/import extraction.
pub const INDEXABLE_SOURCE_LANGUAGES: [&str; 4] = ["rust", "typescript", "python", "go"];

/// Documentation languages: no symbol extraction, but still walked and given
/// a file record plus the doc-body embedding text path.
pub const DOCUMENTATION_LANGUAGES: [&str; 2] = ["markdown", "text"];

pub fn is_indexable_source_language(language: &str) -> bool {
    INDEXABLE_SOURCE_LANGUAGES.contains(&language)
}

pub fn is_documentation_language(language: &str) -> bool {
    DOCUMENTATION_LANGUAGES.contains(&language)
}

pub fn supported_indexable_languages() -> &'static [&'static str] {
    &INDEXABLE_SOURCE_LANGUAGES
}

/// Detect a language label from a file extension. Returns `None` for
/// extensions that are neither source nor documentation (config files,
/// lockfiles, etc.) so the walker can skip them outright.
pub fn detect_language_from_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "rs" => Some("rust"),
        "ts" | "tsx" => Some("typescript"),
        "js" | "jsx" | "mjs" | "cjs" => Some("javascript"),
        "py" | "pyi" => Some("python"),
        "go" => Some("go"),
        "java" => Some("java"),
        "c" | "h" => Some("c"),
        "cpp" | "cc" | "cxx" | "hpp" => Some("cpp"),
        "rb" => Some("ruby"),
        "swift" => Some("swift"),
        "kt" | "kts" => Some("kotlin"),
        "md" | "markdown" => Some("markdown"),
        "txt" => Some("text"),
        // Config/lockfiles: not source inputs for the indexing pipeline.
        "toml" | "yaml" | "yml" | "json" | "lock" => None,
        _ => None,
    }
}
