//! C3 embedding-text builder: one deterministic, bounded-length string per
//! file summarizing path, language, exported symbols, and leading
//! documentation.

use crate::languages::ExtractedSymbol;
use archivist_core::constants::{EMBED_TEXT_DOC_TOKEN_CAP, EMBED_TEXT_MAX_BYTES, EMBED_TEXT_MAX_SYMBOLS};
use archivist_core::languages::is_documentation_language;

/// Build the embedding text for a file. Deterministic over
/// `(path, language, symbols, source)` — the same inputs always yield the
/// same byte-identical string.
pub fn build_embedding_text(
    path: &str,
    language: &str,
    symbols: &[ExtractedSymbol],
    source: &str,
) -> String {
    let mut text = String::new();
    text.push_str(&format!("path: {path}\nlanguage: {language}\n"));

    let exported: Vec<&ExtractedSymbol> = symbols.iter().filter(|s| s.is_exported).collect();
    if !exported.is_empty() {
        text.push_str("symbols:\n");
        for sym in exported.iter().take(EMBED_TEXT_MAX_SYMBOLS) {
            text.push_str(&format!("- {} ({})\n", sym.name, sym.kind.as_str()));
        }
    }

    if let Some(doc) = leading_doc_comment(source, language) {
        text.push_str("doc:\n");
        text.push_str(&doc);
        text.push('\n');
    }

    if is_documentation_language(language) {
        text.push_str("body:\n");
        text.push_str(&first_n_tokens(source, EMBED_TEXT_DOC_TOKEN_CAP));
        text.push('\n');
    }

    truncate_bytes(&text, EMBED_TEXT_MAX_BYTES)
}

/// Extract the leading documentation block or comment at the top of a file,
/// stripping the language's comment markers. Stops at the first non-comment,
/// non-blank line. Returns `None` for files with no leading comment.
fn leading_doc_comment(source: &str, language: &str) -> Option<String> {
    match language {
        "python" => leading_python_docstring(source).or_else(|| leading_hash_comment(source)),
        "rust" | "go" | "typescript" => leading_slash_comment(source),
        _ => None,
    }
}

fn leading_slash_comment(source: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() && lines.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("///") {
            lines.push(rest.trim().to_string());
        } else if let Some(rest) = trimmed.strip_prefix("//!") {
            lines.push(rest.trim().to_string());
        } else if let Some(rest) = trimmed.strip_prefix("//") {
            lines.push(rest.trim().to_string());
        } else if trimmed.starts_with("/**") || trimmed.starts_with("/*") {
            let stripped = trimmed.trim_start_matches("/**").trim_start_matches("/*");
            let stripped = stripped.trim_end_matches("*/").trim_start_matches('*').trim();
            if !stripped.is_empty() {
                lines.push(stripped.to_string());
            }
        } else if trimmed.starts_with('*') && !trimmed.starts_with("*/") {
            lines.push(trimmed.trim_start_matches('*').trim().to_string());
        } else {
            break;
        }
    }
    if lines.is_empty() { None } else { Some(lines.join(" ").trim().to_string()) }
}

fn leading_hash_comment(source: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() && lines.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('#') {
            lines.push(rest.trim().to_string());
        } else {
            break;
        }
    }
    if lines.is_empty() { None } else { Some(lines.join(" ").trim().to_string()) }
}

fn leading_python_docstring(source: &str) -> Option<String> {
    let trimmed = source.trim_start();
    for quote in ["\"\"\"", "'''"] {
        if let Some(rest) = trimmed.strip_prefix(quote) {
            let end = rest.find(quote)?;
            return Some(rest[..end].trim().to_string());
        }
    }
    None
}

fn first_n_tokens(source: &str, n: usize) -> String {
    source.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

fn truncate_bytes(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivist_core::types::SymbolKind;

    fn symbol(name: &str, exported: bool) -> ExtractedSymbol {
        ExtractedSymbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            line: 1,
            column: 0,
            is_exported: exported,
            parent_name: None,
            signature: None,
        }
    }

    #[test]
    fn includes_path_language_and_exported_symbols_only() {
        let symbols = vec![symbol("public_fn", true), symbol("hidden", false)];
        let text = build_embedding_text("src/lib.rs", "rust", &symbols, "fn public_fn() {}");
        assert!(text.contains("path: src/lib.rs"));
        assert!(text.contains("language: rust"));
        assert!(text.contains("public_fn (function)"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn caps_exported_symbols_at_max() {
        let symbols: Vec<ExtractedSymbol> = (0..40).map(|i| symbol(&format!("f{i}"), true)).collect();
        let text = build_embedding_text("a.rs", "rust", &symbols, "");
        assert_eq!(text.matches('-').count(), EMBED_TEXT_MAX_SYMBOLS);
    }

    #[test]
    fn extracts_leading_rust_doc_comment() {
        let source = "/// Greets the caller.\n/// Second line.\npub fn greet() {}\n";
        let text = build_embedding_text("a.rs", "rust", &[], source);
        assert!(text.contains("Greets the caller. Second line."));
    }

    #[test]
    fn extracts_leading_python_docstring() {
        let source = "\"\"\"Module summary.\"\"\"\n\ndef f():\n    pass\n";
        let text = build_embedding_text("a.py", "python", &[], source);
        assert!(text.contains("Module summary."));
    }

    #[test]
    fn documentation_languages_include_body_tokens() {
        let text = build_embedding_text("README.md", "markdown", &[], "# Title\nsome body text");
        assert!(text.contains("body:"));
        assert!(text.contains("Title"));
    }

    #[test]
    fn is_deterministic_for_identical_inputs() {
        let symbols = vec![symbol("f", true)];
        let a = build_embedding_text("a.rs", "rust", &symbols, "fn f() {}");
        let b = build_embedding_text("a.rs", "rust", &symbols, "fn f() {}");
        assert_eq!(a, b);
    }

    #[test]
    fn truncates_to_max_bytes() {
        let symbols: Vec<ExtractedSymbol> = (0..32)
            .map(|i| symbol(&"x".repeat(50).chars().chain(i.to_string().chars()).collect::<String>(), true))
            .collect();
        let text = build_embedding_text("a.rs", "rust", &symbols, &"word ".repeat(2000));
        assert!(text.len() <= EMBED_TEXT_MAX_BYTES);
    }
}
