//! Thin tree-sitter wrapper: parses source into a syntax tree for one of the
//! four indexable languages.

use archivist_core::error::ParseError;

pub fn parse_file(source: &str, language: &str) -> Result<tree_sitter::Tree, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    let ts_language = get_language(language)?;
    parser
        .set_language(&ts_language)
        .map_err(|e| ParseError::GrammarNotAvailable {
            language: format!("{language}: {e}"),
        })?;

    parser
        .parse(source, None)
        .ok_or_else(|| ParseError::TreeSitterFailed {
            path: format!("<{language} source>"),
        })
}

pub fn get_language(language: &str) -> Result<tree_sitter::Language, ParseError> {
    match language {
        "rust" => Ok(tree_sitter_rust::LANGUAGE.into()),
        "typescript" => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "python" => Ok(tree_sitter_python::LANGUAGE.into()),
        "go" => Ok(tree_sitter_go::LANGUAGE.into()),
        other => Err(ParseError::GrammarNotAvailable {
            language: other.to_string(),
        }),
    }
}

pub fn is_language_supported(language: &str) -> bool {
    archivist_core::languages::is_indexable_source_language(language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_supported_language() {
        assert!(parse_file("fn main() {}", "rust").is_ok());
        assert!(parse_file("def f(): pass", "python").is_ok());
        assert!(parse_file("function f() {}", "typescript").is_ok());
        assert!(parse_file("package main", "go").is_ok());
    }

    #[test]
    fn unsupported_language_is_rejected() {
        assert!(parse_file("# hi", "markdown").is_err());
    }
}
