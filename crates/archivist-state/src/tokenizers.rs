//! Custom Tantivy tokenizers for code identifiers: splits on non-alphanumeric
//! boundaries and additionally on camelCase/snake_case transitions, all
//! lowercased.

use tantivy::tokenizer::{BoxTokenStream, Token, TokenStream, Tokenizer};

/// `CamelCaseName` → `[camel, case, name]`
#[derive(Clone)]
pub struct CodeCamelTokenizer;

impl Tokenizer for CodeCamelTokenizer {
    type TokenStream<'a> = BoxTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        BoxTokenStream::new(VecTokenStream::new(split_camel_case(text)))
    }
}

/// `snake_case_name` → `[snake, case, name]`
#[derive(Clone)]
pub struct CodeSnakeTokenizer;

impl Tokenizer for CodeSnakeTokenizer {
    type TokenStream<'a> = BoxTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        BoxTokenStream::new(VecTokenStream::new(split_snake_case(text)))
    }
}

/// Combines camel and snake splitting, deduplicated. Used for symbol names
/// and file paths so either convention matches the same query term.
#[derive(Clone)]
pub struct CodeIdentifierTokenizer;

impl Tokenizer for CodeIdentifierTokenizer {
    type TokenStream<'a> = BoxTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        let mut seen = std::collections::HashSet::new();
        let mut tokens = Vec::new();
        for t in split_camel_case(text).into_iter().chain(split_snake_case(text)) {
            if seen.insert(t.clone()) {
                tokens.push(t);
            }
        }
        BoxTokenStream::new(VecTokenStream::new(tokens))
    }
}

/// `src/auth/handler.rs` → `[src, auth, handler, rs]`, further split on
/// camel/snake boundaries within each path segment.
#[derive(Clone)]
pub struct CodePathTokenizer;

impl Tokenizer for CodePathTokenizer {
    type TokenStream<'a> = BoxTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        let mut seen = std::collections::HashSet::new();
        let mut tokens = Vec::new();
        for segment in text.split(['/', '\\']) {
            for t in split_camel_case(segment).into_iter().chain(split_snake_case(segment)) {
                if seen.insert(t.clone()) {
                    tokens.push(t);
                }
            }
        }
        BoxTokenStream::new(VecTokenStream::new(tokens))
    }
}

fn split_camel_case(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_uppercase() && !current.is_empty() {
            tokens.push(current.to_lowercase());
            current.clear();
        }
        if ch.is_alphanumeric() {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(current.to_lowercase());
            current.clear();
        }
    }
    if !current.is_empty() {
        tokens.push(current.to_lowercase());
    }
    tokens
}

fn split_snake_case(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

struct VecTokenStream {
    tokens: Vec<Token>,
    index: usize,
}

impl VecTokenStream {
    fn new(strings: Vec<String>) -> Self {
        let mut offset = 0;
        let tokens = strings
            .into_iter()
            .enumerate()
            .map(|(pos, text)| {
                let from = offset;
                offset += text.len();
                Token {
                    offset_from: from,
                    offset_to: offset,
                    position: pos,
                    text,
                    position_length: 1,
                }
            })
            .collect();
        Self { tokens, index: 0 }
    }
}

impl TokenStream for VecTokenStream {
    fn advance(&mut self) -> bool {
        if self.index < self.tokens.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.index - 1]
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.tokens[self.index - 1]
    }
}

pub fn register_tokenizers(manager: &tantivy::tokenizer::TokenizerManager) {
    manager.register("code_camel", CodeCamelTokenizer);
    manager.register("code_snake", CodeSnakeTokenizer);
    manager.register("code_identifier", CodeIdentifierTokenizer);
    manager.register("code_path", CodePathTokenizer);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(t: &mut impl Tokenizer, text: &str) -> Vec<String> {
        let mut stream = t.token_stream(text);
        let mut out = Vec::new();
        while stream.advance() {
            out.push(stream.token().text.clone());
        }
        out
    }

    #[test]
    fn camel_case_splits_on_uppercase_boundaries() {
        let mut t = CodeCamelTokenizer;
        assert_eq!(tokenize(&mut t, "CamelCaseName"), vec!["camel", "case", "name"]);
    }

    #[test]
    fn snake_case_splits_on_non_alphanumeric() {
        let mut t = CodeSnakeTokenizer;
        assert_eq!(tokenize(&mut t, "snake_case_name"), vec!["snake", "case", "name"]);
    }

    #[test]
    fn identifier_tokenizer_dedupes_camel_and_snake() {
        let mut t = CodeIdentifierTokenizer;
        let tokens = tokenize(&mut t, "parse_HTTPResponse");
        assert!(tokens.contains(&"parse".to_string()));
        assert!(tokens.contains(&"response".to_string()));
    }

    #[test]
    fn path_tokenizer_splits_segments_and_identifiers() {
        let mut t = CodePathTokenizer;
        let tokens = tokenize(&mut t, "src/authHandler.rs");
        assert!(tokens.contains(&"src".to_string()));
        assert!(tokens.contains(&"auth".to_string()));
        assert!(tokens.contains(&"handler".to_string()));
        assert!(tokens.contains(&"rs".to_string()));
    }
}
