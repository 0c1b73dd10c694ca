//! Rust symbol/import extraction.

use super::{ExtractedImport, ExtractedSymbol, node_text};
use archivist_core::types::SymbolKind;

pub fn extract(tree: &tree_sitter::Tree, source: &str) -> Vec<ExtractedSymbol> {
    let mut symbols = Vec::new();
    extract_from_node(tree.root_node(), source, None, &mut symbols);
    symbols
}

/// Walk the tree emitting one symbol per top-level declaration. Function and
/// method bodies are never descended into for further symbol extraction —
/// nested fns/closures are not emitted.
fn extract_from_node(
    node: tree_sitter::Node,
    source: &str,
    parent: Option<&str>,
    symbols: &mut Vec<ExtractedSymbol>,
) {
    match node.kind() {
        "function_item" => {
            if let Some(sym) = extract_function(node, source, parent) {
                symbols.push(sym);
            }
            return;
        }
        "struct_item" => {
            if let Some((sym, name)) = extract_named(node, source, parent, SymbolKind::Class) {
                symbols.push(sym);
                extract_children(node, source, Some(&name), symbols);
            }
            return;
        }
        "enum_item" => {
            if let Some((sym, _)) = extract_named(node, source, parent, SymbolKind::Enum) {
                symbols.push(sym);
            }
            return;
        }
        "trait_item" => {
            if let Some((sym, name)) = extract_named(node, source, parent, SymbolKind::Interface) {
                symbols.push(sym);
                extract_children(node, source, Some(&name), symbols);
            }
            return;
        }
        "impl_item" => {
            let type_name = node.child_by_field_name("type").map(|n| node_text(n, source));
            extract_children(node, source, type_name.as_deref(), symbols);
            return;
        }
        "const_item" | "static_item" => {
            if let Some((sym, _)) = extract_named(node, source, parent, SymbolKind::Variable) {
                symbols.push(sym);
            }
            return;
        }
        "type_item" => {
            if let Some((sym, _)) = extract_named(node, source, parent, SymbolKind::Type) {
                symbols.push(sym);
            }
            return;
        }
        "mod_item" => {
            // Modules are not a symbol kind of their own; recurse so
            // top-level items inside the module are still extracted.
            if let Some(body) = node.child_by_field_name("body") {
                extract_children(body, source, parent, symbols);
            }
            return;
        }
        _ => {}
    }

    extract_children(node, source, parent, symbols);
}

fn extract_children(
    node: tree_sitter::Node,
    source: &str,
    parent: Option<&str>,
    symbols: &mut Vec<ExtractedSymbol>,
) {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            extract_from_node(child, source, parent, symbols);
        }
    }
}

fn extract_function(
    node: tree_sitter::Node,
    source: &str,
    parent: Option<&str>,
) -> Option<ExtractedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source);
    let kind = if parent.is_some() { SymbolKind::Method } else { SymbolKind::Function };
    Some(ExtractedSymbol {
        name,
        kind,
        line: node.start_position().row as u32 + 1,
        column: node.start_position().column as u32,
        is_exported: has_pub_visibility(node, source),
        parent_name: parent.map(String::from),
        signature: first_line(node, source),
    })
}

fn extract_named(
    node: tree_sitter::Node,
    source: &str,
    parent: Option<&str>,
    kind: SymbolKind,
) -> Option<(ExtractedSymbol, String)> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source);
    let sym = ExtractedSymbol {
        name: name.clone(),
        kind,
        line: node.start_position().row as u32 + 1,
        column: node.start_position().column as u32,
        is_exported: has_pub_visibility(node, source),
        parent_name: parent.map(String::from),
        signature: None,
    };
    Some((sym, name))
}

fn first_line(node: tree_sitter::Node, source: &str) -> Option<String> {
    node_text(node, source).lines().next().map(|l| l.trim().to_string())
}

fn has_pub_visibility(node: tree_sitter::Node, source: &str) -> bool {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i)
            && child.kind() == "visibility_modifier"
        {
            return node_text(child, source).starts_with("pub");
        }
    }
    false
}

/// Extract Rust `use` imports, including brace-expansion (`use a::{b, c};`).
pub fn extract_imports(_tree: &tree_sitter::Tree, source: &str) -> Vec<ExtractedImport> {
    let mut results = Vec::new();
    let mut buffer = String::new();
    let mut in_use = false;

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") {
            continue;
        }
        if !in_use && !trimmed.starts_with("use ") {
            continue;
        }
        if !in_use {
            in_use = true;
            buffer.clear();
        }
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(trimmed);
        if trimmed.ends_with(';') {
            in_use = false;
            for target in parse_use_targets(&buffer) {
                let is_default = false;
                let imported_name = if target.ends_with("::*") {
                    Some("*".to_string())
                } else {
                    target.rsplit("::").next().map(|s| s.to_string())
                };
                results.push(ExtractedImport {
                    module_path: target,
                    imported_name,
                    is_default,
                });
            }
            buffer.clear();
        }
    }
    results
}

fn parse_use_targets(statement: &str) -> Vec<String> {
    let mut stmt = statement.trim();
    if let Some(rest) = stmt.strip_prefix("use ") {
        stmt = rest;
    }
    stmt = stmt.trim_end_matches(';').trim();
    expand_use_expr(stmt)
        .into_iter()
        .map(|s| normalize_target(&s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn expand_use_expr(expr: &str) -> Vec<String> {
    let expr = expr.trim();
    let Some(open_idx) = expr.find('{') else {
        return vec![expr.to_string()];
    };
    let Some(close_idx) = expr.rfind('}') else {
        return vec![expr.to_string()];
    };
    if close_idx <= open_idx {
        return vec![expr.to_string()];
    }
    let prefix = expr[..open_idx].trim_end_matches("::").trim();
    let inner = &expr[open_idx + 1..close_idx];
    let mut targets = Vec::new();
    for part in split_top_level(inner) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let merged = if prefix.is_empty() {
            part.to_string()
        } else {
            format!("{prefix}::{part}")
        };
        targets.extend(expand_use_expr(&merged));
    }
    targets
}

fn split_top_level(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in input.chars() {
        match ch {
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn normalize_target(target: &str) -> String {
    let mut cleaned = target.trim().to_string();
    if let Some((lhs, _rhs)) = cleaned.split_once(" as ") {
        cleaned = lhs.trim().to_string();
    }
    cleaned = cleaned.replace("self::", "");
    cleaned.trim_end_matches("::self").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn extracts_pub_function_and_struct() {
        let source = "pub fn greet() {}\nstruct Hidden;\npub struct Visible { x: i32 }";
        let tree = parser::parse_file(source, "rust").unwrap();
        let symbols = extract(&tree, source);
        let greet = symbols.iter().find(|s| s.name == "greet").unwrap();
        assert_eq!(greet.kind, SymbolKind::Function);
        assert!(greet.is_exported);

        let hidden = symbols.iter().find(|s| s.name == "Hidden").unwrap();
        assert!(!hidden.is_exported);
    }

    #[test]
    fn impl_methods_get_parent_set_to_type_name() {
        let source = "struct Foo;\nimpl Foo { pub fn bar(&self) {} }";
        let tree = parser::parse_file(source, "rust").unwrap();
        let symbols = extract(&tree, source);
        let bar = symbols.iter().find(|s| s.name == "bar").unwrap();
        assert_eq!(bar.kind, SymbolKind::Method);
        assert_eq!(bar.parent_name.as_deref(), Some("Foo"));
    }

    #[test]
    fn nested_fn_inside_function_body_is_not_emitted() {
        let source = "fn outer() {\n    fn inner() {}\n}";
        let tree = parser::parse_file(source, "rust").unwrap();
        let symbols = extract(&tree, source);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "outer");
    }

    #[test]
    fn extract_imports_expands_braces() {
        let source = "use a::{b, c};";
        let tree = parser::parse_file(source, "rust").unwrap();
        let imports = extract_imports(&tree, source);
        let paths: Vec<&str> = imports.iter().map(|i| i.module_path.as_str()).collect();
        assert!(paths.contains(&"a::b"));
        assert!(paths.contains(&"a::c"));
    }

    #[test]
    fn extract_imports_glob_keeps_wildcard() {
        let source = "use a::*;";
        let tree = parser::parse_file(source, "rust").unwrap();
        let imports = extract_imports(&tree, source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].module_path, "a::*");
        assert_eq!(imports[0].imported_name.as_deref(), Some("*"));
    }
}
