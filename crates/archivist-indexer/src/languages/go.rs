//! Go symbol/import extraction.

use super::{ExtractedImport, ExtractedSymbol, node_text};
use archivist_core::types::SymbolKind;

pub fn extract(tree: &tree_sitter::Tree, source: &str) -> Vec<ExtractedSymbol> {
    let mut symbols = Vec::new();
    extract_from_node(tree.root_node(), source, &mut symbols);
    symbols
}

fn extract_from_node(node: tree_sitter::Node, source: &str, symbols: &mut Vec<ExtractedSymbol>) {
    match node.kind() {
        "function_declaration" => {
            if let Some(sym) = extract_function(node, source) {
                symbols.push(sym);
            }
            return;
        }
        "method_declaration" => {
            if let Some(sym) = extract_method(node, source) {
                symbols.push(sym);
            }
            return;
        }
        "type_declaration" => {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i)
                    && child.kind() == "type_spec"
                    && let Some(sym) = extract_type_spec(child, source)
                {
                    symbols.push(sym);
                }
            }
            return;
        }
        "const_declaration" | "var_declaration" => {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i)
                    && matches!(child.kind(), "const_spec" | "var_spec")
                    && let Some(name_node) = child.child_by_field_name("name")
                {
                    let name = node_text(name_node, source);
                    symbols.push(ExtractedSymbol {
                        name: name.clone(),
                        kind: SymbolKind::Variable,
                        line: child.start_position().row as u32 + 1,
                        column: child.start_position().column as u32,
                        is_exported: is_exported_name(&name),
                        parent_name: None,
                        signature: None,
                    });
                }
            }
            return;
        }
        _ => {}
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            extract_from_node(child, source, symbols);
        }
    }
}

fn extract_function(node: tree_sitter::Node, source: &str) -> Option<ExtractedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source);
    Some(ExtractedSymbol {
        name: name.clone(),
        kind: SymbolKind::Function,
        line: node.start_position().row as u32 + 1,
        column: node.start_position().column as u32,
        is_exported: is_exported_name(&name),
        parent_name: None,
        signature: node_text(node, source).lines().next().map(|l| l.trim().to_string()),
    })
}

fn extract_method(node: tree_sitter::Node, source: &str) -> Option<ExtractedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source);

    let receiver = node.child_by_field_name("receiver").and_then(|r| {
        let mut found = None;
        for i in 0..r.child_count() {
            if let Some(c) = r.child(i)
                && c.kind() == "parameter_declaration"
            {
                found = c.child_by_field_name("type").map(|t| node_text(t, source).replace('*', ""));
                break;
            }
        }
        found
    });

    Some(ExtractedSymbol {
        name: name.clone(),
        kind: SymbolKind::Method,
        line: node.start_position().row as u32 + 1,
        column: node.start_position().column as u32,
        is_exported: is_exported_name(&name),
        parent_name: receiver,
        signature: node_text(node, source).lines().next().map(|l| l.trim().to_string()),
    })
}

fn extract_type_spec(node: tree_sitter::Node, source: &str) -> Option<ExtractedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source);
    let type_node = node.child_by_field_name("type")?;
    let kind = match type_node.kind() {
        "struct_type" => SymbolKind::Class,
        "interface_type" => SymbolKind::Interface,
        _ => SymbolKind::Type,
    };
    Some(ExtractedSymbol {
        name: name.clone(),
        kind,
        line: node.start_position().row as u32 + 1,
        column: node.start_position().column as u32,
        is_exported: is_exported_name(&name),
        parent_name: None,
        signature: None,
    })
}

fn is_exported_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Extract Go imports from both single and grouped `import (...)` blocks.
pub fn extract_imports(_tree: &tree_sitter::Tree, source: &str) -> Vec<ExtractedImport> {
    let mut imports = Vec::new();
    let mut in_group = false;

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("import (") {
            in_group = true;
            continue;
        }
        if in_group {
            if trimmed == ")" {
                in_group = false;
                continue;
            }
            if let Some(import) = parse_import_line(trimmed) {
                imports.push(import);
            }
            continue;
        }
        if trimmed.starts_with("import ")
            && let Some(import) = parse_import_line(trimmed.trim_start_matches("import ").trim())
        {
            imports.push(import);
        }
    }
    imports
}

fn parse_import_line(line: &str) -> Option<ExtractedImport> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some((alias, rest)) = trimmed.split_once(' ') {
        let path = extract_quoted(rest.trim())?;
        let alias = alias.trim();
        let is_default = alias == "_" || alias == ".";
        return Some(ExtractedImport {
            module_path: path,
            imported_name: if alias.is_empty() || is_default { None } else { Some(alias.to_string()) },
            is_default,
        });
    }
    extract_quoted(trimmed).map(|path| ExtractedImport {
        module_path: path,
        imported_name: None,
        is_default: false,
    })
}

fn extract_quoted(fragment: &str) -> Option<String> {
    let start = fragment.find('"')?;
    let rest = &fragment[start + 1..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn exported_function_and_unexported_function() {
        let source = "package main\n\nfunc Greet() {}\nfunc hidden() {}\n";
        let tree = parser::parse_file(source, "go").unwrap();
        let symbols = extract(&tree, source);
        let greet = symbols.iter().find(|s| s.name == "Greet").unwrap();
        assert!(greet.is_exported);
        let hidden = symbols.iter().find(|s| s.name == "hidden").unwrap();
        assert!(!hidden.is_exported);
    }

    #[test]
    fn method_gets_receiver_as_parent() {
        let source = "package main\n\ntype Foo struct{}\nfunc (f *Foo) Bar() {}\n";
        let tree = parser::parse_file(source, "go").unwrap();
        let symbols = extract(&tree, source);
        let bar = symbols.iter().find(|s| s.name == "Bar").unwrap();
        assert_eq!(bar.kind, SymbolKind::Method);
        assert_eq!(bar.parent_name.as_deref(), Some("Foo"));
    }

    #[test]
    fn extract_imports_handles_single_and_grouped() {
        let source = "package main\n\nimport \"fmt\"\nimport (\n    \"github.com/org/pkg/auth\"\n    cfg \"github.com/org/pkg/config\"\n)\n";
        let tree = parser::parse_file(source, "go").unwrap();
        let imports = extract_imports(&tree, source);
        let paths: Vec<&str> = imports.iter().map(|i| i.module_path.as_str()).collect();
        assert!(paths.contains(&"fmt"));
        assert!(paths.contains(&"github.com/org/pkg/auth"));
        assert!(paths.contains(&"github.com/org/pkg/config"));
    }
}
