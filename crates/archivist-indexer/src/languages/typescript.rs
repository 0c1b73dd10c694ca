//! TypeScript/JavaScript symbol/import extraction.

use super::{ExtractedImport, ExtractedSymbol, node_text};
use archivist_core::types::SymbolKind;

pub fn extract(tree: &tree_sitter::Tree, source: &str) -> Vec<ExtractedSymbol> {
    let mut symbols = Vec::new();
    extract_from_node(tree.root_node(), source, None, false, &mut symbols);
    symbols
}

fn extract_from_node(
    node: tree_sitter::Node,
    source: &str,
    parent: Option<&str>,
    exported: bool,
    symbols: &mut Vec<ExtractedSymbol>,
) {
    match node.kind() {
        "export_statement" => {
            let inner_exported = true;
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    extract_from_node(child, source, parent, inner_exported, symbols);
                }
            }
            return;
        }
        "function_declaration" => {
            if let Some(sym) = extract_named(node, source, parent, exported, SymbolKind::Function) {
                symbols.push(sym);
            }
            return;
        }
        "class_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source);
                symbols.push(ExtractedSymbol {
                    name: name.clone(),
                    kind: SymbolKind::Class,
                    line: node.start_position().row as u32 + 1,
                    column: node.start_position().column as u32,
                    is_exported: exported,
                    parent_name: parent.map(String::from),
                    signature: None,
                });
                if let Some(body) = node.child_by_field_name("body") {
                    for i in 0..body.child_count() {
                        if let Some(child) = body.child(i) {
                            extract_from_node(child, source, Some(&name), false, symbols);
                        }
                    }
                }
            }
            return;
        }
        "interface_declaration" => {
            if let Some(sym) = extract_named(node, source, parent, exported, SymbolKind::Interface) {
                symbols.push(sym);
            }
            return;
        }
        "enum_declaration" => {
            if let Some(sym) = extract_named(node, source, parent, exported, SymbolKind::Enum) {
                symbols.push(sym);
            }
            return;
        }
        "type_alias_declaration" => {
            if let Some(sym) = extract_named(node, source, parent, exported, SymbolKind::Type) {
                symbols.push(sym);
            }
            return;
        }
        "method_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source);
                let is_private = name.starts_with('#') || has_private_modifier(node, source);
                symbols.push(ExtractedSymbol {
                    name: name.clone(),
                    kind: SymbolKind::Method,
                    line: node.start_position().row as u32 + 1,
                    column: node.start_position().column as u32,
                    is_exported: !is_private,
                    parent_name: parent.map(String::from),
                    signature: node_text(node, source).lines().next().map(|l| l.trim().to_string()),
                });
            }
            return;
        }
        "lexical_declaration" if parent.is_none() => {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i)
                    && child.kind() == "variable_declarator"
                    && let Some(name_node) = child.child_by_field_name("name")
                    && name_node.kind() == "identifier"
                {
                    let name = node_text(name_node, source);
                    symbols.push(ExtractedSymbol {
                        name,
                        kind: SymbolKind::Variable,
                        line: node.start_position().row as u32 + 1,
                        column: node.start_position().column as u32,
                        is_exported: exported,
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
            extract_from_node(child, source, parent, false, symbols);
        }
    }
}

fn extract_named(
    node: tree_sitter::Node,
    source: &str,
    parent: Option<&str>,
    exported: bool,
    kind: SymbolKind,
) -> Option<ExtractedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source);
    Some(ExtractedSymbol {
        name,
        kind,
        line: node.start_position().row as u32 + 1,
        column: node.start_position().column as u32,
        is_exported: exported,
        parent_name: parent.map(String::from),
        signature: node_text(node, source).lines().next().map(|l| l.trim().to_string()),
    })
}

fn has_private_modifier(node: tree_sitter::Node, source: &str) -> bool {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i)
            && child.kind() == "accessibility_modifier"
            && node_text(child, source) == "private"
        {
            return true;
        }
    }
    false
}

/// Extract ES module `import`/`export ... from` statements and `require()`
/// calls, including multi-line and destructured forms.
pub fn extract_imports(_tree: &tree_sitter::Tree, source: &str) -> Vec<ExtractedImport> {
    let mut results = Vec::new();
    let mut buffer = String::new();
    let mut in_multiline = false;

    for line in source.lines() {
        let trimmed = line.trim();

        if in_multiline {
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(trimmed);
            if trimmed.contains(" from ") || trimmed.ends_with(';') {
                in_multiline = false;
                let joined = buffer.trim().to_string();
                if joined.contains(" from ") {
                    results.extend(parse_es_import(&joined));
                }
                buffer.clear();
            }
            continue;
        }

        if (trimmed.starts_with("import ") || (trimmed.starts_with("export ") && trimmed.contains(" from ")))
            && !trimmed.contains(" from ")
        {
            in_multiline = true;
            buffer.clear();
            buffer.push_str(trimmed);
            continue;
        }

        if trimmed.starts_with("import ") || (trimmed.starts_with("export ") && trimmed.contains(" from ")) {
            results.extend(parse_es_import(trimmed));
            continue;
        }
        if trimmed.contains("require(") {
            results.extend(parse_require(trimmed));
        }
    }
    results
}

fn parse_es_import(statement: &str) -> Vec<ExtractedImport> {
    let mut imports = Vec::new();
    let Some((left, right)) = statement.split_once(" from ") else {
        return imports;
    };
    let Some(module) = extract_quoted(right) else {
        return imports;
    };
    let left = left.trim_start_matches("import ").trim_start_matches("export ").trim();

    if left.starts_with('{') {
        let inner = left.trim_start_matches('{').trim_end_matches('}');
        for part in inner.split(',') {
            let name = part.trim().split(" as ").next().unwrap_or("").trim();
            if name.is_empty() {
                continue;
            }
            imports.push(ExtractedImport {
                module_path: module.clone(),
                imported_name: Some(name.to_string()),
                is_default: false,
            });
        }
        return imports;
    }

    if let Some(ns) = left.strip_prefix("* as ") {
        imports.push(ExtractedImport {
            module_path: module,
            imported_name: Some(ns.trim().to_string()),
            is_default: false,
        });
        return imports;
    }

    let default_name = left.split(',').next().unwrap_or("").trim();
    if !default_name.is_empty() {
        imports.push(ExtractedImport {
            module_path: module,
            imported_name: Some(default_name.to_string()),
            is_default: true,
        });
    }
    imports
}

fn parse_require(statement: &str) -> Vec<ExtractedImport> {
    let mut imports = Vec::new();
    let Some(idx) = statement.find("require(") else {
        return imports;
    };
    let after = &statement[idx + "require(".len()..];
    let Some(end) = after.find(')') else {
        return imports;
    };
    let Some(module) = extract_quoted(&after[..end]) else {
        return imports;
    };

    let lhs = statement.split('=').next().unwrap_or("");
    if let Some(open) = lhs.find('{')
        && let Some(close) = lhs.find('}')
    {
        for part in lhs[open + 1..close].split(',') {
            let name = part.trim();
            if name.is_empty() {
                continue;
            }
            imports.push(ExtractedImport {
                module_path: module.clone(),
                imported_name: Some(name.to_string()),
                is_default: false,
            });
        }
        return imports;
    }

    let name = lhs.split_whitespace().last().unwrap_or("").trim().to_string();
    imports.push(ExtractedImport {
        module_path: module,
        imported_name: if name.is_empty() { None } else { Some(name) },
        is_default: true,
    });
    imports
}

fn extract_quoted(input: &str) -> Option<String> {
    let single = input.find('\'');
    let double = input.find('"');
    let (quote, start) = match (single, double) {
        (Some(s), Some(d)) => {
            if s < d {
                ('\'', s)
            } else {
                ('"', d)
            }
        }
        (Some(s), None) => ('\'', s),
        (None, Some(d)) => ('"', d),
        (None, None) => return None,
    };
    let rest = &input[start + 1..];
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn exported_function_is_marked_exported() {
        let source = "export function greet() {}\nfunction hidden() {}\n";
        let tree = parser::parse_file(source, "typescript").unwrap();
        let symbols = extract(&tree, source);
        let greet = symbols.iter().find(|s| s.name == "greet").unwrap();
        assert!(greet.is_exported);
        let hidden = symbols.iter().find(|s| s.name == "hidden").unwrap();
        assert!(!hidden.is_exported);
    }

    #[test]
    fn class_methods_become_methods_with_parent() {
        let source = "export class Foo {\n  bar() {}\n}\n";
        let tree = parser::parse_file(source, "typescript").unwrap();
        let symbols = extract(&tree, source);
        let bar = symbols.iter().find(|s| s.name == "bar").unwrap();
        assert_eq!(bar.kind, SymbolKind::Method);
        assert_eq!(bar.parent_name.as_deref(), Some("Foo"));
    }

    #[test]
    fn extract_imports_named_default_namespace_and_require() {
        let source = "import { Router } from \"./router\";\nimport AuthClient from \"./auth/client\";\nimport * as Utils from \"./utils\";\nconst cfg = require(\"./config\");\n";
        let tree = parser::parse_file(source, "typescript").unwrap();
        let imports = extract_imports(&tree, source);
        let names: Vec<String> = imports.iter().filter_map(|i| i.imported_name.clone()).collect();
        assert!(names.contains(&"Router".to_string()));
        assert!(names.contains(&"AuthClient".to_string()));
        assert!(names.contains(&"Utils".to_string()));
        assert!(names.contains(&"cfg".to_string()));
    }
}
