//! Python symbol/import extraction.

use super::{ExtractedImport, ExtractedSymbol, node_text};
use archivist_core::types::SymbolKind;

pub fn extract(tree: &tree_sitter::Tree, source: &str) -> Vec<ExtractedSymbol> {
    let mut symbols = Vec::new();
    extract_from_node(tree.root_node(), source, None, &mut symbols);
    symbols
}

fn extract_from_node(
    node: tree_sitter::Node,
    source: &str,
    parent: Option<&str>,
    symbols: &mut Vec<ExtractedSymbol>,
) {
    match node.kind() {
        "function_definition" => {
            if let Some(sym) = extract_function(node, source, parent) {
                symbols.push(sym);
            }
            return;
        }
        "class_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source);
                symbols.push(ExtractedSymbol {
                    name: name.clone(),
                    kind: SymbolKind::Class,
                    line: node.start_position().row as u32 + 1,
                    column: node.start_position().column as u32,
                    is_exported: !name.starts_with('_'),
                    parent_name: parent.map(String::from),
                    signature: None,
                });
                if let Some(body) = node.child_by_field_name("body") {
                    extract_children(body, source, Some(&name), symbols);
                }
            }
            return;
        }
        "decorated_definition" => {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i)
                    && matches!(child.kind(), "function_definition" | "class_definition")
                {
                    extract_from_node(child, source, parent, symbols);
                }
            }
            return;
        }
        "expression_statement" if parent.is_none() => {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i)
                    && child.kind() == "assignment"
                    && let Some(left) = child.child_by_field_name("left")
                    && left.kind() == "identifier"
                {
                    let name = node_text(left, source);
                    symbols.push(ExtractedSymbol {
                        name: name.clone(),
                        kind: SymbolKind::Variable,
                        line: node.start_position().row as u32 + 1,
                        column: node.start_position().column as u32,
                        is_exported: !name.starts_with('_'),
                        parent_name: None,
                        signature: None,
                    });
                }
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
        name: name.clone(),
        kind,
        line: node.start_position().row as u32 + 1,
        column: node.start_position().column as u32,
        is_exported: !name.starts_with('_'),
        parent_name: parent.map(String::from),
        signature: node_text(node, source).lines().next().map(|l| l.trim().to_string()),
    })
}

/// Extract Python `import`/`from ... import` statements, including
/// multi-line parenthesized forms and relative imports.
pub fn extract_imports(_tree: &tree_sitter::Tree, source: &str) -> Vec<ExtractedImport> {
    let mut imports = Vec::new();
    let mut buffer = String::new();
    let mut in_paren = false;

    for line in source.lines() {
        let trimmed = line.trim();

        if in_paren {
            let content = if let Some(pos) = trimmed.find(')') {
                in_paren = false;
                &trimmed[..pos]
            } else {
                trimmed
            };
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(content);
            if !in_paren {
                let joined = buffer.trim().to_string();
                if joined.starts_with("from ") {
                    imports.extend(parse_from_import(&joined));
                }
                buffer.clear();
            }
            continue;
        }

        if (trimmed.starts_with("from ") || trimmed.starts_with("import "))
            && trimmed.contains('(')
            && !trimmed.contains(')')
        {
            in_paren = true;
            buffer.clear();
            buffer.push_str(trimmed.replace('(', "").trim());
            continue;
        }

        if trimmed.starts_with("import ") {
            imports.extend(parse_plain_import(trimmed));
        } else if trimmed.starts_with("from ") {
            imports.extend(parse_from_import(trimmed));
        }
    }
    imports
}

fn parse_plain_import(statement: &str) -> Vec<ExtractedImport> {
    statement
        .trim_start_matches("import ")
        .split(',')
        .filter_map(|module| {
            let module = module.trim();
            if module.is_empty() {
                return None;
            }
            let target = module.split(" as ").next().unwrap_or("").trim();
            if target.is_empty() {
                return None;
            }
            Some(ExtractedImport {
                module_path: target.to_string(),
                imported_name: None,
                is_default: false,
            })
        })
        .collect()
}

fn parse_from_import(statement: &str) -> Vec<ExtractedImport> {
    let mut results = Vec::new();
    let body = statement.trim_start_matches("from ").trim();
    let Some((module, imports_raw)) = body.split_once(" import ") else {
        return results;
    };
    let module = module.trim();
    for imported in imports_raw.split(',') {
        let imported = imported.trim();
        if imported.is_empty() {
            continue;
        }
        let name = imported.split(" as ").next().unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        results.push(ExtractedImport {
            module_path: module.to_string(),
            imported_name: Some(name.to_string()),
            is_default: false,
        });
    }
    results
}
