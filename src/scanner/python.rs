//! Syntax-aware import extraction for Python sources

use thiserror::Error;
use tree_sitter::{Node, Parser};

/// One import statement target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PythonImport {
    /// `import a.b` or `import a.b as c`
    Module(String),
    /// `from a.b import c, d`; `names` is empty for `from a.b import *`
    From { module: String, names: Vec<String> },
    /// `from . import x`, `from ..pkg import y`; the text after `from`
    Relative(String),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Python grammar could not be loaded: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("parser produced no syntax tree")]
    NoTree,

    #[error("syntax error near line {line}")]
    Syntax { line: usize },
}

/// Reusable Python parser; one per scan
pub struct PythonImportParser {
    parser: Parser,
}

impl PythonImportParser {
    pub fn new() -> Result<Self, ExtractError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    /// Extract every import of a source file, in source order.
    ///
    /// Files that do not parse cleanly are rejected as a whole so that a
    /// half-understood file never contributes partial imports.
    pub fn extract(&mut self, source: &str) -> Result<Vec<PythonImport>, ExtractError> {
        let tree = self.parser.parse(source, None).ok_or(ExtractError::NoTree)?;
        let root = tree.root_node();

        if root.has_error() {
            return Err(ExtractError::Syntax {
                line: first_error_line(root),
            });
        }

        let bytes = source.as_bytes();
        let mut imports = Vec::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => collect_import(node, bytes, &mut imports),
                "import_from_statement" => collect_from_import(node, bytes, &mut imports),
                "future_import_statement" => {
                    imports.push(PythonImport::Module("__future__".to_string()))
                }
                _ => {
                    let mut cursor = node.walk();
                    let children: Vec<Node> = node.named_children(&mut cursor).collect();
                    // Reverse so the stack pops in source order
                    stack.extend(children.into_iter().rev());
                }
            }
        }

        Ok(imports)
    }
}

fn collect_import(node: Node, source: &[u8], out: &mut Vec<PythonImport>) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        if let Some(dotted) = imported_name(name, source) {
            out.push(PythonImport::Module(dotted));
        }
    }
}

fn collect_from_import(node: Node, source: &[u8], out: &mut Vec<PythonImport>) {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };

    if module_node.kind() == "relative_import" {
        out.push(PythonImport::Relative(node_text(module_node, source)));
        return;
    }

    let module = node_text(module_node, source);
    if module.is_empty() {
        return;
    }

    let mut cursor = node.walk();
    let names = node
        .children_by_field_name("name", &mut cursor)
        .filter_map(|n| imported_name(n, source))
        .collect();

    out.push(PythonImport::From { module, names });
}

/// Name of a `dotted_name` or the original name of an `aliased_import`
fn imported_name(node: Node, source: &[u8]) -> Option<String> {
    let target = match node.kind() {
        "aliased_import" => node.child_by_field_name("name")?,
        _ => node,
    };
    let text = node_text(target, source);
    (!text.is_empty()).then_some(text)
}

fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source)
        .map(|t| t.split_whitespace().collect())
        .unwrap_or_default()
}

fn first_error_line(root: Node) -> usize {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    root.start_position().row + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> Vec<PythonImport> {
        PythonImportParser::new().unwrap().extract(source).unwrap()
    }

    #[test]
    fn plain_and_aliased_imports() {
        let imports = extract("import os, sys\nimport numpy as np\nimport a.b.c as d\n");
        assert_eq!(
            imports,
            vec![
                PythonImport::Module("os".into()),
                PythonImport::Module("sys".into()),
                PythonImport::Module("numpy".into()),
                PythonImport::Module("a.b.c".into()),
            ]
        );
    }

    #[test]
    fn from_imports() {
        let imports = extract(
            "from managers import config_manager, session_manager as sm\nfrom yaml import *\n",
        );
        assert_eq!(
            imports,
            vec![
                PythonImport::From {
                    module: "managers".into(),
                    names: vec!["config_manager".into(), "session_manager".into()],
                },
                PythonImport::From {
                    module: "yaml".into(),
                    names: vec![],
                },
            ]
        );
    }

    #[test]
    fn relative_and_future_imports() {
        let imports = extract(
            "from __future__ import annotations\nfrom . import helpers\nfrom ..pkg import thing\n",
        );
        assert_eq!(
            imports,
            vec![
                PythonImport::Module("__future__".into()),
                PythonImport::Relative(".".into()),
                PythonImport::Relative("..pkg".into()),
            ]
        );
    }

    #[test]
    fn nested_imports_are_found_and_text_is_ignored() {
        let source = r#"
# import fake_comment
"""
import fake_docstring
"""
def load():
    try:
        import requests
    except ImportError:
        pass
    text = "import fake_string"
    return text
"#;
        assert_eq!(extract(source), vec![PythonImport::Module("requests".into())]);
    }

    #[test]
    fn syntax_error_rejects_file() {
        let mut parser = PythonImportParser::new().unwrap();
        let err = parser
            .extract("import os\n\ndef broken(:\n    pass\n")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Syntax { .. }));
    }
}
