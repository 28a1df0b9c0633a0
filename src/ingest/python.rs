//! Python rules.
//!
//! Classes deriving directly from `ABC` or `Protocol` are treated as
//! interfaces; every other base lands in `extends`. Instance types come from
//! annotated `__init__` parameters, annotated class attributes, and
//! `self.x = Type(...)` assignments in `__init__`.

use crate::ingest::chain::{ChainStep, LinkRole};
use crate::ingest::detect::Language;
use crate::ingest::rules::{
    clean_annotation, field_text, named_children, node_text, signature_text, simple_type_name,
    FunctionCapture, ImportCapture, ImportedSymbol, LanguageRules, Param, TypeCapture, TypeKind,
};
use crate::ingest::scope::{ScopeFrame, ScopeKind};
use tree_sitter::Node;

pub struct PythonRules;

/// Bases that mark a class as an interface and are not recorded as supertypes.
const INTERFACE_MARKERS: &[&str] = &["ABC", "Protocol"];

/// Bases that carry no type information.
const IGNORED_BASES: &[&str] = &["object", "Generic", "NamedTuple", "TypedDict"];

impl LanguageRules for PythonRules {
    fn language(&self) -> Language {
        Language::Python
    }

    fn self_token(&self) -> &'static str {
        "self"
    }

    fn constructor_name(&self) -> &'static str {
        "__init__"
    }

    fn is_self_reference(&self, name: &str) -> bool {
        name == "self" || name == "cls"
    }

    fn scope_for(&self, node: &Node, source: &[u8]) -> Option<ScopeFrame> {
        match node.kind() {
            "class_definition" => {
                field_text(node, "name", source).map(|n| ScopeFrame::new(ScopeKind::Class, n))
            }
            "function_definition" => {
                field_text(node, "name", source).map(|n| ScopeFrame::new(ScopeKind::Function, n))
            }
            "assignment" => {
                let left = node.child_by_field_name("left")?;
                let right = node.child_by_field_name("right")?;
                if left.kind() == "identifier" && right.kind() == "lambda" {
                    Some(ScopeFrame::new(ScopeKind::Function, node_text(&left, source)))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn is_call_site(&self, node: &Node) -> bool {
        node.kind() == "call"
    }

    fn descend<'t>(&self, node: &Node<'t>) -> Option<Node<'t>> {
        match node.kind() {
            "call" => node.child_by_field_name("function"),
            "attribute" => node.child_by_field_name("object"),
            "subscript" => node.child_by_field_name("value"),
            "parenthesized_expression" | "await" => node.named_child(0),
            _ => None,
        }
    }

    fn classify(&self, node: &Node, source: &[u8]) -> ChainStep {
        match node.kind() {
            "call" => ChainStep::MarkInvoked,
            "attribute" => match field_text(node, "attribute", source) {
                Some(attr) => ChainStep::Push(LinkRole::Member, attr),
                None => ChainStep::Stop,
            },
            "identifier" => ChainStep::Push(LinkRole::Member, node_text(node, source).to_string()),
            "subscript" | "parenthesized_expression" | "await" => ChainStep::Skip,
            _ => ChainStep::Stop,
        }
    }

    fn capture_imports(&self, node: &Node, source: &[u8]) -> Vec<ImportCapture> {
        let line = node.start_position().row + 1;
        match node.kind() {
            // import a.b, c as d
            "import_statement" => named_children(node)
                .iter()
                .filter_map(|item| {
                    let (module, alias) = match item.kind() {
                        "dotted_name" => (node_text(item, source).to_string(), None),
                        "aliased_import" => (
                            field_text(item, "name", source)?,
                            field_text(item, "alias", source),
                        ),
                        _ => return None,
                    };
                    // `import a.b` binds `a`
                    let local = alias.unwrap_or_else(|| {
                        module.split('.').next().unwrap_or(&module).to_string()
                    });
                    Some(ImportCapture {
                        origin: module,
                        symbols: vec![ImportedSymbol::new("*", Some(local))],
                        line,
                    })
                })
                .collect(),
            // from .models import User as U, Repo
            "import_from_statement" => {
                let Some(origin) = field_text(node, "module_name", source) else {
                    return Vec::new();
                };
                let mut symbols = Vec::new();
                let mut cursor = node.walk();
                for item in node.children_by_field_name("name", &mut cursor) {
                    match item.kind() {
                        "dotted_name" => {
                            symbols.push(ImportedSymbol::new(node_text(&item, source), None))
                        }
                        "aliased_import" => {
                            if let Some(name) = field_text(&item, "name", source) {
                                symbols.push(ImportedSymbol::new(
                                    name,
                                    field_text(&item, "alias", source),
                                ));
                            }
                        }
                        _ => {}
                    }
                }
                if named_children(node).iter().any(|c| c.kind() == "wildcard_import") {
                    symbols.push(ImportedSymbol::new("*", None));
                }
                vec![ImportCapture {
                    origin,
                    symbols,
                    line,
                }]
            }
            _ => Vec::new(),
        }
    }

    fn capture_type(&self, node: &Node, source: &[u8]) -> Option<TypeCapture> {
        if node.kind() != "class_definition" {
            return None;
        }
        let mut capture = TypeCapture {
            kind: Some(TypeKind::Class),
            name: field_text(node, "name", source)?,
            ..Default::default()
        };

        if let Some(bases) = node.child_by_field_name("superclasses") {
            for base in named_children(&bases) {
                let name = match base.kind() {
                    "identifier" => node_text(&base, source).to_string(),
                    "attribute" => match field_text(&base, "attribute", source) {
                        Some(n) => n,
                        None => continue,
                    },
                    "subscript" => match base
                        .child_by_field_name("value")
                        .map(|v| node_text(&v, source).to_string())
                    {
                        Some(n) => n.rsplit('.').next().unwrap_or(&n).to_string(),
                        None => continue,
                    },
                    _ => continue,
                };
                if INTERFACE_MARKERS.contains(&name.as_str()) {
                    capture.kind = Some(TypeKind::Interface);
                } else if !IGNORED_BASES.contains(&name.as_str()) {
                    capture.extends.push(name);
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            for statement in named_children(&body) {
                let definition = if statement.kind() == "decorated_definition" {
                    match statement.child_by_field_name("definition") {
                        Some(d) => d,
                        None => continue,
                    }
                } else {
                    statement
                };
                match definition.kind() {
                    "function_definition" => {
                        let Some(f) = self.capture_function(&definition, source) else {
                            continue;
                        };
                        let sig = signature_text(&f.params, f.return_type.as_deref());
                        capture.fields.push((f.name.clone(), sig));
                        if f.is_constructor {
                            if let Some(ctor_body) = f.body {
                                collect_self_assignments(&ctor_body, source, &mut capture);
                            }
                        }
                    }
                    "expression_statement" => {
                        // annotated class attribute: `repo: Repo` or `repo: Repo = None`
                        let Some(assignment) = definition.named_child(0) else {
                            continue;
                        };
                        if assignment.kind() != "assignment" {
                            continue;
                        }
                        let Some(left) = assignment.child_by_field_name("left") else {
                            continue;
                        };
                        if left.kind() != "identifier" {
                            continue;
                        }
                        let name = node_text(&left, source).to_string();
                        let annotation = field_text(&assignment, "type", source)
                            .map(|t| clean_annotation(&t));
                        if let Some(type_name) = annotation.as_deref().and_then(simple_type_name) {
                            capture.typed_fields.push((name.clone(), type_name));
                        }
                        capture.fields.push((name, annotation.unwrap_or_default()));
                    }
                    _ => {}
                }
            }
        }
        Some(capture)
    }

    fn capture_function<'t>(&self, node: &Node<'t>, source: &[u8]) -> Option<FunctionCapture<'t>> {
        match node.kind() {
            "function_definition" => {
                let name = field_text(node, "name", source)?;
                Some(FunctionCapture {
                    is_constructor: self.is_constructor_name(&name),
                    params: capture_params(node.child_by_field_name("parameters"), source),
                    return_type: field_text(node, "return_type", source)
                        .map(|t| clean_annotation(&t)),
                    body: node.child_by_field_name("body"),
                    name,
                })
            }
            "assignment" => {
                let frame = self.scope_for(node, source)?;
                let lambda = node.child_by_field_name("right")?;
                Some(FunctionCapture {
                    name: frame.name,
                    params: capture_params(lambda.child_by_field_name("parameters"), source),
                    return_type: None,
                    body: lambda.child_by_field_name("body"),
                    is_constructor: false,
                })
            }
            _ => None,
        }
    }
}

/// Parameters without the leading `self`/`cls` receiver.
fn capture_params(params: Option<Node>, source: &[u8]) -> Vec<Param> {
    let Some(params) = params else {
        return Vec::new();
    };
    named_children(&params)
        .iter()
        .filter_map(|p| {
            let (name, type_sig) = match p.kind() {
                "identifier" => (node_text(p, source).to_string(), None),
                "typed_parameter" => {
                    let name = p.named_child(0).map(|n| node_text(&n, source).to_string())?;
                    (name, field_text(p, "type", source))
                }
                "default_parameter" => (field_text(p, "name", source)?, None),
                "typed_default_parameter" => {
                    (field_text(p, "name", source)?, field_text(p, "type", source))
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    (node_text(p, source).to_string(), None)
                }
                _ => return None,
            };
            Some(Param {
                name,
                type_sig: type_sig.map(|t| clean_annotation(&t)),
            })
        })
        .filter(|p| p.name != "self" && p.name != "cls")
        .collect()
}

/// `self.repo = Repo(...)` and `self.repo: Repo = ...` inside `__init__`.
fn collect_self_assignments(body: &Node, source: &[u8], capture: &mut TypeCapture) {
    for statement in named_children(body) {
        if statement.kind() != "expression_statement" {
            continue;
        }
        let Some(assignment) = statement.named_child(0) else {
            continue;
        };
        if assignment.kind() != "assignment" {
            continue;
        }
        let Some(left) = assignment.child_by_field_name("left") else {
            continue;
        };
        if left.kind() != "attribute"
            || field_text(&left, "object", source).as_deref() != Some("self")
        {
            continue;
        }
        let Some(field) = field_text(&left, "attribute", source) else {
            continue;
        };
        let declared = field_text(&assignment, "type", source).and_then(|t| simple_type_name(&t));
        let constructed = assignment.child_by_field_name("right").and_then(|right| {
            if right.kind() != "call" {
                return None;
            }
            let callee = field_text(&right, "function", source)?;
            let simple = callee.rsplit('.').next().unwrap_or(&callee).to_string();
            // Class names are capitalized; lowercase callees are factory functions.
            simple
                .chars()
                .next()
                .filter(|c| c.is_uppercase())
                .map(|_| simple.clone())
        });
        if let Some(type_name) = declared.or(constructed) {
            capture.typed_fields.push((field, type_name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::pool::with_parser;

    fn parse(source: &str) -> tree_sitter::Tree {
        with_parser(Language::Python, |p| p.parse(source.as_bytes(), None))
            .unwrap()
            .unwrap()
    }

    fn find<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        children.into_iter().find_map(|c| find(c, kind))
    }

    #[test]
    fn test_from_import_with_alias() {
        let src = "from .models import User as U, Repo\n";
        let tree = parse(src);
        let stmt = find(tree.root_node(), "import_from_statement").unwrap();
        let imports = PythonRules.capture_imports(&stmt, src.as_bytes());
        assert_eq!(imports[0].origin, ".models");
        let locals: Vec<_> = imports[0].symbols.iter().map(|s| s.local_name().to_string()).collect();
        assert_eq!(locals, vec!["U", "Repo"]);
    }

    #[test]
    fn test_plain_import_binds_first_segment() {
        let src = "import os.path\nimport numpy as np\n";
        let tree = parse(src);
        let mut imports = Vec::new();
        let mut cursor = tree.root_node().walk();
        for child in tree.root_node().children(&mut cursor) {
            imports.extend(PythonRules.capture_imports(&child, src.as_bytes()));
        }
        assert_eq!(imports[0].origin, "os.path");
        assert_eq!(imports[0].symbols[0].local_name(), "os");
        assert_eq!(imports[1].symbols[0].local_name(), "np");
    }

    #[test]
    fn test_class_with_abc_is_interface() {
        let src = "class Store(ABC):\n    def get(self, key: str) -> bytes:\n        ...\n";
        let tree = parse(src);
        let class = find(tree.root_node(), "class_definition").unwrap();
        let capture = PythonRules.capture_type(&class, src.as_bytes()).unwrap();
        assert_eq!(capture.kind, Some(TypeKind::Interface));
        assert!(capture.extends.is_empty());
        assert_eq!(capture.fields[0], ("get".to_string(), "(key: str):bytes".to_string()));
    }

    #[test]
    fn test_init_assignments_feed_typed_fields() {
        let src = "class Svc(Base):\n    cache: Cache\n    def __init__(self, repo: Repo):\n        self.client = Client()\n        self.helper = make_helper()\n";
        let tree = parse(src);
        let class = find(tree.root_node(), "class_definition").unwrap();
        let capture = PythonRules.capture_type(&class, src.as_bytes()).unwrap();
        assert_eq!(capture.extends, vec!["Base"]);
        assert!(capture.typed_fields.contains(&("cache".to_string(), "Cache".to_string())));
        assert!(capture.typed_fields.contains(&("client".to_string(), "Client".to_string())));
        assert!(!capture.typed_fields.iter().any(|(n, _)| n == "helper"));

        let init = find(tree.root_node(), "function_definition").unwrap();
        let f = PythonRules.capture_function(&init, src.as_bytes()).unwrap();
        assert!(f.is_constructor);
        assert_eq!(f.params.len(), 1);
        assert_eq!(f.params[0].type_sig.as_deref(), Some("Repo"));
    }

    #[test]
    fn test_lambda_assignment_is_function_scope() {
        let src = "square = lambda x: x * x\n";
        let tree = parse(src);
        let assignment = find(tree.root_node(), "assignment").unwrap();
        let frame = PythonRules.scope_for(&assignment, src.as_bytes()).unwrap();
        assert_eq!(frame.name, "square");
        assert_eq!(frame.kind, ScopeKind::Function);
    }
}
