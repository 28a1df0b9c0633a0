//! Rust rules.
//!
//! Structs and unions are classes, traits are interfaces. An `impl` block
//! opens a class frame named after its self type and contributes a
//! provisional type capture: its methods become members and `impl Trait for`
//! adds the trait to `implements`. The struct/enum declaration, wherever it
//! appears, supplies the definitive kind and position.

use crate::ingest::chain::{ChainStep, LinkRole};
use crate::ingest::detect::Language;
use crate::ingest::rules::{
    field_text, named_children, node_text, signature_text, simple_type_name, FunctionCapture,
    ImportCapture, ImportedSymbol, LanguageRules, Param, TypeCapture, TypeKind,
};
use crate::ingest::scope::{ScopeFrame, ScopeKind};
use tree_sitter::Node;

pub struct RustRules;

const PATH_SEPARATOR: &str = "::";

impl LanguageRules for RustRules {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn self_token(&self) -> &'static str {
        "self"
    }

    fn constructor_name(&self) -> &'static str {
        "new"
    }

    fn is_self_reference(&self, name: &str) -> bool {
        name == "self" || name == "Self"
    }

    fn scope_for(&self, node: &Node, source: &[u8]) -> Option<ScopeFrame> {
        match node.kind() {
            "struct_item" | "union_item" => {
                field_text(node, "name", source).map(|n| ScopeFrame::new(ScopeKind::Class, n))
            }
            "enum_item" => {
                field_text(node, "name", source).map(|n| ScopeFrame::new(ScopeKind::Enum, n))
            }
            "trait_item" => {
                field_text(node, "name", source).map(|n| ScopeFrame::new(ScopeKind::Interface, n))
            }
            "impl_item" => impl_type_name(node, source).map(|n| ScopeFrame::new(ScopeKind::Class, n)),
            "function_item" | "function_signature_item" => {
                field_text(node, "name", source).map(|n| ScopeFrame::new(ScopeKind::Function, n))
            }
            "let_declaration" => {
                let pattern = node.child_by_field_name("pattern")?;
                let value = node.child_by_field_name("value")?;
                if pattern.kind() == "identifier" && value.kind() == "closure_expression" {
                    Some(ScopeFrame::new(ScopeKind::Function, node_text(&pattern, source)))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn is_call_site(&self, node: &Node) -> bool {
        node.kind() == "call_expression"
    }

    fn descend<'t>(&self, node: &Node<'t>) -> Option<Node<'t>> {
        match node.kind() {
            "call_expression" | "generic_function" => node.child_by_field_name("function"),
            "field_expression" => node.child_by_field_name("value"),
            "scoped_identifier" => node.child_by_field_name("path"),
            "try_expression" | "await_expression" | "parenthesized_expression" => {
                node.named_child(0)
            }
            "reference_expression" => node.child_by_field_name("value"),
            "index_expression" => node.named_child(0),
            _ => None,
        }
    }

    fn classify(&self, node: &Node, source: &[u8]) -> ChainStep {
        match node.kind() {
            "call_expression" => ChainStep::MarkInvoked,
            "field_expression" => match field_text(node, "field", source) {
                Some(field) => ChainStep::Push(LinkRole::Member, field),
                None => ChainStep::Stop,
            },
            "scoped_identifier" => match field_text(node, "name", source) {
                Some(name) => ChainStep::Push(LinkRole::Member, name),
                None => ChainStep::Stop,
            },
            "identifier" | "self" | "type_identifier" | "field_identifier" => {
                ChainStep::Push(LinkRole::Member, node_text(node, source).to_string())
            }
            // path roots that carry no receiver information
            "crate" | "super" => ChainStep::Skip,
            "generic_function"
            | "try_expression"
            | "await_expression"
            | "parenthesized_expression"
            | "reference_expression"
            | "index_expression" => ChainStep::Skip,
            _ => ChainStep::Stop,
        }
    }

    fn capture_imports(&self, node: &Node, source: &[u8]) -> Vec<ImportCapture> {
        if node.kind() != "use_declaration" {
            return Vec::new();
        }
        let Some(argument) = node.child_by_field_name("argument") else {
            return Vec::new();
        };
        let line = node.start_position().row + 1;
        let mut leaves = Vec::new();
        flatten_use(&argument, "", source, &mut leaves);
        leaves
            .into_iter()
            .map(|(origin, symbol)| ImportCapture {
                origin,
                symbols: vec![symbol],
                line,
            })
            .collect()
    }

    fn capture_type(&self, node: &Node, source: &[u8]) -> Option<TypeCapture> {
        match node.kind() {
            "struct_item" | "union_item" => {
                let mut capture = TypeCapture {
                    kind: Some(TypeKind::Class),
                    name: field_text(node, "name", source)?,
                    ..Default::default()
                };
                if let Some(body) = node.child_by_field_name("body") {
                    collect_struct_fields(&body, source, &mut capture);
                }
                Some(capture)
            }
            "enum_item" => {
                let mut capture = TypeCapture {
                    kind: Some(TypeKind::Enum),
                    name: field_text(node, "name", source)?,
                    ..Default::default()
                };
                if let Some(body) = node.child_by_field_name("body") {
                    for variant in named_children(&body) {
                        if variant.kind() == "enum_variant" {
                            if let Some(name) = field_text(&variant, "name", source) {
                                capture.fields.push((name, String::new()));
                            }
                        }
                    }
                }
                Some(capture)
            }
            "trait_item" => {
                let mut capture = TypeCapture {
                    kind: Some(TypeKind::Interface),
                    name: field_text(node, "name", source)?,
                    ..Default::default()
                };
                if let Some(bounds) = node.child_by_field_name("bounds") {
                    for bound in named_children(&bounds) {
                        if bound.kind() == "lifetime" {
                            continue;
                        }
                        capture.extends.extend(simple_type_name(node_text(&bound, source)));
                    }
                }
                if let Some(body) = node.child_by_field_name("body") {
                    collect_methods(&body, source, &mut capture);
                }
                Some(capture)
            }
            "impl_item" => {
                let mut capture = TypeCapture {
                    kind: Some(TypeKind::Class),
                    name: impl_type_name(node, source)?,
                    provisional: true,
                    ..Default::default()
                };
                if let Some(trait_name) =
                    field_text(node, "trait", source).and_then(|t| simple_type_name(&t))
                {
                    capture.implements.push(trait_name);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    collect_methods(&body, source, &mut capture);
                }
                Some(capture)
            }
            "type_item" => Some(TypeCapture {
                kind: Some(TypeKind::Alias),
                name: field_text(node, "name", source)?,
                fields: field_text(node, "type", source)
                    .map(|t| vec![("=".to_string(), t)])
                    .unwrap_or_default(),
                ..Default::default()
            }),
            _ => None,
        }
    }

    fn capture_function<'t>(&self, node: &Node<'t>, source: &[u8]) -> Option<FunctionCapture<'t>> {
        match node.kind() {
            "function_item" | "function_signature_item" => {
                let name = field_text(node, "name", source)?;
                Some(FunctionCapture {
                    is_constructor: self.is_constructor_name(&name),
                    params: capture_params(node.child_by_field_name("parameters"), source),
                    return_type: field_text(node, "return_type", source),
                    body: node.child_by_field_name("body"),
                    name,
                })
            }
            "let_declaration" => {
                let frame = self.scope_for(node, source)?;
                let closure = node.child_by_field_name("value")?;
                Some(FunctionCapture {
                    name: frame.name,
                    params: capture_params(closure.child_by_field_name("parameters"), source),
                    return_type: field_text(&closure, "return_type", source),
                    body: closure.child_by_field_name("body"),
                    is_constructor: false,
                })
            }
            _ => None,
        }
    }
}

/// Self type of an impl block: `impl<T> Display for Wrapper<T>` -> `Wrapper`.
fn impl_type_name(node: &Node, source: &[u8]) -> Option<String> {
    field_text(node, "type", source).and_then(|t| simple_type_name(&t))
}

fn collect_struct_fields(body: &Node, source: &[u8], capture: &mut TypeCapture) {
    match body.kind() {
        "field_declaration_list" => {
            for field in named_children(body) {
                if field.kind() != "field_declaration" {
                    continue;
                }
                let (Some(name), Some(declared)) = (
                    field_text(&field, "name", source),
                    field_text(&field, "type", source),
                ) else {
                    continue;
                };
                if let Some(type_name) = simple_type_name(&declared) {
                    capture.typed_fields.push((name.clone(), type_name));
                }
                capture.fields.push((name, declared));
            }
        }
        // tuple struct: fields are positional
        "ordered_field_declaration_list" => {
            let mut cursor = body.walk();
            for (index, declared) in body.children_by_field_name("type", &mut cursor).enumerate() {
                let declared = node_text(&declared, source).to_string();
                if let Some(type_name) = simple_type_name(&declared) {
                    capture.typed_fields.push((index.to_string(), type_name));
                }
                capture.fields.push((index.to_string(), declared));
            }
        }
        _ => {}
    }
}

fn collect_methods(body: &Node, source: &[u8], capture: &mut TypeCapture) {
    for item in named_children(body) {
        if let Some(f) = RustRules.capture_function(&item, source) {
            let sig = signature_text(&f.params, f.return_type.as_deref());
            capture.fields.push((f.name, sig));
        }
    }
}

/// Parameters without the `self` receiver.
fn capture_params(params: Option<Node>, source: &[u8]) -> Vec<Param> {
    let Some(params) = params else {
        return Vec::new();
    };
    named_children(&params)
        .iter()
        .filter_map(|p| match p.kind() {
            "parameter" => Some(Param {
                name: field_text(p, "pattern", source)?,
                type_sig: field_text(p, "type", source),
            }),
            // closure parameters may be bare patterns
            "identifier" => Some(Param {
                name: node_text(p, source).to_string(),
                type_sig: None,
            }),
            _ => None,
        })
        .collect()
}

/// Flatten a `use` tree into `(origin, symbol)` leaves.
///
/// The origin keeps the full path (`crate::graph::schema::CodeGraph`); module
/// resolution walks it back to the longest prefix naming a file.
fn flatten_use(node: &Node, prefix: &str, source: &[u8], out: &mut Vec<(String, ImportedSymbol)>) {
    let join = |rest: &str| {
        if prefix.is_empty() {
            rest.to_string()
        } else {
            format!("{}{}{}", prefix, PATH_SEPARATOR, rest)
        }
    };
    match node.kind() {
        "identifier" | "scoped_identifier" | "crate" | "super" => {
            let path = join(node_text(node, source));
            let name = last_segment(&path).to_string();
            out.push((path, ImportedSymbol::new(name, None)));
        }
        "self" => {
            // `use a::b::{self}` imports the module `b`
            if !prefix.is_empty() {
                let name = last_segment(prefix).to_string();
                out.push((prefix.to_string(), ImportedSymbol::new(name, None)));
            }
        }
        "use_as_clause" => {
            let (Some(path), alias) = (
                field_text(node, "path", source),
                field_text(node, "alias", source),
            ) else {
                return;
            };
            let path = join(&path);
            let name = last_segment(&path).to_string();
            out.push((path, ImportedSymbol::new(name, alias)));
        }
        "use_wildcard" => {
            let text = node_text(node, source);
            let base = text.trim_end_matches('*').trim_end_matches(PATH_SEPARATOR);
            let path = if base.is_empty() {
                prefix.to_string()
            } else {
                join(base)
            };
            out.push((path, ImportedSymbol::new("*", None)));
        }
        "scoped_use_list" => {
            let next = match field_text(node, "path", source) {
                Some(path) => join(&path),
                None => prefix.to_string(),
            };
            if let Some(list) = node.child_by_field_name("list") {
                flatten_use(&list, &next, source, out);
            }
        }
        "use_list" => {
            for child in named_children(node) {
                flatten_use(&child, prefix, source, out);
            }
        }
        _ => {}
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::pool::with_parser;

    fn parse(source: &str) -> tree_sitter::Tree {
        with_parser(Language::Rust, |p| p.parse(source.as_bytes(), None))
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
    fn test_use_tree_flattening() {
        let src = "use crate::graph::{schema::CodeGraph, filter as f, self};\n";
        let tree = parse(src);
        let decl = find(tree.root_node(), "use_declaration").unwrap();
        let imports = RustRules.capture_imports(&decl, src.as_bytes());
        let pairs: Vec<_> = imports
            .iter()
            .map(|i| (i.origin.as_str(), i.symbols[0].local_name()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("crate::graph::schema::CodeGraph", "CodeGraph"),
                ("crate::graph::filter", "f"),
                ("crate::graph", "graph"),
            ]
        );
    }

    #[test]
    fn test_wildcard_use() {
        let src = "use super::rules::*;\n";
        let tree = parse(src);
        let decl = find(tree.root_node(), "use_declaration").unwrap();
        let imports = RustRules.capture_imports(&decl, src.as_bytes());
        assert_eq!(imports[0].origin, "super::rules");
        assert_eq!(imports[0].symbols[0].name, "*");
    }

    #[test]
    fn test_impl_trait_is_provisional_class() {
        let src = "impl<T> Store for Cache<T> { fn get(&self, key: &str) -> Option<T> { None } }";
        let tree = parse(src);
        let imp = find(tree.root_node(), "impl_item").unwrap();
        let capture = RustRules.capture_type(&imp, src.as_bytes()).unwrap();
        assert!(capture.provisional);
        assert_eq!(capture.name, "Cache");
        assert_eq!(capture.implements, vec!["Store"]);
        assert_eq!(capture.fields[0], ("get".to_string(), "(key: &str):Option<T>".to_string()));
        let frame = RustRules.scope_for(&imp, src.as_bytes()).unwrap();
        assert_eq!(frame.name, "Cache");
    }

    #[test]
    fn test_struct_typed_fields_and_trait_bounds() {
        let src = "struct Svc { repo: Arc<dyn Repo>, count: usize }\ntrait Repo: Send + Store {}";
        let tree = parse(src);
        let s = find(tree.root_node(), "struct_item").unwrap();
        let capture = RustRules.capture_type(&s, src.as_bytes()).unwrap();
        assert_eq!(capture.typed_fields[0], ("repo".to_string(), "Repo".to_string()));
        let t = find(tree.root_node(), "trait_item").unwrap();
        let capture = RustRules.capture_type(&t, src.as_bytes()).unwrap();
        assert_eq!(capture.kind, Some(TypeKind::Interface));
        assert_eq!(capture.extends, vec!["Send", "Store"]);
    }

    #[test]
    fn test_only_new_is_a_constructor() {
        let src = "impl A { fn new() -> Self { A } fn renew(&self) {} }";
        let tree = parse(src);
        let body = find(tree.root_node(), "declaration_list").unwrap();
        let flags: Vec<(String, bool)> = named_children(&body)
            .iter()
            .filter_map(|item| RustRules.capture_function(item, src.as_bytes()))
            .map(|f| (f.name, f.is_constructor))
            .collect();
        assert_eq!(flags, vec![("new".to_string(), true), ("renew".to_string(), false)]);
    }

    #[test]
    fn test_self_receiver_excluded_from_params() {
        let src = "impl A { fn new(repo: Repo) -> Self { A { repo } } fn run(&mut self, n: u32) {} }";
        let tree = parse(src);
        let imp = find(tree.root_node(), "impl_item").unwrap();
        let capture = RustRules.capture_type(&imp, src.as_bytes()).unwrap();
        assert_eq!(capture.fields[0].1, "(repo: Repo):Self");
        assert_eq!(capture.fields[1].1, "(n: u32):");
        assert!(RustRules.is_self_reference("Self"));
    }
}
