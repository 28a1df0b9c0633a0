//! TypeScript (and TSX) rules.
//!
//! Call chains, imports, and class handling come from the JavaScript rules;
//! this module adds interfaces, enums, type aliases, abstract classes, and
//! the typed constructor parameters the instance-type mapping feeds on.

use crate::ingest::chain::ChainStep;
use crate::ingest::detect::Language;
use crate::ingest::javascript;
use crate::ingest::rules::{
    child_of_kind, clean_annotation, field_text, named_children, node_text, signature_text,
    FunctionCapture, ImportCapture, LanguageRules, TypeCapture, TypeKind,
};
use crate::ingest::scope::{ScopeFrame, ScopeKind};
use tree_sitter::Node;

pub struct TypeScriptRules {
    pub tsx: bool,
}

impl LanguageRules for TypeScriptRules {
    fn language(&self) -> Language {
        if self.tsx {
            Language::Tsx
        } else {
            Language::TypeScript
        }
    }

    fn self_token(&self) -> &'static str {
        "this"
    }

    fn constructor_name(&self) -> &'static str {
        "constructor"
    }

    fn scope_for(&self, node: &Node, source: &[u8]) -> Option<ScopeFrame> {
        let kind = match node.kind() {
            "class_declaration" | "class" | "abstract_class_declaration" => ScopeKind::Class,
            "interface_declaration" => ScopeKind::Interface,
            "enum_declaration" => ScopeKind::Enum,
            _ => return javascript::function_frame(node, source),
        };
        field_text(node, "name", source).map(|name| ScopeFrame::new(kind, name))
    }

    fn is_call_site(&self, node: &Node) -> bool {
        node.kind() == "call_expression"
    }

    fn descend<'t>(&self, node: &Node<'t>) -> Option<Node<'t>> {
        javascript::descend(node)
    }

    fn classify(&self, node: &Node, source: &[u8]) -> ChainStep {
        javascript::classify(node, source)
    }

    fn capture_imports(&self, node: &Node, source: &[u8]) -> Vec<ImportCapture> {
        javascript::capture_imports(node, source)
    }

    fn capture_type(&self, node: &Node, source: &[u8]) -> Option<TypeCapture> {
        match node.kind() {
            "class_declaration" | "class" | "abstract_class_declaration" => {
                javascript::capture_class(self, node, source)
            }
            "interface_declaration" => capture_interface(self, node, source),
            "enum_declaration" => capture_enum(node, source),
            "type_alias_declaration" => Some(TypeCapture {
                kind: Some(TypeKind::Alias),
                name: field_text(node, "name", source)?,
                fields: field_text(node, "value", source)
                    .map(|v| vec![("=".to_string(), clean_annotation(&v))])
                    .unwrap_or_default(),
                ..Default::default()
            }),
            _ => None,
        }
    }

    fn capture_function<'t>(&self, node: &Node<'t>, source: &[u8]) -> Option<FunctionCapture<'t>> {
        javascript::capture_function(self, node, source)
    }
}

fn capture_interface(rules: &dyn LanguageRules, node: &Node, source: &[u8]) -> Option<TypeCapture> {
    let mut capture = TypeCapture {
        kind: Some(TypeKind::Interface),
        name: field_text(node, "name", source)?,
        ..Default::default()
    };

    if let Some(clause) = child_of_kind(node, &["extends_type_clause"]) {
        capture.extends.extend(
            named_children(&clause)
                .iter()
                .filter_map(|n| javascript::heritage_name(n, source)),
        );
    }

    if let Some(body) = node.child_by_field_name("body") {
        for member in named_children(&body) {
            match member.kind() {
                "method_signature" => {
                    if let Some(f) = javascript::capture_function(rules, &member, source) {
                        let sig = signature_text(&f.params, f.return_type.as_deref());
                        capture.fields.push((f.name, sig));
                    }
                }
                "property_signature" => {
                    if let Some(name) = field_text(&member, "name", source) {
                        let annotation = field_text(&member, "type", source)
                            .map(|t| clean_annotation(&t))
                            .unwrap_or_default();
                        capture.fields.push((name, annotation));
                    }
                }
                _ => {}
            }
        }
    }
    Some(capture)
}

fn capture_enum(node: &Node, source: &[u8]) -> Option<TypeCapture> {
    let mut capture = TypeCapture {
        kind: Some(TypeKind::Enum),
        name: field_text(node, "name", source)?,
        ..Default::default()
    };
    if let Some(body) = node.child_by_field_name("body") {
        for member in named_children(&body) {
            let name = match member.kind() {
                "property_identifier" | "string" => node_text(&member, source).to_string(),
                "enum_assignment" => match field_text(&member, "name", source) {
                    Some(n) => n,
                    None => continue,
                },
                _ => continue,
            };
            capture.fields.push((name, String::new()));
        }
    }
    Some(capture)
}
