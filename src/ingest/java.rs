//! Java rules.
//!
//! `method_invocation` names and invokes in one node, so chains are built with
//! [`ChainStep::PushInvoked`]. Imports keep the full dotted path as origin
//! (`com.acme.Service`); wildcard imports keep the package and bind `*`.

use crate::ingest::chain::{ChainStep, LinkRole};
use crate::ingest::detect::Language;
use crate::ingest::rules::{
    child_of_kind, field_text, named_children, node_text, signature_text, simple_type_name,
    FunctionCapture, ImportCapture, ImportedSymbol, LanguageRules, Param, TypeCapture, TypeKind,
};
use crate::ingest::scope::{ScopeFrame, ScopeKind};
use tree_sitter::Node;

pub struct JavaRules;

impl LanguageRules for JavaRules {
    fn language(&self) -> Language {
        Language::Java
    }

    fn self_token(&self) -> &'static str {
        "this"
    }

    fn constructor_name(&self) -> &'static str {
        // Constructors carry the class name; see `capture_function`.
        ""
    }

    fn scope_for(&self, node: &Node, source: &[u8]) -> Option<ScopeFrame> {
        let kind = match node.kind() {
            "class_declaration" | "record_declaration" => ScopeKind::Class,
            "interface_declaration" | "annotation_type_declaration" => ScopeKind::Interface,
            "enum_declaration" => ScopeKind::Enum,
            "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                ScopeKind::Function
            }
            _ => return None,
        };
        field_text(node, "name", source).map(|name| ScopeFrame::new(kind, name))
    }

    fn is_call_site(&self, node: &Node) -> bool {
        node.kind() == "method_invocation"
    }

    fn descend<'t>(&self, node: &Node<'t>) -> Option<Node<'t>> {
        match node.kind() {
            "method_invocation" | "field_access" => node.child_by_field_name("object"),
            "cast_expression" => node.child_by_field_name("value"),
            "array_access" => node.child_by_field_name("array"),
            "parenthesized_expression" => node.named_child(0),
            _ => None,
        }
    }

    fn classify(&self, node: &Node, source: &[u8]) -> ChainStep {
        match node.kind() {
            "method_invocation" => match field_text(node, "name", source) {
                Some(name) => ChainStep::PushInvoked(name),
                None => ChainStep::Stop,
            },
            "field_access" => match field_text(node, "field", source) {
                Some(field) => ChainStep::Push(LinkRole::Member, field),
                None => ChainStep::Stop,
            },
            "identifier" | "this" | "super" | "type_identifier" => {
                ChainStep::Push(LinkRole::Member, node_text(node, source).to_string())
            }
            "cast_expression" | "array_access" | "parenthesized_expression" => ChainStep::Skip,
            _ => ChainStep::Stop,
        }
    }

    fn capture_imports(&self, node: &Node, source: &[u8]) -> Vec<ImportCapture> {
        if node.kind() != "import_declaration" {
            return Vec::new();
        }
        let text = node_text(node, source);
        let body = text
            .trim()
            .trim_start_matches("import")
            .trim_end_matches(';')
            .trim();
        let (is_static, path) = match body.strip_prefix("static") {
            Some(rest) => (true, rest.trim()),
            None => (false, body),
        };
        let path: String = path.chars().filter(|c| !c.is_whitespace()).collect();
        if path.is_empty() {
            return Vec::new();
        }

        let line = node.start_position().row + 1;
        let capture = if let Some(package) = path.strip_suffix(".*") {
            ImportCapture {
                origin: package.to_string(),
                symbols: vec![ImportedSymbol::new("*", None)],
                line,
            }
        } else if is_static {
            // import static a.b.Util.helper -> Util.java exports helper
            let (class_path, member) = path.rsplit_once('.').unwrap_or(("", path.as_str()));
            ImportCapture {
                origin: class_path.to_string(),
                symbols: vec![ImportedSymbol::new(member, None)],
                line,
            }
        } else {
            let name = path.rsplit('.').next().unwrap_or(&path).to_string();
            ImportCapture {
                origin: path.clone(),
                symbols: vec![ImportedSymbol::new(name, None)],
                line,
            }
        };
        vec![capture]
    }

    fn capture_type(&self, node: &Node, source: &[u8]) -> Option<TypeCapture> {
        let kind = match node.kind() {
            "class_declaration" | "record_declaration" => TypeKind::Class,
            "interface_declaration" | "annotation_type_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            _ => return None,
        };
        let mut capture = TypeCapture {
            kind: Some(kind),
            name: field_text(node, "name", source)?,
            ..Default::default()
        };

        if let Some(superclass) = node.child_by_field_name("superclass") {
            capture.extends.extend(type_names(&superclass, source));
        }
        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            capture.implements.extend(type_names(&interfaces, source));
        }
        if let Some(extended) = child_of_kind(node, &["extends_interfaces"]) {
            capture.extends.extend(type_names(&extended, source));
        }

        // record components are fields
        if let Some(components) = node.child_by_field_name("parameters") {
            for param in capture_params(Some(components), source) {
                if let Some(type_name) = param.type_sig.as_deref().and_then(simple_type_name) {
                    capture.typed_fields.push((param.name.clone(), type_name));
                }
                capture.fields.push((param.name, param.type_sig.unwrap_or_default()));
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            collect_members(&body, source, &mut capture);
        }
        Some(capture)
    }

    fn capture_function<'t>(&self, node: &Node<'t>, source: &[u8]) -> Option<FunctionCapture<'t>> {
        let is_constructor = match node.kind() {
            "method_declaration" => false,
            "constructor_declaration" | "compact_constructor_declaration" => true,
            _ => return None,
        };
        Some(FunctionCapture {
            name: field_text(node, "name", source)?,
            params: capture_params(node.child_by_field_name("parameters"), source),
            return_type: field_text(node, "type", source),
            body: node.child_by_field_name("body"),
            is_constructor,
        })
    }
}

/// Simple names of every type mentioned under a heritage clause.
fn type_names(clause: &Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    for child in named_children(clause) {
        match child.kind() {
            "type_list" => names.extend(type_names(&child, source)),
            "type_identifier" | "generic_type" | "scoped_type_identifier" => {
                names.extend(simple_type_name(node_text(&child, source)))
            }
            _ => {}
        }
    }
    names
}

fn collect_members(body: &Node, source: &[u8], capture: &mut TypeCapture) {
    for member in named_children(body) {
        match member.kind() {
            "method_declaration" | "constructor_declaration" => {
                let Some(f) = JavaRules.capture_function(&member, source) else {
                    continue;
                };
                let sig = signature_text(&f.params, f.return_type.as_deref());
                capture.fields.push((f.name.clone(), sig));
                if f.is_constructor {
                    if let Some(ctor_body) = f.body {
                        collect_this_assignments(&ctor_body, source, capture);
                    }
                }
            }
            "field_declaration" | "constant_declaration" => {
                let Some(declared) = field_text(&member, "type", source) else {
                    continue;
                };
                let simple = simple_type_name(&declared);
                let mut cursor = member.walk();
                for declarator in member.children_by_field_name("declarator", &mut cursor) {
                    let Some(name) = field_text(&declarator, "name", source) else {
                        continue;
                    };
                    if let Some(type_name) = &simple {
                        capture.typed_fields.push((name.clone(), type_name.clone()));
                    }
                    capture.fields.push((name, declared.clone()));
                }
            }
            "enum_constant" => {
                if let Some(name) = field_text(&member, "name", source) {
                    capture.fields.push((name, String::new()));
                }
            }
            // enum bodies nest regular members one level down
            "enum_body_declarations" => collect_members(&member, source, capture),
            _ => {}
        }
    }
}

/// `this.repo = new Repo()` inside a constructor.
fn collect_this_assignments(body: &Node, source: &[u8], capture: &mut TypeCapture) {
    for statement in named_children(body) {
        if statement.kind() != "expression_statement" {
            continue;
        }
        let Some(assignment) = statement.named_child(0) else {
            continue;
        };
        if assignment.kind() != "assignment_expression" {
            continue;
        }
        let (Some(left), Some(right)) = (
            assignment.child_by_field_name("left"),
            assignment.child_by_field_name("right"),
        ) else {
            continue;
        };
        if left.kind() != "field_access"
            || field_text(&left, "object", source).as_deref() != Some("this")
            || right.kind() != "object_creation_expression"
        {
            continue;
        }
        if let (Some(field), Some(type_name)) = (
            field_text(&left, "field", source),
            field_text(&right, "type", source).and_then(|t| simple_type_name(&t)),
        ) {
            capture.typed_fields.push((field, type_name));
        }
    }
}

fn capture_params(params: Option<Node>, source: &[u8]) -> Vec<Param> {
    let Some(params) = params else {
        return Vec::new();
    };
    named_children(&params)
        .iter()
        .filter(|p| p.kind() == "formal_parameter" || p.kind() == "spread_parameter")
        .filter_map(|p| {
            let name = field_text(p, "name", source).or_else(|| {
                // spread_parameter: Type... name
                child_of_kind(p, &["variable_declarator"])
                    .and_then(|d| field_text(&d, "name", source))
            })?;
            let type_sig = field_text(p, "type", source).or_else(|| {
                p.named_child(0)
                    .filter(|n| n.kind() != "modifiers")
                    .map(|n| node_text(&n, source).to_string())
            });
            Some(Param { name, type_sig })
        })
        .collect()
}
