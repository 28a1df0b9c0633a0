//! JavaScript rules.
//!
//! The ECMAScript helpers here (call chains, imports, class heritage,
//! function captures) are shared with the TypeScript rules; TypeScript only
//! adds interfaces, enums, aliases, and type annotations on top.

use crate::ingest::chain::{ChainStep, LinkRole};
use crate::ingest::detect::Language;
use crate::ingest::rules::{
    child_of_kind, clean_annotation, field_text, named_children, node_text, signature_text,
    simple_type_name, unquote, FunctionCapture, ImportCapture, ImportedSymbol, LanguageRules,
    Param, TypeCapture, TypeKind,
};
use crate::ingest::scope::{ScopeFrame, ScopeKind};
use tree_sitter::Node;

pub struct JavaScriptRules;

impl LanguageRules for JavaScriptRules {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn self_token(&self) -> &'static str {
        "this"
    }

    fn constructor_name(&self) -> &'static str {
        "constructor"
    }

    fn scope_for(&self, node: &Node, source: &[u8]) -> Option<ScopeFrame> {
        match node.kind() {
            "class_declaration" | "class" => {
                field_text(node, "name", source).map(|n| ScopeFrame::new(ScopeKind::Class, n))
            }
            _ => function_frame(node, source),
        }
    }

    fn is_call_site(&self, node: &Node) -> bool {
        node.kind() == "call_expression"
    }

    fn descend<'t>(&self, node: &Node<'t>) -> Option<Node<'t>> {
        descend(node)
    }

    fn classify(&self, node: &Node, source: &[u8]) -> ChainStep {
        classify(node, source)
    }

    fn capture_imports(&self, node: &Node, source: &[u8]) -> Vec<ImportCapture> {
        capture_imports(node, source)
    }

    fn capture_type(&self, node: &Node, source: &[u8]) -> Option<TypeCapture> {
        match node.kind() {
            "class_declaration" | "class" => capture_class(self, node, source),
            _ => None,
        }
    }

    fn capture_function<'t>(&self, node: &Node<'t>, source: &[u8]) -> Option<FunctionCapture<'t>> {
        capture_function(self, node, source)
    }
}

const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function",
    "function_expression",
    "generator_function",
];

/// Value node of a declarator or class field when it is function-valued.
fn function_value<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("value")
        .filter(|v| FUNCTION_VALUES.contains(&v.kind()))
}

/// Name of a class field: `name` in TypeScript, `property` in JavaScript.
fn class_field_name(node: &Node, source: &[u8]) -> Option<String> {
    field_text(node, "name", source).or_else(|| field_text(node, "property", source))
}

/// Function frames shared by JavaScript and TypeScript.
pub(crate) fn function_frame(node: &Node, source: &[u8]) -> Option<ScopeFrame> {
    let name = match node.kind() {
        "function_declaration"
        | "generator_function_declaration"
        | "function_signature"
        | "method_definition"
        | "method_signature"
        | "abstract_method_signature" => field_text(node, "name", source)?,
        "variable_declarator" => {
            function_value(node)?;
            let name = node.child_by_field_name("name")?;
            if name.kind() != "identifier" {
                return None;
            }
            node_text(&name, source).to_string()
        }
        "public_field_definition" | "field_definition" => {
            function_value(node)?;
            class_field_name(node, source)?
        }
        _ => return None,
    };
    Some(ScopeFrame::new(ScopeKind::Function, name))
}

pub(crate) fn descend<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    match node.kind() {
        "call_expression" => node.child_by_field_name("function"),
        "member_expression" | "subscript_expression" => node.child_by_field_name("object"),
        "parenthesized_expression"
        | "non_null_expression"
        | "await_expression"
        | "as_expression"
        | "satisfies_expression" => node.named_child(0),
        _ => None,
    }
}

pub(crate) fn classify(node: &Node, source: &[u8]) -> ChainStep {
    match node.kind() {
        "call_expression" => ChainStep::MarkInvoked,
        "member_expression" => match node.child_by_field_name("property") {
            Some(property) => ChainStep::Push(LinkRole::Member, node_text(&property, source).to_string()),
            None => ChainStep::Stop,
        },
        "identifier" | "this" | "super" => {
            ChainStep::Push(LinkRole::Member, node_text(node, source).to_string())
        }
        "parenthesized_expression"
        | "non_null_expression"
        | "await_expression"
        | "subscript_expression"
        | "as_expression"
        | "satisfies_expression" => ChainStep::Skip,
        _ => ChainStep::Stop,
    }
}

pub(crate) fn capture_imports(node: &Node, source: &[u8]) -> Vec<ImportCapture> {
    let line = node.start_position().row + 1;
    match node.kind() {
        "import_statement" => {
            let Some(origin) = node.child_by_field_name("source") else {
                return Vec::new();
            };
            let mut symbols = Vec::new();
            if let Some(clause) = child_of_kind(node, &["import_clause"]) {
                for part in named_children(&clause) {
                    match part.kind() {
                        "identifier" => symbols.push(ImportedSymbol::new(
                            "default",
                            Some(node_text(&part, source).to_string()),
                        )),
                        "namespace_import" => {
                            if let Some(local) = child_of_kind(&part, &["identifier"]) {
                                symbols.push(ImportedSymbol::new(
                                    "*",
                                    Some(node_text(&local, source).to_string()),
                                ));
                            }
                        }
                        "named_imports" => {
                            for spec in named_children(&part) {
                                if spec.kind() != "import_specifier" {
                                    continue;
                                }
                                if let Some(name) = field_text(&spec, "name", source) {
                                    symbols.push(ImportedSymbol::new(
                                        name,
                                        field_text(&spec, "alias", source),
                                    ));
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            vec![ImportCapture {
                origin: unquote(node_text(&origin, source)),
                symbols,
                line,
            }]
        }
        // const x = require('./x'), const { a, b } = require('./x')
        "variable_declarator" => {
            let Some(value) = node.child_by_field_name("value") else {
                return Vec::new();
            };
            if value.kind() != "call_expression"
                || field_text(&value, "function", source).as_deref() != Some("require")
            {
                return Vec::new();
            }
            let Some(origin) = value
                .child_by_field_name("arguments")
                .and_then(|args| child_of_kind(&args, &["string"]))
            else {
                return Vec::new();
            };
            let Some(binding) = node.child_by_field_name("name") else {
                return Vec::new();
            };
            let symbols = match binding.kind() {
                "identifier" => vec![ImportedSymbol::new(
                    "*",
                    Some(node_text(&binding, source).to_string()),
                )],
                "object_pattern" => named_children(&binding)
                    .iter()
                    .filter_map(|p| match p.kind() {
                        "shorthand_property_identifier_pattern" => {
                            Some(ImportedSymbol::new(node_text(p, source), None))
                        }
                        "pair_pattern" => {
                            let key = field_text(p, "key", source)?;
                            Some(ImportedSymbol::new(key, field_text(p, "value", source)))
                        }
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            vec![ImportCapture {
                origin: unquote(node_text(&origin, source)),
                symbols,
                line,
            }]
        }
        _ => Vec::new(),
    }
}

/// Simple name of a heritage/type expression: `Base`, `ns.Base` -> `Base`, `Base<T>` -> `Base`.
pub(crate) fn heritage_name(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "type_identifier" => Some(node_text(node, source).to_string()),
        "member_expression" => field_text(node, "property", source),
        "nested_type_identifier" => field_text(node, "name", source),
        "generic_type" => node
            .child_by_field_name("name")
            .and_then(|n| heritage_name(&n, source)),
        _ => None,
    }
}

/// Collect class heritage: JavaScript has a bare expression, TypeScript wraps
/// it in `extends_clause`/`implements_clause`.
fn collect_heritage(class: &Node, source: &[u8], capture: &mut TypeCapture) {
    let Some(heritage) = child_of_kind(class, &["class_heritage"]) else {
        return;
    };
    for part in named_children(&heritage) {
        match part.kind() {
            "extends_clause" => capture.extends.extend(
                named_children(&part)
                    .iter()
                    .filter_map(|n| heritage_name(n, source)),
            ),
            "implements_clause" => capture.implements.extend(
                named_children(&part)
                    .iter()
                    .filter_map(|n| heritage_name(n, source)),
            ),
            _ => capture.extends.extend(heritage_name(&part, source)),
        }
    }
}

/// Class capture shared with TypeScript.
pub(crate) fn capture_class(
    rules: &dyn LanguageRules,
    node: &Node,
    source: &[u8],
) -> Option<TypeCapture> {
    let name = field_text(node, "name", source)?;
    let mut capture = TypeCapture {
        kind: Some(TypeKind::Class),
        name,
        ..Default::default()
    };
    collect_heritage(node, source, &mut capture);

    let Some(body) = node.child_by_field_name("body") else {
        return Some(capture);
    };
    for member in named_children(&body) {
        match member.kind() {
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                if let Some(f) = capture_function(rules, &member, source) {
                    let sig = signature_text(&f.params, f.return_type.as_deref());
                    capture.fields.push((f.name.clone(), sig));
                    if f.is_constructor {
                        if let Some(ctor_body) = f.body {
                            collect_this_assignments(&ctor_body, source, &mut capture);
                        }
                    }
                }
            }
            "public_field_definition" | "field_definition" => {
                let Some(field) = class_field_name(&member, source) else {
                    continue;
                };
                let annotation = member
                    .child_by_field_name("type")
                    .map(|t| clean_annotation(node_text(&t, source)));
                if let Some(type_name) = annotation.as_deref().and_then(simple_type_name) {
                    capture.typed_fields.push((field.clone(), type_name));
                } else if let Some(value) = member.child_by_field_name("value") {
                    if let Some(type_name) = constructed_type(&value, source) {
                        capture.typed_fields.push((field.clone(), type_name));
                    }
                }
                capture.fields.push((field, annotation.unwrap_or_default()));
            }
            _ => {}
        }
    }
    Some(capture)
}

/// `new Foo(...)` -> `Foo`
fn constructed_type(value: &Node, source: &[u8]) -> Option<String> {
    if value.kind() != "new_expression" {
        return None;
    }
    value
        .child_by_field_name("constructor")
        .and_then(|c| heritage_name(&c, source))
}

/// `this.repo = new Repo()` inside a constructor records `repo: Repo`.
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
        let is_this_member = left.kind() == "member_expression"
            && left
                .child_by_field_name("object")
                .map(|o| o.kind() == "this")
                .unwrap_or(false);
        if !is_this_member {
            continue;
        }
        if let (Some(field), Some(type_name)) = (
            field_text(&left, "property", source),
            constructed_type(&right, source),
        ) {
            capture.typed_fields.push((field, type_name));
        }
    }
}

fn capture_params(params: Option<Node>, source: &[u8]) -> Vec<Param> {
    let Some(params) = params else {
        return Vec::new();
    };
    if params.kind() == "identifier" {
        // single-parameter arrow function: x => ...
        return vec![Param {
            name: node_text(&params, source).to_string(),
            type_sig: None,
        }];
    }
    named_children(&params)
        .iter()
        .filter(|p| !p.kind().contains("comment"))
        .map(|p| {
            let name_node = p
                .child_by_field_name("pattern")
                .or_else(|| p.child_by_field_name("left"))
                .unwrap_or(*p);
            Param {
                name: node_text(&name_node, source).to_string(),
                type_sig: p
                    .child_by_field_name("type")
                    .map(|t| clean_annotation(node_text(&t, source))),
            }
        })
        .collect()
}

fn function_parts<'t>(
    rules: &dyn LanguageRules,
    name: String,
    decl: &Node<'t>,
    source: &[u8],
) -> FunctionCapture<'t> {
    let params = decl
        .child_by_field_name("parameters")
        .or_else(|| decl.child_by_field_name("parameter"));
    FunctionCapture {
        is_constructor: rules.is_constructor_name(&name),
        name,
        params: capture_params(params, source),
        return_type: decl
            .child_by_field_name("return_type")
            .map(|t| clean_annotation(node_text(&t, source))),
        body: decl.child_by_field_name("body"),
    }
}

/// Function capture shared with TypeScript.
pub(crate) fn capture_function<'t>(
    rules: &dyn LanguageRules,
    node: &Node<'t>,
    source: &[u8],
) -> Option<FunctionCapture<'t>> {
    let frame = function_frame(node, source)?;
    match node.kind() {
        "variable_declarator" | "public_field_definition" | "field_definition" => {
            let value = function_value(node)?;
            Some(function_parts(rules, frame.name, &value, source))
        }
        _ => Some(function_parts(rules, frame.name, node, source)),
    }
}
