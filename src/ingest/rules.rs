//! Per-language extraction rules.
//!
//! Every supported language implements [`LanguageRules`]: the node-kind
//! vocabulary for scope-introducing constructs, the call-chain classifier, the
//! self-reference token and constructor name, and the structural captures the
//! extraction engine runs (imports, type declarations, functions).
//!
//! Rules are stateless; [`rules_for`] hands out a `'static` instance per
//! language, resolved once per file.

use crate::ingest::chain::ChainStep;
use crate::ingest::detect::Language;
use crate::ingest::scope::ScopeFrame;
use crate::ingest::{java, javascript, python, rust, typescript};
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

/// Declared kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Alias,
}

/// One imported name, with its local alias when renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedSymbol {
    /// Name as exported by the origin module (`*` for namespace/wildcard imports)
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ImportedSymbol {
    pub fn new(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias,
        }
    }

    /// The name this symbol is bound to in the importing file.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Raw import statement before module resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCapture {
    /// Origin text as written (`./service`, `a.b.c`, `crate::graph`)
    pub origin: String,
    pub symbols: Vec<ImportedSymbol>,
    pub line: usize,
}

/// A type declaration (or a Rust impl block contributing to one).
#[derive(Debug, Clone, Default)]
pub struct TypeCapture {
    pub kind: Option<TypeKind>,
    pub name: String,
    /// Raw names of supertypes (class inheritance, interface extension, supertraits)
    pub extends: Vec<String>,
    /// Raw names of implemented interfaces/traits
    pub implements: Vec<String>,
    /// Members: method or property name -> type signature
    pub fields: Vec<(String, String)>,
    /// Properties with a declared type: name -> simple type name
    pub typed_fields: Vec<(String, String)>,
    /// Impl blocks only add members; a later definitive declaration sets kind and position
    pub provisional: bool,
}

/// One parameter as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_sig: Option<String>,
}

/// A function or method declaration.
#[derive(Debug, Clone)]
pub struct FunctionCapture<'t> {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    /// Absent for signatures (interface methods, trait items, abstract methods)
    pub body: Option<Node<'t>>,
    pub is_constructor: bool,
}

/// Language-specific rules consumed by the scope/chain resolver and extraction engine.
pub trait LanguageRules: Sync {
    fn language(&self) -> Language;

    /// Receiver keyword: `this` or `self`
    fn self_token(&self) -> &'static str;

    /// Conventional constructor method name, empty when the language has none.
    fn constructor_name(&self) -> &'static str;

    /// Whether a function called `name` is the type's constructor.
    fn is_constructor_name(&self, name: &str) -> bool {
        let constructor = self.constructor_name();
        !constructor.is_empty() && name == constructor
    }

    /// Whether `name` refers to the current instance or type.
    fn is_self_reference(&self, name: &str) -> bool {
        name == self.self_token()
    }

    /// Frame introduced by `node`, or `None` when it does not open a scope.
    fn scope_for(&self, node: &Node, source: &[u8]) -> Option<ScopeFrame>;

    /// Whether `node` is an invocation whose chain should be walked.
    fn is_call_site(&self, node: &Node) -> bool;

    /// The receiver/callee child a chain walk descends into from `node`.
    fn descend<'t>(&self, node: &Node<'t>) -> Option<Node<'t>>;

    /// How `node` contributes to a chain walked upward from its leftmost atom.
    fn classify(&self, node: &Node, source: &[u8]) -> ChainStep;

    fn capture_imports(&self, node: &Node, source: &[u8]) -> Vec<ImportCapture>;

    fn capture_type(&self, node: &Node, source: &[u8]) -> Option<TypeCapture>;

    fn capture_function<'t>(&self, node: &Node<'t>, source: &[u8]) -> Option<FunctionCapture<'t>>;

    /// Whether a leaf token is a comment (excluded from body hashes).
    fn is_comment(&self, node: &Node) -> bool {
        node.kind().contains("comment")
    }
}

static RUST_RULES: rust::RustRules = rust::RustRules;
static PYTHON_RULES: python::PythonRules = python::PythonRules;
static JAVA_RULES: java::JavaRules = java::JavaRules;
static JAVASCRIPT_RULES: javascript::JavaScriptRules = javascript::JavaScriptRules;
static TYPESCRIPT_RULES: typescript::TypeScriptRules = typescript::TypeScriptRules { tsx: false };
static TSX_RULES: typescript::TypeScriptRules = typescript::TypeScriptRules { tsx: true };

/// Rules registry.
pub fn rules_for(language: Language) -> &'static dyn LanguageRules {
    match language {
        Language::Rust => &RUST_RULES,
        Language::Python => &PYTHON_RULES,
        Language::Java => &JAVA_RULES,
        Language::JavaScript => &JAVASCRIPT_RULES,
        Language::TypeScript => &TYPESCRIPT_RULES,
        Language::Tsx => &TSX_RULES,
    }
}

// Shared node helpers used by the language modules.

/// UTF-8 text of a node, empty on invalid ranges.
pub(crate) fn node_text<'s>(node: &Node, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

/// Text of the named field child, if present.
pub(crate) fn field_text(node: &Node, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| node_text(&child, source).to_string())
}

/// First named child whose kind is one of `kinds`.
pub(crate) fn child_of_kind<'t>(node: &Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| kinds.contains(&child.kind()));
    found
}

/// Named children as a vector (tree cursors cannot outlive the borrow).
pub(crate) fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Strip a leading `:` or `->` from an annotation and collapse whitespace.
pub(crate) fn clean_annotation(text: &str) -> String {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix(':')
        .or_else(|| trimmed.strip_prefix("->"))
        .unwrap_or(trimmed);
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip string quotes from an import origin.
pub(crate) fn unquote(text: &str) -> String {
    text.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

/// Member signature `(a: A, b):R` recorded in a type's fields.
pub(crate) fn signature_text(params: &[Param], return_type: Option<&str>) -> String {
    let list = params
        .iter()
        .map(|p| match &p.type_sig {
            Some(t) => format!("{}: {}", p.name, t),
            None => p.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("({}):{}", list, return_type.unwrap_or(""))
}

const WRAPPER_TYPES: &[&str] = &[
    "Box", "Arc", "Rc", "Option", "RefCell", "Cell", "Mutex", "RwLock", "Weak", "Optional",
    "Readonly", "Promise",
];

/// Reduce a declared type to the simple name a receiver resolves to.
///
/// `&mut Arc<dyn crate::svc::Service>` -> `Service`, `Optional<Repo>` -> `Repo`,
/// `Service | null` -> `Service`. Returns `None` for anything that does not
/// reduce to a single identifier (tuples, function types, literals).
pub fn simple_type_name(raw: &str) -> Option<String> {
    let mut text = clean_annotation(raw);
    if let Some((first, _)) = text.split_once('|') {
        text = first.trim().to_string();
    }
    let mut t = text.as_str();
    loop {
        let before = t;
        for prefix in ["&mut ", "&", "mut ", "dyn ", "impl ", "readonly ", "typing."] {
            if let Some(rest) = t.strip_prefix(prefix) {
                t = rest.trim_start();
            }
        }
        if t.starts_with('\'') {
            // lifetime in a reference: &'a T
            t = t.split_once(' ').map(|(_, rest)| rest).unwrap_or("");
        }
        if t == before {
            break;
        }
    }
    let t = t.trim_end_matches("[]").trim_end_matches('?').trim();

    let (outer, inner) = match t.split_once('<').or_else(|| t.split_once('[')) {
        Some((outer, rest)) => (outer.trim(), Some(rest)),
        None => (t, None),
    };
    let base = outer.rsplit(|c| c == ':' || c == '.').next().unwrap_or(outer);

    if let Some(inner) = inner {
        if WRAPPER_TYPES.contains(&base) {
            let inner = inner.trim_end_matches(|c| c == '>' || c == ']');
            let first_arg = inner.split(',').next().unwrap_or(inner);
            return simple_type_name(first_arg);
        }
    }

    if !base.is_empty() && base.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Some(base.to_string())
    } else {
        None
    }
}
