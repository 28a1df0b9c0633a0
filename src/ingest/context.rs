//! Per-file extraction context.
//!
//! One context is created per file and dropped with it. It owns every cache
//! and lookup table the extraction passes share, so parallel workers never
//! touch common mutable state.

use crate::ingest::chain::ChainLink;
use crate::ingest::detect::Language;
use crate::ingest::rules::LanguageRules;
use crate::ingest::scope::{Scope, KEY_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

/// Length of the hex-encoded synthetic id.
const SYNTHETIC_ID_LEN: usize = 16;

/// Process-stable identifier for a syntax node.
///
/// Derived from file path, node kind, and byte range, so re-parsing the same
/// content yields the same id (unlike tree-sitter's transient node ids).
pub fn synthetic_id(absolute_path: &str, node: &Node) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(absolute_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(node.kind().as_bytes());
    hasher.update(&(node.start_byte() as u64).to_le_bytes());
    hasher.update(&(node.end_byte() as u64).to_le_bytes());
    let hex = hasher.finalize().to_hex();
    hex[..SYNTHETIC_ID_LEN].to_string()
}

/// Position of a node, 1-indexed lines and 0-indexed byte columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Position {
    pub fn of(node: &Node) -> Self {
        Self {
            start_line: node.start_position().row + 1,
            start_col: node.start_position().column,
            end_line: node.end_position().row + 1,
            end_col: node.end_position().column,
        }
    }
}

/// Cross-reference record bridging a syntax node and the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisNode {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: String,
    /// First line of the node's text
    pub text: String,
    pub position: Position,
    /// Synthetic ids of named children
    pub children: Vec<String>,
}

/// Caches and symbol tables for one file.
pub struct ExtractionContext {
    absolute_path: String,
    language: Language,
    synthetic_to_transient: HashMap<String, usize>,
    transient_to_synthetic: HashMap<usize, String>,
    chain_cache: HashMap<String, Vec<ChainLink>>,
    scope_cache: HashMap<usize, Scope>,
    /// Local import binding -> normalized origin path
    imports: HashMap<String, String>,
    /// Local import binding -> name exported by the origin, for renamed imports
    import_names: HashMap<String, String>,
    /// `scope::member` -> `scope::Type`
    instance_types: HashMap<String, String>,
    local_types: HashSet<String>,
    nodes: HashMap<String, AnalysisNode>,
}

impl ExtractionContext {
    pub fn new(absolute_path: &str, language: Language) -> Self {
        Self {
            absolute_path: absolute_path.to_string(),
            language,
            synthetic_to_transient: HashMap::new(),
            transient_to_synthetic: HashMap::new(),
            chain_cache: HashMap::new(),
            scope_cache: HashMap::new(),
            imports: HashMap::new(),
            import_names: HashMap::new(),
            instance_types: HashMap::new(),
            local_types: HashSet::new(),
            nodes: HashMap::new(),
        }
    }

    pub fn absolute_path(&self) -> &str {
        &self.absolute_path
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Synthetic id for `node`, registering the synthetic/transient pair.
    pub fn synthetic_id(&mut self, node: &Node) -> String {
        if let Some(id) = self.transient_to_synthetic.get(&node.id()) {
            return id.clone();
        }
        let id = synthetic_id(&self.absolute_path, node);
        self.transient_to_synthetic.insert(node.id(), id.clone());
        self.synthetic_to_transient.insert(id.clone(), node.id());
        id
    }

    /// Transient tree-sitter id for a registered synthetic id.
    pub fn transient_id(&self, synthetic: &str) -> Option<usize> {
        self.synthetic_to_transient.get(synthetic).copied()
    }

    pub fn cached_chain(&self, synthetic: &str) -> Option<&Vec<ChainLink>> {
        self.chain_cache.get(synthetic)
    }

    pub fn cache_chain(&mut self, synthetic: String, links: Vec<ChainLink>) {
        self.chain_cache.insert(synthetic, links);
    }

    /// Record an [`AnalysisNode`] for a declaration or call site and return its id.
    pub fn register_node(&mut self, node: &Node, source: &[u8]) -> String {
        let id = self.synthetic_id(node);
        if !self.nodes.contains_key(&id) {
            let name = node
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(source).ok())
                .map(str::to_string);
            let text = node
                .utf8_text(source)
                .unwrap_or("")
                .lines()
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            let mut cursor = node.walk();
            let children = node
                .named_children(&mut cursor)
                .map(|child| synthetic_id(&self.absolute_path, &child))
                .collect();
            self.nodes.insert(
                id.clone(),
                AnalysisNode {
                    id: id.clone(),
                    name,
                    kind: node.kind().to_string(),
                    text,
                    position: Position::of(node),
                    children,
                },
            );
        }
        id
    }

    /// Drain the registered analysis nodes.
    pub fn take_nodes(&mut self) -> HashMap<String, AnalysisNode> {
        std::mem::take(&mut self.nodes)
    }

    /// Scope of `node`, including the frame `node` itself introduces.
    pub fn scope_of(&mut self, rules: &dyn LanguageRules, node: &Node, source: &[u8]) -> Scope {
        if let Some(cached) = self.scope_cache.get(&node.id()) {
            return cached.clone();
        }

        let mut ancestor = node.parent();
        while let Some(candidate) = ancestor {
            if rules.scope_for(&candidate, source).is_some() {
                break;
            }
            ancestor = candidate.parent();
        }

        let mut scope = match ancestor {
            Some(enclosing) => self.scope_of(rules, &enclosing, source),
            None => Scope::file(),
        };
        if let Some(frame) = rules.scope_for(node, source) {
            scope.push(frame);
        }

        self.scope_cache.insert(node.id(), scope.clone());
        scope
    }

    pub fn register_import(&mut self, local_name: &str, exported_name: &str, normalized_path: &str) {
        self.imports
            .insert(local_name.to_string(), normalized_path.to_string());
        if local_name != exported_name {
            self.import_names
                .insert(local_name.to_string(), exported_name.to_string());
        }
    }

    /// Name a local binding has in the module it was imported from.
    pub fn exported_name<'a>(&'a self, local_name: &'a str) -> &'a str {
        self.import_names
            .get(local_name)
            .map(String::as_str)
            .unwrap_or(local_name)
    }

    /// Normalized path a local binding was imported from.
    ///
    /// Qualified names (`ns.Type`, `module::Type`) fall back to their first segment.
    pub fn imported_path(&self, name: &str) -> Option<&str> {
        if let Some(path) = self.imports.get(name) {
            return Some(path);
        }
        let first = name
            .split(|c| c == '.' || c == ':')
            .find(|s| !s.is_empty())?;
        self.imports.get(first).map(String::as_str)
    }

    pub fn add_local_type(&mut self, name: &str) {
        self.local_types.insert(name.to_string());
    }

    pub fn is_local_type(&self, name: &str) -> bool {
        self.local_types.contains(name)
    }

    /// Record that `member` in `scope` holds an instance of `type_name`.
    ///
    /// Constructor parameters call this with `overwrite = true`; typed field
    /// declarations only fill gaps.
    pub fn record_instance_type(&mut self, scope: &Scope, member: &str, type_name: &str, overwrite: bool) {
        let key = scope.qualify(member);
        let value = scope.qualify(type_name);
        if !overwrite && self.instance_types.contains_key(&key) {
            return;
        }
        self.instance_types.insert(key, value);
    }

    /// Declared type of `member`, searching `scope` and then each enclosing scope.
    pub fn instance_type(&self, scope: &Scope, member: &str) -> Option<&str> {
        let mut current = Some(scope.clone());
        while let Some(s) = current {
            if let Some(value) = self.instance_types.get(&s.qualify(member)) {
                return Some(value.rsplit(KEY_SEPARATOR).next().unwrap_or(value));
            }
            current = s.parent();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::scope::{ScopeFrame, ScopeKind};

    fn class_scope(name: &str) -> Scope {
        Scope::file().child(ScopeFrame::new(ScopeKind::Class, name))
    }

    #[test]
    fn test_instance_type_lookup_walks_outward() {
        let mut ctx = ExtractionContext::new("/r/a.ts", Language::TypeScript);
        let caller = class_scope("Caller");
        ctx.record_instance_type(&caller, "service", "Service", true);

        assert_eq!(ctx.instance_type(&caller, "service"), Some("Service"));
        let inner = caller.child(ScopeFrame::new(ScopeKind::Class, "Inner"));
        assert_eq!(ctx.instance_type(&inner, "service"), Some("Service"));
        assert_eq!(ctx.instance_type(&Scope::file(), "service"), None);
    }

    #[test]
    fn test_constructor_params_override_fields() {
        let mut ctx = ExtractionContext::new("/r/a.ts", Language::TypeScript);
        let scope = class_scope("C");
        ctx.record_instance_type(&scope, "repo", "Repo", true);
        ctx.record_instance_type(&scope, "repo", "OtherRepo", false);
        assert_eq!(ctx.instance_type(&scope, "repo"), Some("Repo"));
        ctx.record_instance_type(&scope, "repo", "SqlRepo", true);
        assert_eq!(ctx.instance_type(&scope, "repo"), Some("SqlRepo"));
    }

    #[test]
    fn test_imported_path_qualified_fallback() {
        let mut ctx = ExtractionContext::new("/r/a.py", Language::Python);
        ctx.register_import("models", "models", "/r/models.py");
        ctx.register_import("Svc", "Service", "/r/service.py");
        assert_eq!(ctx.exported_name("Svc"), "Service");
        assert_eq!(ctx.exported_name("models"), "models");
        assert_eq!(ctx.imported_path("models"), Some("/r/models.py"));
        assert_eq!(ctx.imported_path("models.User"), Some("/r/models.py"));
        assert_eq!(ctx.imported_path("other"), None);
    }

    #[test]
    fn test_synthetic_ids_are_stable_across_parses() {
        let src = b"function f() { g(); }";
        let parse = || {
            crate::ingest::pool::with_parser(Language::JavaScript, |p| p.parse(src, None))
                .unwrap()
                .unwrap()
        };
        let (t1, t2) = (parse(), parse());
        assert_eq!(
            synthetic_id("/r/a.js", &t1.root_node()),
            synthetic_id("/r/a.js", &t2.root_node())
        );
        assert_ne!(
            synthetic_id("/r/a.js", &t1.root_node()),
            synthetic_id("/r/b.js", &t1.root_node())
        );

        let mut ctx = ExtractionContext::new("/r/a.js", Language::JavaScript);
        let id = ctx.synthetic_id(&t1.root_node());
        assert_eq!(ctx.transient_id(&id), Some(t1.root_node().id()));
    }
}
