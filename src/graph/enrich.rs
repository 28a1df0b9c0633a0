//! Graph enrichment: canonical nodes and typed relationships.
//!
//! Turns an assembled [`CodeGraph`] into an [`EnrichedGraph`] in passes:
//!
//! 1. nodes: one per file, type and function, deduplicated by id
//! 2. heritage: IMPLEMENTS/IMPLEMENTED_BY and EXTENDS/EXTENDED_BY pairs
//! 3. HAS_METHOD from a type to each of its methods
//! 4. IMPORTS from a file to the constructs it imports
//! 5. CALLS (and CALLS_IMPLEMENTATION through interfaces) for every call
//!
//! An edge is added only when both endpoints are registered nodes, and at
//! most once per `(from, to, kind)`.
//!
//! Call targets are matched by name, not by type checking. When several
//! types implement an interface, CALLS_IMPLEMENTATION points at the first
//! implementer (in key order) that declares the method; the others are not
//! linked.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::schema::{Call, CodeGraph, FunctionAnalysis, TypeAnalysis};
use crate::ingest::context::Position;
use crate::ingest::rules::TypeKind;
use crate::ingest::scope::{composite_key, split_composite, KEY_SEPARATOR};
use crate::validation::normalize_lexically;

/// Kind of an enriched node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    File,
    Class,
    Interface,
    Function,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "FILE",
            NodeKind::Class => "CLASS",
            NodeKind::Interface => "INTERFACE",
            NodeKind::Function => "FUNCTION",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of an enriched edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    Calls,
    CallsImplementation,
    HasMethod,
    Imports,
    Implements,
    ImplementedBy,
    Extends,
    ExtendedBy,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 8] = [
        RelationshipKind::Calls,
        RelationshipKind::CallsImplementation,
        RelationshipKind::HasMethod,
        RelationshipKind::Imports,
        RelationshipKind::Implements,
        RelationshipKind::ImplementedBy,
        RelationshipKind::Extends,
        RelationshipKind::ExtendedBy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Calls => "CALLS",
            RelationshipKind::CallsImplementation => "CALLS_IMPLEMENTATION",
            RelationshipKind::HasMethod => "HAS_METHOD",
            RelationshipKind::Imports => "IMPORTS",
            RelationshipKind::Implements => "IMPLEMENTS",
            RelationshipKind::ImplementedBy => "IMPLEMENTED_BY",
            RelationshipKind::Extends => "EXTENDS",
            RelationshipKind::ExtendedBy => "EXTENDED_BY",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = String;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        RelationshipKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown relationship kind: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedGraphNode {
    /// Graph key for types and functions, absolute path for files
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    /// Path relative to the project root
    pub file: String,
    /// Absolute path
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrichedGraphEdge {
    pub from: String,
    pub to: String,
    pub kind: RelationshipKind,
    pub from_path: String,
    pub to_path: String,
}

/// Canonical node/edge graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedGraph {
    pub nodes: Vec<EnrichedGraphNode>,
    pub edges: Vec<EnrichedGraphEdge>,
}

impl EnrichedGraph {
    /// Node lookup table by id.
    pub fn index(&self) -> HashMap<&str, &EnrichedGraphNode> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    pub fn node(&self, id: &str) -> Option<&EnrichedGraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_of_kind(&self, kind: RelationshipKind) -> impl Iterator<Item = &EnrichedGraphEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    pub fn has_edge(&self, from: &str, to: &str, kind: RelationshipKind) -> bool {
        self.edges
            .iter()
            .any(|e| e.kind == kind && e.from == from && e.to == to)
    }

    /// Edge count per kind, for summaries.
    pub fn edge_counts(&self) -> Vec<(RelationshipKind, usize)> {
        RelationshipKind::ALL
            .iter()
            .map(|kind| (*kind, self.edges_of_kind(*kind).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

/// Build the enriched graph for `graph`.
pub fn enrich(graph: &CodeGraph) -> EnrichedGraph {
    let mut enricher = Enricher::new(graph);
    enricher.register_nodes();
    enricher.heritage();
    enricher.methods();
    enricher.imports();
    enricher.calls();

    log::info!(
        "enriched graph: {} nodes, {} edges",
        enricher.out.nodes.len(),
        enricher.out.edges.len()
    );
    enricher.out
}

/// Per-run state; the caches die with it.
struct Enricher<'g> {
    graph: &'g CodeGraph,
    out: EnrichedGraph,
    node_ids: AHashMap<String, usize>,
    edge_keys: AHashSet<(String, String, RelationshipKind)>,
    /// `file::Name` -> type keys
    types_by_reference: AHashMap<String, Vec<String>>,
    /// (file, display name) -> function key, first in key order
    functions_by_name: AHashMap<(String, String), String>,
    path_cache: AHashMap<String, String>,
    composite_cache: AHashMap<String, Option<(String, String)>>,
}

impl<'g> Enricher<'g> {
    fn new(graph: &'g CodeGraph) -> Self {
        let mut types_by_reference: AHashMap<String, Vec<String>> = AHashMap::new();
        for (key, analysis) in &graph.types {
            types_by_reference
                .entry(analysis.reference())
                .or_default()
                .push(key.clone());
        }
        let mut functions_by_name = AHashMap::new();
        for (key, function) in &graph.functions {
            functions_by_name
                .entry((function.file.clone(), function.display_name()))
                .or_insert_with(|| key.clone());
        }

        Self {
            graph,
            out: EnrichedGraph::default(),
            node_ids: AHashMap::new(),
            edge_keys: AHashSet::new(),
            types_by_reference,
            functions_by_name,
            path_cache: AHashMap::new(),
            composite_cache: AHashMap::new(),
        }
    }

    fn normalize_path(&mut self, path: &str) -> String {
        if let Some(cached) = self.path_cache.get(path) {
            return cached.clone();
        }
        let normalized = normalize_lexically(Path::new(path))
            .to_string_lossy()
            .into_owned();
        self.path_cache.insert(path.to_string(), normalized.clone());
        normalized
    }

    /// `file::identifier` split with a normalized file part.
    fn parse_composite(&mut self, reference: &str) -> Option<(String, String)> {
        if let Some(cached) = self.composite_cache.get(reference) {
            return cached.clone();
        }
        let parsed = match split_composite(reference) {
            Some((file, identifier)) => {
                let file = self.normalize_path(file);
                Some((file, identifier.to_string()))
            }
            None => None,
        };
        self.composite_cache
            .insert(reference.to_string(), parsed.clone());
        parsed
    }

    fn relative_path(&self, absolute: &str) -> String {
        self.graph
            .files
            .get(absolute)
            .map(|f| f.path.clone())
            .unwrap_or_else(|| absolute.to_string())
    }

    fn add_node(&mut self, node: EnrichedGraphNode) {
        if self.node_ids.contains_key(&node.id) {
            return;
        }
        self.node_ids.insert(node.id.clone(), self.out.nodes.len());
        self.out.nodes.push(node);
    }

    fn has_node(&self, id: &str) -> bool {
        self.node_ids.contains_key(id)
    }

    fn add_edge(&mut self, from: &str, to: &str, kind: RelationshipKind) -> bool {
        let (Some(&from_index), Some(&to_index)) = (self.node_ids.get(from), self.node_ids.get(to))
        else {
            log::debug!("dropping {} edge {} -> {}: endpoint not registered", kind, from, to);
            return false;
        };
        let key = (from.to_string(), to.to_string(), kind);
        if self.edge_keys.contains(&key) {
            return false;
        }
        self.edge_keys.insert(key);
        let edge = EnrichedGraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            from_path: self.out.nodes[from_index].file_path.clone(),
            to_path: self.out.nodes[to_index].file_path.clone(),
        };
        self.out.edges.push(edge);
        true
    }

    fn register_nodes(&mut self) {
        let graph = self.graph;
        for (path, file) in &graph.files {
            self.add_node(EnrichedGraphNode {
                id: path.clone(),
                name: file.path.clone(),
                kind: NodeKind::File,
                file: file.path.clone(),
                file_path: path.clone(),
                position: None,
            });
        }
        for (key, analysis) in &graph.types {
            let kind = match analysis.kind {
                TypeKind::Interface => NodeKind::Interface,
                TypeKind::Class | TypeKind::Enum | TypeKind::Alias => NodeKind::Class,
            };
            let file = self.relative_path(&analysis.file);
            self.add_node(EnrichedGraphNode {
                id: key.clone(),
                name: analysis.name.clone(),
                kind,
                file,
                file_path: analysis.file.clone(),
                position: Some(analysis.position),
            });
        }
        for (key, function) in &graph.functions {
            let file = self.relative_path(&function.file);
            self.add_node(EnrichedGraphNode {
                id: key.clone(),
                name: function.display_name(),
                kind: NodeKind::Function,
                file,
                file_path: function.file.clone(),
                position: Some(Position {
                    start_line: function.start_line,
                    start_col: 0,
                    end_line: function.end_line,
                    end_col: 0,
                }),
            });
        }
    }

    /// Type keys a `file::Name` reference points at.
    fn resolve_type_reference(&mut self, reference: &str) -> Vec<String> {
        let Some((file, name)) = self.parse_composite(reference) else {
            return Vec::new();
        };
        self.types_by_reference
            .get(&composite_key(&file, &name))
            .cloned()
            .unwrap_or_default()
    }

    fn heritage(&mut self) {
        let graph = self.graph;
        for (key, analysis) in &graph.types {
            for reference in &analysis.implements {
                for target in self.resolve_type_reference(reference) {
                    self.add_edge(key, &target, RelationshipKind::Implements);
                    self.add_edge(&target, key, RelationshipKind::ImplementedBy);
                }
            }
            for reference in &analysis.extends {
                for target in self.resolve_type_reference(reference) {
                    self.add_edge(key, &target, RelationshipKind::Extends);
                    self.add_edge(&target, key, RelationshipKind::ExtendedBy);
                }
            }
        }
    }

    fn methods(&mut self) {
        let graph = self.graph;
        for (key, function) in &graph.functions {
            if let Some(owner) = owner_type_key(function) {
                if graph.types.contains_key(&owner) {
                    self.add_edge(&owner, key, RelationshipKind::HasMethod);
                }
            }
        }
    }

    fn imports(&mut self) {
        let graph = self.graph;
        for (path, file) in &graph.files {
            for import in file.imports.iter().filter(|i| !i.is_external) {
                let target_file = self.normalize_path(&import.normalized_path);
                if !self.has_node(&target_file) {
                    log::debug!("{}: import {} resolved outside the graph", file.path, import.origin);
                    continue;
                }
                let named: Vec<&str> = import
                    .symbols
                    .iter()
                    .map(|s| s.name.as_str())
                    .filter(|name| *name != "*")
                    .collect();
                if named.is_empty() {
                    self.add_edge(path, &target_file, RelationshipKind::Imports);
                    continue;
                }
                for name in named {
                    let target = self
                        .imported_construct(&target_file, name)
                        .unwrap_or_else(|| target_file.clone());
                    self.add_edge(path, &target, RelationshipKind::Imports);
                }
            }
        }
    }

    /// Type or top-level function called `name` declared in `file`.
    fn imported_construct(&self, file: &str, name: &str) -> Option<String> {
        if let Some(keys) = self.types_by_reference.get(&composite_key(file, name)) {
            return keys.first().cloned();
        }
        self.functions_by_name
            .get(&(file.to_string(), name.to_string()))
            .cloned()
    }

    fn calls(&mut self) {
        let graph = self.graph;
        for (key, function) in &graph.functions {
            for call in &function.calls {
                self.link_call(key, Some(function), call);
            }
        }
        // module initialization code calls from its file
        for (path, file) in &graph.files {
            for call in &file.top_level_calls {
                self.link_call(path, None, call);
            }
        }
    }

    fn link_call(&mut self, from: &str, function: Option<&FunctionAnalysis>, call: &Call) {
        let Some(target) = self.resolve_call(function, call) else {
            log::debug!("{}: unresolved call to {}", from, call.function);
            return;
        };
        self.add_edge(from, &target, RelationshipKind::Calls);

        if let Some(implementation) = self.implementation_of(&target) {
            self.add_edge(from, &implementation, RelationshipKind::CallsImplementation);
        }
    }

    /// Function key a call lands on.
    ///
    /// Tries `CallerType.fn`, then `caller.fn` in the target file, then a
    /// top-level `fn` there, then a method of the calling function's own class.
    fn resolve_call(&mut self, function: Option<&FunctionAnalysis>, call: &Call) -> Option<String> {
        let target_file = self.normalize_path(&call.file);
        let lookup = |file: &str, name: String| {
            self.functions_by_name
                .get(&(file.to_string(), name))
                .cloned()
        };

        if let Some(caller_type) = &call.caller_type {
            if let Some(key) = lookup(&target_file, format!("{}.{}", caller_type, call.function)) {
                return Some(key);
            }
        }
        if let Some(caller) = &call.caller {
            if let Some(key) = lookup(&target_file, format!("{}.{}", caller, call.function)) {
                return Some(key);
            }
        }
        if let Some(key) = lookup(&target_file, call.function.clone()) {
            return Some(key);
        }

        let function = function?;
        let class_name = function.class_name.as_ref()?;
        let self_call = match &call.caller {
            None => true,
            Some(caller) => caller == class_name,
        };
        if self_call {
            return lookup(&function.file, format!("{}.{}", class_name, call.function));
        }
        None
    }

    /// Same-named method on the first implementer, when `target` is an interface method.
    fn implementation_of(&mut self, target: &str) -> Option<String> {
        let graph = self.graph;
        let method = graph.functions.get(target)?;
        let owner_key = owner_type_key(method)?;
        let owner = graph.types.get(&owner_key)?;
        if owner.kind != TypeKind::Interface {
            return None;
        }

        let mut implementers: Vec<String> = Vec::new();
        for reference in &owner.implemented_by {
            implementers.extend(self.resolve_type_reference(reference));
        }
        implementers.sort();
        implementers.dedup();

        implementers
            .iter()
            .filter_map(|key| graph.types.get(key))
            .find_map(|implementer| method_of(graph, implementer, &method.name))
    }
}

/// Key of the type declaring `function`, for methods.
fn owner_type_key(function: &FunctionAnalysis) -> Option<String> {
    function.class_name.as_ref()?;
    let (owner_scope, _) = function.scope.rsplit_once(KEY_SEPARATOR)?;
    Some(composite_key(&function.file, owner_scope))
}

fn method_of(graph: &CodeGraph, owner: &TypeAnalysis, name: &str) -> Option<String> {
    let key = composite_key(&owner.file, &format!("{}{}{}", owner.scope, KEY_SEPARATOR, name));
    graph.functions.contains_key(&key).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::schema::{FileAnalysis, ImportAnalysis};
    use crate::ingest::detect::Language;
    use crate::ingest::rules::ImportedSymbol;
    use std::collections::BTreeMap;

    fn function(file: &str, scope: &str, class_name: Option<&str>, calls: Vec<Call>) -> FunctionAnalysis {
        let name = scope.rsplit("::").next().unwrap().to_string();
        FunctionAnalysis {
            node_id: format!("{}#{}", file, scope),
            file: file.to_string(),
            name,
            scope: scope.to_string(),
            params: vec![],
            return_type: None,
            lines: 3,
            start_line: 1,
            end_line: 3,
            function_hash: String::new(),
            signature_hash: String::new(),
            calls,
            class_name: class_name.map(str::to_string),
            full_text: String::new(),
        }
    }

    fn type_analysis(file: &str, name: &str, kind: TypeKind, implements: &[&str]) -> TypeAnalysis {
        TypeAnalysis {
            node_id: format!("{}#{}", file, name),
            file: file.to_string(),
            kind,
            name: name.to_string(),
            fields: BTreeMap::new(),
            extends: vec![],
            extended_by: vec![],
            implements: implements.iter().map(|s| s.to_string()).collect(),
            implemented_by: vec![],
            scope: name.to_string(),
            position: Position::default(),
        }
    }

    fn file(path: &str, imports: Vec<ImportAnalysis>) -> FileAnalysis {
        FileAnalysis {
            path: path.trim_start_matches("/r/").to_string(),
            absolute_path: path.to_string(),
            language: Language::TypeScript,
            imports,
            functions: vec![],
            types: vec![],
            top_level_calls: vec![],
        }
    }

    fn call(function: &str, file: &str, caller: Option<&str>, caller_type: Option<&str>) -> Call {
        Call {
            node_id: "c".to_string(),
            function: function.to_string(),
            file: file.to_string(),
            caller: caller.map(str::to_string),
            caller_type: caller_type.map(str::to_string),
            line: 1,
        }
    }

    fn insert_function(graph: &mut CodeGraph, f: FunctionAnalysis) {
        graph.functions.insert(f.key(), f);
    }

    fn insert_type(graph: &mut CodeGraph, t: TypeAnalysis) {
        graph.types.insert(t.key(), t);
    }

    fn interface_graph(implementers: &[&str]) -> CodeGraph {
        let mut graph = CodeGraph::new();
        graph.files.insert("/r/i.ts".into(), file("/r/i.ts", vec![]));
        insert_type(&mut graph, type_analysis("/r/i.ts", "I", TypeKind::Interface, &[]));
        insert_function(&mut graph, function("/r/i.ts", "I::m", Some("I"), vec![]));
        for name in implementers {
            let path = format!("/r/{}.ts", name.to_lowercase());
            graph.files.insert(path.clone(), file(&path, vec![]));
            insert_type(&mut graph, type_analysis(&path, name, TypeKind::Class, &["/r/i.ts::I"]));
            insert_function(&mut graph, function(&path, &format!("{}::m", name), Some(name), vec![]));
        }
        crate::graph::assemble::finalize_relations(&mut graph);
        graph
    }

    #[test]
    fn test_interface_implementation_edges() {
        let graph = interface_graph(&["A"]);
        let enriched = enrich(&graph);

        let index = enriched.index();
        assert_eq!(index["/r/i.ts::I"].kind, NodeKind::Interface);
        assert_eq!(index["/r/a.ts::A"].kind, NodeKind::Class);
        assert_eq!(index["/r/a.ts::A::m"].name, "A.m");

        assert!(enriched.has_edge("/r/a.ts::A", "/r/i.ts::I", RelationshipKind::Implements));
        assert!(enriched.has_edge("/r/i.ts::I", "/r/a.ts::A", RelationshipKind::ImplementedBy));
        assert!(enriched.has_edge("/r/a.ts::A", "/r/a.ts::A::m", RelationshipKind::HasMethod));
    }

    #[test]
    fn test_calls_implementation_takes_first_implementer() {
        let mut graph = interface_graph(&["B", "A"]);
        graph.files.insert("/r/main.ts".into(), file("/r/main.ts", vec![]));
        insert_function(
            &mut graph,
            function(
                "/r/main.ts",
                "run",
                None,
                vec![call("m", "/r/i.ts", Some("service"), Some("I"))],
            ),
        );
        let enriched = enrich(&graph);

        assert!(enriched.has_edge("/r/main.ts::run", "/r/i.ts::I::m", RelationshipKind::Calls));
        let implementations: Vec<&str> = enriched
            .edges_of_kind(RelationshipKind::CallsImplementation)
            .map(|e| e.to.as_str())
            .collect();
        assert_eq!(implementations, vec!["/r/a.ts::A::m"]);
    }

    #[test]
    fn test_call_resolution_order() {
        let mut graph = CodeGraph::new();
        graph.files.insert("/r/a.ts".into(), file("/r/a.ts", vec![]));
        graph.files.insert("/r/svc.ts".into(), file("/r/svc.ts", vec![]));
        insert_type(&mut graph, type_analysis("/r/svc.ts", "Service", TypeKind::Class, &[]));
        insert_function(&mut graph, function("/r/svc.ts", "Service::run", Some("Service"), vec![]));
        insert_function(&mut graph, function("/r/svc.ts", "run", None, vec![]));
        insert_type(&mut graph, type_analysis("/r/a.ts", "Caller", TypeKind::Class, &[]));
        insert_function(&mut graph, function("/r/a.ts", "Caller::helper", Some("Caller"), vec![]));
        insert_function(
            &mut graph,
            function(
                "/r/a.ts",
                "Caller::go",
                Some("Caller"),
                vec![
                    call("run", "/r/svc.ts", Some("service"), Some("Service")),
                    call("run", "/r/svc.ts", None, None),
                    call("helper", "/r/a.ts", Some("Caller"), Some("Caller")),
                    call("helper", "/r/a.ts", None, None),
                    call("missing", "/r/a.ts", None, None),
                ],
            ),
        );

        let enriched = enrich(&graph);
        let targets: Vec<&str> = enriched
            .edges_of_kind(RelationshipKind::Calls)
            .map(|e| e.to.as_str())
            .collect();
        assert_eq!(
            targets,
            vec!["/r/svc.ts::Service::run", "/r/svc.ts::run", "/r/a.ts::Caller::helper"]
        );
    }

    #[test]
    fn test_imports_edges_target_named_construct() {
        let mut graph = CodeGraph::new();
        let import = |origin: &str, symbols: Vec<ImportedSymbol>, path: &str, external: bool| ImportAnalysis {
            node_id: "i".to_string(),
            origin: origin.to_string(),
            symbols,
            normalized_path: path.to_string(),
            is_external: external,
            line: 1,
        };
        graph.files.insert(
            "/r/main.ts".into(),
            file(
                "/r/main.ts",
                vec![
                    import("./svc", vec![ImportedSymbol::new("Service", None)], "/r/svc.ts", false),
                    import("./util", vec![ImportedSymbol::new("*", Some("u".into()))], "/r/util.ts", false),
                    import("lodash", vec![ImportedSymbol::new("map", None)], "lodash", true),
                ],
            ),
        );
        graph.files.insert("/r/svc.ts".into(), file("/r/svc.ts", vec![]));
        graph.files.insert("/r/util.ts".into(), file("/r/util.ts", vec![]));
        insert_type(&mut graph, type_analysis("/r/svc.ts", "Service", TypeKind::Class, &[]));

        let enriched = enrich(&graph);
        let imports: Vec<(&str, &str)> = enriched
            .edges_of_kind(RelationshipKind::Imports)
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        assert_eq!(
            imports,
            vec![("/r/main.ts", "/r/svc.ts::Service"), ("/r/main.ts", "/r/util.ts")]
        );
    }

    #[test]
    fn test_every_edge_has_registered_endpoints() {
        let mut graph = interface_graph(&["A", "B"]);
        insert_function(
            &mut graph,
            function("/r/a.ts", "A::other", Some("A"), vec![call("m", "/r/gone.ts", None, None)]),
        );
        let enriched = enrich(&graph);
        let index = enriched.index();
        for edge in &enriched.edges {
            assert!(index.contains_key(edge.from.as_str()), "missing {}", edge.from);
            assert!(index.contains_key(edge.to.as_str()), "missing {}", edge.to);
        }
    }

    #[test]
    fn test_relationship_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&RelationshipKind::CallsImplementation).unwrap(),
            "\"CALLS_IMPLEMENTATION\""
        );
        assert_eq!("calls".parse::<RelationshipKind>().unwrap(), RelationshipKind::Calls);
        assert_eq!(
            "implemented-by".parse::<RelationshipKind>().unwrap(),
            RelationshipKind::ImplementedBy
        );
        assert!("CALLED".parse::<RelationshipKind>().is_err());
        let kind: NodeKind = serde_json::from_str("\"INTERFACE\"").unwrap();
        assert_eq!(kind, NodeKind::Interface);
    }
}
