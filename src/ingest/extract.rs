//! Syntax extraction engine.
//!
//! Turns one parsed file into imports, type declarations, functions, and
//! resolved call sites. Passes run in a fixed order because later ones read
//! tables earlier ones fill:
//!
//! 1. imports: resolve origins, register local bindings
//! 2. types: declarations, supertype references, typed fields
//! 3. functions: scopes, hashes, constructor parameter types
//! 4. calls: chain walk, receiver resolution, attribution to the owning function
//!
//! Every pass tolerates partial syntax trees; a construct the rules cannot
//! capture is skipped, never fatal.

use crate::graph::module_resolver::ModuleResolver;
use crate::graph::schema::{
    append_unique, Call, FileAnalysis, FunctionAnalysis, ImportAnalysis, TypeAnalysis,
};
use crate::ingest::chain::{chain_for, split_chain, ChainLink};
use crate::ingest::context::{AnalysisNode, ExtractionContext, Position};
use crate::ingest::detect::{detect_language, Language};
use crate::ingest::pool::with_parser;
use crate::ingest::rules::{rules_for, simple_type_name, LanguageRules, Param, TypeKind};
use crate::ingest::scope::{composite_key, Scope, ScopeFrame, ScopeKind};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tree_sitter::{Node, Tree};

/// Per-file extraction failures. The assembler logs these and moves on.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is {size} bytes, over the {limit} byte limit")]
    Oversized { path: String, size: u64, limit: u64 },

    #[error("failed to parse {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("no extraction rules for {path}")]
    UnsupportedLanguage { path: String },

    #[error("extraction of {path} timed out after {seconds}s")]
    Timeout { path: String, seconds: u64 },

    #[error("extraction worker for {path} failed: {reason}")]
    WorkerFailed { path: String, reason: String },
}

impl ExtractError {
    pub fn path(&self) -> &str {
        match self {
            ExtractError::Unreadable { path, .. }
            | ExtractError::Oversized { path, .. }
            | ExtractError::ParseFailed { path, .. }
            | ExtractError::UnsupportedLanguage { path }
            | ExtractError::Timeout { path, .. }
            | ExtractError::WorkerFailed { path, .. } => path,
        }
    }
}

/// A type declaration as extracted, before cross-file merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedType {
    pub analysis: TypeAnalysis,
    /// Rust impl blocks contribute members but not kind or position
    pub provisional: bool,
}

/// Everything one file contributes to the code graph.
#[derive(Debug, Clone)]
pub struct FileExtraction {
    pub file: FileAnalysis,
    pub types: Vec<ExtractedType>,
    pub functions: Vec<FunctionAnalysis>,
    /// Every resolved call in source order, in functions or at top level
    pub calls: Vec<Call>,
    pub nodes: HashMap<String, AnalysisNode>,
}

/// Read, parse, and extract one file.
pub fn extract_file(
    relative_path: &str,
    absolute_path: &str,
    max_file_size: u64,
    resolver: &dyn ModuleResolver,
) -> Result<FileExtraction, ExtractError> {
    let language = detect_language(Path::new(absolute_path)).ok_or_else(|| {
        ExtractError::UnsupportedLanguage {
            path: relative_path.to_string(),
        }
    })?;

    let unreadable = |source| ExtractError::Unreadable {
        path: relative_path.to_string(),
        source,
    };
    let size = std::fs::metadata(absolute_path).map_err(unreadable)?.len();
    if size > max_file_size {
        return Err(ExtractError::Oversized {
            path: relative_path.to_string(),
            size,
            limit: max_file_size,
        });
    }
    let source = std::fs::read(absolute_path).map_err(unreadable)?;

    extract_source(&source, relative_path, absolute_path, language, resolver)
}

/// Parse `source` with this thread's pooled parser and extract it.
pub fn extract_source(
    source: &[u8],
    relative_path: &str,
    absolute_path: &str,
    language: Language,
    resolver: &dyn ModuleResolver,
) -> Result<FileExtraction, ExtractError> {
    let parse_failed = |reason: String| ExtractError::ParseFailed {
        path: relative_path.to_string(),
        reason,
    };
    let tree = with_parser(language, |parser| parser.parse(source, None))
        .map_err(|e| parse_failed(e.to_string()))?
        .ok_or_else(|| parse_failed("parser produced no tree".to_string()))?;

    if tree.root_node().has_error() {
        log::debug!("{} parsed with syntax errors", relative_path);
    }
    Ok(extract(
        &tree,
        source,
        relative_path,
        absolute_path,
        language,
        resolver,
    ))
}

/// Extract one parsed file.
pub fn extract(
    tree: &Tree,
    source: &[u8],
    relative_path: &str,
    absolute_path: &str,
    language: Language,
    resolver: &dyn ModuleResolver,
) -> FileExtraction {
    let mut extractor = Extractor {
        rules: rules_for(language),
        source,
        ctx: ExtractionContext::new(absolute_path, language),
        resolver,
    };
    let nodes = named_preorder(tree.root_node());

    let imports = extractor.imports(&nodes);
    let types = extractor.types(&nodes);
    let mut functions = extractor.functions(&nodes);
    let (calls, top_level_calls) = extractor.calls(&nodes, &mut functions);

    let mut function_keys = Vec::new();
    append_unique(&mut function_keys, functions.iter().map(FunctionAnalysis::key).collect());
    let mut type_keys = Vec::new();
    append_unique(&mut type_keys, types.iter().map(|t| t.analysis.key()).collect());

    log::debug!(
        "{}: {} imports, {} types, {} functions, {} calls",
        relative_path,
        imports.len(),
        types.len(),
        functions.len(),
        calls.len()
    );

    FileExtraction {
        file: FileAnalysis {
            path: relative_path.to_string(),
            absolute_path: absolute_path.to_string(),
            language,
            imports,
            functions: function_keys,
            types: type_keys,
            top_level_calls,
        },
        types,
        functions,
        calls,
        nodes: extractor.ctx.take_nodes(),
    }
}

struct Extractor<'a> {
    rules: &'static dyn LanguageRules,
    source: &'a [u8],
    ctx: ExtractionContext,
    resolver: &'a dyn ModuleResolver,
}

impl<'a> Extractor<'a> {
    fn absolute_path(&self) -> String {
        self.ctx.absolute_path().to_string()
    }

    fn imports(&mut self, nodes: &[Node]) -> Vec<ImportAnalysis> {
        let mut imports = Vec::new();
        for node in nodes {
            let captures = self.rules.capture_imports(node, self.source);
            if captures.is_empty() {
                continue;
            }
            let node_id = self.ctx.register_node(node, self.source);
            for capture in captures {
                let resolved = self.resolver.resolve(
                    &capture.origin,
                    &capture.symbols,
                    self.ctx.absolute_path(),
                    self.ctx.language(),
                );
                for symbol in &capture.symbols {
                    let local = symbol.local_name();
                    // a bare wildcard binds nothing addressable
                    if local == "*" {
                        continue;
                    }
                    self.ctx
                        .register_import(local, &symbol.name, &resolved.normalized_path);
                }
                imports.push(ImportAnalysis {
                    node_id: node_id.clone(),
                    origin: capture.origin,
                    symbols: capture.symbols,
                    normalized_path: resolved.normalized_path,
                    is_external: resolved.is_external,
                    line: capture.line,
                });
            }
        }
        imports
    }

    /// `file::Name` reference for a supertype as written in source.
    fn type_reference(&self, raw: &str) -> String {
        let simple = raw
            .rsplit(|c| c == '.' || c == ':')
            .next()
            .unwrap_or(raw);
        match self.ctx.imported_path(raw) {
            Some(path) => composite_key(path, self.ctx.exported_name(simple)),
            None => composite_key(self.ctx.absolute_path(), simple),
        }
    }

    fn types(&mut self, nodes: &[Node]) -> Vec<ExtractedType> {
        let mut types = Vec::new();
        for node in nodes {
            let Some(capture) = self.rules.capture_type(node, self.source) else {
                continue;
            };
            let mut scope = self.ctx.scope_of(self.rules, node, self.source);
            if self.rules.scope_for(node, self.source).is_none() {
                // aliases never enclose anything, so they get a key-only frame
                scope.push(ScopeFrame::new(ScopeKind::Alias, capture.name.clone()));
            }
            self.ctx.add_local_type(&capture.name);
            for (field, type_name) in &capture.typed_fields {
                self.ctx.record_instance_type(&scope, field, type_name, false);
            }

            let mut extends = Vec::new();
            append_unique(
                &mut extends,
                capture.extends.iter().map(|raw| self.type_reference(raw)).collect(),
            );
            let mut implements = Vec::new();
            append_unique(
                &mut implements,
                capture.implements.iter().map(|raw| self.type_reference(raw)).collect(),
            );
            let mut fields = BTreeMap::new();
            for (name, signature) in capture.fields {
                fields.entry(name).or_insert(signature);
            }

            types.push(ExtractedType {
                analysis: TypeAnalysis {
                    node_id: self.ctx.register_node(node, self.source),
                    file: self.absolute_path(),
                    kind: capture.kind.unwrap_or(TypeKind::Class),
                    name: capture.name,
                    fields,
                    extends,
                    extended_by: Vec::new(),
                    implements,
                    implemented_by: Vec::new(),
                    scope: scope.chain_string(),
                    position: Position::of(node),
                },
                provisional: capture.provisional,
            });
        }
        types
    }

    fn functions(&mut self, nodes: &[Node]) -> Vec<FunctionAnalysis> {
        let mut functions = Vec::new();
        for node in nodes {
            let Some(capture) = self.rules.capture_function(node, self.source) else {
                continue;
            };
            let scope = self.ctx.scope_of(self.rules, node, self.source);
            let owner = scope.without_innermost_function();
            let class_name = match scope.innermost() {
                Some(frame) if frame.kind == ScopeKind::Method => {
                    owner.innermost().map(|f| f.name.clone())
                }
                _ => None,
            };

            if capture.is_constructor {
                for param in &capture.params {
                    if let Some(type_name) = param.type_sig.as_deref().and_then(simple_type_name) {
                        self.ctx
                            .record_instance_type(&owner, &param.name, &type_name, true);
                    }
                }
            }

            let position = Position::of(node);
            functions.push(FunctionAnalysis {
                node_id: self.ctx.register_node(node, self.source),
                file: self.absolute_path(),
                scope: scope.chain_string(),
                return_type: capture.return_type.clone(),
                lines: position.end_line - position.start_line + 1,
                start_line: position.start_line,
                end_line: position.end_line,
                function_hash: function_hash(self.rules, capture.body, self.source),
                signature_hash: signature_hash(&capture.params, capture.return_type.as_deref()),
                calls: Vec::new(),
                class_name,
                full_text: node.utf8_text(self.source).unwrap_or("").to_string(),
                params: capture.params,
                name: capture.name,
            });
        }
        functions
    }

    /// Resolve every call site; returns `(all_calls, top_level_calls)` and
    /// attaches the rest to their owning functions.
    fn calls(&mut self, nodes: &[Node], functions: &mut [FunctionAnalysis]) -> (Vec<Call>, Vec<Call>) {
        let by_key: HashMap<String, usize> = functions
            .iter()
            .enumerate()
            .map(|(index, f)| (f.key(), index))
            .collect();

        let mut all = Vec::new();
        let mut top_level = Vec::new();
        for node in nodes {
            if !self.rules.is_call_site(node) {
                continue;
            }
            let scope = self.ctx.scope_of(self.rules, node, self.source);
            let Some(call) = self.resolve_call(node, &scope) else {
                continue;
            };
            let owner = scope
                .enclosing_function()
                .map(|s| s.key(self.ctx.absolute_path()))
                .and_then(|key| by_key.get(&key).copied());
            match owner {
                Some(index) => functions[index].calls.push(call.clone()),
                None => top_level.push(call.clone()),
            }
            all.push(call);
        }
        (all, top_level)
    }

    fn resolve_call(&mut self, node: &Node, scope: &Scope) -> Option<Call> {
        let links = chain_for(self.rules, *node, self.source, &mut self.ctx);
        let (callers, function) = split_chain(&links)?;
        let function = function.name.clone();
        let lookup = scope.without_innermost_function();

        let (caller, caller_type, file) = if callers.is_empty() {
            // bare call: imported function or a local one
            let file = self
                .ctx
                .imported_path(&function)
                .map(str::to_string)
                .unwrap_or_else(|| self.absolute_path());
            (None, None, file)
        } else {
            self.resolve_receiver(callers, &lookup)
        };

        Some(Call {
            node_id: self.ctx.register_node(node, self.source),
            function,
            file,
            caller,
            caller_type,
            line: node.start_position().row + 1,
        })
    }

    /// `(caller, caller_type, target_file)` for a call with a receiver chain.
    fn resolve_receiver(
        &self,
        callers: &[ChainLink],
        lookup: &Scope,
    ) -> (Option<String>, Option<String>, String) {
        let current = self.absolute_path();
        let first = &callers[0].name;

        if self.rules.is_self_reference(first) {
            return match callers.get(1) {
                // this.service.run(): the member is the caller
                Some(member) => {
                    let caller = member.name.clone();
                    match self.ctx.instance_type(lookup, &caller) {
                        Some(type_name) => {
                            let file = self.file_of_type(type_name);
                            (Some(caller), Some(type_name.to_string()), file)
                        }
                        None => (Some(caller), None, current),
                    }
                }
                // this.helper(): a method on the enclosing type
                None => {
                    let owner = lookup.enclosing_type().map(str::to_string);
                    (owner.clone(), owner, current)
                }
            };
        }

        let caller = first.clone();
        if let Some(type_name) = self.ctx.instance_type(lookup, &caller) {
            let file = self.file_of_type(type_name);
            return (Some(caller), Some(type_name.to_string()), file);
        }
        if let Some(path) = self.ctx.imported_path(&caller) {
            let exported = self.ctx.exported_name(&caller);
            let caller_type = starts_uppercase(exported).then(|| exported.to_string());
            return (Some(caller.clone()), caller_type, path.to_string());
        }
        if self.ctx.is_local_type(&caller) {
            return (Some(caller.clone()), Some(caller), current);
        }
        (Some(caller), None, current)
    }

    fn file_of_type(&self, type_name: &str) -> String {
        self.ctx
            .imported_path(type_name)
            .map(str::to_string)
            .unwrap_or_else(|| self.absolute_path())
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

/// Named nodes in document order.
fn named_preorder(root: Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_named() {
            out.push(node);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return out;
            }
        }
    }
}

fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Hash of the body's non-comment leaf tokens, so whitespace and comment
/// edits do not change it. A missing body hashes the empty string.
pub fn function_hash(rules: &dyn LanguageRules, body: Option<Node>, source: &[u8]) -> String {
    let mut tokens: Vec<&str> = Vec::new();
    let mut stack: Vec<Node> = body.into_iter().collect();
    while let Some(node) = stack.pop() {
        if rules.is_comment(&node) {
            continue;
        }
        if node.child_count() == 0 {
            let text = node.utf8_text(source).unwrap_or("").trim();
            if !text.is_empty() {
                tokens.push(text);
            }
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        // reversed so the stack pops in document order
        stack.extend(children.into_iter().rev());
    }
    sha256_hex(&tokens.join(" "))
}

/// Hash of `(T1,T2):R` with whitespace removed; missing types are `_`.
pub fn signature_hash(params: &[Param], return_type: Option<&str>) -> String {
    let types: Vec<&str> = params
        .iter()
        .map(|p| p.type_sig.as_deref().unwrap_or("_"))
        .collect();
    let signature = format!("({}):{}", types.join(","), return_type.unwrap_or("_"));
    let normalized: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
    sha256_hex(&normalized)
}
