//! Data model of the assembled code graph.
//!
//! All maps are ordered so serialized graphs are byte-for-byte reproducible.
//! Keys follow the composite scheme `${absolutePath}::${scopeChain}`.

use crate::ingest::context::Position;
use crate::ingest::detect::Language;
use crate::ingest::rules::{ImportedSymbol, Param, TypeKind};
use crate::ingest::scope::composite_key;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// An import statement after module resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportAnalysis {
    pub node_id: String,
    /// Origin text as written in source
    pub origin: String,
    pub symbols: Vec<ImportedSymbol>,
    /// Absolute path of the resolved file, or the origin text when external
    pub normalized_path: String,
    pub is_external: bool,
    pub line: usize,
}

/// One invocation recorded inside a function body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub node_id: String,
    /// Invoked name (last chain link)
    pub function: String,
    /// Best-effort target file; the calling file when nothing resolved
    pub file: String,
    /// Receiver name after the self-reference rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    /// Type the receiver resolved to, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_type: Option<String>,
    pub line: usize,
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionAnalysis {
    pub node_id: String,
    /// Absolute path of the declaring file
    pub file: String,
    pub name: String,
    /// Scope chain including the function itself, e.g. `Caller::run`
    pub scope: String,
    pub params: Vec<Param>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub lines: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub function_hash: String,
    pub signature_hash: String,
    pub calls: Vec<Call>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub full_text: String,
}

impl FunctionAnalysis {
    /// Graph key: `${file}::${scope}`.
    pub fn key(&self) -> String {
        composite_key(&self.file, &self.scope)
    }

    /// Node name in the enriched graph: `Class.method` or `function`.
    pub fn display_name(&self) -> String {
        match &self.class_name {
            Some(class) => format!("{}.{}", class, self.name),
            None => self.name.clone(),
        }
    }
}

/// A class, interface, enum, or alias declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAnalysis {
    pub node_id: String,
    pub file: String,
    pub kind: TypeKind,
    pub name: String,
    /// Member name -> type signature
    pub fields: BTreeMap<String, String>,
    /// Composite `file::Name` references
    pub extends: Vec<String>,
    /// Derived by finalization, never populated during extraction
    pub extended_by: Vec<String>,
    pub implements: Vec<String>,
    /// Derived by finalization, never populated during extraction
    pub implemented_by: Vec<String>,
    /// Scope chain including the type itself
    pub scope: String,
    pub position: Position,
}

impl TypeAnalysis {
    pub fn key(&self) -> String {
        composite_key(&self.file, &self.scope)
    }

    /// Composite reference other types use to point at this one.
    pub fn reference(&self) -> String {
        composite_key(&self.file, &self.name)
    }

    /// Append `extends`/`implements`/`fields` of a later declaration at the same key.
    pub fn merge_from(&mut self, other: TypeAnalysis) {
        append_unique(&mut self.extends, other.extends);
        append_unique(&mut self.implements, other.implements);
        for (name, signature) in other.fields {
            self.fields.entry(name).or_insert(signature);
        }
    }
}

/// Per-file summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalysis {
    /// Path relative to the project root
    pub path: String,
    pub absolute_path: String,
    pub language: Language,
    pub imports: Vec<ImportAnalysis>,
    /// Keys of functions declared in this file
    pub functions: Vec<String>,
    /// Keys of types declared in this file
    pub types: Vec<String>,
    /// Calls outside any function body (module initialization code)
    pub top_level_calls: Vec<Call>,
}

/// The assembled cross-file graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeGraph {
    pub files: BTreeMap<String, FileAnalysis>,
    pub functions: BTreeMap<String, FunctionAnalysis>,
    pub types: BTreeMap<String, TypeAnalysis>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether some file's root-relative path is exactly `file_path`.
    pub fn has_file(&self, file_path: &str) -> bool {
        let wanted = file_path.trim_start_matches("./");
        self.files.values().any(|f| f.path == wanted)
    }

    /// Functions declared in the file named by `file_path`.
    ///
    /// With `exact`, only the file whose root-relative path equals
    /// `file_path` matches; otherwise every file whose absolute path ends
    /// with it does.
    pub fn functions_in<'a>(
        &'a self,
        file_path: &str,
        exact: bool,
    ) -> impl Iterator<Item = &'a FunctionAnalysis> + 'a {
        let wanted = file_path.trim_start_matches("./").to_string();
        let files: HashSet<&'a str> = self
            .files
            .values()
            .filter(|f| exact && f.path == wanted)
            .map(|f| f.absolute_path.as_str())
            .collect();
        self.functions.values().filter(move |f| {
            if exact {
                files.contains(f.file.as_str())
            } else {
                path_matches(&f.file, &wanted)
            }
        })
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Resolved call sites, inside functions and at top level.
    pub fn call_count(&self) -> usize {
        let in_functions: usize = self.functions.values().map(|f| f.calls.len()).sum();
        let top_level: usize = self.files.values().map(|f| f.top_level_calls.len()).sum();
        in_functions + top_level
    }
}

/// Component-wise suffix match: `/repo/src/a.ts` matches `src/a.ts` and `a.ts`, not `ra.ts`.
pub fn path_matches(absolute: &str, file_path: &str) -> bool {
    let wanted = file_path.trim_start_matches("./");
    if wanted.is_empty() {
        return false;
    }
    std::path::Path::new(absolute).ends_with(wanted)
}

/// Push each item not already present, preserving order.
pub(crate) fn append_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
