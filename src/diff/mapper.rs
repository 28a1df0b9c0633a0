//! Diff-to-function mapping.
//!
//! Compares the functions of one file in two graph snapshots and uses the
//! diff's hunks to sort them into added, modified and deleted. Functions
//! are matched across snapshots by scope chain (`Caller::run`), so moving a
//! file between roots or same-named methods on different classes do not
//! confuse the match.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::parse::{parse_unified_diff, Hunk};
use crate::graph::schema::{CodeGraph, FunctionAnalysis};

/// A changed function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    /// Scope chain, e.g. `Caller::run`
    pub full_name: String,
    pub function_hash: String,
    pub signature_hash: String,
    /// Graph key in the snapshot the function was taken from
    pub id: String,
    pub full_text: String,
    pub lines: usize,
}

impl From<&FunctionAnalysis> for FunctionDescriptor {
    fn from(function: &FunctionAnalysis) -> Self {
        Self {
            name: function.name.clone(),
            full_name: function.scope.clone(),
            function_hash: function.function_hash.clone(),
            signature_hash: function.signature_hash.clone(),
            id: function.key(),
            full_text: function.full_text.clone(),
            lines: function.lines,
        }
    }
}

/// Functions of a change, each in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeResult {
    pub added: Vec<FunctionDescriptor>,
    pub modified: Vec<FunctionDescriptor>,
    pub deleted: Vec<FunctionDescriptor>,
}

impl ChangeResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Append `other`, skipping descriptors already present by id.
    pub fn merge(&mut self, other: ChangeResult) {
        let mut seen: HashSet<String> = self
            .added
            .iter()
            .chain(&self.modified)
            .chain(&self.deleted)
            .map(|d| d.id.clone())
            .collect();
        for (target, items) in [
            (&mut self.added, other.added),
            (&mut self.modified, other.modified),
            (&mut self.deleted, other.deleted),
        ] {
            for item in items {
                if seen.insert(item.id.clone()) {
                    target.push(item);
                }
            }
        }
    }

    /// Head-snapshot ids of added and modified functions.
    pub fn head_ids(&self) -> Vec<String> {
        self.added
            .iter()
            .chain(&self.modified)
            .map(|d| d.id.clone())
            .collect()
    }

    /// Base-snapshot ids of deleted functions.
    pub fn base_ids(&self) -> Vec<String> {
        self.deleted.iter().map(|d| d.id.clone()).collect()
    }
}

fn functions_by_scope<'g>(
    graph: &'g CodeGraph,
    file_path: &str,
    exact: bool,
) -> BTreeMap<&'g str, &'g FunctionAnalysis> {
    graph
        .functions_in(file_path, exact)
        .map(|f| (f.scope.as_str(), f))
        .collect()
}

/// Classify the functions of `file_path` against already-parsed hunks.
///
/// `file_path` is matched against root-relative paths when either snapshot
/// has such a file, by path suffix otherwise.
pub fn classify(hunks: &[&Hunk], head: &CodeGraph, base: &CodeGraph, file_path: &str) -> ChangeResult {
    let exact = head.has_file(file_path) || base.has_file(file_path);
    let head_functions = functions_by_scope(head, file_path, exact);
    let base_functions = functions_by_scope(base, file_path, exact);
    let changing: Vec<&&Hunk> = hunks.iter().filter(|h| h.has_changes()).collect();

    let mut result = ChangeResult::default();
    for (scope, function) in &head_functions {
        match base_functions.get(scope) {
            None => result.added.push(FunctionDescriptor::from(*function)),
            Some(before) => {
                let touched = changing
                    .iter()
                    .any(|h| h.overlaps_old(before.start_line, before.end_line));
                if touched {
                    result.modified.push(FunctionDescriptor::from(*function));
                }
            }
        }
    }
    for (scope, function) in &base_functions {
        if !head_functions.contains_key(scope) {
            result.deleted.push(FunctionDescriptor::from(*function));
        }
    }
    result
}

/// Map a diff onto the functions of `file_path` in two snapshots.
///
/// Uses the hunks of `file_path` when the diff has file headers, every
/// hunk otherwise.
pub fn map_diff(diff_text: &str, head: &CodeGraph, base: &CodeGraph, file_path: &str) -> ChangeResult {
    let parsed = parse_unified_diff(diff_text);
    let hunks = parsed.hunks_for(file_path);
    let result = classify(&hunks, head, base, file_path);
    log::debug!(
        "{}: {} hunks, {} added, {} modified, {} deleted",
        file_path,
        hunks.len(),
        result.added.len(),
        result.modified.len(),
        result.deleted.len()
    );
    result
}

/// Map every file of a multi-file diff and merge the results.
pub fn map_diff_all(diff_text: &str, head: &CodeGraph, base: &CodeGraph) -> ChangeResult {
    let parsed = parse_unified_diff(diff_text);
    let mut result = ChangeResult::default();
    for file in &parsed.files {
        let Some(path) = file.path() else {
            log::warn!("diff section without a file path; pass the file explicitly");
            continue;
        };
        let hunks: Vec<&Hunk> = file.hunks.iter().collect();
        result.merge(classify(&hunks, head, base, path));
    }
    result
}
