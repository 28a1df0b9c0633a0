//! Unified diff parsing.
//!
//! Understands `git diff` output (`diff --git`, `---`/`+++` headers, rename
//! and mode lines) as well as bare hunk lists without any file header.
//! Malformed hunk headers are reported and their bodies ignored; the rest
//! of the diff still parses.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Recoverable diff problems.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    #[error("line {line}: malformed hunk header: {header}")]
    MalformedHunkHeader { line: usize, header: String },
}

/// One `@@ -a,b +c,d @@` hunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    /// New-side line numbers of `+` lines
    pub added_lines: Vec<usize>,
    /// Old-side line numbers of `-` lines
    pub deleted_lines: Vec<usize>,
}

impl Hunk {
    /// Whether the hunk carries at least one `+` or `-` line.
    pub fn has_changes(&self) -> bool {
        !self.added_lines.is_empty() || !self.deleted_lines.is_empty()
    }

    /// Inclusive old-side line range; `-N,0` covers line `N`.
    pub fn old_range(&self) -> (usize, usize) {
        let start = self.old_start;
        (start, start + self.old_count.max(1) - 1)
    }

    pub fn overlaps_old(&self, start_line: usize, end_line: usize) -> bool {
        let (start, end) = self.old_range();
        start <= end_line && start_line <= end
    }
}

/// Hunks of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Old-side path without the `a/` prefix; `None` for `/dev/null`
    pub old_path: Option<String>,
    /// New-side path without the `b/` prefix; `None` for `/dev/null`
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
    /// Whether any header named this file
    pub has_header: bool,
}

impl FileDiff {
    /// New path, or the old one for deleted files.
    pub fn path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }

    pub fn is_added(&self) -> bool {
        self.has_header && self.old_path.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.has_header && self.new_path.is_none()
    }

    /// Whether this diff touches `file_path` (component-wise suffix match either way).
    pub fn touches(&self, file_path: &str) -> bool {
        let wanted = std::path::Path::new(file_path.trim_start_matches("./"));
        [&self.old_path, &self.new_path]
            .into_iter()
            .flatten()
            .any(|p| {
                let candidate = std::path::Path::new(p);
                wanted.ends_with(candidate) || candidate.ends_with(wanted)
            })
    }
}

/// Parsed diff: files in order of appearance plus skipped headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDiff {
    pub files: Vec<FileDiff>,
    pub errors: Vec<DiffError>,
}

impl ParsedDiff {
    /// Hunks for `file_path`; every hunk when the diff names no files.
    pub fn hunks_for(&self, file_path: &str) -> Vec<&Hunk> {
        if self.files.iter().all(|f| !f.has_header) {
            return self.files.iter().flat_map(|f| f.hunks.iter()).collect();
        }
        self.files
            .iter()
            .filter(|f| f.touches(file_path))
            .flat_map(|f| f.hunks.iter())
            .collect()
    }
}

fn hunk_header() -> Option<&'static Regex> {
    static HEADER: OnceLock<Option<Regex>> = OnceLock::new();
    HEADER
        .get_or_init(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").ok())
        .as_ref()
}

/// Strip `a/`/`b/` prefixes, trailing timestamps, and map `/dev/null` to `None`.
fn header_path(raw: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    if raw == "/dev/null" {
        return None;
    }
    let raw = raw.trim_matches('"');
    let stripped = raw
        .strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw);
    Some(stripped.to_string())
}

/// Parse unified diff text.
pub fn parse_unified_diff(text: &str) -> ParsedDiff {
    let mut parsed = ParsedDiff::default();
    let mut current: Option<FileDiff> = None;
    let mut hunk: Option<Hunk> = None;
    // lines left in the current hunk body, per side
    let mut old_left = 0usize;
    let mut new_left = 0usize;
    let mut old_line = 0usize;
    let mut new_line = 0usize;

    let finish_hunk = |current: &mut Option<FileDiff>, hunk: &mut Option<Hunk>| {
        if let Some(done) = hunk.take() {
            current.get_or_insert_with(FileDiff::default).hunks.push(done);
        }
    };

    for (index, line) in text.lines().enumerate() {
        let in_body = hunk.is_some() && (old_left > 0 || new_left > 0);
        if in_body {
            match line.as_bytes().first() {
                Some(b'+') => {
                    if let Some(h) = hunk.as_mut() {
                        h.added_lines.push(new_line);
                    }
                    new_line += 1;
                    new_left = new_left.saturating_sub(1);
                }
                Some(b'-') => {
                    if let Some(h) = hunk.as_mut() {
                        h.deleted_lines.push(old_line);
                    }
                    old_line += 1;
                    old_left = old_left.saturating_sub(1);
                }
                Some(b'\\') => {}
                // context, including blank lines whose leading space was stripped
                _ => {
                    old_line += 1;
                    new_line += 1;
                    old_left = old_left.saturating_sub(1);
                    new_left = new_left.saturating_sub(1);
                }
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            finish_hunk(&mut current, &mut hunk);
            if let Some(done) = current.take() {
                parsed.files.push(done);
            }
            let (old_path, new_path) = match rest.split_once(" b/") {
                Some((old, new)) => (header_path(old), header_path(new)),
                None => (None, None),
            };
            current = Some(FileDiff {
                old_path,
                new_path,
                hunks: Vec::new(),
                has_header: true,
            });
        } else if let Some(rest) = line.strip_prefix("--- ") {
            finish_hunk(&mut current, &mut hunk);
            // plain unified diff: `---` opens a new file
            let opens_file = match &current {
                Some(file) => !file.hunks.is_empty() || !file.has_header,
                None => true,
            };
            if opens_file {
                if let Some(done) = current.take() {
                    parsed.files.push(done);
                }
                current = Some(FileDiff {
                    has_header: true,
                    ..FileDiff::default()
                });
            }
            if let Some(file) = current.as_mut() {
                file.old_path = header_path(rest);
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            let file = current.get_or_insert_with(|| FileDiff {
                has_header: true,
                ..FileDiff::default()
            });
            file.new_path = header_path(rest);
        } else if line.starts_with("@@") {
            finish_hunk(&mut current, &mut hunk);
            match parse_header(line) {
                Some(parsed_hunk) => {
                    old_left = parsed_hunk.old_count;
                    new_left = parsed_hunk.new_count;
                    old_line = parsed_hunk.old_start;
                    new_line = parsed_hunk.new_start;
                    hunk = Some(parsed_hunk);
                }
                None => {
                    log::warn!("skipping malformed hunk header at line {}: {}", index + 1, line);
                    parsed.errors.push(DiffError::MalformedHunkHeader {
                        line: index + 1,
                        header: line.to_string(),
                    });
                }
            }
        }
        // index/mode/rename lines and bodies of rejected hunks are ignored
    }

    finish_hunk(&mut current, &mut hunk);
    if let Some(done) = current.take() {
        parsed.files.push(done);
    }
    parsed
}

fn parse_header(line: &str) -> Option<Hunk> {
    let caps = hunk_header()?.captures(line)?;
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<usize>().ok());
    Some(Hunk {
        old_start: number(1)?,
        old_count: number(2).unwrap_or(1),
        new_start: number(3)?,
        new_count: number(4).unwrap_or(1),
        added_lines: Vec::new(),
        deleted_lines: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIT_DIFF: &str = "\
diff --git a/src/a.ts b/src/a.ts
index 1111111..2222222 100644
--- a/src/a.ts
+++ b/src/a.ts
@@ -3,4 +3,5 @@ function foo() {
 function bar() {
   const x = 1;
+  const y = 2;
   return x;
 }
diff --git a/src/old.ts b/src/old.ts
deleted file mode 100644
--- a/src/old.ts
+++ /dev/null
@@ -1,2 +0,0 @@
-export function gone() {
-}
";

    #[test]
    fn test_parses_multi_file_git_diff() {
        let parsed = parse_unified_diff(GIT_DIFF);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.files.len(), 2);

        let a = &parsed.files[0];
        assert_eq!(a.path(), Some("src/a.ts"));
        assert_eq!(a.hunks.len(), 1);
        assert_eq!(a.hunks[0].added_lines, vec![5]);
        assert!(a.hunks[0].deleted_lines.is_empty());

        let old = &parsed.files[1];
        assert!(old.is_deleted());
        assert_eq!(old.path(), Some("src/old.ts"));
        assert_eq!(old.hunks[0].deleted_lines, vec![1, 2]);
    }

    #[test]
    fn test_bare_hunks_without_headers() {
        let parsed = parse_unified_diff("@@ -1 +1 @@\n-a\n+b\n");
        assert_eq!(parsed.files.len(), 1);
        assert!(!parsed.files[0].has_header);
        assert_eq!(parsed.hunks_for("anything.ts").len(), 1);
        let hunk = &parsed.files[0].hunks[0];
        assert_eq!((hunk.old_count, hunk.new_count), (1, 1));
    }

    #[test]
    fn test_malformed_header_is_skipped() {
        let text = "\
--- a/x.py
+++ b/x.py
@@ -bogus @@
-nothing
@@ -2,1 +2,1 @@
-old
+new
";
        let parsed = parse_unified_diff(text);
        assert_eq!(parsed.errors.len(), 1);
        assert!(matches!(parsed.errors[0], DiffError::MalformedHunkHeader { line: 3, .. }));
        assert_eq!(parsed.files[0].hunks.len(), 1);
        assert_eq!(parsed.files[0].hunks[0].deleted_lines, vec![2]);
    }

    #[test]
    fn test_deleted_line_looking_like_header() {
        // deleting the SQL comment "-- note" produces a "--- note" body line
        let text = "\
--- a/q.py
+++ b/q.py
@@ -1,2 +1,1 @@
--- note
 keep
";
        let parsed = parse_unified_diff(text);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].hunks[0].deleted_lines, vec![1]);
    }

    #[test]
    fn test_zero_count_old_range_covers_start_line() {
        let hunk = parse_header("@@ -7,0 +8,2 @@").unwrap();
        assert_eq!(hunk.old_range(), (7, 7));
        assert!(hunk.overlaps_old(5, 7));
        assert!(!hunk.overlaps_old(8, 10));
    }

    #[test]
    fn test_touches_matches_relative_suffix() {
        let parsed = parse_unified_diff(GIT_DIFF);
        assert_eq!(parsed.hunks_for("src/a.ts").len(), 1);
        assert_eq!(parsed.hunks_for("a.ts").len(), 1);
        assert_eq!(parsed.hunks_for("b.ts").len(), 0);
    }
}
