//! Language detection by file extension.
//!
//! The registry is resolved once per file; everything downstream dispatches on
//! the returned [`Language`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Source languages with extraction rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Python,
    Java,
    JavaScript,
    TypeScript,
    /// TypeScript with JSX; shares the TypeScript rules, parsed with the TSX grammar
    Tsx,
}

impl Language {
    /// Stable lowercase name used in output and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
        }
    }

    /// Extensions probed by the module resolver when an import omits one.
    pub fn probe_extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["rs"],
            Language::Python => &["py"],
            Language::Java => &["java"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs", "ts", "tsx"],
            Language::TypeScript | Language::Tsx => {
                &["ts", "tsx", "d.ts", "mts", "cts", "js", "jsx"]
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the language of a file from its extension.
///
/// Returns `None` for anything without extraction rules.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "rs" => Some(Language::Rust),
        "py" | "pyi" => Some(Language::Python),
        "java" => Some(Language::Java),
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
        "ts" | "mts" | "cts" => Some(Language::TypeScript),
        "tsx" => Some(Language::Tsx),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect_language(Path::new("a/b.rs")), Some(Language::Rust));
        assert_eq!(detect_language(Path::new("x.py")), Some(Language::Python));
        assert_eq!(detect_language(Path::new("Main.java")), Some(Language::Java));
        assert_eq!(detect_language(Path::new("app.mjs")), Some(Language::JavaScript));
        assert_eq!(detect_language(Path::new("svc.ts")), Some(Language::TypeScript));
        assert_eq!(detect_language(Path::new("view.tsx")), Some(Language::Tsx));
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(detect_language(Path::new("README.md")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
        assert_eq!(detect_language(Path::new("main.c")), None);
    }

    #[test]
    fn test_language_serializes_lowercase() {
        let json = serde_json::to_string(&Language::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");
    }
}
