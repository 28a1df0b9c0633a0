//! Import origin resolution.
//!
//! Extraction hands every import origin to a [`ModuleResolver`], which maps
//! it to a project file or marks it external. [`FsModuleResolver`] is the
//! default: it resolves against the set of discovered project files only and
//! never reads package manifests or alias tables.
//!
//! Handles:
//! - JS/TS relative specifiers with extension and `index.*` probing
//! - Python dotted and relative modules (`a/b.py`, `a/b/__init__.py`)
//! - Java fully qualified names by path suffix
//! - Rust `crate::`, `super::`, `self::` and plain paths, walking prefixes

use crate::ingest::detect::Language;
use crate::ingest::rules::ImportedSymbol;
use crate::validation::normalize_lexically;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Outcome of resolving one import origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    /// Absolute path of the resolved file, or the origin text when external
    pub normalized_path: String,
    pub is_external: bool,
}

impl ResolvedImport {
    pub fn internal(path: impl Into<String>) -> Self {
        Self {
            normalized_path: path.into(),
            is_external: false,
        }
    }

    pub fn external(origin: impl Into<String>) -> Self {
        Self {
            normalized_path: origin.into(),
            is_external: true,
        }
    }
}

/// Maps an import origin to a file on disk.
pub trait ModuleResolver: Send + Sync {
    fn resolve(
        &self,
        origin: &str,
        symbols: &[ImportedSymbol],
        from_file: &str,
        language: Language,
    ) -> ResolvedImport;
}

/// Resolver that marks every import external.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternalOnly;

impl ModuleResolver for ExternalOnly {
    fn resolve(&self, origin: &str, _: &[ImportedSymbol], _: &str, _: Language) -> ResolvedImport {
        ResolvedImport::external(origin)
    }
}

const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Default resolver over a fixed set of project files.
pub struct FsModuleResolver {
    root: PathBuf,
    files: HashSet<PathBuf>,
    /// Java file name -> files with that name
    java_by_name: HashMap<String, Vec<PathBuf>>,
    /// (crate `src` dir, module path) -> file
    rust_modules: HashMap<(PathBuf, String), PathBuf>,
}

impl FsModuleResolver {
    /// Index `files` (absolute paths) under `root`.
    pub fn new(root: &Path, files: &[PathBuf]) -> Self {
        let mut index = Self {
            root: normalize_lexically(root),
            files: HashSet::new(),
            java_by_name: HashMap::new(),
            rust_modules: HashMap::new(),
        };
        for file in files {
            let file = normalize_lexically(file);
            match file.extension().and_then(|e| e.to_str()) {
                Some("java") => {
                    if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                        index
                            .java_by_name
                            .entry(name.to_string())
                            .or_default()
                            .push(file.clone());
                    }
                }
                Some("rs") => {
                    if let Some((src_dir, module)) = rust_module_path(&file) {
                        index.rust_modules.insert((src_dir, module), file.clone());
                    }
                }
                _ => {}
            }
            index.files.insert(file);
        }
        index
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    fn resolve_script(&self, origin: &str, from_file: &Path) -> Option<PathBuf> {
        if !(origin.starts_with("./") || origin.starts_with("../") || origin == "." || origin == "..") {
            return None;
        }
        let dir = from_file.parent()?;
        let base = normalize_lexically(&dir.join(origin));
        if self.exists(&base) {
            return Some(base);
        }
        // `./util.js` written for a `util.ts` source
        if let Some(ext) = base.extension().and_then(|e| e.to_str()) {
            let swapped: &[&str] = match ext {
                "js" => &["ts", "tsx"],
                "jsx" => &["tsx"],
                "mjs" => &["mts"],
                "cjs" => &["cts"],
                _ => &[],
            };
            for candidate in swapped {
                let path = base.with_extension(candidate);
                if self.exists(&path) {
                    return Some(path);
                }
            }
        }
        for ext in SCRIPT_EXTENSIONS {
            let mut with_ext = base.clone().into_os_string();
            with_ext.push(".");
            with_ext.push(ext);
            let path = PathBuf::from(with_ext);
            if self.exists(&path) {
                return Some(path);
            }
        }
        SCRIPT_EXTENSIONS
            .iter()
            .map(|ext| base.join(format!("index.{}", ext)))
            .find(|path| self.exists(path))
    }

    fn resolve_python(&self, origin: &str, from_file: &Path) -> Option<PathBuf> {
        let dots = origin.chars().take_while(|c| *c == '.').count();
        let rest = &origin[dots..];
        let segments: Vec<&str> = rest.split('.').filter(|s| !s.is_empty()).collect();

        let bases: Vec<PathBuf> = if dots > 0 {
            // `.` is the current package, each extra dot one level up
            let mut dir = from_file.parent()?.to_path_buf();
            for _ in 1..dots {
                dir = dir.parent()?.to_path_buf();
            }
            vec![dir]
        } else {
            vec![self.root.clone(), self.root.join("src")]
        };

        for base in bases {
            let mut module = base;
            module.extend(&segments);
            if segments.is_empty() {
                let init = module.join("__init__.py");
                if self.exists(&init) {
                    return Some(init);
                }
                continue;
            }
            let file = module.with_extension("py");
            if self.exists(&file) {
                return Some(file);
            }
            let init = module.join("__init__.py");
            if self.exists(&init) {
                return Some(init);
            }
        }
        None
    }

    fn resolve_java(&self, origin: &str) -> Option<PathBuf> {
        let segments: Vec<&str> = origin.split('.').filter(|s| !s.is_empty()).collect();
        // com.acme.Outer.Inner lives in com/acme/Outer.java
        for end in (1..=segments.len()).rev() {
            let class = segments[end - 1];
            let Some(candidates) = self.java_by_name.get(&format!("{}.java", class)) else {
                continue;
            };
            let mut suffix: PathBuf = segments[..end - 1].iter().collect();
            suffix.push(format!("{}.java", class));
            if let Some(found) = candidates.iter().find(|path| path.ends_with(&suffix)) {
                return Some(found.clone());
            }
        }
        None
    }

    fn resolve_rust(&self, origin: &str, from_file: &Path) -> Option<PathBuf> {
        let (src_dir, current_module) = rust_module_path(from_file)?;
        let segments: Vec<&str> = origin.split("::").filter(|s| !s.is_empty()).collect();
        let first = *segments.first()?;

        // (absolute module path segments, number of segments that came from the base)
        let mut candidates: Vec<(Vec<String>, usize)> = Vec::new();
        match first {
            "crate" => candidates.push((to_owned(&segments), 1)),
            "self" => {
                let mut path = split_module(&current_module);
                let base_len = path.len();
                path.extend(to_owned(&segments[1..]));
                candidates.push((path, base_len));
            }
            "super" => {
                let mut path = split_module(&current_module);
                let mut rest = &segments[..];
                while rest.first() == Some(&"super") {
                    if path.len() <= 1 {
                        return None;
                    }
                    path.pop();
                    rest = &rest[1..];
                }
                let base_len = path.len();
                path.extend(to_owned(rest));
                candidates.push((path, base_len));
            }
            _ => {
                // plain path: a crate-level module, then a child of the current module
                let mut from_crate = vec!["crate".to_string()];
                from_crate.extend(to_owned(&segments));
                candidates.push((from_crate, 1));
                let mut from_current = split_module(&current_module);
                let base_len = from_current.len();
                from_current.extend(to_owned(&segments));
                candidates.push((from_current, base_len));
            }
        }

        for (path, base_len) in candidates {
            // `crate::Item` may name the crate root; plain paths must consume a segment
            let min_len = if first == "crate" || first == "self" || first == "super" {
                base_len
            } else {
                base_len + 1
            };
            for len in (min_len.max(1)..=path.len()).rev() {
                let key = (src_dir.clone(), path[..len].join("::"));
                if let Some(file) = self.rust_modules.get(&key) {
                    return Some(file.clone());
                }
            }
        }
        None
    }
}

impl ModuleResolver for FsModuleResolver {
    fn resolve(
        &self,
        origin: &str,
        _symbols: &[ImportedSymbol],
        from_file: &str,
        language: Language,
    ) -> ResolvedImport {
        let from = Path::new(from_file);
        let found = match language {
            Language::JavaScript | Language::TypeScript | Language::Tsx => {
                self.resolve_script(origin, from)
            }
            Language::Python => self.resolve_python(origin, from),
            Language::Java => self.resolve_java(origin),
            Language::Rust => self.resolve_rust(origin, from),
        };
        match found.as_deref().and_then(Path::to_str) {
            Some(path) => ResolvedImport::internal(path),
            None => {
                log::debug!("import '{}' in {} is external", origin, from_file);
                ResolvedImport::external(origin)
            }
        }
    }
}

fn to_owned(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

fn split_module(module: &str) -> Vec<String> {
    module.split("::").map(str::to_string).collect()
}

/// Crate `src` directory and module path of a Rust source file.
///
/// Examples:
/// - "/p/src/lib.rs" -> ("/p/src", "crate")
/// - "/p/src/foo.rs" -> ("/p/src", "crate::foo")
/// - "/p/src/foo/mod.rs" -> ("/p/src", "crate::foo")
/// - "/p/src/foo/bar.rs" -> ("/p/src", "crate::foo::bar")
///
/// Files outside a `src` directory have no module path.
fn rust_module_path(file: &Path) -> Option<(PathBuf, String)> {
    let src_dir = file
        .ancestors()
        .skip(1)
        .find(|dir| dir.file_name().map(|n| n == "src").unwrap_or(false))?
        .to_path_buf();
    let relative = file.strip_prefix(&src_dir).ok()?;
    let mut segments: Vec<String> = vec!["crate".to_string()];
    let components: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    let (last, dirs) = components.split_last()?;
    segments.extend(dirs.iter().map(|d| d.to_string()));
    let stem = last.strip_suffix(".rs")?;
    let is_root = dirs.is_empty() && (stem == "lib" || stem == "main");
    if !is_root && stem != "mod" {
        segments.push(stem.to_string());
    }
    Some((src_dir, segments.join("::")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(files: &[&str]) -> FsModuleResolver {
        let files: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
        FsModuleResolver::new(Path::new("/p"), &files)
    }

    fn resolve(r: &FsModuleResolver, origin: &str, from: &str, language: Language) -> ResolvedImport {
        r.resolve(origin, &[], from, language)
    }

    #[test]
    fn test_rust_module_path() {
        let module = |p: &str| rust_module_path(Path::new(p)).map(|(_, m)| m);
        assert_eq!(module("/p/src/lib.rs").as_deref(), Some("crate"));
        assert_eq!(module("/p/src/main.rs").as_deref(), Some("crate"));
        assert_eq!(module("/p/src/foo.rs").as_deref(), Some("crate::foo"));
        assert_eq!(module("/p/src/foo/mod.rs").as_deref(), Some("crate::foo"));
        assert_eq!(module("/p/src/foo/bar.rs").as_deref(), Some("crate::foo::bar"));
        assert_eq!(module("/p/build.rs"), None);
    }

    #[test]
    fn test_rust_paths_walk_prefixes() {
        let r = resolver(&["/p/src/lib.rs", "/p/src/graph/mod.rs", "/p/src/graph/schema.rs"]);
        let from = "/p/src/graph/schema.rs";
        assert_eq!(
            resolve(&r, "crate::graph::schema::CodeGraph", "/p/src/lib.rs", Language::Rust).normalized_path,
            "/p/src/graph/schema.rs"
        );
        assert_eq!(
            resolve(&r, "super::Assembler", from, Language::Rust).normalized_path,
            "/p/src/graph/mod.rs"
        );
        assert_eq!(
            resolve(&r, "crate::Config", from, Language::Rust).normalized_path,
            "/p/src/lib.rs"
        );
        let external = resolve(&r, "std::collections::HashMap", from, Language::Rust);
        assert!(external.is_external);
        assert_eq!(external.normalized_path, "std::collections::HashMap");
    }

    #[test]
    fn test_script_relative_probing() {
        let r = resolver(&["/p/src/service.ts", "/p/src/util/index.ts", "/p/src/caller.ts"]);
        let from = "/p/src/caller.ts";
        assert_eq!(
            resolve(&r, "./service", from, Language::TypeScript).normalized_path,
            "/p/src/service.ts"
        );
        assert_eq!(
            resolve(&r, "./service.js", from, Language::TypeScript).normalized_path,
            "/p/src/service.ts"
        );
        assert_eq!(
            resolve(&r, "./util", from, Language::TypeScript).normalized_path,
            "/p/src/util/index.ts"
        );
        assert!(resolve(&r, "react", from, Language::TypeScript).is_external);
    }

    #[test]
    fn test_python_modules() {
        let r = resolver(&["/p/app/models.py", "/p/app/__init__.py", "/p/app/views.py"]);
        let from = "/p/app/views.py";
        assert_eq!(
            resolve(&r, "app.models", from, Language::Python).normalized_path,
            "/p/app/models.py"
        );
        assert_eq!(
            resolve(&r, ".models", from, Language::Python).normalized_path,
            "/p/app/models.py"
        );
        assert_eq!(
            resolve(&r, ".", from, Language::Python).normalized_path,
            "/p/app/__init__.py"
        );
        assert_eq!(resolve(&r, "app", from, Language::Python).normalized_path, "/p/app/__init__.py");
        assert!(resolve(&r, "os.path", from, Language::Python).is_external);
    }

    #[test]
    fn test_java_suffix_and_nested_classes() {
        let r = resolver(&[
            "/p/src/main/java/com/acme/Service.java",
            "/p/src/main/java/com/other/Service.java",
        ]);
        let from = "/p/src/main/java/com/acme/App.java";
        assert_eq!(
            resolve(&r, "com.acme.Service", from, Language::Java).normalized_path,
            "/p/src/main/java/com/acme/Service.java"
        );
        assert_eq!(
            resolve(&r, "com.other.Service.Inner", from, Language::Java).normalized_path,
            "/p/src/main/java/com/other/Service.java"
        );
        assert!(resolve(&r, "java.util.List", from, Language::Java).is_external);
    }
}
