//! Path validation and normalization utilities.
//!
//! Every path the graph stores is an absolute, lexically normalized UTF-8
//! string: graph keys embed it, so two spellings of the same file must
//! collapse to one. Normalization here never touches the filesystem; only
//! [`canonicalize_root`] does, once per run.

use camino::{Utf8Path, Utf8PathBuf};
use std::path::{Component, Path, PathBuf};

/// Error types for path validation.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    /// Path cannot be canonicalized (doesn't exist or permission denied)
    #[error("cannot canonicalize path: {0}")]
    CannotCanonicalize(String),

    /// Path exists but is not a directory
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Path is not valid UTF-8 and cannot be used in a graph key
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8(String),

    /// Resolved path escapes the project root
    #[error("path escapes project root: {0} (root: {1})")]
    OutsideRoot(String, String),
}

/// Canonicalize a project root and check that it is a directory.
pub fn canonicalize_root(root: &Path) -> Result<Utf8PathBuf, PathValidationError> {
    let canonical = std::fs::canonicalize(root).map_err(|_| {
        PathValidationError::CannotCanonicalize(root.to_string_lossy().to_string())
    })?;
    if !canonical.is_dir() {
        return Err(PathValidationError::NotADirectory(
            canonical.to_string_lossy().to_string(),
        ));
    }
    to_utf8(canonical)
}

/// Convert to a UTF-8 path.
pub fn to_utf8(path: PathBuf) -> Result<Utf8PathBuf, PathValidationError> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|p| PathValidationError::NonUtf8(p.to_string_lossy().to_string()))
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` at the root is dropped; `..` on a relative path with nothing left to
/// pop is kept so the result stays equivalent.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Absolute, normalized form of `path` resolved against `root`.
pub fn absolutize(path: &Path, root: &Utf8Path) -> Result<Utf8PathBuf, PathValidationError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.as_std_path().join(path)
    };
    to_utf8(normalize_lexically(&joined))
}

/// `path` relative to `root`, both already absolute and normalized.
pub fn relative_to_root(path: &Utf8Path, root: &Utf8Path) -> Result<Utf8PathBuf, PathValidationError> {
    path.strip_prefix(root)
        .map(Utf8Path::to_path_buf)
        .map_err(|_| PathValidationError::OutsideRoot(path.to_string(), root.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_lexically_resolves_dots() {
        assert_eq!(
            normalize_lexically(Path::new("/repo/src/./a/../b.ts")),
            PathBuf::from("/repo/src/b.ts")
        );
        assert_eq!(normalize_lexically(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_lexically(Path::new("../a/./b")), PathBuf::from("../a/b"));
    }

    #[test]
    fn test_absolutize_relative_path() {
        let root = Utf8Path::new("/repo");
        let abs = absolutize(Path::new("src/../lib/x.py"), root).unwrap();
        assert_eq!(abs, Utf8PathBuf::from("/repo/lib/x.py"));
        let kept = absolutize(Path::new("/elsewhere/y.py"), root).unwrap();
        assert_eq!(kept, Utf8PathBuf::from("/elsewhere/y.py"));
    }

    #[test]
    fn test_relative_to_root() {
        let root = Utf8Path::new("/repo");
        assert_eq!(
            relative_to_root(Utf8Path::new("/repo/src/a.rs"), root).unwrap(),
            Utf8PathBuf::from("src/a.rs")
        );
        assert!(matches!(
            relative_to_root(Utf8Path::new("/other/a.rs"), root),
            Err(PathValidationError::OutsideRoot(_, _))
        ));
    }

    #[test]
    fn test_canonicalize_root_rejects_files_and_missing() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f.txt");
        std::fs::write(&file, b"x").unwrap();

        assert!(canonicalize_root(temp.path()).is_ok());
        assert!(matches!(
            canonicalize_root(&file),
            Err(PathValidationError::NotADirectory(_))
        ));
        assert!(matches!(
            canonicalize_root(&temp.path().join("missing")),
            Err(PathValidationError::CannotCanonicalize(_))
        ));
    }
}
