//! Blastmap-specific error codes
//!
//! Error codes follow the pattern: BLM-{CATEGORY}-{3-digit number}
//!
//! Categories (1-3 uppercase letters):
//! - ROOT: Project root errors (missing, not a directory, no files)
//! - DIF: Diff input errors (unreadable, nothing parseable)
//! - ARG: Invalid command arguments
//! - IO: I/O-related errors (file access, permissions)
//!
//! Each error code is stable and should not be reused.

use crate::graph::AssembleError;

/// Root directory does not exist
pub const BLM_ROOT_001_MISSING: &str = "BLM-ROOT-001";

/// Root path is not a directory
pub const BLM_ROOT_002_NOT_A_DIRECTORY: &str = "BLM-ROOT-002";

/// No analyzable files under the root
pub const BLM_ROOT_003_NO_FILES: &str = "BLM-ROOT-003";

/// Diff file could not be read
pub const BLM_DIF_001_UNREADABLE: &str = "BLM-DIF-001";

/// Diff contained no valid hunk
pub const BLM_DIF_002_NO_HUNKS: &str = "BLM-DIF-002";

/// Invalid command arguments
pub const BLM_ARG_001_INVALID: &str = "BLM-ARG-001";

/// Invalid file path
pub const BLM_IO_001_INVALID_PATH: &str = "BLM-IO-001";

/// Output could not be written
pub const BLM_IO_002_WRITE_FAILED: &str = "BLM-IO-002";

/// Async runtime could not be started
pub const BLM_IO_003_RUNTIME: &str = "BLM-IO-003";

/// Error code documentation
///
/// | Code | Description | Remediation |
/// |------|-------------|-------------|
/// | BLM-ROOT-001 | Root directory missing | Check the `--root`/`--head`/`--base` path |
/// | BLM-ROOT-002 | Root is not a directory | Pass the project directory, not a file |
/// | BLM-ROOT-003 | No analyzable files | Check `--include`/`--exclude` and supported extensions |
/// | BLM-DIF-001 | Diff unreadable | Check the `--diff` path and permissions |
/// | BLM-DIF-002 | No valid hunks | Produce the diff with `git diff` or `diff -u` |
/// | BLM-ARG-001 | Invalid arguments | See `blastmap --help` |
/// | BLM-IO-001 | Invalid path | Verify path format |
/// | BLM-IO-002 | Write failed | Check `--out` directory permissions |
/// | BLM-IO-003 | Runtime start failed | Lower `--workers` |
pub const ERROR_CODE_DOCUMENTATION: &str = "See module documentation";

/// Map an assembler error to its stable code.
pub fn code_for(error: &AssembleError) -> &'static str {
    match error {
        AssembleError::MissingRoot(_) => BLM_ROOT_001_MISSING,
        AssembleError::NotADirectory(_) => BLM_ROOT_002_NOT_A_DIRECTORY,
        AssembleError::NoFiles(_) => BLM_ROOT_003_NO_FILES,
        AssembleError::Path(_) => BLM_IO_001_INVALID_PATH,
        AssembleError::Runtime(_) => BLM_IO_003_RUNTIME,
    }
}

/// Short category name of a code (`BLM-ROOT-001` -> `ROOT`).
pub fn category(code: &str) -> Option<&str> {
    let mut parts = code.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("BLM"), Some(category), Some(number), None)
            if number.len() == 3 && number.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some(category)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_pattern() {
        for code in [
            BLM_ROOT_001_MISSING,
            BLM_ROOT_002_NOT_A_DIRECTORY,
            BLM_ROOT_003_NO_FILES,
            BLM_DIF_001_UNREADABLE,
            BLM_DIF_002_NO_HUNKS,
            BLM_ARG_001_INVALID,
            BLM_IO_001_INVALID_PATH,
            BLM_IO_002_WRITE_FAILED,
            BLM_IO_003_RUNTIME,
        ] {
            assert!(category(code).is_some(), "bad code {}", code);
        }
        assert_eq!(category("MAG-REF-001"), None);
        assert_eq!(category("BLM-ROOT-1"), None);
    }

    #[test]
    fn test_assemble_error_codes() {
        assert_eq!(code_for(&AssembleError::NoFiles("/r".to_string())), BLM_ROOT_003_NO_FILES);
    }
}
