//! Analysis run configuration.
//!
//! Defaults come from [`AnalysisConfig::default`]; `BLASTMAP_FILE_TIMEOUT_SECS`
//! and `BLASTMAP_MAX_FILE_SIZE` override them via [`AnalysisConfig::from_env`],
//! and CLI flags override both.

use std::time::Duration;

/// Files larger than this are skipped (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Per-file extraction timeout.
pub const DEFAULT_FILE_TIMEOUT: Duration = Duration::from_secs(60);

/// Batches hold this many files per worker.
const FILES_PER_WORKER: usize = 4;

pub const ENV_FILE_TIMEOUT: &str = "BLASTMAP_FILE_TIMEOUT_SECS";
pub const ENV_MAX_FILE_SIZE: &str = "BLASTMAP_MAX_FILE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub max_file_size: u64,
    pub file_timeout: Duration,
    /// Concurrent extraction workers
    pub workers: usize,
    /// Files dispatched per batch
    pub batch_size: usize,
    /// Discovery globs, relative to the root (empty = everything)
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Honor `.gitignore`/`.ignore` at the root during discovery
    pub gitignore_aware: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .max(1);
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            file_timeout: DEFAULT_FILE_TIMEOUT,
            workers,
            batch_size: workers * FILES_PER_WORKER,
            include: Vec::new(),
            exclude: Vec::new(),
            gitignore_aware: true,
        }
    }
}

impl AnalysisConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; unparsable values are ignored with a warning.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_FILE_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.file_timeout = Duration::from_secs(secs),
                _ => log::warn!("ignoring {}={:?}: expected positive seconds", ENV_FILE_TIMEOUT, raw),
            }
        }
        if let Some(raw) = lookup(ENV_MAX_FILE_SIZE) {
            match raw.trim().parse::<u64>() {
                Ok(bytes) if bytes > 0 => self.max_file_size = bytes,
                _ => log::warn!("ignoring {}={:?}: expected positive bytes", ENV_MAX_FILE_SIZE, raw),
            }
        }
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_file_timeout(mut self, timeout: Duration) -> Self {
        self.file_timeout = timeout;
        self
    }

    /// Set the worker count; the batch size follows it.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.batch_size = self.workers * FILES_PER_WORKER;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn with_gitignore(mut self, aware: bool) -> Self {
        self.gitignore_aware = aware;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.file_timeout, Duration::from_secs(60));
        assert!(config.workers >= 1);
        assert_eq!(config.batch_size, config.workers * FILES_PER_WORKER);
        assert!(config.gitignore_aware);
    }

    #[test]
    fn test_env_overrides() {
        let config = AnalysisConfig::default().apply_env(|key| match key {
            ENV_FILE_TIMEOUT => Some("5".to_string()),
            ENV_MAX_FILE_SIZE => Some("2048".to_string()),
            _ => None,
        });
        assert_eq!(config.file_timeout, Duration::from_secs(5));
        assert_eq!(config.max_file_size, 2048);
    }

    #[test]
    fn test_invalid_env_values_keep_defaults() {
        let config = AnalysisConfig::default().apply_env(|key| match key {
            ENV_FILE_TIMEOUT => Some("soon".to_string()),
            ENV_MAX_FILE_SIZE => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.file_timeout, DEFAULT_FILE_TIMEOUT);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_builder_clamps() {
        let config = AnalysisConfig::default().with_workers(0).with_batch_size(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.batch_size, 1);
        let config = AnalysisConfig::default().with_workers(3);
        assert_eq!(config.batch_size, 12);
    }
}
