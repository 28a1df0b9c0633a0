//! Version and build information for blastmap
//!
//! Build metadata (commit SHA, build date) is injected by `build.rs`.

/// Full version string: "blastmap {version} ({commit} {date})"
pub fn version() -> String {
    format!(
        "blastmap {} ({} {})",
        package_version(),
        build_commit(),
        build_date()
    )
}

/// Get the package version (e.g., "0.4.0")
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get the build commit SHA
///
/// Returns "unknown" if not built with commit info
pub fn build_commit() -> &'static str {
    option_env!("BLASTMAP_COMMIT_SHA").unwrap_or("unknown")
}

/// Get the build date
pub fn build_date() -> &'static str {
    option_env!("BLASTMAP_BUILD_DATE").unwrap_or("unknown")
}
