#![forbid(unsafe_code)]

// Build information surfaced by the /api/version endpoint and the startup log.
// Source trees without git metadata (tarballs, containers) report "unknown".
const UNKNOWN: &str = "unknown";

fn main() {
    let branch = build_data::get_git_branch().unwrap_or_else(|_| UNKNOWN.to_string());
    let commit = build_data::get_git_commit_short().unwrap_or_else(|_| UNKNOWN.to_string());
    let dirty = build_data::get_git_dirty()
        .map(|d| d.to_string())
        .unwrap_or_else(|_| UNKNOWN.to_string());
    // Using BUILD_TIMESTAMP makes build unreproducible.
    let source_ts = build_data::get_source_time()
        .map(build_data::format_timestamp)
        .unwrap_or_else(|_| UNKNOWN.to_string());
    let rustc = build_data::get_rustc_version().unwrap_or_else(|_| UNKNOWN.to_string());

    println!("cargo:rustc-env=GIT_BRANCH={}", branch);
    println!("cargo:rustc-env=GIT_COMMIT_SHORT={}", commit);
    println!("cargo:rustc-env=GIT_DIRTY={}", dirty);
    println!("cargo:rustc-env=SOURCE_TIMESTAMP={}", source_ts);
    println!("cargo:rustc-env=RUSTC_VERSION={}", rustc);
}
