//! Build script for jobsh-repl.
//!
//! Bakes the git revision and build date into the binary for `--version`.
//! `SOURCE_DATE_EPOCH` pins the date for reproducible builds.

use std::path::Path;
use std::process::Command;

fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!hash.is_empty()).then_some(hash)
}

fn build_date() -> String {
    let pinned = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0));
    pinned
        .unwrap_or_else(chrono::Utc::now)
        .format("%Y-%m-%d")
        .to_string()
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    if Path::new("../../.git").exists() {
        println!("cargo:rerun-if-changed=../../.git/HEAD");
    }

    let hash = git_hash().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=JOBSH_GIT_HASH={hash}");
    println!("cargo:rustc-env=JOBSH_BUILD_DATE={}", build_date());
}
