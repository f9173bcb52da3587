// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-env-changed=TRYON_VERSION");

    // Packagers can pin the version string explicitly
    let version = std::env::var("TRYON_VERSION").unwrap_or_else(|_| describe_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Crate version with the short commit hash appended when built from a checkout
/// ("0.1.0-abcdef1"), or the bare crate version otherwise.
fn describe_version() -> String {
    let base = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());

    let hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|hash| !hash.is_empty());

    match hash {
        Some(hash) => format!("{}-{}", base, hash),
        None => base,
    }
}
