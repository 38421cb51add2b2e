use std::fs;
use std::path::Path;
use std::process::Command;

/// Bump the local build counter and return the new value
fn next_build_number() -> u64 {
    let path = Path::new("BUILD_NUMBER");
    let current = fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let next = current + 1;
    if let Err(e) = fs::write(path, next.to_string()) {
        println!("cargo:warning=could not update BUILD_NUMBER: {}", e);
    }
    next
}

/// A VERSION file pins the tool version, otherwise the package version wins
fn tool_version() -> String {
    fs::read_to_string("VERSION")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

fn git_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let profile = match std::env::var("PROFILE").as_deref() {
        Ok("release") => "release",
        _ => "development",
    };

    println!("cargo:rustc-env=ZEROTOOL_VERSION={}", tool_version());
    println!("cargo:rustc-env=ZEROTOOL_BUILD={}", next_build_number());
    println!("cargo:rustc-env=ZEROTOOL_PROFILE={}", profile);
    println!("cargo:rustc-env=ZEROTOOL_GIT_HASH={}", git_hash());

    // BUILD_NUMBER is rewritten above, so it is not a rerun trigger
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-env-changed=PROFILE");
}
