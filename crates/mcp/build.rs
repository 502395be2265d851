#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
    let Some(git_dir) = find_git_dir(&manifest_dir) else {
        return;
    };

    let Some(sha) = head_sha(&git_dir) else {
        return;
    };

    let short = sha.chars().take(12).collect::<String>();
    println!("cargo:rustc-env=TT_GIT_SHA={short}");
}

fn find_git_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let dot_git = current.join(".git");
        if dot_git.is_dir() {
            return Some(dot_git);
        }
        if dot_git.is_file() {
            // Worktree: `.git` is a file pointing at the real git dir.
            let text = fs::read_to_string(&dot_git).ok()?;
            let line = text.lines().next().unwrap_or("").trim();
            return line
                .strip_prefix("gitdir:")
                .map(|path| current.join(path.trim()));
        }

        current = current.parent()?;
    }
}

fn head_sha(git_dir: &Path) -> Option<String> {
    let head_path = git_dir.join("HEAD");
    println!("cargo:rerun-if-changed={}", head_path.display());

    let head_raw = fs::read_to_string(&head_path).ok()?;
    let head = head_raw.trim();
    if head.is_empty() {
        return None;
    }

    match head.strip_prefix("ref:") {
        Some(ref_path) => resolve_ref(git_dir, ref_path.trim()),
        None => Some(head.to_string()),
    }
}

fn resolve_ref(git_dir: &Path, ref_path: &str) -> Option<String> {
    // Loose ref first.
    let full_ref = git_dir.join(ref_path);
    if full_ref.exists() {
        println!("cargo:rerun-if-changed={}", full_ref.display());
        if let Ok(text) = fs::read_to_string(&full_ref) {
            let sha = text.trim();
            if !sha.is_empty() {
                return Some(sha.to_string());
            }
        }
    }

    // Fall back to packed-refs (common in worktrees / after gc).
    let packed = git_dir.join("packed-refs");
    if !packed.exists() {
        return None;
    }
    println!("cargo:rerun-if-changed={}", packed.display());
    let text = fs::read_to_string(&packed).ok()?;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('^') {
            continue;
        }
        let Some((sha, name)) = line.split_once(' ') else {
            continue;
        };
        if name == ref_path && !sha.trim().is_empty() {
            return Some(sha.trim().to_string());
        }
    }

    None
}
