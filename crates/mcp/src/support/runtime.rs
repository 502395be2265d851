#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

/// Zero-config launches (no flags, no TAGTREE_* environment) bind the store
/// and the default workspace to the enclosing repository.
fn auto_mode_enabled() -> bool {
    const ENV_KEYS: [&str; 4] = [
        "TAGTREE_STORAGE_DIR",
        "TAGTREE_WORKSPACE",
        "TAGTREE_AUTO_REFRESH",
        "TAGTREE_SHOW_DESCENDANTS",
    ];
    std::env::args().len() <= 1 && ENV_KEYS.into_iter().all(|key| std::env::var_os(key).is_none())
}

fn default_repo_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match cwd.ancestors().find(|dir| dir.join(".git").exists()) {
        Some(root) => root.to_path_buf(),
        None => cwd,
    }
}

/// Repo directory name squeezed into the workspace-id alphabet.
fn default_workspace_from_root(root: &Path) -> String {
    let raw = root
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("workspace");
    let cleaned: String = raw
        .chars()
        .map(|ch| match ch {
            _ if ch.is_ascii_alphanumeric() => ch.to_ascii_lowercase(),
            '.' | '_' | '-' => ch,
            _ => '-',
        })
        .collect();
    match cleaned.trim_matches('-') {
        "" => "workspace".to_string(),
        name => name.to_string(),
    }
}

/// First value following `flag` in the argument list.
fn flag_value(flag: &str) -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

pub(crate) fn parse_storage_dir() -> PathBuf {
    // Repeated --storage-dir keeps the last value, like most CLI overrides.
    let mut args = std::env::args().skip(1);
    let mut chosen: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        if arg == "--storage-dir"
            && let Some(value) = args.next()
        {
            chosen = Some(PathBuf::from(value));
        }
    }
    chosen
        .or_else(|| std::env::var_os("TAGTREE_STORAGE_DIR").map(PathBuf::from))
        .unwrap_or_else(|| {
            if auto_mode_enabled() {
                default_repo_root().join(".tagtree")
            } else {
                PathBuf::from(".tagtree")
            }
        })
}

pub(crate) fn parse_default_workspace() -> Option<String> {
    flag_value("--workspace")
        .or_else(|| std::env::var("TAGTREE_WORKSPACE").ok())
        .or_else(|| auto_mode_enabled().then(|| default_workspace_from_root(&default_repo_root())))
}

pub(crate) fn parse_auto_refresh() -> bool {
    std::env::args().skip(1).any(|arg| arg == "--auto-refresh")
        || parse_bool_env("TAGTREE_AUTO_REFRESH")
}

pub(crate) fn parse_show_descendants() -> bool {
    if let Some(value) = flag_value("--show-descendants") {
        return parse_bool_value(&value);
    }
    match std::env::var("TAGTREE_SHOW_DESCENDANTS") {
        Ok(value) => parse_bool_value(&value),
        Err(_) => true,
    }
}

fn parse_bool_value(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_bool_env(key: &str) -> bool {
    std::env::var(key).is_ok_and(|value| parse_bool_value(&value))
}
