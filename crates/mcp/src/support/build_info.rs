#![forbid(unsafe_code)]

pub(crate) fn build_profile_label() -> &'static str {
    if cfg!(debug_assertions) { "debug" } else { "release" }
}

pub(crate) fn build_git_sha() -> Option<&'static str> {
    option_env!("TT_GIT_SHA")
        .map(str::trim)
        .filter(|sha| !sha.is_empty())
}

/// Shaped as semver build metadata (`+<id>(.<id>)*`) so version strings stay
/// machine-parseable: `0.1.0+git.<sha>.<profile>`.
pub(crate) fn build_fingerprint() -> String {
    let version = crate::SERVER_VERSION;
    let profile = build_profile_label();
    match build_git_sha() {
        Some(sha) => format!("{version}+git.{sha}.{profile}"),
        None => format!("{version}+{profile}"),
    }
}
