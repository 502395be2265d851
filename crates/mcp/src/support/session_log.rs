#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

/// Breadcrumb file for the most recent server session.
///
/// A stdio server has nowhere to report startup or transport trouble once the
/// client owns both pipes, so every state change is flushed to a small
/// key=value file under the storage directory. The file is overwritten on
/// each launch; it describes the last run only.
#[derive(Debug)]
pub(crate) struct SessionLog {
    path: PathBuf,
    header: Vec<(&'static str, String)>,
    mode: Option<String>,
    first_line: Option<String>,
    last_method: Option<String>,
    last_error: Option<String>,
    exit: Option<String>,
}

impl SessionLog {
    pub(crate) fn new(storage_dir: &Path) -> Self {
        let cwd = match std::env::current_dir() {
            Ok(dir) => dir.display().to_string(),
            Err(_) => String::from("."),
        };
        let header = vec![
            ("ts_start", crate::ts_ms_to_rfc3339(crate::now_ms_i64())),
            ("pid", std::process::id().to_string()),
            ("build", crate::build_fingerprint()),
            ("cwd", cwd),
            ("args", format!("{:?}", std::env::args().collect::<Vec<_>>())),
        ];
        let log = Self {
            path: storage_dir.join("tagtree_mcp_last_session.txt"),
            header,
            mode: None,
            first_line: None,
            last_method: None,
            last_error: None,
            exit: None,
        };
        log.flush();
        log
    }

    pub(crate) fn note_mode(&mut self, mode: &str, first_line: &str) {
        self.mode = Some(mode.to_string());
        self.first_line = Some(clip(first_line.trim_end(), 240));
        self.flush();
    }

    pub(crate) fn note_method(&mut self, method: &str) {
        let method = method.trim();
        if !method.is_empty() {
            self.last_method = Some(clip(method, 96));
            self.flush();
        }
    }

    pub(crate) fn note_error(&mut self, error: &str) {
        let error = error.trim();
        if !error.is_empty() {
            self.last_error = Some(clip(error, 300));
            self.flush();
        }
    }

    pub(crate) fn note_exit(&mut self, reason: &str) {
        self.exit = Some(clip(reason.trim(), 120));
        self.flush();
    }

    fn flush(&self) {
        if let Some(dir) = self.path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }

        let tail = [
            ("mode", self.mode.as_deref()),
            ("first_line", self.first_line.as_deref()),
            ("last_method", self.last_method.as_deref()),
            ("last_error", self.last_error.as_deref()),
            ("exit", self.exit.as_deref()),
        ];
        let mut lines: Vec<String> = self
            .header
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        lines.extend(
            tail.into_iter()
                .filter_map(|(key, value)| value.map(|v| format!("{key}={v}"))),
        );
        lines.push(String::new());

        // Diagnostics must never take the server down.
        let _ = std::fs::write(&self.path, lines.join("\n"));
    }
}

fn clip(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
