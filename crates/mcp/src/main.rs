#![forbid(unsafe_code)]

mod entry;
mod handlers;
mod server;
mod support;

pub(crate) use support::*;

pub(crate) use server::{SidebarState, TreeSnapshot, ViewMode};
pub(crate) use tt_core::ids::WorkspaceId;
use tt_storage::SqliteStore;
pub(crate) use tt_storage::StoreError;

// Baseline protocol revision, reported when a client does not name one of its
// own; `initialize` otherwise echoes whatever the client asked for.
const MCP_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "tagtree-mcp";
const SERVER_VERSION: &str = "0.1.0";

fn write_last_crash(storage_dir: &std::path::Path, kind: &str, detail: &str) {
    // Crash breadcrumbs share the store directory so a wedged setup can be
    // diagnosed without a working transport. Request bodies never land here.
    let _ = std::fs::create_dir_all(storage_dir);
    let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let report = [
        format!(
            "ts={}",
            crate::support::ts_ms_to_rfc3339(crate::support::now_ms_i64())
        ),
        format!("pid={}", std::process::id()),
        format!("kind={kind}"),
        format!("build={}", crate::build_fingerprint()),
        format!("cwd={}", cwd.display()),
        format!("args={:?}", std::env::args().collect::<Vec<_>>()),
        format!("detail={detail}"),
        String::new(),
    ];
    let _ = std::fs::write(
        storage_dir.join("tagtree_mcp_last_crash.txt"),
        report.join("\n"),
    );
}

fn install_crash_reporter(storage_dir: std::path::PathBuf) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        let detail = format!("{info}\nbacktrace:\n{backtrace}");
        write_last_crash(&storage_dir, "panic", &detail);
        previous(info);
    }));
}

pub(crate) struct SidebarServer {
    initialized: bool,
    store: SqliteStore,
    sidebar: SidebarState,
    default_workspace: Option<WorkspaceId>,
    auto_refresh: bool,
}

pub(crate) struct SidebarServerConfig {
    default_workspace: Option<WorkspaceId>,
    auto_refresh: bool,
    show_descendants: bool,
}

fn usage() -> &'static str {
    "tt_mcp — tag tree sidebar over MCP stdio\n\n\
USAGE:\n\
  tt_mcp [--storage-dir DIR] [--workspace WS] [--auto-refresh]\n\
        [--show-descendants BOOL]\n\
\n\
FLAGS:\n\
  -h, --help       Print help and exit\n\
  -V, --version    Print version/build and exit\n\
\n\
NOTES:\n\
  - Default store: <repo>/.tagtree/ next to the enclosing .git\n\
  - Env fallbacks: TAGTREE_STORAGE_DIR, TAGTREE_WORKSPACE,\n\
    TAGTREE_AUTO_REFRESH, TAGTREE_SHOW_DESCENDANTS\n"
}

fn version_line() -> String {
    format!(
        "tt_mcp {SERVER_VERSION} build={}",
        crate::build_fingerprint()
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let has_flag = |flags: [&str; 2]| std::env::args().any(|arg| flags.contains(&arg.as_str()));
    // Help and version must not touch the filesystem; answering them before
    // any storage setup keeps `--help` safe to run anywhere.
    if has_flag(["-h", "--help"]) {
        print!("{}", usage());
        return Ok(());
    }
    if has_flag(["-V", "--version"]) {
        println!("{}", version_line());
        return Ok(());
    }

    let storage_dir = parse_storage_dir();
    install_crash_reporter(storage_dir.clone());
    // Session breadcrumbs go to the store directory, never to stdout/stderr,
    // which belong to the JSON-RPC transport.
    let mut session_log = SessionLog::new(&storage_dir);

    let default_workspace = match parse_default_workspace().map(WorkspaceId::try_new).transpose() {
        Ok(workspace) => workspace,
        Err(err) => {
            let detail = format!("workspace: {}", err.message());
            session_log.note_error(&detail);
            return Err(detail.into());
        }
    };

    let store = SqliteStore::open(&storage_dir)?;
    let mut server = SidebarServer::new(
        store,
        SidebarServerConfig {
            default_workspace,
            auto_refresh: parse_auto_refresh(),
            show_descendants: parse_show_descendants(),
        },
    );

    let result = entry::run_stdio(&mut server, &mut session_log);
    if let Err(err) = &result {
        session_log.note_error(&format!("{err:?}"));
        write_last_crash(&storage_dir, "error", &format!("{err:?}"));
    }
    result
}
