#![forbid(unsafe_code)]
#![allow(dead_code)]

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// One spawned `tt_mcp` process speaking newline-delimited JSON over stdio.
///
/// The process gets a private storage directory so tests never share state;
/// `Drop` kills the server and, unless the test opted out to restart against
/// the same store, removes the directory again.
pub(crate) struct Server {
    process: Child,
    input: ChildStdin,
    output: BufReader<ChildStdout>,
    dir: PathBuf,
    keep_dir: bool,
}

impl Server {
    pub(crate) fn start(test_name: &str) -> Self {
        Self::start_with_args(test_name, &[])
    }

    pub(crate) fn start_with_args(test_name: &str, extra_args: &[&str]) -> Self {
        Self::start_with_storage_dir(temp_dir(test_name), extra_args, true)
    }

    pub(crate) fn start_initialized(test_name: &str) -> Self {
        Self::start_initialized_with_args(test_name, &[])
    }

    pub(crate) fn start_initialized_with_args(test_name: &str, extra_args: &[&str]) -> Self {
        let mut server = Self::start_with_args(test_name, extra_args);
        server.initialize_default();
        server
    }

    pub(crate) fn start_with_storage_dir(
        storage_dir: PathBuf,
        extra_args: &[&str],
        cleanup_storage: bool,
    ) -> Self {
        std::fs::create_dir_all(&storage_dir).expect("create storage dir");
        let mut process = Command::new(env!("CARGO_BIN_EXE_tt_mcp"))
            .arg("--storage-dir")
            .arg(&storage_dir)
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .expect("spawn tt_mcp");
        let input = process.stdin.take().expect("stdin piped");
        let output = BufReader::new(process.stdout.take().expect("stdout piped"));
        Self {
            process,
            input,
            output,
            dir: storage_dir,
            keep_dir: !cleanup_storage,
        }
    }

    /// Runs the `initialize` / `notifications/initialized` handshake.
    pub(crate) fn initialize_default(&mut self) {
        let hello = self.request(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "harness", "version": "0" }
            }
        }));
        assert!(hello.get("result").is_some(), "initialize failed: {hello}");
        self.send(json!({ "jsonrpc": "2.0", "method": "notifications/initialized", "params": {} }));
    }

    pub(crate) fn send(&mut self, message: Value) {
        self.send_raw(&message.to_string());
    }

    pub(crate) fn send_raw(&mut self, line: &str) {
        writeln!(self.input, "{line}").expect("write line to server");
        self.input.flush().expect("flush server stdin");
    }

    pub(crate) fn recv(&mut self) -> Value {
        let mut line = String::new();
        let n = self.output.read_line(&mut line).expect("read server reply");
        assert!(n > 0 && !line.trim().is_empty(), "server closed its stdout");
        serde_json::from_str(line.trim()).expect("reply is one json object per line")
    }

    pub(crate) fn request(&mut self, message: Value) -> Value {
        self.send(message);
        self.recv()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
        if !self.keep_dir {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}

pub(crate) fn temp_dir(test_name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "tt_mcp_{test_name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// Unwraps the inner tool payload from a `tools/call` response envelope.
pub(crate) fn extract_tool_text(resp: &Value) -> Value {
    let text = resp
        .pointer("/result/content/0/text")
        .and_then(Value::as_str)
        .expect("tool responses carry one text content item");
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

pub(crate) fn call_tool(server: &mut Server, id: u64, name: &str, arguments: Value) -> Value {
    let resp = server.request(json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    }));
    extract_tool_text(&resp)
}

pub(crate) fn assert_tool_ok(out: &Value) -> &Value {
    assert_eq!(
        out.pointer("/success").and_then(Value::as_bool),
        Some(true),
        "tool call failed: {out}"
    );
    out.get("result").expect("successful calls carry a result")
}

pub(crate) fn assert_tool_error(out: &Value, code: &str) {
    assert_eq!(
        out.pointer("/success").and_then(Value::as_bool),
        Some(false),
        "tool call unexpectedly succeeded: {out}"
    );
    assert_eq!(
        out.pointer("/error/code").and_then(Value::as_str),
        Some(code),
        "wrong error code: {out}"
    );
}

pub(crate) fn assert_json_rpc_error(resp: &Value, expected_code: i64) {
    assert_eq!(
        resp.pointer("/error/code").and_then(Value::as_i64),
        Some(expected_code),
        "wrong json-rpc error: {resp}"
    );
}

/// Small fixture graph used across the flow tests:
///
/// ```text
/// Work (3 refs total)
/// └── Projects (3)
///     └── Done (2)
/// Home (1)
/// ```
///
/// The Notes page carries the tagging blocks (b2 marks Projects, b1/b4
/// mark Done, b3 marks Home).
pub(crate) const FIXTURE_YAML: &str = r#"
pages:
  - uid: p-work
    title: Work
  - uid: p-projects
    title: Work/Projects
  - uid: p-done
    title: Work/Projects/Done
  - uid: p-home
    title: Home
  - uid: p-notes
    title: Notes
    blocks:
      - uid: b1
        text: "finish the report #[[Work/Projects/Done]]"
      - uid: b2
        text: "kick off planning #[[Work/Projects]]"
      - uid: b3
        text: "water the plants #[[Home]]"
      - uid: b4
        text: "archive the sprint #[[Work/Projects/Done]] again"
"#;

pub(crate) fn import_fixture(server: &mut Server, workspace: &str) {
    let out = call_tool(
        server,
        10,
        "graph_import",
        json!({ "workspace": workspace, "yaml": FIXTURE_YAML }),
    );
    assert_tool_ok(&out);
}
