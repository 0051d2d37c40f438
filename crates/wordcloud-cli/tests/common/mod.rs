//! Common test utilities.
//!
//! Integration tests drive the real `wordcloud` binary:
//! - `ServerProcess`: a `wordcloud serve` child with its own config, data
//!   directory and Claude Desktop config, talked to over stdin/stdout
//! - `EventReader`: reads snapshot frames off the viewer's event stream
//!
//! Every process gets a fresh temporary directory, so tests can run in
//! parallel and never touch the user's real configuration.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Output, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

/// How long to wait for a response before failing the test.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the binary under test.
pub fn binary() -> &'static str {
    env!("CARGO_BIN_EXE_wordcloud")
}

/// A scratch home for one server: config file, snapshot, Claude config.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let workspace = Self {
            dir: TempDir::new().expect("create temp dir"),
        };
        let config = format!(
            "[storage]\npath = {:?}\n\n[integrations]\nclaude_desktop_config = {:?}\n",
            workspace.data_path().display().to_string(),
            workspace.claude_config_path().display().to_string(),
        );
        std::fs::write(workspace.config_path(), config).expect("write config");
        workspace
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.path().join("data").join("words.json")
    }

    pub fn claude_config_path(&self) -> PathBuf {
        self.dir.path().join("claude_desktop_config.json")
    }

    /// The snapshot as currently stored on disk.
    pub fn stored_snapshot(&self) -> Value {
        read_json(&self.data_path())
    }

    /// Run a one-shot CLI command against this workspace.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(binary())
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .env("RUST_LOG", "warn")
            .output()
            .expect("run wordcloud")
    }
}

pub fn read_json(path: &Path) -> Value {
    let contents = std::fs::read_to_string(path).expect("read json file");
    serde_json::from_str(&contents).expect("parse json file")
}

/// A running `wordcloud serve` process.
pub struct ServerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
}

impl ServerProcess {
    /// Start with the viewer on a free port.
    pub fn start(workspace: &Workspace) -> Self {
        Self::start_with(workspace, &["--port", "0"])
    }

    /// Start with the viewer disabled.
    pub fn start_without_viewer(workspace: &Workspace) -> Self {
        Self::start_with(workspace, &["--no-viewer"])
    }

    pub fn start_with(workspace: &Workspace, serve_args: &[&str]) -> Self {
        let mut child = Command::new(binary())
            .arg("--config")
            .arg(workspace.config_path())
            .arg("serve")
            .args(serve_args)
            .env("RUST_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn wordcloud serve");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().expect("child stdout");

        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self {
            child,
            stdin,
            lines,
        }
    }

    /// Write one raw line to the server.
    pub fn send_raw(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        writeln!(stdin, "{}", line).expect("write to server");
        stdin.flush().expect("flush server stdin");
    }

    pub fn send(&mut self, message: Value) {
        self.send_raw(&message.to_string());
    }

    /// Next response line, parsed.
    pub fn recv(&mut self) -> Value {
        let line = self
            .lines
            .recv_timeout(TIMEOUT)
            .expect("timed out waiting for a response");
        serde_json::from_str(&line).expect("response is JSON")
    }

    /// Send a request and wait for its response.
    pub fn request(&mut self, id: Value, method: &str, params: Value) -> Value {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }));
        self.recv()
    }

    /// Read the start-up announcement and perform the handshake.
    pub fn handshake(&mut self) -> Value {
        let announcement = self.recv();
        assert_eq!(announcement["id"], 0);

        let init = self.request(
            json!(1),
            "initialize",
            json!({
                "protocolVersion": "2025-06-18",
                "capabilities": {},
                "clientInfo": {"name": "integration-test", "version": "1.0.0"}
            }),
        );
        self.send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}));
        assert_eq!(init["result"], announcement["result"]);
        init
    }

    /// Call a tool and return its raw response.
    pub fn call(&mut self, id: i64, name: &str, arguments: Value) -> Value {
        self.request(
            json!(id),
            "tools/call",
            json!({"name": name, "arguments": arguments}),
        )
    }

    /// Call a tool that must succeed and decode its JSON text payload.
    pub fn call_ok(&mut self, id: i64, name: &str, arguments: Value) -> Value {
        let response = self.call(id, name, arguments);
        assert_eq!(response["id"], id);
        let result = &response["result"];
        assert!(
            result.get("isError").is_none(),
            "tool {} failed: {}",
            name,
            result
        );
        tool_payload(result)
    }

    /// Close stdin and wait for the process to exit.
    pub fn finish(mut self) -> ExitStatus {
        drop(self.stdin.take());
        self.child.wait().expect("wait for server")
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Decode the JSON text block of a `tools/call` result.
pub fn tool_payload(result: &Value) -> Value {
    let text = result["content"][0]["text"]
        .as_str()
        .expect("text content block");
    serde_json::from_str(text).expect("tool text is JSON")
}

/// Reads `data:` frames off an event stream, skipping keep-alives.
pub struct EventReader {
    response: reqwest::Response,
    buffer: String,
}

impl EventReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: String::new(),
        }
    }

    pub async fn next(&mut self) -> Value {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let frame: String = self.buffer.drain(..end + 2).collect();
                let data: Vec<&str> = frame
                    .lines()
                    .filter_map(|l| l.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect();
                if data.is_empty() {
                    continue;
                }
                return serde_json::from_str(&data.join("\n")).expect("event data is JSON");
            }

            let chunk = tokio::time::timeout(TIMEOUT, self.response.chunk())
                .await
                .expect("timed out waiting for an event")
                .expect("read event stream")
                .expect("event stream ended");
            self.buffer
                .push_str(std::str::from_utf8(&chunk).expect("event stream is UTF-8"));
        }
    }
}
