//! End-to-end tests of the viewer running next to the stdio server.

mod common;

use common::{EventReader, ServerProcess, Workspace};
use serde_json::{json, Value};

/// Start a server with the viewer on a free port and return its base URL.
fn start(workspace: &Workspace) -> (ServerProcess, String) {
    let mut server = ServerProcess::start(workspace);
    server.handshake();
    let url = server.call_ok(100, "viewer_url", json!({}))["url"]
        .as_str()
        .unwrap()
        .trim_end_matches('/')
        .to_string();
    assert!(!url.ends_with(":0"), "viewer reported an unbound port: {url}");
    (server, url)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tool_call_reaches_event_stream() {
    let workspace = Workspace::new();
    let (mut server, url) = start(&workspace);

    let resp = reqwest::get(format!("{url}/api/events")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let mut events = EventReader::new(resp);

    let initial = events.next().await;
    assert_eq!(initial["words"], json!([]));

    server.call_ok(2, "add_word", json!({"word": "Rust", "size": 8}));

    let pushed = events.next().await;
    assert_eq!(pushed["words"][0]["word"], "Rust");
    assert_eq!(pushed["words"][0]["size"], 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_every_stream_gets_the_change() {
    let workspace = Workspace::new();
    let (mut server, url) = start(&workspace);

    let mut first = EventReader::new(reqwest::get(format!("{url}/api/events")).await.unwrap());
    let mut second = EventReader::new(reqwest::get(format!("{url}/api/events")).await.unwrap());
    first.next().await;
    second.next().await;

    server.call_ok(2, "add_word", json!({"word": "Go"}));

    assert_eq!(first.next().await["words"][0]["word"], "Go");
    assert_eq!(second.next().await["words"][0]["word"], "Go");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_viewer_edits_are_visible_to_tools() {
    let workspace = Workspace::new();
    let (mut server, url) = start(&workspace);
    server.call_ok(2, "add_word", json!({"word": "Go"}));
    server.call_ok(3, "add_word", json!({"word": "Concurrency"}));

    let mut events = EventReader::new(reqwest::get(format!("{url}/api/events")).await.unwrap());
    events.next().await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/api/connect"))
        .json(&json!({"source": "go", "target": "concurrency"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let pushed = events.next().await;
    assert_eq!(pushed["connections"][0]["source"], "Go");

    let listed = server.call_ok(4, "list_words", json!({}));
    assert_eq!(listed["connections"][0]["target"], "Concurrency");

    let resp = client
        .post(format!("{url}/api/disconnect"))
        .json(&json!({"source": "Go", "target": "Concurrency"}))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "success"}));

    let listed = server.call_ok(5, "list_words", json!({}));
    assert_eq!(listed["connections"], json!([]));
    assert_eq!(workspace.stored_snapshot()["connections"], json!([]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_words_endpoint_matches_tools() {
    let workspace = Workspace::new();
    let (mut server, url) = start(&workspace);
    server.call_ok(2, "add_word", json!({"word": "Docker"}));

    let resp = reqwest::get(format!("{url}/api/words")).await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["words"][0]["word"], "Docker");
    assert_eq!(body["words"][0]["category"], "tool");
}

#[test]
fn test_port_in_use_keeps_stdio_running() {
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port().to_string();

    let workspace = Workspace::new();
    let mut server = ServerProcess::start_with(&workspace, &["--port", &port]);
    server.handshake();

    let added = server.call_ok(2, "add_word", json!({"word": "Still", "size": 2}));
    assert_eq!(added["action"], "added");
    assert!(server.finish().success());
}
