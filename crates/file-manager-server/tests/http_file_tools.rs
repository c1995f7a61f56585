//! File tools driven through HTTP sessions

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use file_manager_server::factory;
use mcp_server::transport::SESSION_HEADER;
use mcp_server::{HttpConfig, HttpTransport};

fn app(dir: &TempDir) -> Router {
    HttpTransport::new(factory(dir.path()), HttpConfig::new(3002))
        .unwrap()
        .router()
}

async fn send(app: &Router, session: Option<&str>, body: Value) -> (StatusCode, Option<String>, Value) {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(session) = session {
        request = request.header(SESSION_HEADER, session);
    }

    let response = app
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let session = response
        .headers()
        .get(SESSION_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, session, body)
}

async fn open_session(app: &Router) -> String {
    let (status, session, body) = send(
        app,
        None,
        json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "integration-test", "version": "1.0.0"}
            }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(body["result"]["serverInfo"]["name"], "file-manager-server");
    session.unwrap()
}

fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

#[tokio::test]
async fn written_content_reads_back_identically() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let session = open_session(&app).await;
    let content = "line one\nline two — ünïcödé\n";

    let (status, _, body) = send(
        &app,
        Some(&session),
        tool_call(1, "write_file", json!({"file_path": "out/data.txt", "content": content})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["isError"], Value::Null);

    assert_eq!(
        std::fs::read_to_string(dir.path().join("out/data.txt")).unwrap(),
        content
    );

    let (_, _, body) = send(
        &app,
        Some(&session),
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "resources/read",
            "params": {"uri": "file://content/out"}
        }),
    )
    .await;
    // A directory is not readable as a file
    assert!(body["result"]["contents"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Failed to read file: "));

    let (_, _, body) = send(
        &app,
        Some(&session),
        tool_call(3, "read_file", json!({"file_path": "out/data.txt"})),
    )
    .await;
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.ends_with(&format!("Content:\n{}", content)));
}

#[tokio::test]
async fn deleting_a_missing_path_is_an_error_envelope() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let session = open_session(&app).await;

    let (status, _, body) = send(
        &app,
        Some(&session),
        tool_call(1, "delete_path", json!({"path": "ghost.txt"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_null());
    assert_eq!(body["result"]["isError"], true);
    assert!(body["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Failed to delete ghost.txt: "));
}

#[tokio::test]
async fn sessions_share_the_filesystem_but_not_state() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let writer = open_session(&app).await;
    let reader = open_session(&app).await;
    assert_ne!(writer, reader);

    send(
        &app,
        Some(&writer),
        tool_call(1, "write_file", json!({"file_path": "shared.txt", "content": "hi"})),
    )
    .await;

    let (_, _, body) = send(
        &app,
        Some(&reader),
        tool_call(1, "list_directory", json!({"directory_path": "."})),
    )
    .await;
    assert_eq!(
        body["result"]["content"][0]["text"],
        "Directory: .\n📄 shared.txt (2 bytes)"
    );
}

#[tokio::test]
async fn tool_listing_advertises_defaults_as_optional() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let session = open_session(&app).await;

    let (_, _, body) = send(
        &app,
        Some(&session),
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
    )
    .await;

    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 6);
    let read_file = &tools[0];
    assert_eq!(read_file["name"], "read_file");
    assert_eq!(read_file["inputSchema"]["required"], json!(["file_path"]));
    assert_eq!(
        read_file["inputSchema"]["properties"]["encoding"]["enum"],
        json!(["utf8", "base64", "binary"])
    );
}
