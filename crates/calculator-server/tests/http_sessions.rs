//! Session lifecycle over the Streamable HTTP transport

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use calculator_server::factory;
use mcp_server::transport::SESSION_HEADER;
use mcp_server::{HttpConfig, HttpTransport};

fn app() -> Router {
    HttpTransport::new(factory(), HttpConfig::new(3001))
        .unwrap()
        .router()
}

fn post(session: Option<&str>, body: Value) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .header(header::HOST, "localhost:3001")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json, text/event-stream");
    if let Some(session) = session {
        request = request.header(SESSION_HEADER, session);
    }
    request.body(Body::from(body.to_string())).unwrap()
}

fn delete(session: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri("/mcp")
        .header(SESSION_HEADER, session)
        .body(Body::empty())
        .unwrap()
}

fn initialize() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": {"name": "integration-test", "version": "1.0.0"}
        }
    })
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn open_session(app: &Router) -> String {
    let response = app.clone().oneshot(post(None, initialize())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let session = response.headers()[SESSION_HEADER].to_str().unwrap().to_string();
    let body = body_json(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["serverInfo"]["name"], "calculator-server");
    session
}

#[tokio::test]
async fn initialize_then_call_tool() {
    let app = app();
    let session = open_session(&app).await;

    let response = app
        .clone()
        .oneshot(post(
            Some(&session),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .oneshot(post(
            Some(&session),
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "add", "arguments": {"a": 2, "b": 3}}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], 2);
    assert_eq!(body["result"]["content"][0]["text"], "2 + 3 = 5");
}

#[tokio::test]
async fn domain_errors_stay_inside_the_envelope() {
    let app = app();
    let session = open_session(&app).await;

    let response = app
        .oneshot(post(
            Some(&session),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "divide", "arguments": {"a": 1, "b": 0}}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(body["result"]["content"][0]["text"], "Error: division by zero");
}

#[tokio::test]
async fn missing_or_unknown_session_is_rejected() {
    let app = app();
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    let response = app.clone().oneshot(post(None, ping.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32000);
    assert!(body["id"].is_null());

    let response = app
        .oneshot(post(Some("not-a-session"), ping))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], -32000);
}

#[tokio::test]
async fn reinitializing_a_session_is_rejected() {
    let app = app();
    let session = open_session(&app).await;

    let response = app.oneshot(post(Some(&session), initialize())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], -32600);
}

#[tokio::test]
async fn sessions_are_isolated() {
    let app = app();
    let first = open_session(&app).await;
    let second = open_session(&app).await;
    assert_ne!(first, second);

    let response = app.clone().oneshot(delete(&first)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post(
            Some(&second),
            json!({"jsonrpc": "2.0", "id": 5, "method": "ping"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deleted_session_cannot_be_reused() {
    let app = app();
    let session = open_session(&app).await;

    let response = app.clone().oneshot(delete(&session)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(
            Some(&session),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], -32000);

    let response = app.oneshot(delete(&session)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_requests_get_batch_replies() {
    let app = app();
    let session = open_session(&app).await;

    let response = app
        .oneshot(post(
            Some(&session),
            json!([
                {"jsonrpc": "2.0", "id": 10, "method": "resources/read", "params": {"uri": "math://pi"}},
                {"jsonrpc": "2.0", "method": "notifications/initialized"},
                {"jsonrpc": "2.0", "id": 11, "method": "resources/read", "params": {"uri": "math://formula/pythagoras"}}
            ]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let replies = body.as_array().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["id"], 10);
    assert_eq!(replies[1]["result"]["contents"][0]["uri"], "math://formula/pythagoras");
}

#[tokio::test]
async fn sse_stream_requires_a_session() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/mcp")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let session = open_session(&app).await;
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/mcp")
                .header(SESSION_HEADER, session.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn health_reports_server_name() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["server"], "calculator-server-http");
}
