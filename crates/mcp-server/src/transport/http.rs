//! Streamable HTTP transport for MCP
//!
//! `POST /mcp` carries client messages, `GET /mcp` streams server
//! notifications as SSE and `DELETE /mcp` ends a session. The session is
//! named by the `Mcp-Session-Id` header issued at initialization.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::any::Any;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::error::RecvError;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use super::session::{Initialization, SessionManager};
use crate::config::HttpConfig;
use crate::error::{Result, ServerError};
use crate::protocol::{
    is_supported_version, IncomingPayload, McpError, McpMessage, OutgoingPayload,
    SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::registry::RegistryFactory;

/// Header carrying the session id in both directions
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Header carrying the negotiated protocol version on follow-up requests
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

/// Shared state for HTTP handlers
struct AppState {
    sessions: Arc<SessionManager>,
    config: HttpConfig,
    server_name: String,
    started: Instant,
}

/// HTTP transport for MCP protocol
pub struct HttpTransport {
    state: Arc<AppState>,
}

impl HttpTransport {
    /// Create a new HTTP transport
    ///
    /// The factory is invoked once up front so a broken registry fails at
    /// startup instead of on the first client.
    pub fn new(factory: RegistryFactory, config: HttpConfig) -> Result<Self> {
        let probe = factory()?;
        let server_name = probe.info().name.clone();

        Ok(Self {
            state: Arc::new(AppState {
                sessions: Arc::new(SessionManager::new(factory)),
                config,
                server_name,
                started: Instant::now(),
            }),
        })
    }

    /// Live sessions of this transport
    pub fn sessions(&self) -> Arc<SessionManager> {
        self.state.sessions.clone()
    }

    /// Build the axum router
    pub fn router(&self) -> Router {
        let state = self.state.clone();

        let mcp = Router::new()
            .route(
                "/mcp",
                post(handle_mcp_post).get(handle_mcp_get).delete(handle_mcp_delete),
            )
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                validate_host_and_origin,
            ));

        Router::new()
            .route("/health", get(health))
            .merge(mcp)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&state.config))
            .with_state(state)
    }

    /// Run the HTTP server until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.listen_address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        info!("MCP HTTP server listening on {}", addr);
        info!("Health check available at http://{}/health", addr);
        if self.state.config.dns_rebinding_protection {
            info!(
                "DNS rebinding protection enabled for hosts: {}",
                self.state.config.allowed_hosts.join(", ")
            );
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal(self.sessions()))
            .await?;

        info!("Server shutdown complete");
        Ok(())
    }
}

fn cors_layer(config: &HttpConfig) -> CorsLayer {
    let origins = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(SESSION_HEADER),
            HeaderName::from_static(PROTOCOL_VERSION_HEADER),
        ])
        .expose_headers([HeaderName::from_static(SESSION_HEADER)])
}

/// Resolves on Ctrl+C or SIGTERM, then closes every session so open SSE
/// streams end and the server can drain
async fn shutdown_signal(sessions: Arc<SessionManager>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutting down server...");
    let closed = sessions.close_all().await;
    debug!("Closed {} sessions during shutdown", closed);
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "server": format!("{}-http", state.server_name),
        "uptime": state.started.elapsed().as_secs_f64(),
        "timestamp": Utc::now().to_rfc3339(),
        "sessions": state.sessions.len().await,
    }))
}

/// Reject `/mcp` requests from unexpected hosts or origins when protection is on
async fn validate_host_and_origin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.dns_rebinding_protection {
        let headers = request.headers();

        let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
        if !host.is_some_and(|h| state.config.is_allowed_host(h)) {
            warn!("Rejected request for host {:?}", host);
            return error_response(
                StatusCode::FORBIDDEN,
                McpError::server_error(format!("Invalid Host header: {}", host.unwrap_or(""))),
            );
        }

        if let Some(origin) = headers.get(header::ORIGIN) {
            let origin = origin.to_str().unwrap_or("");
            if !state.config.is_allowed_origin(origin) {
                warn!("Rejected request from origin {}", origin);
                return error_response(
                    StatusCode::FORBIDDEN,
                    McpError::server_error(format!("Invalid Origin header: {}", origin)),
                );
            }
        }
    }

    next.run(request).await
}

/// Handle client messages via HTTP POST
async fn handle_mcp_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_json(&headers) {
        return error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            McpError::server_error("Unsupported Media Type: Content-Type must be application/json"),
        );
    }

    let payload = match IncomingPayload::parse(&body) {
        Ok(payload) => payload,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match session_id(&headers) {
        Some(id) => {
            let Some(session) = state.sessions.get(id).await else {
                debug!("Unknown session id: {}", id);
                return invalid_session();
            };
            if payload.contains_initialize() {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    McpError::invalid_request("Invalid Request: Server already initialized"),
                );
            }
            if let Err(response) = check_protocol_version(&headers) {
                return response;
            }

            reply(StatusCode::OK, session.handle(payload).await, None)
        }
        None if payload.is_initialize() => match state.sessions.initialize(payload).await {
            Ok(Initialization {
                session: Some(session),
                reply: outgoing,
            }) => reply(StatusCode::OK, outgoing, Some(session.id())),
            // initialize itself was rejected; the reply carries the reason
            Ok(Initialization {
                session: None,
                reply: outgoing,
            }) => reply(StatusCode::BAD_REQUEST, outgoing, None),
            Err(e) => {
                error!("Failed to build registry for new session: {}", e);
                internal_error()
            }
        },
        None if payload.contains_initialize() => error_response(
            StatusCode::BAD_REQUEST,
            McpError::invalid_request("Invalid Request: Only one initialization request is allowed"),
        ),
        None => invalid_session(),
    }
}

/// Stream server-to-client notifications via Server-Sent Events
async fn handle_mcp_get(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let session = match session_id(&headers) {
        Some(id) => state.sessions.get(id).await,
        None => None,
    };
    let Some(session) = session else {
        return invalid_session();
    };
    if let Err(response) = check_protocol_version(&headers) {
        return response;
    }

    let id = session.id().to_string();
    let (mut notifications, mut closed) = session.subscribe();
    drop(session);

    info!("SSE stream opened for session {}", id);

    let stream = async_stream::stream! {
        loop {
            if *closed.borrow() {
                break;
            }

            let next = tokio::select! {
                message = notifications.recv() => Some(message),
                changed = closed.changed() => match changed {
                    Ok(()) if !*closed.borrow() => continue,
                    _ => None,
                },
            };

            match next {
                Some(Ok(message)) => match Event::default().json_data(&message) {
                    Ok(event) => yield Ok::<Event, Infallible>(event),
                    Err(e) => warn!("Failed to encode notification: {}", e),
                },
                Some(Err(RecvError::Lagged(skipped))) => {
                    warn!("SSE stream for session {} dropped {} notifications", id, skipped);
                }
                Some(Err(RecvError::Closed)) | None => break,
            }
        }
        info!("SSE stream closed for session {}", id);
    };

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

/// Terminate a session
async fn handle_mcp_delete(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return invalid_session();
    };
    if let Err(response) = check_protocol_version(&headers) {
        return response;
    }

    if state.sessions.close(id).await {
        StatusCode::OK.into_response()
    } else {
        invalid_session()
    }
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("application/json"))
}

fn check_protocol_version(headers: &HeaderMap) -> std::result::Result<(), Response> {
    let Some(value) = headers.get(PROTOCOL_VERSION_HEADER) else {
        return Ok(());
    };

    match value.to_str() {
        Ok(version) if is_supported_version(version) => Ok(()),
        _ => Err(error_response(
            StatusCode::BAD_REQUEST,
            McpError::server_error(format!(
                "Bad Request: Unsupported protocol version (supported versions: {})",
                SUPPORTED_PROTOCOL_VERSIONS.join(", ")
            )),
        )),
    }
}

fn reply(status: StatusCode, outgoing: Option<OutgoingPayload>, session_id: Option<&str>) -> Response {
    let Some(outgoing) = outgoing else {
        return StatusCode::ACCEPTED.into_response();
    };

    let body = match serde_json::to_vec(&outgoing) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            return internal_error();
        }
    };

    let mut response = (status, [(header::CONTENT_TYPE, "application/json")], body).into_response();
    if let Some(value) = session_id.and_then(|id| HeaderValue::from_str(id).ok()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

fn error_response(status: StatusCode, error: McpError) -> Response {
    (status, Json(McpMessage::error_response(None, error))).into_response()
}

fn invalid_session() -> Response {
    error_response(StatusCode::BAD_REQUEST, McpError::invalid_session())
}

fn internal_error() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        McpError::internal_error("Internal server error"),
    )
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("Request handler panicked");
    internal_error()
}
