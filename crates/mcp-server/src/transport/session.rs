//! Session multiplexing for the HTTP transport
//!
//! Every client that initializes over HTTP gets its own [`Session`]: a fresh
//! registry from the factory, its own protocol handler and its own
//! notification channel. The [`SessionManager`] is the only owner of the
//! id-to-session map.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RegistryError;
use crate::protocol::{IncomingPayload, McpMessage, OutgoingPayload, RequestHandler};
use crate::registry::RegistryFactory;

/// One client connection over HTTP
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    /// Shared by every in-flight request of this session
    handler: RequestHandler,
    notifications: broadcast::Sender<McpMessage>,
    closed: watch::Sender<bool>,
}

impl Session {
    fn new(id: String, handler: RequestHandler, notifications: broadcast::Sender<McpMessage>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id,
            created_at: Utc::now(),
            handler,
            notifications,
            closed,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Run a payload through this session's handler
    pub async fn handle(&self, payload: IncomingPayload) -> Option<OutgoingPayload> {
        self.handler.handle_payload(payload).await
    }

    pub fn is_initialized(&self) -> bool {
        self.handler.is_initialized()
    }

    /// Notification receiver plus a signal that flips when the session closes
    pub fn subscribe(&self) -> (broadcast::Receiver<McpMessage>, watch::Receiver<bool>) {
        (self.notifications.subscribe(), self.closed.subscribe())
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Outcome of an initialization attempt
#[derive(Debug)]
pub struct Initialization {
    /// The registered session, absent when `initialize` itself failed
    pub session: Option<Arc<Session>>,
    pub reply: Option<OutgoingPayload>,
}

/// Owner of all live HTTP sessions
pub struct SessionManager {
    factory: RegistryFactory,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(factory: RegistryFactory) -> Self {
        Self {
            factory,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a live session
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Create a session for an `initialize` payload
    ///
    /// The payload runs against a freshly built registry first; the session
    /// is registered under a new id only if initialization succeeded.
    pub async fn initialize(&self, payload: IncomingPayload) -> Result<Initialization, RegistryError> {
        let registry = (self.factory)()?;
        let handler = RequestHandler::new(registry);
        let notifications = handler.notifier();

        let reply = handler.handle_payload(payload).await;
        if !handler.is_initialized() {
            debug!("Initialization failed, no session created");
            return Ok(Initialization { session: None, reply });
        }

        let session = {
            let mut sessions = self.sessions.write().await;
            let mut id = Uuid::new_v4().to_string();
            while sessions.contains_key(&id) {
                id = Uuid::new_v4().to_string();
            }
            let session = Arc::new(Session::new(id.clone(), handler, notifications));
            sessions.insert(id, session.clone());
            session
        };

        info!("New session established: {}", session.id());
        Ok(Initialization {
            session: Some(session),
            reply,
        })
    }

    /// Close and forget a session; closing an unknown id is a no-op
    pub async fn close(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                session.close();
                info!("Session closed: {}", id);
                true
            }
            None => false,
        }
    }

    /// Close every live session, returning how many were closed
    pub async fn close_all(&self) -> usize {
        let drained: Vec<Arc<Session>> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.close();
        }
        if !drained.is_empty() {
            info!("Closed {} sessions", drained.len());
        }
        drained.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ToolCallResult;
    use crate::registry::{Arguments, Registry, ToolDescriptor, ToolResult};
    use futures::future::join_all;
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    async fn ping_tool(_args: Arguments) -> ToolResult {
        Ok(ToolCallResult::text("pong"))
    }

    async fn slow_tool(_args: Arguments) -> ToolResult {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(ToolCallResult::text("done"))
    }

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(|| {
            Ok::<_, RegistryError>(
                Registry::builder("test", "1.0.0")
                    .tool(ToolDescriptor::new("ping", ping_tool))?
                    .tool(ToolDescriptor::new("slow", slow_tool))?
                    .build(),
            )
        }))
    }

    fn initialize_payload() -> IncomingPayload {
        IncomingPayload::Single(McpMessage::request(
            1,
            "initialize",
            Some(json!({
                "protocolVersion": "2025-06-18",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "1.0.0"}
            })),
        ))
    }

    #[tokio::test]
    async fn test_initialize_registers_session() {
        let manager = manager();
        let init = manager.initialize(initialize_payload()).await.unwrap();

        let session = init.session.unwrap();
        assert!(init.reply.is_some());
        assert!(session.is_initialized());

        let found = manager.get(session.id()).await.unwrap();
        assert!(Arc::ptr_eq(&found, &session));
    }

    #[tokio::test]
    async fn test_failed_initialize_registers_nothing() {
        let manager = manager();
        let payload = IncomingPayload::Single(McpMessage::request(1, "initialize", None));

        let init = manager.initialize(payload).await.unwrap();
        assert!(init.session.is_none());
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_sessions_are_distinct() {
        let manager = manager();
        let a = manager.initialize(initialize_payload()).await.unwrap().session.unwrap();
        let b = manager.initialize(initialize_payload()).await.unwrap().session.unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(manager.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_initializations_get_distinct_sessions() {
        let manager = manager();
        let inits = join_all((0..16).map(|_| manager.initialize(initialize_payload()))).await;

        let ids: HashSet<String> = inits
            .into_iter()
            .map(|init| init.unwrap().session.unwrap().id().to_string())
            .collect();
        assert_eq!(ids.len(), 16);
        assert_eq!(manager.len().await, 16);
        for id in &ids {
            assert!(manager.get(id).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_slow_tool_does_not_block_other_requests() {
        let manager = manager();
        let session = manager.initialize(initialize_payload()).await.unwrap().session.unwrap();

        let slow = tokio::spawn({
            let session = session.clone();
            async move {
                session
                    .handle(IncomingPayload::Single(McpMessage::request(
                        2,
                        "tools/call",
                        Some(json!({"name": "slow", "arguments": {}})),
                    )))
                    .await
            }
        });
        // Let the slow call start before pinging
        tokio::time::sleep(Duration::from_millis(50)).await;

        let ping = tokio::time::timeout(
            Duration::from_millis(200),
            session.handle(IncomingPayload::Single(McpMessage::request(3, "ping", None))),
        )
        .await
        .expect("ping waited for the slow tool call");
        assert!(matches!(ping, Some(OutgoingPayload::Single(ref m)) if m.result.is_some()));

        match slow.await.unwrap() {
            Some(OutgoingPayload::Single(reply)) => {
                assert_eq!(reply.result.unwrap()["content"][0]["text"], "done")
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let manager = manager();
        let session = manager.initialize(initialize_payload()).await.unwrap().session.unwrap();
        let id = session.id().to_string();

        assert!(manager.close(&id).await);
        assert!(session.is_closed());
        assert!(manager.get(&id).await.is_none());
        assert!(!manager.close(&id).await);
    }

    #[tokio::test]
    async fn test_close_all() {
        let manager = manager();
        manager.initialize(initialize_payload()).await.unwrap();
        manager.initialize(initialize_payload()).await.unwrap();

        assert_eq!(manager.close_all().await, 2);
        assert!(manager.is_empty().await);
    }
}
