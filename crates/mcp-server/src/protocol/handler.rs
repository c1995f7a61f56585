//! MCP request handler

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::payload::{IncomingPayload, OutgoingPayload};
use super::types::*;
use crate::registry::Registry;

/// Capacity of the server-to-client notification channel
pub const NOTIFICATION_BUFFER: usize = 64;

/// Protocol state negotiated with one client
#[derive(Debug, Default)]
struct ClientState {
    /// Whether `initialize` has completed
    initialized: bool,
    /// Negotiated protocol version
    protocol_version: Option<String>,
    /// Client identity from `initialize`
    client_info: Option<ClientInfo>,
    /// Minimum level for log notifications; `None` until the client asks
    log_level: Option<LoggingLevel>,
}

/// Handler for MCP requests
///
/// Owns one registry instance and the protocol state of a single client.
/// Requests are handled through `&self`, so several may be in flight at
/// once; the state lock is never held across an await point.
pub struct RequestHandler {
    /// Tools, resources and prompts served to this client
    registry: Registry,
    state: RwLock<ClientState>,
    /// Server-to-client notifications
    notifications: broadcast::Sender<McpMessage>,
}

impl RequestHandler {
    /// Create a new request handler
    pub fn new(registry: Registry) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            registry,
            state: RwLock::new(ClientState::default()),
            notifications,
        }
    }

    // Every update is a plain field store, so a poisoned lock still holds usable state
    fn state(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive server-to-client notifications emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<McpMessage> {
        self.notifications.subscribe()
    }

    /// Sender side of the notification channel, for transports that fan out
    pub fn notifier(&self) -> broadcast::Sender<McpMessage> {
        self.notifications.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    pub fn protocol_version(&self) -> Option<String> {
        self.state().protocol_version.clone()
    }

    pub fn client_info(&self) -> Option<ClientInfo> {
        self.state().client_info.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handle a single or batched payload
    ///
    /// Returns `None` when nothing in the payload expects a reply.
    pub async fn handle_payload(&self, payload: IncomingPayload) -> Option<OutgoingPayload> {
        match payload {
            IncomingPayload::Single(message) => self.handle(message).await.map(OutgoingPayload::Single),
            IncomingPayload::Batch(messages) => {
                let mut responses = Vec::with_capacity(messages.len());
                for message in messages {
                    if let Some(response) = self.handle(message).await {
                        responses.push(response);
                    }
                }
                (!responses.is_empty()).then_some(OutgoingPayload::Batch(responses))
            }
        }
    }

    /// Handle an incoming message
    pub async fn handle(&self, message: McpMessage) -> Option<McpMessage> {
        let McpMessage { id, method, params, .. } = message;

        match (method, id) {
            (Some(method), Some(id)) => {
                debug!("Handling request: {}", method);

                let result = match method.as_str() {
                    "initialize" => self.handle_initialize(params),
                    "ping" => Ok(json!({})),
                    "tools/list" => to_result(ToolsListResult {
                        tools: self.registry.tools().list(),
                    }),
                    "tools/call" => self.handle_tools_call(params).await,
                    "resources/list" => to_result(ResourcesListResult {
                        resources: self.registry.resources().list(),
                    }),
                    "resources/templates/list" => to_result(ResourceTemplatesListResult {
                        resource_templates: self.registry.resources().list_templates(),
                    }),
                    "resources/read" => self.handle_resources_read(params).await,
                    "prompts/list" => to_result(PromptsListResult {
                        prompts: self.registry.prompts().list(),
                    }),
                    "prompts/get" => self.handle_prompts_get(params),
                    "logging/setLevel" => self.handle_set_level(params),
                    _ => Err(McpError::method_not_found()),
                };

                Some(match result {
                    Ok(result) => McpMessage::response(id, result),
                    Err(error) => McpMessage::error_response(Some(id), error),
                })
            }
            (Some(method), None) => {
                match method.as_str() {
                    "notifications/initialized" | "initialized" => {
                        info!("Client initialized");
                    }
                    "notifications/cancelled" => {
                        debug!("Request cancelled");
                    }
                    _ => {
                        debug!("Unknown notification: {}", method);
                    }
                }
                None
            }
            (None, _) => {
                // Responses - we never send requests, so nothing is waiting on them
                debug!("Received unexpected response");
                None
            }
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = parse_params(params)?;

        info!(
            "Initializing session with client: {} v{}",
            params.client_info.name, params.client_info.version
        );

        let protocol_version = if is_supported_version(&params.protocol_version) {
            params.protocol_version
        } else {
            debug!(
                "Client requested unsupported protocol version {}, offering {}",
                params.protocol_version, LATEST_PROTOCOL_VERSION
            );
            LATEST_PROTOCOL_VERSION.to_string()
        };

        {
            let mut state = self.state_mut();
            state.initialized = true;
            state.protocol_version = Some(protocol_version.clone());
            state.client_info = Some(params.client_info);
        }

        to_result(InitializeResult {
            protocol_version,
            capabilities: self.registry.capabilities(),
            server_info: self.registry.info().clone(),
            instructions: self.registry.instructions().map(str::to_string),
        })
    }

    /// Handle tools/call request
    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ToolCallParams = parse_params(params)?;

        debug!("Calling tool: {}", params.name);

        let result = self
            .registry
            .tools()
            .call(&params.name, params.arguments)
            .await?;

        let level = if result.is_error() {
            LoggingLevel::Error
        } else {
            LoggingLevel::Info
        };
        self.log(level, json!({ "tool": params.name, "isError": result.is_error() }));

        to_result(result)
    }

    /// Handle resources/read request
    async fn handle_resources_read(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ResourceReadParams = parse_params(params)?;
        let result = self.registry.resources().read(&params.uri).await?;
        to_result(result)
    }

    /// Handle prompts/get request
    fn handle_prompts_get(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: GetPromptParams = parse_params(params)?;
        let result = self.registry.prompts().get(&params.name, params.arguments)?;
        to_result(result)
    }

    /// Handle logging/setLevel request
    fn handle_set_level(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: SetLevelParams = parse_params(params)?;
        debug!("Client log level set to {:?}", params.level);
        self.state_mut().log_level = Some(params.level);
        Ok(json!({}))
    }

    /// Emit a `notifications/message` if the client asked for this level
    fn log(&self, level: LoggingLevel, data: Value) {
        if !self.state().log_level.is_some_and(|min| level >= min) {
            return;
        }

        let params = LoggingMessageParams {
            level,
            logger: Some(self.registry.info().name.clone()),
            data,
        };
        if let Ok(params) = serde_json::to_value(params) {
            // No subscriber just means nobody is listening right now
            let _ = self
                .notifications
                .send(McpMessage::notification("notifications/message", Some(params)));
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, McpError> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::invalid_params(e.to_string()))?
        .ok_or_else(|| McpError::invalid_params("Missing params"))
}

fn to_result<T: Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::internal_error(e.to_string()))
}
