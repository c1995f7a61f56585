//! Tool registration and dispatch

use async_trait::async_trait;
use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::schema::{Arguments, CompiledSchema, InputSchema};
use crate::error::{RegistryError, ToolError};
use crate::protocol::{McpError, McpTool, ToolCallResult};

/// What a tool handler returns; `Err` becomes an error-flagged result
pub type ToolResult = Result<ToolCallResult, ToolError>;

/// Async tool implementation
///
/// Any `Fn(Arguments) -> impl Future<Output = ToolResult>` is a handler.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Arguments) -> ToolResult;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    async fn call(&self, args: Arguments) -> ToolResult {
        (self)(args).await
    }
}

/// A registered tool
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    title: Option<String>,
    description: Option<String>,
    schema: InputSchema,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        Self::with_handler(name, Arc::new(handler))
    }

    /// Register a handler implemented as a type rather than a closure
    pub fn with_handler(name: impl Into<String>, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            schema: InputSchema::new(),
            handler,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protocol view of this tool
    pub fn to_mcp_tool(&self) -> McpTool {
        McpTool {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// A tool plus the validator compiled from its schema
#[derive(Debug, Clone)]
struct RegisteredTool {
    descriptor: ToolDescriptor,
    schema: CompiledSchema,
}

/// Tools keyed by name, in registration order
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, compiling its input schema
    pub fn register(&mut self, tool: ToolDescriptor) -> Result<(), RegistryError> {
        if self.tools.contains_key(&tool.name) {
            return Err(RegistryError::DuplicateTool(tool.name));
        }
        let schema = tool.schema.clone().compile(&tool.name)?;
        self.tools.insert(
            tool.name.clone(),
            RegisteredTool {
                descriptor: tool,
                schema,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name).map(|entry| &entry.descriptor)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn list(&self) -> Vec<McpTool> {
        self.tools
            .values()
            .map(|entry| entry.descriptor.to_mcp_tool())
            .collect()
    }

    /// Validate arguments and invoke a tool
    ///
    /// Unknown tools and schema violations are protocol errors. Anything the
    /// handler does, including panicking, comes back as a tool result.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> Result<ToolCallResult, McpError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| McpError::invalid_params(format!("Tool {} not found", name)))?;

        let args = entry
            .schema
            .validate(arguments.as_ref())
            .map_err(|v| v.into_mcp_error(&format!("Invalid arguments for tool {}", name)))?;

        debug!("Invoking tool: {}", name);

        match AssertUnwindSafe(entry.descriptor.handler.call(args)).catch_unwind().await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", name, e);
                Ok(ToolCallResult::error(e.to_string()))
            }
            Err(_) => {
                error!("Tool {} panicked", name);
                Ok(ToolCallResult::error(format!("Internal error in tool {}", name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::schema::FieldSpec;
    use serde_json::json;

    fn echo_tool() -> ToolDescriptor {
        ToolDescriptor::new("echo", |args: Arguments| async move {
            let text = args.string("text")?;
            if text.is_empty() {
                return Err(ToolError::failed("Nothing to echo"));
            }
            Ok::<_, ToolError>(ToolCallResult::text(text.to_string()))
        })
        .with_title("Echo")
        .with_schema(InputSchema::new().field("text", FieldSpec::string("Text to echo")))
    }

    async fn boom(_args: Arguments) -> ToolResult {
        panic!("handler bug")
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool()).unwrap();
        registry.register(ToolDescriptor::new("boom", boom)).unwrap();
        registry
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry();
        assert_eq!(
            registry.register(echo_tool()),
            Err(RegistryError::DuplicateTool("echo".to_string()))
        );
        assert_eq!(registry.names(), vec!["echo", "boom"]);
    }

    #[tokio::test]
    async fn test_call_success() {
        let result = registry()
            .call("echo", Some(json!({"text": "hello"})))
            .await
            .unwrap();
        assert!(!result.is_error());
        assert_eq!(result.text_content(), "hello");
    }

    #[tokio::test]
    async fn test_handler_error_is_contained() {
        let result = registry()
            .call("echo", Some(json!({"text": ""})))
            .await
            .unwrap();
        assert!(result.is_error());
        assert_eq!(result.text_content(), "Nothing to echo");
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let result = registry().call("boom", None).await.unwrap();
        assert!(result.is_error());
        assert_eq!(result.text_content(), "Internal error in tool boom");
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments() {
        let registry = registry();

        let error = registry.call("missing", None).await.unwrap_err();
        assert_eq!(error.code, McpError::INVALID_PARAMS);

        let error = registry.call("echo", Some(json!({"text": 5}))).await.unwrap_err();
        assert_eq!(error.code, McpError::INVALID_PARAMS);
        assert_eq!(error.data.unwrap()["violations"][0]["field"], "text");
    }
}
