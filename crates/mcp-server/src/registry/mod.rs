//! Tool, resource and prompt registries
//!
//! A [`Registry`] is populated once through [`RegistryBuilder`] and is
//! read-only afterwards. HTTP sessions each get their own instance from a
//! [`RegistryFactory`].

mod prompts;
mod resources;
mod schema;
mod tools;
mod uri_template;

pub use prompts::{PromptBuilder, PromptDescriptor, PromptRegistry};
pub use resources::{ResourceDescriptor, ResourceHandler, ResourceLocation, ResourceRegistry, ResourceRequest};
pub use schema::{
    Arguments, CompiledSchema, FieldKind, FieldSpec, FieldViolation, InputSchema, SchemaViolations,
};
pub use tools::{ToolDescriptor, ToolHandler, ToolRegistry, ToolResult};
pub use uri_template::{TemplateVariables, UriTemplate};

use std::sync::Arc;

use crate::error::RegistryError;
use crate::protocol::{ServerCapabilities, ServerInfo};

/// Builds a fresh registry for each session
pub type RegistryFactory = Arc<dyn Fn() -> Result<Registry, RegistryError> + Send + Sync>;

/// Everything one server instance exposes
#[derive(Debug, Clone)]
pub struct Registry {
    info: ServerInfo,
    instructions: Option<String>,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
}

impl Registry {
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder {
            registry: Registry {
                info: ServerInfo {
                    name: name.into(),
                    version: version.into(),
                },
                instructions: None,
                tools: ToolRegistry::new(),
                resources: ResourceRegistry::new(),
                prompts: PromptRegistry::new(),
            },
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    /// Capabilities to advertise for this registry's contents
    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities::for_registry(
            !self.tools.is_empty(),
            !self.resources.is_empty(),
            !self.prompts.is_empty(),
        )
    }
}

/// Populates a [`Registry`] at startup
#[derive(Debug)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.registry.instructions = Some(instructions.into());
        self
    }

    pub fn tool(mut self, tool: ToolDescriptor) -> Result<Self, RegistryError> {
        self.registry.tools.register(tool)?;
        Ok(self)
    }

    pub fn resource(mut self, resource: ResourceDescriptor) -> Result<Self, RegistryError> {
        self.registry.resources.register(resource)?;
        Ok(self)
    }

    pub fn prompt(mut self, prompt: PromptDescriptor) -> Result<Self, RegistryError> {
        self.registry.prompts.register(prompt)?;
        Ok(self)
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ToolCallResult;

    async fn noop(_args: Arguments) -> ToolResult {
        Ok(ToolCallResult::text("ok"))
    }

    #[test]
    fn test_capabilities_follow_contents() {
        let registry = Registry::builder("test", "1.0.0")
            .tool(ToolDescriptor::new("noop", noop))
            .unwrap()
            .build();

        let caps = registry.capabilities();
        assert!(caps.tools.is_some());
        assert!(caps.resources.is_none());
        assert!(caps.prompts.is_none());
        assert!(caps.logging.is_some());
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let result = Registry::builder("test", "1.0.0")
            .tool(ToolDescriptor::new("noop", noop))
            .and_then(|b| b.tool(ToolDescriptor::new("noop", noop)));

        assert!(matches!(result, Err(RegistryError::DuplicateTool(name)) if name == "noop"));
    }
}
