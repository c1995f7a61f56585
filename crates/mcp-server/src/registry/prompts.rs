//! Prompt registration and construction

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

use super::schema::{Arguments, CompiledSchema, InputSchema};
use crate::error::{RegistryError, ToolError};
use crate::protocol::{GetPromptResult, McpError, McpPrompt, PromptMessage};

/// Builds the message list for a prompt from validated arguments
pub type PromptBuilder = Arc<dyn Fn(&Arguments) -> Result<Vec<PromptMessage>, ToolError> + Send + Sync>;

/// A registered prompt
#[derive(Clone)]
pub struct PromptDescriptor {
    name: String,
    title: Option<String>,
    description: Option<String>,
    arguments: InputSchema,
    builder: PromptBuilder,
}

impl PromptDescriptor {
    pub fn new<F>(name: impl Into<String>, builder: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Vec<PromptMessage>, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            title: None,
            description: None,
            arguments: InputSchema::new(),
            builder: Arc::new(builder),
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

    pub fn with_arguments(mut self, arguments: InputSchema) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_mcp_prompt(&self) -> McpPrompt {
        McpPrompt {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            arguments: self.arguments.to_prompt_arguments(),
        }
    }
}

impl std::fmt::Debug for PromptDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct RegisteredPrompt {
    descriptor: PromptDescriptor,
    arguments: CompiledSchema,
}

/// Prompts keyed by name, in registration order
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    prompts: IndexMap<String, RegisteredPrompt>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, prompt: PromptDescriptor) -> Result<(), RegistryError> {
        if self.prompts.contains_key(&prompt.name) {
            return Err(RegistryError::DuplicatePrompt(prompt.name));
        }
        let arguments = prompt.arguments.clone().compile(&prompt.name)?;
        self.prompts.insert(
            prompt.name.clone(),
            RegisteredPrompt {
                descriptor: prompt,
                arguments,
            },
        );
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn list(&self) -> Vec<McpPrompt> {
        self.prompts
            .values()
            .map(|entry| entry.descriptor.to_mcp_prompt())
            .collect()
    }

    /// Validate arguments and build the prompt messages
    pub fn get(&self, name: &str, arguments: Option<Value>) -> Result<GetPromptResult, McpError> {
        let entry = self
            .prompts
            .get(name)
            .ok_or_else(|| McpError::invalid_params(format!("Prompt {} not found", name)))?;

        let args = entry
            .arguments
            .validate(arguments.as_ref())
            .map_err(|v| v.into_mcp_error(&format!("Invalid arguments for prompt {}", name)))?;

        let prompt = &entry.descriptor;
        let messages = (prompt.builder)(&args).map_err(|e| McpError::invalid_params(e.to_string()))?;

        Ok(GetPromptResult {
            description: prompt.description.clone(),
            messages,
        })
    }
}
