//! Resource registration and URI resolution

use async_trait::async_trait;
use indexmap::IndexMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::uri_template::{TemplateVariables, UriTemplate};
use crate::error::RegistryError;
use crate::protocol::{McpError, McpResource, McpResourceTemplate, ReadResourceResult, ResourceContents};

/// A resolved read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// URI exactly as the client sent it
    pub uri: String,
    /// Placeholder values; empty for static resources
    pub variables: TemplateVariables,
}

impl ResourceRequest {
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

/// Async content producer
///
/// Producers report their own failures inside the returned contents.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, request: ResourceRequest) -> Vec<ResourceContents>;
}

#[async_trait]
impl<F, Fut> ResourceHandler for F
where
    F: Fn(ResourceRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Vec<ResourceContents>> + Send + 'static,
{
    async fn read(&self, request: ResourceRequest) -> Vec<ResourceContents> {
        (self)(request).await
    }
}

/// Where a resource lives
#[derive(Debug, Clone)]
pub enum ResourceLocation {
    Fixed(String),
    Template(UriTemplate),
}

/// A registered resource
#[derive(Clone)]
pub struct ResourceDescriptor {
    name: String,
    location: ResourceLocation,
    title: Option<String>,
    description: Option<String>,
    mime_type: Option<String>,
    handler: Arc<dyn ResourceHandler>,
}

impl ResourceDescriptor {
    /// Resource served at one exact URI
    pub fn fixed<F, Fut>(name: impl Into<String>, uri: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ResourceRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<ResourceContents>> + Send + 'static,
    {
        Self::new(name.into(), ResourceLocation::Fixed(uri.into()), Arc::new(handler))
    }

    /// Resource family served under a URI template
    pub fn template<F, Fut>(
        name: impl Into<String>,
        template: &str,
        handler: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(ResourceRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<ResourceContents>> + Send + 'static,
    {
        let template = UriTemplate::parse(template)?;
        Ok(Self::new(
            name.into(),
            ResourceLocation::Template(template),
            Arc::new(handler),
        ))
    }

    fn new(name: String, location: ResourceLocation, handler: Arc<dyn ResourceHandler>) -> Self {
        Self {
            name,
            location,
            title: None,
            description: None,
            mime_type: None,
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

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &ResourceLocation {
        &self.location
    }

    async fn produce(&self, request: ResourceRequest) -> Vec<ResourceContents> {
        let mut contents = self.handler.read(request).await;
        if let Some(mime_type) = &self.mime_type {
            for block in contents.iter_mut().filter(|c| c.mime_type.is_none()) {
                block.mime_type = Some(mime_type.clone());
            }
        }
        contents
    }
}

impl std::fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Resources keyed by name, in registration order
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: IndexMap<String, ResourceDescriptor>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource: ResourceDescriptor) -> Result<(), RegistryError> {
        if self.resources.contains_key(&resource.name) {
            return Err(RegistryError::DuplicateResource(resource.name));
        }
        self.resources.insert(resource.name.clone(), resource);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Fixed resources for `resources/list`
    pub fn list(&self) -> Vec<McpResource> {
        self.resources
            .values()
            .filter_map(|r| match &r.location {
                ResourceLocation::Fixed(uri) => Some(McpResource {
                    uri: uri.clone(),
                    name: r.name.clone(),
                    title: r.title.clone(),
                    description: r.description.clone(),
                    mime_type: r.mime_type.clone(),
                }),
                ResourceLocation::Template(_) => None,
            })
            .collect()
    }

    /// Templates for `resources/templates/list`
    pub fn list_templates(&self) -> Vec<McpResourceTemplate> {
        self.resources
            .values()
            .filter_map(|r| match &r.location {
                ResourceLocation::Template(template) => Some(McpResourceTemplate {
                    uri_template: template.as_str().to_string(),
                    name: r.name.clone(),
                    title: r.title.clone(),
                    description: r.description.clone(),
                    mime_type: r.mime_type.clone(),
                }),
                ResourceLocation::Fixed(_) => None,
            })
            .collect()
    }

    /// Find the resource serving a URI
    ///
    /// Exact URIs win over templates; templates are tried in registration order.
    pub fn resolve(&self, uri: &str) -> Option<(&ResourceDescriptor, TemplateVariables)> {
        let fixed = self.resources.values().find(|r| {
            matches!(&r.location, ResourceLocation::Fixed(fixed) if fixed == uri)
        });
        if let Some(resource) = fixed {
            return Some((resource, TemplateVariables::new()));
        }

        self.resources.values().find_map(|r| match &r.location {
            ResourceLocation::Template(template) => template.match_uri(uri).map(|vars| (r, vars)),
            ResourceLocation::Fixed(_) => None,
        })
    }

    /// Read a resource by URI
    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let (resource, variables) = self
            .resolve(uri)
            .ok_or_else(|| McpError::invalid_params(format!("Resource {} not found", uri)))?;

        debug!("Reading resource {} via {}", uri, resource.name);

        let contents = resource
            .produce(ResourceRequest {
                uri: uri.to_string(),
                variables,
            })
            .await;

        Ok(ReadResourceResult { contents })
    }
}
