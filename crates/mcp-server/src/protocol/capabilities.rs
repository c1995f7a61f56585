//! Server capabilities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server capabilities advertised during initialization
///
/// Registries are fixed once built, so nothing ever reports `listChanged`
/// or resource subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListCapability>,
    /// Always an empty object when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<Map<String, Value>>,
}

impl ServerCapabilities {
    /// Advertise each family only when something is registered in it
    pub fn for_registry(has_tools: bool, has_resources: bool, has_prompts: bool) -> Self {
        Self {
            tools: has_tools.then(ListCapability::default),
            resources: has_resources.then(ResourcesCapability::default),
            prompts: has_prompts.then(ListCapability::default),
            logging: Some(Map::new()),
        }
    }
}

/// Capability of a listable family (tools, prompts)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCapability {
    pub list_changed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesCapability {
    pub subscribe: bool,
    pub list_changed: bool,
}
