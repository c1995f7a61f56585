//! Declared input schemas and argument validation
//!
//! Tools and prompts declare their inputs as an ordered set of named fields.
//! The declaration renders to a JSON Schema document which is compiled once
//! at registration. Incoming arguments get their defaults filled in, are
//! checked against the compiled schema before a handler ever runs, and lose
//! any undeclared fields.

use indexmap::IndexMap;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema, ValidationError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::{RegistryError, ToolError};
use crate::protocol::{McpError, McpInputSchema, McpPromptArgument};

/// Type of a declared field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Number,
    String,
    Boolean,
    /// String restricted to a fixed set of values
    Enum(Vec<String>),
}

impl FieldKind {
    fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Number => "number",
            FieldKind::String | FieldKind::Enum(_) => "string",
            FieldKind::Boolean => "boolean",
        }
    }
}

/// Declaration of a single input field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    kind: FieldKind,
    description: Option<String>,
    default: Option<Value>,
    optional: bool,
}

impl FieldSpec {
    fn new(kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: Some(description.into()),
            default: None,
            optional: false,
        }
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(FieldKind::Number, description)
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(FieldKind::String, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(FieldKind::Boolean, description)
    }

    pub fn one_of(values: &[&str], description: impl Into<String>) -> Self {
        Self::new(
            FieldKind::Enum(values.iter().map(|v| v.to_string()).collect()),
            description,
        )
    }

    /// Field may be omitted and has no default
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the field is omitted
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!(self.kind.type_name()));
        if let FieldKind::Enum(values) = &self.kind {
            schema.insert("enum".to_string(), json!(values));
        }
        if let Some(description) = &self.description {
            schema.insert("description".to_string(), json!(description));
        }
        if let Some(default) = &self.default {
            schema.insert("default".to_string(), default.clone());
        }
        Value::Object(schema)
    }
}

/// Ordered set of declared input fields
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    fields: IndexMap<String, FieldSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// JSON Schema advertised by `tools/list`
    pub fn to_json_schema(&self) -> McpInputSchema {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, spec)| (name.clone(), spec.json_schema()))
            .collect();

        let required: Vec<String> = self
            .fields
            .iter()
            .filter(|(_, spec)| spec.is_required())
            .map(|(name, _)| name.clone())
            .collect();

        McpInputSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required),
        }
    }

    /// Full JSON Schema document for the declared fields
    pub fn to_value(&self) -> Value {
        let schema = self.to_json_schema();
        let mut document = Map::new();
        document.insert("type".to_string(), json!(schema.schema_type));
        if let Some(properties) = schema.properties {
            document.insert("properties".to_string(), Value::Object(properties));
        }
        if let Some(required) = schema.required {
            document.insert("required".to_string(), json!(required));
        }
        Value::Object(document)
    }

    /// Compile the declaration for validation; `owner` names the tool or prompt
    pub fn compile(self, owner: &str) -> Result<CompiledSchema, RegistryError> {
        let document = self.to_value();
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&document)
            .map_err(|e| RegistryError::InvalidSchema {
                owner: owner.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CompiledSchema {
            declaration: self,
            validator: Arc::new(validator),
        })
    }

    /// Argument descriptors advertised by `prompts/list`
    pub fn to_prompt_arguments(&self) -> Vec<McpPromptArgument> {
        self.fields
            .iter()
            .map(|(name, spec)| McpPromptArgument {
                name: name.clone(),
                description: spec.description.clone(),
                required: spec.is_required(),
            })
            .collect()
    }
}

/// A declaration together with its compiled validator
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    declaration: InputSchema,
    validator: Arc<JSONSchema>,
}

impl CompiledSchema {
    pub fn declaration(&self) -> &InputSchema {
        &self.declaration
    }

    /// Validate raw arguments, filling defaults
    ///
    /// A `null` field counts as omitted. Every offending field is reported,
    /// in declaration order.
    pub fn validate(&self, arguments: Option<&Value>) -> Result<Arguments, SchemaViolations> {
        let mut instance = match arguments {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value) => value.clone(),
        };

        if let Value::Object(provided) = &mut instance {
            provided.retain(|_, value| !value.is_null());
            for (name, spec) in &self.declaration.fields {
                if let Some(default) = &spec.default {
                    provided.entry(name.clone()).or_insert_with(|| default.clone());
                }
            }
        }

        if let Err(errors) = self.validator.validate(&instance) {
            let mut violations: Vec<FieldViolation> =
                errors.map(|e| FieldViolation::from_error(&e)).collect();
            violations.sort_by_key(|v| {
                self.declaration
                    .fields
                    .get_index_of(&v.field)
                    .unwrap_or(usize::MAX)
            });
            return Err(SchemaViolations(violations));
        }

        let Value::Object(mut provided) = instance else {
            // The compiled schema only accepts objects
            return Ok(Arguments::default());
        };
        let values = self
            .declaration
            .fields
            .keys()
            .filter_map(|name| provided.remove(name).map(|value| (name.clone(), value)))
            .collect();
        Ok(Arguments { values })
    }
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    fn from_error(error: &ValidationError<'_>) -> Self {
        if let ValidationErrorKind::Required { property } = &error.kind {
            return Self {
                field: property
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| property.to_string()),
                reason: "Required".to_string(),
            };
        }

        let path = error.instance_path.to_string();
        let field = path.trim_start_matches('/');
        Self {
            field: if field.is_empty() { "(arguments)" } else { field }.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Every field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolations(pub Vec<FieldViolation>);

impl SchemaViolations {
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.field.as_str()).collect()
    }

    /// Convert into a JSON-RPC invalid params error listing the violations
    pub fn into_mcp_error(self, context: &str) -> McpError {
        let message = format!("{}: {}", context, self);
        McpError::invalid_params(message).with_data(json!({ "violations": self.0 }))
    }
}

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|v| format!("{}: {}", v.field, v.reason))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Validated arguments handed to tool handlers and prompt builders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Result<f64, ToolError> {
        self.opt_number(name)?
            .ok_or_else(|| ToolError::invalid_argument(name, "missing"))
    }

    pub fn opt_number(&self, name: &str) -> Result<Option<f64>, ToolError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| ToolError::invalid_argument(name, "expected a number")),
        }
    }

    pub fn string(&self, name: &str) -> Result<&str, ToolError> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid_argument(name, "expected a string"))
    }

    pub fn boolean(&self, name: &str) -> Result<bool, ToolError> {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| ToolError::invalid_argument(name, "expected a boolean"))
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc_schema() -> InputSchema {
        InputSchema::new()
            .field(
                "operation",
                FieldSpec::one_of(&["add", "sqrt"], "Operation"),
            )
            .field("a", FieldSpec::number("First number"))
            .field("b", FieldSpec::number("Second number").optional())
            .field("exact", FieldSpec::boolean("Exact mode").with_default(false))
    }

    fn compiled() -> CompiledSchema {
        calc_schema().compile("calculate").unwrap()
    }

    #[test]
    fn test_validate_fills_defaults_and_drops_unknown() {
        let args = compiled()
            .validate(Some(&json!({"operation": "add", "a": 1, "extra": true})))
            .unwrap();

        assert_eq!(args.number("a").unwrap(), 1.0);
        assert_eq!(args.opt_number("b").unwrap(), None);
        assert!(!args.boolean("exact").unwrap());
        assert!(args.get("extra").is_none());
    }

    #[test]
    fn test_null_counts_as_omitted() {
        let args = compiled()
            .validate(Some(&json!({"operation": "sqrt", "a": 9, "b": null, "exact": null})))
            .unwrap();

        assert_eq!(args.opt_number("b").unwrap(), None);
        assert!(!args.boolean("exact").unwrap());
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let violations = compiled()
            .validate(Some(&json!({"operation": "cube", "b": "two", "exact": 1})))
            .unwrap_err();

        assert_eq!(violations.fields(), vec!["operation", "a", "b", "exact"]);
        assert!(violations.0[0].reason.contains("cube"));
        assert_eq!(violations.0[1].reason, "Required");
        assert!(violations.0[2].reason.contains("two"));
        assert!(violations.0[2].reason.contains("number"));
        assert!(violations.0[3].reason.contains("boolean"));
    }

    #[test]
    fn test_validate_rejects_non_object() {
        let violations = compiled().validate(Some(&json!([1, 2]))).unwrap_err();
        assert_eq!(violations.fields(), vec!["(arguments)"]);
    }

    #[test]
    fn test_json_schema_lists_required_fields() {
        let schema = calc_schema().to_json_schema();
        let properties = schema.properties.unwrap();

        assert_eq!(schema.required.unwrap(), vec!["operation", "a"]);
        assert_eq!(properties["operation"]["enum"], json!(["add", "sqrt"]));
        assert_eq!(properties["exact"]["default"], json!(false));
    }

    #[test]
    fn test_document_matches_advertised_schema() {
        let document = calc_schema().to_value();

        assert_eq!(document["type"], "object");
        assert_eq!(document["required"], json!(["operation", "a"]));
        assert_eq!(document["properties"]["a"]["type"], "number");
        assert_eq!(InputSchema::new().to_value(), json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn test_violations_into_mcp_error() {
        let error = compiled()
            .validate(None)
            .unwrap_err()
            .into_mcp_error("Invalid arguments for tool calculate");

        assert_eq!(error.code, McpError::INVALID_PARAMS);
        let data = error.data.unwrap();
        assert_eq!(data["violations"][0]["field"], "operation");
    }
}
