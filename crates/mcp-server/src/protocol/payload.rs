//! Single and batched JSON-RPC payloads

use serde::Serialize;
use serde_json::Value;

use super::types::{McpError, McpMessage, JSONRPC_VERSION};

/// What a client sent in one HTTP body or one stdio line
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingPayload {
    Single(McpMessage),
    Batch(Vec<McpMessage>),
}

impl IncomingPayload {
    /// Parse raw bytes; malformed JSON is a parse error
    pub fn parse(body: &[u8]) -> Result<Self, McpError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| McpError::parse_error())?;
        Self::from_value(value)
    }

    /// Interpret already-parsed JSON
    pub fn from_value(value: Value) -> Result<Self, McpError> {
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(McpError::invalid_request("Invalid Request: empty batch"));
                }
                items
                    .into_iter()
                    .map(parse_message)
                    .collect::<Result<Vec<_>, _>>()
                    .map(IncomingPayload::Batch)
            }
            other => parse_message(other).map(IncomingPayload::Single),
        }
    }

    pub fn messages(&self) -> &[McpMessage] {
        match self {
            IncomingPayload::Single(message) => std::slice::from_ref(message),
            IncomingPayload::Batch(messages) => messages,
        }
    }

    /// Whether any message expects a response
    pub fn has_requests(&self) -> bool {
        self.messages().iter().any(McpMessage::is_request)
    }

    /// Whether an `initialize` request is present anywhere in the payload
    pub fn contains_initialize(&self) -> bool {
        self.messages().iter().any(McpMessage::is_initialize_request)
    }

    /// Whether the payload is exactly one `initialize` request
    pub fn is_initialize(&self) -> bool {
        matches!(self, IncomingPayload::Single(m) if m.is_initialize_request())
    }
}

fn parse_message(value: Value) -> Result<McpMessage, McpError> {
    let message: McpMessage = serde_json::from_value(value)
        .map_err(|e| McpError::invalid_request(format!("Invalid Request: {}", e)))?;

    if message.jsonrpc != JSONRPC_VERSION {
        return Err(McpError::invalid_request(
            "Invalid Request: jsonrpc must be \"2.0\"",
        ));
    }
    if message.method.is_none() && !message.is_response() {
        return Err(McpError::invalid_request(
            "Invalid Request: message has neither method nor result",
        ));
    }

    Ok(message)
}

/// Reply mirroring the shape of the incoming payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutgoingPayload {
    Single(McpMessage),
    Batch(Vec<McpMessage>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_and_batch() {
        let single = IncomingPayload::parse(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        assert!(single.has_requests());
        assert!(!single.is_initialize());

        let batch = IncomingPayload::from_value(json!([
            {"jsonrpc": "2.0", "method": "notifications/initialized"},
            {"jsonrpc": "2.0", "id": 2, "method": "tools/list"}
        ]))
        .unwrap();
        assert_eq!(batch.messages().len(), 2);
        assert!(batch.has_requests());
    }

    #[test]
    fn test_parse_errors() {
        let error = IncomingPayload::parse(b"{not json").unwrap_err();
        assert_eq!(error.code, McpError::PARSE_ERROR);

        let error = IncomingPayload::from_value(json!([])).unwrap_err();
        assert_eq!(error.code, McpError::INVALID_REQUEST);

        let error = IncomingPayload::from_value(json!({"jsonrpc": "1.0", "method": "ping"})).unwrap_err();
        assert_eq!(error.code, McpError::INVALID_REQUEST);

        let error = IncomingPayload::from_value(json!({"jsonrpc": "2.0", "id": 3})).unwrap_err();
        assert_eq!(error.code, McpError::INVALID_REQUEST);
    }

    #[test]
    fn test_initialize_detection() {
        let init = IncomingPayload::from_value(json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}
        }))
        .unwrap();
        assert!(init.is_initialize());
        assert!(init.contains_initialize());
    }

    #[test]
    fn test_outgoing_shape() {
        let single = OutgoingPayload::Single(McpMessage::response(json!(1), json!({})));
        assert!(serde_json::to_value(&single).unwrap().is_object());

        let batch = OutgoingPayload::Batch(vec![McpMessage::response(json!(1), json!({}))]);
        assert!(serde_json::to_value(&batch).unwrap().is_array());
    }
}
