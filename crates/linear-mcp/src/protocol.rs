//! Wire types for MCP over JSON-RPC 2.0.
//!
//! Requests carry an `id` and get exactly one response; notifications have
//! no `id` and are never answered. Only the tools capability is offered.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision announced in `initialize`.
pub const MCP_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "linear-mcp-server";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Request identifier. Echoed back unchanged; `Null` is used when the
/// request could not be read far enough to find its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    fn with_code(code: i32, message: String) -> Self {
        Self {
            code,
            message,
            data: None,
        }
    }

    pub fn parse_error(detail: &str) -> Self {
        Self::with_code(Self::PARSE_ERROR, format!("Parse error: {}", detail))
    }

    pub fn invalid_request(detail: &str) -> Self {
        Self::with_code(
            Self::INVALID_REQUEST,
            format!("Invalid request: {}", detail),
        )
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::with_code(
            Self::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(detail: &str) -> Self {
        Self::with_code(Self::INVALID_PARAMS, format!("Invalid params: {}", detail))
    }

    pub fn internal_error(detail: &str) -> Self {
        Self::with_code(Self::INTERNAL_ERROR, format!("Internal error: {}", detail))
    }
}

impl JsonRpcResponse {
    fn new(id: RequestId, result: Option<Value>, error: Option<JsonRpcError>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
            error,
        }
    }

    pub fn success(id: RequestId, result: Value) -> Self {
        Self::new(id, Some(result), None)
    }

    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self::new(id, None, Some(error))
    }

    /// Serialize `result` into a success response, or report an internal error.
    pub fn from_result<T: Serialize>(id: RequestId, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self::success(id, value),
            Err(e) => Self::error(id, JsonRpcError::internal_error(&e.to_string())),
        }
    }
}

/// A frame accepted from a client.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Parse one framed message.
    ///
    /// A message with an `id` member is a request, otherwise a notification.
    /// Text that is not JSON is a [`FrameError::Parse`]; JSON that is not a
    /// JSON-RPC 2.0 message is a [`FrameError::InvalidRequest`].
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FrameError::Parse(e.to_string()))?;

        let obj = value
            .as_object()
            .ok_or_else(|| FrameError::InvalidRequest("message is not a JSON object".into()))?;

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(FrameError::InvalidRequest(
                "jsonrpc must be \"2.0\"".into(),
            ));
        }

        if obj.contains_key("id") {
            serde_json::from_value(value)
                .map(IncomingMessage::Request)
                .map_err(|e| FrameError::InvalidRequest(format!("bad request: {}", e)))
        } else {
            serde_json::from_value(value)
                .map(IncomingMessage::Notification)
                .map_err(|e| FrameError::InvalidRequest(format!("bad notification: {}", e)))
        }
    }
}

// ============================================================================
// Lifecycle and tools
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Server capabilities. Only tools are offered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default)]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// One advertised tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    /// Documented result shape; not sent in tools/list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<ToolDefinition>,
}

/// `tools/call` params. A missing `arguments` member is distinct from `{}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Envelope returned for every tool invocation, success or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ToolResultContent>,
    pub is_error: bool,
}

/// A content block. Only text is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolResultContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolCallResult {
    pub fn text(content: String) -> Self {
        Self {
            content: vec![ToolResultContent::Text { text: content }],
            is_error: false,
        }
    }

    /// Create an error result; the text reads `Error: <message>`.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: vec![ToolResultContent::Text {
                text: format!("Error: {}", message),
            }],
            is_error: true,
        }
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            ToolResultContent::Text { text } => text.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response_has_no_result_member() {
        let resp = JsonRpcResponse::error(
            RequestId::Number(7),
            JsonRpcError::method_not_found("resources/list"),
        );

        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "error": {"code": -32601, "message": "Method not found: resources/list"}
            })
        );
    }

    #[test]
    fn test_success_response_has_no_error_member() {
        let resp = JsonRpcResponse::success(RequestId::String("x".into()), json!({}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["id"], "x");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_tool_call_result_always_carries_is_error() {
        let json = serde_json::to_value(ToolCallResult::text("Hello".to_string())).unwrap();
        assert_eq!(
            json,
            json!({"content": [{"type": "text", "text": "Hello"}], "isError": false})
        );
    }

    #[test]
    fn test_error_envelope_text() {
        let result = ToolCallResult::error("Issue not found");
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some("Error: Issue not found"));
    }

    #[test]
    fn test_request_id_is_echoed_verbatim() {
        for raw in ["42", "\"abc\"", "null"] {
            let id: RequestId = serde_json::from_str(raw).unwrap();
            assert_eq!(serde_json::to_string(&id).unwrap(), raw);
        }
    }

    #[test]
    fn test_parse_request() {
        let msg = IncomingMessage::parse(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#).unwrap();
        match msg {
            IncomingMessage::Request(req) => {
                assert_eq!(req.id, RequestId::String("a".into()));
                assert_eq!(req.method, "ping");
            }
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_null_id_is_request() {
        let msg = IncomingMessage::parse(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        assert!(matches!(msg, IncomingMessage::Request(_)));
    }

    #[test]
    fn test_parse_notification() {
        let msg =
            IncomingMessage::parse(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        match msg {
            IncomingMessage::Notification(n) => assert_eq!(n.method, "notifications/initialized"),
            other => panic!("Expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_frames() {
        assert!(matches!(
            IncomingMessage::parse("{not json"),
            Err(FrameError::Parse(_))
        ));
        for frame in [
            "[1,2]",
            r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#,
            r#"{"jsonrpc":"2.0","id":1}"#,
        ] {
            assert!(
                matches!(IncomingMessage::parse(frame), Err(FrameError::InvalidRequest(_))),
                "{} should be an invalid request",
                frame
            );
        }
    }

    #[test]
    fn test_tool_definition_omits_missing_output_schema() {
        let def = ToolDefinition {
            name: "linear_getViewer".into(),
            description: "d".into(),
            input_schema: json!({"type": "object"}),
            output_schema: None,
        };
        let json = serde_json::to_value(def).unwrap();
        assert!(json.get("inputSchema").is_some());
        assert!(json.get("outputSchema").is_none());
    }
}
