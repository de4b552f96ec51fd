use crate::errors::{ErrorCode, McpError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message }),
        }
    }

    pub fn from_error(id: Value, error: McpError) -> Self {
        Self::failure(id, error.code.as_i32(), error.message)
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Decodes one stdio line. A line that is not JSON, or is JSON but not a
/// request, comes back as the error response to write instead.
pub fn parse_line(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let parsed: Value = serde_json::from_str(line).map_err(|_| {
        JsonRpcResponse::failure(
            Value::Null,
            ErrorCode::ParseError.as_i32(),
            "Parse error".to_string(),
        )
    })?;
    let id = parsed.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(parsed).map_err(|_| {
        JsonRpcResponse::failure(
            id,
            ErrorCode::InvalidRequest.as_i32(),
            "Invalid request".to_string(),
        )
    })
}
