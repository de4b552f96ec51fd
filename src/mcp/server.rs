use crate::app::App;
use crate::errors::{ErrorCode, McpError, ToolError, ToolErrorKind};
use crate::mcp::catalog::{tool_catalog, validate_tool_args};
use crate::mcp::protocol::{parse_line, JsonRpcRequest, JsonRpcResponse};
use crate::services::settings::Settings;
use crate::utils::tool_errors::unknown_tool_error;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

pub const PROTOCOL_VERSION: &str = "2025-06-18";
pub const SERVER_NAME: &str = "psa-gateway";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn map_tool_error(tool: &str, error: &ToolError) -> McpError {
    let mut lines = vec![
        format!("tool: {}", tool),
        format!("code: {}", error.code),
        format!("message: {}", error.message),
    ];
    if let Some(hint) = &error.hint {
        lines.push(format!("hint: {}", hint));
    }
    let message = lines.join("\n");

    match error.kind {
        ToolErrorKind::InvalidParams | ToolErrorKind::NotFound => {
            McpError::new(ErrorCode::InvalidParams, message)
        }
        ToolErrorKind::Config | ToolErrorKind::Internal => {
            McpError::new(ErrorCode::InternalError, message)
        }
    }
}

pub struct McpServer {
    app: Arc<App>,
}

impl McpServer {
    pub fn new(settings: Settings) -> Result<Self, ToolError> {
        let app = App::initialize(settings)?;
        Ok(Self::from_app(app))
    }

    pub fn from_app(app: App) -> Self {
        Self { app: Arc::new(app) }
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        })
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": tool_catalog() })
    }

    /// Runs one tool. Everything the tool itself reports, failures included,
    /// is an envelope in the text content; only a call that never reached a
    /// tool is an error.
    async fn handle_tools_call(&self, params: &Value) -> Result<Value, McpError> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        if name.is_empty() {
            return Err(McpError::invalid_params("Missing tool name"));
        }
        let args = match params.get("arguments") {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(args) => args.clone(),
        };
        if !args.is_object() {
            return Err(McpError::invalid_params(format!(
                "Invalid arguments for {}: expected an object",
                name
            )));
        }
        if !self.app.tool_executor.has_handler(name) {
            let known = self.app.tool_executor.tool_names();
            return Err(map_tool_error(name, &unknown_tool_error(name, known.as_slice())));
        }

        validate_tool_args(name, &args)?;

        let envelope = self
            .app
            .tool_executor
            .execute(name, args)
            .await
            .map_err(|err| map_tool_error(name, &err))?;
        let text = serde_json::to_string(&envelope).unwrap_or_else(|_| "{}".to_string());
        Ok(serde_json::json!({
            "content": [ { "type": "text", "text": text } ]
        }))
    }

    /// Answer for one request, or `None` when nothing must be written back
    /// (notifications).
    ///
    /// Any request without an `id` is a JSON-RPC notification, so a
    /// `tools/call` sent that way is neither executed nor answered.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.method.starts_with("notifications/") && request.is_notification() {
            return None;
        }
        let id = request.id.clone()?;
        let response = match request.method.as_str() {
            "notifications/initialized" => JsonRpcResponse::success(id, serde_json::json!({})),
            "initialize" => JsonRpcResponse::success(id, self.handle_initialize()),
            "tools/list" => JsonRpcResponse::success(id, self.handle_tools_list()),
            "tools/call" => match self.handle_tools_call(&request.params).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(err) => JsonRpcResponse::from_error(id, err),
            },
            _ => JsonRpcResponse::failure(
                id,
                ErrorCode::MethodNotFound.as_i32(),
                "Method not found".to_string(),
            ),
        };
        Some(response)
    }

    /// Serves newline-delimited JSON-RPC until `input` is exhausted.
    pub async fn serve<R, W>(&self, input: R, output: W) -> Result<(), ToolError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(input).lines();
        let mut writer = BufWriter::new(output);

        while let Some(line) = reader.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let response = match parse_line(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(rejected) => {
                    self.app
                        .logger
                        .warn("unreadable request line", Some(&serde_json::json!({ "line": trimmed })));
                    Some(rejected)
                }
            };
            if let Some(response) = response {
                writer.write_all(response.to_line().as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }
}

pub async fn run_stdio(settings: Settings) -> Result<(), ToolError> {
    let server = McpServer::new(settings)?;
    server.run_stdio().await
}
