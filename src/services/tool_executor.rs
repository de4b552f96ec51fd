use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ToolError;
use crate::mcp::envelope::Envelope;
use crate::services::logger::Logger;
use crate::utils::tool_errors::unknown_tool_error;

use serde_json::Value;

/// A group of tools served by one manager. `tool` is the registered name the
/// caller used, so one handler can serve several tools.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError>;
}

#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolExecutor {
    pub fn new(logger: Logger, handlers: HashMap<String, Arc<dyn ToolHandler>>) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers: Arc::new(handlers),
        }
    }

    pub fn has_handler(&self, tool: &str) -> bool {
        self.handlers.contains_key(tool)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn execute(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        let Some(handler) = self.handlers.get(tool) else {
            return Err(unknown_tool_error(tool, self.tool_names().as_slice()));
        };
        let invocation_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        self.logger.debug(
            "tool call",
            Some(&serde_json::json!({ "tool": tool, "invocation_id": invocation_id })),
        );

        let result = handler.handle(tool, args).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(envelope) => self.logger.info(
                "tool finished",
                Some(&serde_json::json!({
                    "tool": tool,
                    "invocation_id": invocation_id,
                    "success": envelope.success,
                    "error": envelope.error,
                    "duration_ms": duration_ms,
                })),
            ),
            Err(err) => self.logger.warn(
                "tool rejected",
                Some(&serde_json::json!({
                    "tool": tool,
                    "invocation_id": invocation_id,
                    "kind": err.kind,
                    "message": err.message,
                    "duration_ms": duration_ms,
                })),
            ),
        }
        result
    }
}
