use crate::errors::ToolError;
use crate::mcp::envelope::Envelope;
use crate::services::backend::{Backend, Endpoint};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::utils::tool_errors::unknown_tool_error;
use serde_json::Value;

pub const TOOLS: &[&str] = &[
    "test_weaviate_connection",
    "check_weaviate_schema",
    "create_weaviate_schema",
    "delete_weaviate_schema",
];

const PREFIX: &str = "/weaviate/test";

/// Vector-store administration. These endpoints answer in plain text, so the
/// responses are interpreted here rather than through the standard mapping.
#[derive(Clone)]
pub struct WeaviateManager {
    logger: Logger,
    backend: Backend,
}

impl WeaviateManager {
    pub fn new(logger: Logger, backend: Backend) -> Self {
        Self {
            logger: logger.child("weaviate"),
            backend: backend.child("weaviate"),
        }
    }

    fn path(suffix: &str) -> String {
        format!("{}/{}", PREFIX, suffix)
    }

    pub async fn test_connection(&self) -> Envelope {
        let endpoint = Endpoint::get(&Self::path("connection"));
        match self.backend.exchange(endpoint.request().clone()).await {
            Ok(exchange) => {
                let connected = exchange.status == 200;
                let message = if connected {
                    exchange.body_text
                } else {
                    format!("Failed with status {}", exchange.status)
                };
                let mut envelope = if connected {
                    Envelope::success()
                } else {
                    Envelope::failure(message.clone())
                };
                envelope.message = Some(message);
                envelope
                    .with("connected", connected)
                    .with("status_code", exchange.status)
            }
            Err(err) => Envelope::failure(err.to_string())
                .with_message(format!("Connection failed: {}", err))
                .with("connected", false),
        }
    }

    pub async fn check_schema(&self) -> Envelope {
        let endpoint = Endpoint::get(&Self::path("schema/exists"));
        match self.backend.exchange(endpoint.request().clone()).await {
            Ok(exchange) if exchange.status == 200 => {
                let exists = exchange.body_text.to_lowercase().contains("true");
                Envelope::success()
                    .with("schema_exists", exists)
                    .with("raw_response", exchange.body_text)
            }
            outcome => endpoint.interpret(outcome),
        }
    }

    pub async fn create_schema(&self) -> Envelope {
        let check = self.check_schema().await;
        let exists = check
            .payload("schema_exists")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if exists {
            self.logger.info("schema already present, skipping create", None);
            return Envelope::success()
                .with_message("Schema already exists")
                .with("status", "already_exists");
        }
        self.schema_change(Endpoint::post(&Self::path("schema/create")))
            .await
    }

    pub async fn delete_schema(&self) -> Envelope {
        self.schema_change(Endpoint::delete(&Self::path("schema/delete")))
            .await
    }

    async fn schema_change(&self, endpoint: Endpoint) -> Envelope {
        match self.backend.exchange(endpoint.request().clone()).await {
            Ok(exchange) if exchange.status == 200 => Envelope::success()
                .with_message(exchange.body_text)
                .with("status_code", 200),
            Ok(exchange) => Envelope::failure(format!("Failed with status {}", exchange.status))
                .with_message(exchange.body_text)
                .with("status_code", exchange.status),
            Err(err) => Envelope::failure(err.to_string()),
        }
    }

    pub async fn handle_tool(&self, tool: &str, _args: Value) -> Result<Envelope, ToolError> {
        match tool {
            "test_weaviate_connection" => Ok(self.test_connection().await),
            "check_weaviate_schema" => Ok(self.check_schema().await),
            "create_weaviate_schema" => Ok(self.create_schema().await),
            "delete_weaviate_schema" => Ok(self.delete_schema().await),
            _ => Err(unknown_tool_error(tool, TOOLS)),
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for WeaviateManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}
