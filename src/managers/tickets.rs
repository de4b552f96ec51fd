use crate::errors::ToolError;
use crate::mcp::envelope::Envelope;
use crate::model::ticket::{sample_tickets, Ticket};
use crate::services::backend::{Backend, Endpoint};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::utils::args::parse_args;
use crate::utils::tool_errors::unknown_tool_error;
use serde::Deserialize;
use serde_json::Value;

pub const TOOLS: &[&str] = &["get_tickets_by_domain"];

#[derive(Debug, Deserialize)]
struct TicketsArgs {
    domain: String,
}

/// Legacy ticket listing; the only tool with a mock-data mode.
#[derive(Clone)]
pub struct TicketsManager {
    logger: Logger,
    backend: Backend,
    use_mock_data: bool,
}

impl TicketsManager {
    pub fn new(logger: Logger, backend: Backend, use_mock_data: bool) -> Self {
        Self {
            logger: logger.child("tickets"),
            backend: backend.child("tickets"),
            use_mock_data,
        }
    }

    pub async fn tickets_by_domain(&self, domain: &str) -> Envelope {
        if self.use_mock_data {
            self.logger.debug("serving mock tickets", None);
            return tickets_envelope(sample_tickets());
        }
        let envelope = self
            .backend
            .call(
                Endpoint::get("/api/tickets")
                    .query("domain", domain)
                    .payload("tickets"),
            )
            .await;
        if !envelope.success {
            return envelope;
        }
        let rows = match envelope.payload("tickets") {
            Some(Value::Array(rows)) => rows.clone(),
            _ => {
                return Envelope::failure("Invalid ticket data")
                    .with_message("Expected a list of tickets")
            }
        };
        match Ticket::from_rows(rows) {
            Ok(tickets) => tickets_envelope(tickets),
            Err(message) => Envelope::failure("Invalid ticket data").with_message(message),
        }
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        match tool {
            "get_tickets_by_domain" => {
                let args: TicketsArgs = parse_args(tool, args)?;
                Ok(self.tickets_by_domain(&args.domain).await)
            }
            _ => Err(unknown_tool_error(tool, TOOLS)),
        }
    }
}

fn tickets_envelope(tickets: Vec<Ticket>) -> Envelope {
    match serde_json::to_value(tickets) {
        Ok(value) => Envelope::success().with("tickets", value),
        Err(err) => Envelope::failure(err.to_string()),
    }
}

#[async_trait::async_trait]
impl ToolHandler for TicketsManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}
