use crate::errors::ToolError;
use crate::managers::connectwise::ConnectWiseManager;
use crate::managers::DomainArgs;
use crate::mcp::envelope::Envelope;
use crate::model::BoardSyncRequest;
use crate::services::backend::{Backend, Endpoint};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::utils::args::parse_args;
use crate::utils::fields::{truthy, Truthy};
use crate::utils::tool_errors::unknown_tool_error;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const TOOLS: &[&str] = &[
    "sync_connectwise_clients_contacts",
    "sync_connectwise_board_tickets",
    "sync_multiple_connectwise_boards",
    "sync_all_connectwise_data",
];

#[derive(Debug, Deserialize)]
struct BoardTicketsArgs {
    msp_custom_domain: String,
    board_id: i64,
    board_name: String,
    #[serde(default)]
    sync_from_date: Option<String>,
    #[serde(default)]
    sync_statuses: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct BoardConfig {
    board_id: i64,
    board_name: String,
    #[serde(default)]
    sync_from_date: Option<String>,
    #[serde(default)]
    sync_statuses: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct MultipleBoardsArgs {
    msp_custom_domain: String,
    board_configs: Vec<BoardConfig>,
}

/// Long-running ConnectWise synchronization, including the full-tenant
/// composite that discovers boards first.
#[derive(Clone)]
pub struct ConnectWiseSyncManager {
    logger: Logger,
    backend: Backend,
    connectwise: Arc<ConnectWiseManager>,
}

impl ConnectWiseSyncManager {
    pub fn new(logger: Logger, backend: Backend, connectwise: Arc<ConnectWiseManager>) -> Self {
        Self {
            logger: logger.child("connectwise_sync"),
            backend: backend.child("connectwise_sync"),
            connectwise,
        }
    }

    pub async fn sync_clients_contacts(&self, msp_custom_domain: &str) -> Envelope {
        self.backend
            .call(
                Endpoint::get("/syncClientsContacts")
                    .query("mspCustomDomain", msp_custom_domain)
                    .sync_operation()
                    .payload_with_message("sync_result", "Clients and contacts synced successfully"),
            )
            .await
    }

    pub async fn sync_boards(&self, msp_custom_domain: &str, boards: &[BoardSyncRequest]) -> Envelope {
        let body = match serde_json::to_value(boards) {
            Ok(body) => body,
            Err(err) => return Envelope::failure(err.to_string()),
        };
        let envelope = self
            .backend
            .call(
                Endpoint::post("/syncBoardTickets")
                    .query("mspCustomDomain", msp_custom_domain)
                    .json(body)
                    .sync_operation()
                    .fixed_message("Board tickets sync initiated successfully"),
            )
            .await;
        if envelope.success {
            envelope.with("boards_synced", boards.len())
        } else {
            envelope
        }
    }

    /// Clients and contacts first, then every board the tenant has. Both
    /// halves run even if the first fails.
    pub async fn sync_all(&self, msp_custom_domain: &str) -> Envelope {
        let mut overall_success = true;
        let mut errors: Vec<String> = Vec::new();

        let clients = self.sync_clients_contacts(msp_custom_domain).await;
        if !clients.success {
            overall_success = false;
            errors.push("Failed to sync clients and contacts".to_string());
        }

        let mut boards_sync = Value::Null;
        let boards = self.connectwise.boards(msp_custom_domain).await;
        match boards.payload("boards").filter(|rows| rows.is_truthy()) {
            Some(Value::Array(rows)) => {
                let requests = self.board_requests(rows);
                if requests.is_empty() {
                    overall_success = false;
                    errors.push("No syncable boards found".to_string());
                } else {
                    let result = self.sync_boards(msp_custom_domain, &requests).await;
                    if !result.success {
                        overall_success = false;
                        errors.push("Failed to sync some boards".to_string());
                    }
                    boards_sync = result.into_value();
                }
            }
            _ => {
                overall_success = false;
                errors.push("Could not retrieve boards for sync".to_string());
            }
        }

        let mut envelope = Envelope::aggregate(overall_success);
        envelope.insert("clients_contacts_sync", clients.into_value());
        envelope.insert("boards_sync", boards_sync);
        envelope.insert("overall_success", overall_success);
        envelope.insert("errors", errors);
        envelope
    }

    fn board_requests(&self, rows: &[Value]) -> Vec<BoardSyncRequest> {
        rows.iter()
            .filter_map(|row| {
                let id = row.get("id").and_then(Value::as_i64);
                let name = row.get("name").and_then(Value::as_str);
                match (id, name) {
                    (Some(id), Some(name)) => Some(BoardSyncRequest::new(id, name)),
                    _ => {
                        self.logger.warn(
                            "skipping board without id or name",
                            Some(&serde_json::json!({ "board": row })),
                        );
                        None
                    }
                }
            })
            .collect()
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        match tool {
            "sync_connectwise_clients_contacts" => {
                let args: DomainArgs = parse_args(tool, args)?;
                Ok(self.sync_clients_contacts(&args.msp_custom_domain).await)
            }
            "sync_connectwise_board_tickets" => {
                let args: BoardTicketsArgs = parse_args(tool, args)?;
                let mut request = BoardSyncRequest::new(args.board_id, args.board_name);
                request.sync_from_date = truthy(&args.sync_from_date).cloned();
                request.sync_status = truthy(&args.sync_statuses).cloned();
                Ok(self
                    .sync_boards(&args.msp_custom_domain, &[request])
                    .await)
            }
            "sync_multiple_connectwise_boards" => {
                let args: MultipleBoardsArgs = parse_args(tool, args)?;
                let requests: Vec<BoardSyncRequest> = args
                    .board_configs
                    .into_iter()
                    .map(|config| BoardSyncRequest {
                        board_id: config.board_id,
                        board_name: config.board_name,
                        sync_from_date: config.sync_from_date,
                        sync_status: config.sync_statuses,
                    })
                    .collect();
                Ok(self.sync_boards(&args.msp_custom_domain, &requests).await)
            }
            "sync_all_connectwise_data" => {
                let args: DomainArgs = parse_args(tool, args)?;
                Ok(self.sync_all(&args.msp_custom_domain).await)
            }
            _ => Err(unknown_tool_error(tool, TOOLS)),
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for ConnectWiseSyncManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}
