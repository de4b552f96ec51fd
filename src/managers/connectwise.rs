use crate::errors::ToolError;
use crate::managers::DomainArgs;
use crate::mcp::envelope::Envelope;
use crate::services::backend::{Backend, Endpoint};
use crate::services::tool_executor::ToolHandler;
use crate::utils::args::parse_args;
use crate::utils::fields::Fields;
use crate::utils::tool_errors::unknown_tool_error;
use serde::Deserialize;
use serde_json::Value;

pub const TOOLS: &[&str] = &[
    "get_connectwise_boards",
    "get_connectwise_board_statuses",
    "get_connectwise_clients",
    "get_connectwise_contacts",
    "get_connectwise_members",
    "get_connectwise_departments",
    "get_connectwise_priorities",
    "get_connectwise_board_configuration",
    "create_connectwise_board",
    "add_connectwise_contact",
];

/// Tenant-scoped directory lookups: tool name, path, payload key.
const DIRECTORY: &[(&str, &str, &str)] = &[
    ("get_connectwise_boards", "/getConnectWiseBoards", "boards"),
    ("get_connectwise_clients", "/getConnectWiseClients", "clients"),
    ("get_connectwise_contacts", "/getConnectWiseContacts", "contacts"),
    ("get_connectwise_members", "/getConnectWiseMembers", "members"),
    ("get_connectwise_departments", "/getConnectWiseDepartments", "departments"),
    ("get_connectwise_priorities", "/getConnectWisePriorities", "priorities"),
];

#[derive(Debug, Deserialize)]
struct BoardStatusArgs {
    msp_custom_domain: String,
    board_id: i64,
}

#[derive(Debug, Deserialize)]
struct BoardConfigurationArgs {
    msp_custom_domain: String,
    board_id: i64,
    board_name: String,
}

#[derive(Debug, Deserialize)]
struct CreateBoardArgs {
    msp_custom_domain: String,
    board_name: String,
    #[serde(default = "default_board_type")]
    board_type: String,
}

fn default_board_type() -> String {
    "Service".to_string()
}

#[derive(Debug, Deserialize)]
pub struct NewContact {
    pub msp_custom_domain: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company_id: i64,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// ConnectWise boards, directory data and board setup.
#[derive(Clone)]
pub struct ConnectWiseManager {
    backend: Backend,
}

impl ConnectWiseManager {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend: backend.child("connectwise"),
        }
    }

    async fn directory(&self, path: &str, key: &str, msp_custom_domain: &str) -> Envelope {
        self.backend
            .call(
                Endpoint::get(path)
                    .query("mspCustomDomain", msp_custom_domain)
                    .payload(key),
            )
            .await
    }

    pub async fn boards(&self, msp_custom_domain: &str) -> Envelope {
        self.directory("/getConnectWiseBoards", "boards", msp_custom_domain)
            .await
    }

    pub async fn board_statuses(&self, msp_custom_domain: &str, board_id: i64) -> Envelope {
        self.backend
            .call(
                Endpoint::get("/getConnectWiseStatuses")
                    .query("boardId", board_id)
                    .query("mspCustomDomain", msp_custom_domain)
                    .payload("statuses"),
            )
            .await
    }

    pub async fn board_configuration(
        &self,
        msp_custom_domain: &str,
        board_id: i64,
        board_name: &str,
    ) -> Envelope {
        self.backend
            .call(
                Endpoint::get("/getMergedConnectWiseCategorizationWithoutImpactSeverity")
                    .query("mspCustomDomain", msp_custom_domain)
                    .query("boardId", board_id)
                    .query("boardName", board_name)
                    .payload("configuration"),
            )
            .await
    }

    pub async fn create_board(
        &self,
        msp_custom_domain: &str,
        board_name: &str,
        board_type: &str,
    ) -> Envelope {
        let body = Fields::new()
            .put("name", board_name)
            .put("type", board_type)
            .into_value();
        self.backend
            .call(
                Endpoint::post("/createConnectWiseBoard")
                    .query("mspCustomDomain", msp_custom_domain)
                    .json(body)
                    .payload("board"),
            )
            .await
    }

    pub async fn add_contact(&self, contact: &NewContact) -> Envelope {
        let body = Fields::new()
            .put("firstName", contact.first_name.as_str())
            .put("lastName", contact.last_name.as_str())
            .put("email", contact.email.as_str())
            .put("companyId", contact.company_id)
            .put_truthy("phoneNumber", &contact.phone_number)
            .put_truthy("title", &contact.title)
            .into_value();
        self.backend
            .call(
                Endpoint::post("/addConnectWiseContact")
                    .query("mspCustomDomain", &contact.msp_custom_domain)
                    .json(body)
                    .payload("contact"),
            )
            .await
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        if let Some((_, path, key)) = DIRECTORY.iter().find(|(name, _, _)| *name == tool) {
            let args: DomainArgs = parse_args(tool, args)?;
            return Ok(self.directory(path, key, &args.msp_custom_domain).await);
        }
        match tool {
            "get_connectwise_board_statuses" => {
                let args: BoardStatusArgs = parse_args(tool, args)?;
                Ok(self
                    .board_statuses(&args.msp_custom_domain, args.board_id)
                    .await)
            }
            "get_connectwise_board_configuration" => {
                let args: BoardConfigurationArgs = parse_args(tool, args)?;
                Ok(self
                    .board_configuration(&args.msp_custom_domain, args.board_id, &args.board_name)
                    .await)
            }
            "create_connectwise_board" => {
                let args: CreateBoardArgs = parse_args(tool, args)?;
                Ok(self
                    .create_board(&args.msp_custom_domain, &args.board_name, &args.board_type)
                    .await)
            }
            "add_connectwise_contact" => {
                let contact: NewContact = parse_args(tool, args)?;
                Ok(self.add_contact(&contact).await)
            }
            _ => Err(unknown_tool_error(tool, TOOLS)),
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for ConnectWiseManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}
