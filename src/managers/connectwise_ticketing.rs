use crate::constants::limits::SUMMARY_FALLBACK_CHARS;
use crate::errors::ToolError;
use crate::mcp::envelope::Envelope;
use crate::services::backend::{Backend, Endpoint};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::utils::args::{default_true, parse_args};
use crate::utils::fields::{Fields, Truthy};
use crate::utils::text::char_prefix;
use crate::utils::tool_errors::unknown_tool_error;
use serde::Deserialize;
use serde_json::Value;

pub const TOOLS: &[&str] = &[
    "analyze_ticket_request",
    "get_ticket_board_categorization",
    "get_ticket_diagnostic_questions",
    "create_connectwise_ticket",
    "update_connectwise_ticket",
    "get_connectwise_ticket",
    "get_connectwise_ticket_notes",
    "add_note_to_connectwise_ticket",
    "complete_connectwise_ticket",
    "create_smart_ticket",
];

/// AI-backed analysis endpoints share one request shape: tool, path,
/// payload key.
const ANALYSIS: &[(&str, &str, &str)] = &[
    ("analyze_ticket_request", "/getTicketCategorization", "categorization"),
    (
        "get_ticket_board_categorization",
        "/getTicketBoardCategorization",
        "board_categorization",
    ),
    (
        "get_ticket_diagnostic_questions",
        "/getTicketBoardCategorizationDiagnosticQandA",
        "diagnostic_qa",
    ),
];

/// Categorization fields copied from the AI suggestion onto a new ticket
/// when the suggestion sets them.
const SUGGESTED_FIELDS: &[&str] = &["categoryId", "subcategoryId", "priorityId", "statusId"];

#[derive(Debug, Deserialize)]
struct AnalysisArgs {
    msp_custom_domain: String,
    user_id: String,
    user_message: String,
}

#[derive(Debug, Deserialize)]
pub struct NewBoardTicket {
    pub msp_custom_domain: String,
    pub board_id: i64,
    pub summary: String,
    pub description: String,
    pub company_id: i64,
    #[serde(default)]
    pub contact_id: Option<i64>,
    #[serde(default)]
    pub priority_id: Option<i64>,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub subcategory_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateTicketArgs {
    msp_custom_domain: String,
    ticket_id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority_id: Option<i64>,
    #[serde(default)]
    status_id: Option<i64>,
    #[serde(default)]
    category_id: Option<i64>,
    #[serde(default)]
    subcategory_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TicketArgs {
    msp_custom_domain: String,
    ticket_id: String,
}

#[derive(Debug, Deserialize)]
struct TicketNotesArgs {
    msp_custom_domain: String,
    ticket_id: String,
    #[serde(default = "default_true")]
    detailed: bool,
}

#[derive(Debug, Deserialize)]
struct AddNoteArgs {
    msp_custom_domain: String,
    ticket_id: i64,
    note_text: String,
    #[serde(default = "default_note_type")]
    note_type: String,
    #[serde(default)]
    is_internal: bool,
    #[serde(default)]
    is_resolution: bool,
}

fn default_note_type() -> String {
    "general".to_string()
}

#[derive(Debug, Deserialize)]
struct CompleteTicketArgs {
    msp_custom_domain: String,
    ticket_id: String,
    board_id: i64,
    technician_id: String,
    #[serde(default)]
    completion_notes: Option<String>,
    #[serde(default)]
    final_status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SmartTicketArgs {
    pub msp_custom_domain: String,
    pub user_id: String,
    pub issue_description: String,
    pub company_id: i64,
    #[serde(default)]
    pub contact_id: Option<i64>,
}

/// Note flags as the backend expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteFlags {
    pub detail_description: bool,
    pub internal_analysis: bool,
    pub resolution: bool,
}

impl NoteFlags {
    pub fn from_note_type(note_type: &str, is_internal: bool, is_resolution: bool) -> Self {
        Self {
            detail_description: note_type == "detail",
            internal_analysis: note_type == "analysis" || is_internal,
            resolution: is_resolution,
        }
    }
}

#[derive(Clone)]
pub struct ConnectWiseTicketingManager {
    logger: Logger,
    backend: Backend,
}

impl ConnectWiseTicketingManager {
    pub fn new(logger: Logger, backend: Backend) -> Self {
        Self {
            logger: logger.child("connectwise_ticketing"),
            backend: backend.child("connectwise_ticketing"),
        }
    }

    async fn analyze(
        &self,
        path: &str,
        payload_key: &str,
        msp_custom_domain: &str,
        user_id: &str,
        user_message: &str,
    ) -> Envelope {
        let body = Fields::new()
            .put("mspCustomDomain", msp_custom_domain)
            .put("userId", user_id)
            .put("userMessage", user_message)
            .into_value();
        self.backend
            .call(Endpoint::post(path).json(body).payload(payload_key))
            .await
    }

    pub async fn board_categorization(
        &self,
        msp_custom_domain: &str,
        user_id: &str,
        user_message: &str,
    ) -> Envelope {
        self.analyze(
            "/getTicketBoardCategorization",
            "board_categorization",
            msp_custom_domain,
            user_id,
            user_message,
        )
        .await
    }

    pub async fn create_board_ticket(
        &self,
        msp_custom_domain: &str,
        details: Value,
        user_id: &Option<String>,
    ) -> Envelope {
        self.backend
            .call(
                Endpoint::post("/createBoardTicket")
                    .query("mspCustomDomain", msp_custom_domain)
                    .query_truthy("userId", user_id)
                    .json(details)
                    .payload("ticket"),
            )
            .await
    }

    pub async fn create_ticket(&self, ticket: &NewBoardTicket) -> Envelope {
        let details = Fields::new()
            .put("boardId", ticket.board_id)
            .put("summary", ticket.summary.as_str())
            .put("description", ticket.description.as_str())
            .put("companyId", ticket.company_id)
            .put_truthy("contactId", &ticket.contact_id)
            .put_truthy("priorityId", &ticket.priority_id)
            .put_truthy("statusId", &ticket.status_id)
            .put_truthy("categoryId", &ticket.category_id)
            .put_truthy("subcategoryId", &ticket.subcategory_id)
            .into_value();
        self.create_board_ticket(&ticket.msp_custom_domain, details, &ticket.user_id)
            .await
    }

    async fn update_ticket(&self, args: &UpdateTicketArgs) -> Envelope {
        let details = Fields::new()
            .put_truthy("summary", &args.summary)
            .put_truthy("description", &args.description)
            .put_truthy("priorityId", &args.priority_id)
            .put_truthy("statusId", &args.status_id)
            .put_truthy("categoryId", &args.category_id)
            .put_truthy("subcategoryId", &args.subcategory_id)
            .into_value();
        self.backend
            .call(
                Endpoint::put("/updateTicket")
                    .segment(&args.ticket_id)
                    .query("mspCustomDomain", &args.msp_custom_domain)
                    .json(details)
                    .payload("updated_ticket"),
            )
            .await
    }

    async fn ticket(&self, msp_custom_domain: &str, ticket_id: &str) -> Envelope {
        self.backend
            .call(
                Endpoint::get("/getTicketsById")
                    .query("mspCustomDomain", msp_custom_domain)
                    .query("ticketId", ticket_id)
                    .payload("ticket"),
            )
            .await
    }

    async fn ticket_notes(&self, msp_custom_domain: &str, ticket_id: &str, detailed: bool) -> Envelope {
        let path = if detailed {
            "/getConnectWiseTicketNotesById"
        } else {
            "/getTicketNotesById"
        };
        self.backend
            .call(
                Endpoint::get(path)
                    .query("mspCustomDomain", msp_custom_domain)
                    .query("ticketId", ticket_id)
                    .payload("notes"),
            )
            .await
    }

    async fn add_note(&self, args: &AddNoteArgs) -> Envelope {
        let flags = NoteFlags::from_note_type(&args.note_type, args.is_internal, args.is_resolution);
        let body = Fields::new()
            .put("info", format!("Note added via MCP - Type: {}", args.note_type))
            .put("text", args.note_text.as_str())
            .into_value();
        self.backend
            .call(
                Endpoint::post("/addNoteToTicketObject")
                    .query("mspCustomDomain", &args.msp_custom_domain)
                    .query("ticketId", args.ticket_id)
                    .query("detailDescriptionFlag", flags.detail_description)
                    .query("internalAnalysisFlag", flags.internal_analysis)
                    .query("resolutionFlag", flags.resolution)
                    .json(body)
                    .payload("note"),
            )
            .await
    }

    async fn complete_ticket(&self, args: &CompleteTicketArgs) -> Envelope {
        self.backend
            .call(
                Endpoint::post("/completeTicketForQueueAndConnectwise")
                    .query("mspCustomDomain", &args.msp_custom_domain)
                    .query("ticketId", &args.ticket_id)
                    .query("boardId", args.board_id)
                    .query("techId", &args.technician_id)
                    .query_truthy("notes", &args.completion_notes)
                    .query_truthy("status", &args.final_status)
                    .fixed_message("Ticket completed successfully"),
            )
            .await
    }

    /// Board categorization, then ticket creation seeded from it. A failed
    /// categorization is returned as is and no ticket is created.
    pub async fn create_smart_ticket(&self, args: &SmartTicketArgs) -> Envelope {
        let categorization = self
            .board_categorization(&args.msp_custom_domain, &args.user_id, &args.issue_description)
            .await;
        if !categorization.success {
            self.logger.info(
                "smart ticket stopped at categorization",
                Some(&serde_json::json!({ "error": categorization.error })),
            );
            return categorization;
        }
        let suggestion = categorization
            .payload("board_categorization")
            .cloned()
            .unwrap_or(Value::Null);
        let details = smart_ticket_details(
            &suggestion,
            &args.issue_description,
            args.company_id,
            args.contact_id,
        );
        self.create_board_ticket(&args.msp_custom_domain, details, &Some(args.user_id.clone()))
            .await
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        if let Some((_, path, key)) = ANALYSIS.iter().find(|(name, _, _)| *name == tool) {
            let args: AnalysisArgs = parse_args(tool, args)?;
            return Ok(self
                .analyze(path, key, &args.msp_custom_domain, &args.user_id, &args.user_message)
                .await);
        }
        match tool {
            "create_connectwise_ticket" => {
                let ticket: NewBoardTicket = parse_args(tool, args)?;
                Ok(self.create_ticket(&ticket).await)
            }
            "update_connectwise_ticket" => {
                let args: UpdateTicketArgs = parse_args(tool, args)?;
                Ok(self.update_ticket(&args).await)
            }
            "get_connectwise_ticket" => {
                let args: TicketArgs = parse_args(tool, args)?;
                Ok(self.ticket(&args.msp_custom_domain, &args.ticket_id).await)
            }
            "get_connectwise_ticket_notes" => {
                let args: TicketNotesArgs = parse_args(tool, args)?;
                Ok(self
                    .ticket_notes(&args.msp_custom_domain, &args.ticket_id, args.detailed)
                    .await)
            }
            "add_note_to_connectwise_ticket" => {
                let args: AddNoteArgs = parse_args(tool, args)?;
                Ok(self.add_note(&args).await)
            }
            "complete_connectwise_ticket" => {
                let args: CompleteTicketArgs = parse_args(tool, args)?;
                Ok(self.complete_ticket(&args).await)
            }
            "create_smart_ticket" => {
                let args: SmartTicketArgs = parse_args(tool, args)?;
                Ok(self.create_smart_ticket(&args).await)
            }
            _ => Err(unknown_tool_error(tool, TOOLS)),
        }
    }
}

fn smart_ticket_details(
    suggestion: &Value,
    issue_description: &str,
    company_id: i64,
    contact_id: Option<i64>,
) -> Value {
    let summary = suggestion
        .get("summary")
        .cloned()
        .unwrap_or_else(|| Value::String(char_prefix(issue_description, SUMMARY_FALLBACK_CHARS)));
    let mut details = Fields::new()
        .put("boardId", suggestion.get("boardId").cloned().unwrap_or(Value::Null))
        .put("summary", summary)
        .put("description", issue_description)
        .put("companyId", company_id)
        .put_truthy("contactId", &contact_id);
    for field in SUGGESTED_FIELDS {
        if let Some(value) = suggestion.get(*field).filter(|v| v.is_truthy()) {
            details = details.put(field, value.clone());
        }
    }
    details.into_value()
}

#[async_trait::async_trait]
impl ToolHandler for ConnectWiseTicketingManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}
