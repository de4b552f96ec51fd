use crate::constants::limits::SUMMARY_FALLBACK_CHARS;
use crate::constants::messages::NOT_FOUND;
use crate::errors::ToolError;
use crate::mcp::envelope::Envelope;
use crate::services::backend::{Backend, Detail, Endpoint};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::utils::args::parse_args;
use crate::utils::fields::{Fields, Truthy};
use crate::utils::text::char_prefix;
use crate::utils::tool_errors::unknown_tool_error;
use serde::Deserialize;
use serde_json::{json, Value};

pub const TOOLS: &[&str] = &[
    "get_psa_ticket_diagnostic",
    "create_psa_ticket",
    "add_psa_ticket_note",
    "get_psa_ticket_notes",
    "close_psa_ticket",
    "get_psa_ticket_status",
    "create_psa_ticket_with_ai",
];

/// Categorization fields the diagnostic may suggest for a new ticket.
const SUGGESTED_FIELDS: &[&str] = &["priorityId", "categoryId", "subcategoryId"];

const DEFAULT_BOARD_ID: i64 = 1;

/// Who is asking: an end user, or a technician acting for a company.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Requester {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tech_id: Option<String>,
    #[serde(default)]
    pub psa_company_id: Option<i64>,
}

impl Requester {
    /// Diagnostics need a user or a technician.
    pub fn check_identity(&self) -> Result<(), Envelope> {
        if !self.user_id.is_truthy() && !self.tech_id.is_truthy() {
            return Err(Envelope::validation_error(
                "Either user_id or tech_id must be provided",
            ));
        }
        Ok(())
    }

    /// Without a user, the ticket is filed by a technician for a company.
    pub fn check_ticket_owner(&self) -> Result<(), Envelope> {
        if !self.user_id.is_truthy()
            && (!self.tech_id.is_truthy() || !self.psa_company_id.is_truthy())
        {
            return Err(Envelope::validation_error(
                "If userId is null, techId and psaCompanyId are mandatory",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DiagnosticArgs {
    msp_custom_domain: String,
    user_message: String,
    #[serde(flatten)]
    requester: Requester,
}

#[derive(Debug, Deserialize)]
pub struct NewPsaTicket {
    pub msp_custom_domain: String,
    pub psa_type: String,
    pub summary: String,
    pub description: String,
    pub board_id: i64,
    #[serde(flatten)]
    pub requester: Requester,
    #[serde(default)]
    pub priority_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub subcategory_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AddNoteArgs {
    msp_custom_domain: String,
    ticket_id: String,
    note_text: String,
    #[serde(default)]
    is_internal: bool,
    #[serde(default)]
    is_resolution: bool,
}

#[derive(Debug, Deserialize)]
struct NotesArgs {
    msp_custom_domain: String,
    ticket_id: String,
    #[serde(default)]
    detailed: bool,
}

#[derive(Debug, Deserialize)]
struct CloseArgs {
    msp_custom_domain: String,
    ticket_id: String,
    #[serde(default)]
    board_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StatusArgs {
    msp_custom_domain: String,
    ticket_id: String,
}

#[derive(Debug, Deserialize)]
struct AiTicketArgs {
    msp_custom_domain: String,
    psa_type: String,
    issue_description: String,
    #[serde(flatten)]
    requester: Requester,
}

/// Ticket lifecycle on whichever PSA the tenant has configured.
#[derive(Clone)]
pub struct PsaTicketingManager {
    logger: Logger,
    backend: Backend,
}

impl PsaTicketingManager {
    pub fn new(logger: Logger, backend: Backend) -> Self {
        Self {
            logger: logger.child("psa_ticketing"),
            backend: backend.child("psa_ticketing"),
        }
    }

    async fn diagnostic(
        &self,
        msp_custom_domain: &str,
        user_message: &str,
        requester: &Requester,
    ) -> Envelope {
        let body = Fields::new()
            .put("mspCustomDomain", msp_custom_domain)
            .put("userMessage", user_message)
            .put_truthy("userId", &requester.user_id)
            .put_truthy("techId", &requester.tech_id)
            .into_value();
        self.backend
            .call(
                Endpoint::post("/getTicketCategorizationDiagnosticQandA")
                    .json(body)
                    .payload("diagnostic_qa")
                    .bad_request(Detail::Fixed(
                        "Either userId or techId must be provided".to_string(),
                    )),
            )
            .await
    }

    pub async fn ticket_diagnostic(
        &self,
        msp_custom_domain: &str,
        user_message: &str,
        requester: &Requester,
    ) -> Envelope {
        if let Err(rejected) = requester.check_identity() {
            return rejected;
        }
        self.diagnostic(msp_custom_domain, user_message, requester)
            .await
    }

    async fn submit_ticket(&self, msp_custom_domain: &str, ticket: Value) -> Envelope {
        self.backend
            .call(
                Endpoint::post("/createTicket")
                    .query("mspCustomDomain", msp_custom_domain)
                    .json(ticket)
                    .payload("ticket")
                    .bad_request(Detail::Backend),
            )
            .await
    }

    pub async fn create_ticket(&self, ticket: &NewPsaTicket) -> Envelope {
        if let Err(rejected) = ticket.requester.check_ticket_owner() {
            return rejected;
        }
        let requester = &ticket.requester;
        let body = Fields::new()
            .put("psaType", ticket.psa_type.as_str())
            .put("summary", ticket.summary.as_str())
            .put("description", ticket.description.as_str())
            .put("boardId", ticket.board_id)
            .put_truthy("userId", &requester.user_id)
            .put_truthy("techId", &requester.tech_id)
            .put_truthy("psaCompanyId", &requester.psa_company_id)
            .put_truthy("priorityId", &ticket.priority_id)
            .put_truthy("categoryId", &ticket.category_id)
            .put_truthy("subcategoryId", &ticket.subcategory_id)
            .into_value();
        self.submit_ticket(&ticket.msp_custom_domain, body).await
    }

    async fn add_note(&self, args: &AddNoteArgs) -> Envelope {
        let body = Fields::new()
            .put("note", args.note_text.as_str())
            .put("isInternal", args.is_internal)
            .put("isResolution", args.is_resolution)
            .into_value();
        self.backend
            .call(
                Endpoint::post("/addNotesToTicket")
                    .query("mspCustomDomain", &args.msp_custom_domain)
                    .query("ticketId", &args.ticket_id)
                    .json(body)
                    .payload("result")
                    .bad_request(Detail::Backend),
            )
            .await
    }

    async fn notes(&self, msp_custom_domain: &str, ticket_id: &str, detailed: bool) -> Envelope {
        self.backend
            .call(
                Endpoint::get("/getTicketNotes")
                    .query("mspCustomDomain", msp_custom_domain)
                    .query("ticketId", ticket_id)
                    .query("isdetailed", detailed)
                    .payload("notes")
                    .not_found(NOT_FOUND, Detail::Fixed("Ticket or notes not found".to_string())),
            )
            .await
    }

    /// `board_id` is forwarded whenever supplied; some PSAs need it to close.
    pub async fn close_ticket(
        &self,
        msp_custom_domain: &str,
        ticket_id: &str,
        board_id: Option<i64>,
    ) -> Envelope {
        self.backend
            .call(
                Endpoint::post("/closeTicket")
                    .query("mspCustomDomain", msp_custom_domain)
                    .query("ticketId", ticket_id)
                    .query_present("boardId", &board_id)
                    .payload("result"),
            )
            .await
    }

    async fn status(&self, msp_custom_domain: &str, ticket_id: &str) -> Envelope {
        self.backend
            .call(
                Endpoint::get("/getTicketStatus")
                    .query("mspCustomDomain", msp_custom_domain)
                    .query("ticketId", ticket_id)
                    .payload("status")
                    .not_found(NOT_FOUND, Detail::Fixed("Ticket not found".to_string()))
                    .bad_request(Detail::Fixed("Ticket ID is required".to_string())),
            )
            .await
    }

    /// Diagnostic first, then a ticket built from its suggestions. A failed
    /// diagnostic is returned unchanged.
    async fn create_ticket_with_ai(&self, args: &AiTicketArgs) -> Envelope {
        if let Err(rejected) = args.requester.check_ticket_owner() {
            return rejected;
        }
        let diagnostic = self
            .diagnostic(&args.msp_custom_domain, &args.issue_description, &args.requester)
            .await;
        if !diagnostic.success {
            self.logger.info(
                "ai ticket stopped at diagnostic",
                Some(&json!({ "error": diagnostic.error })),
            );
            return diagnostic;
        }
        let suggestion = diagnostic
            .payload("diagnostic_qa")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let body = ai_ticket_body(&suggestion, &args.psa_type, &args.issue_description, &args.requester);
        let mut created = self.submit_ticket(&args.msp_custom_domain, body).await;
        if created.success {
            created.insert("ai_categorization", suggestion);
        }
        created
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        match tool {
            "get_psa_ticket_diagnostic" => {
                let args: DiagnosticArgs = parse_args(tool, args)?;
                Ok(self
                    .ticket_diagnostic(&args.msp_custom_domain, &args.user_message, &args.requester)
                    .await)
            }
            "create_psa_ticket" => {
                let ticket: NewPsaTicket = parse_args(tool, args)?;
                Ok(self.create_ticket(&ticket).await)
            }
            "add_psa_ticket_note" => {
                let args: AddNoteArgs = parse_args(tool, args)?;
                Ok(self.add_note(&args).await)
            }
            "get_psa_ticket_notes" => {
                let args: NotesArgs = parse_args(tool, args)?;
                Ok(self
                    .notes(&args.msp_custom_domain, &args.ticket_id, args.detailed)
                    .await)
            }
            "close_psa_ticket" => {
                let args: CloseArgs = parse_args(tool, args)?;
                Ok(self
                    .close_ticket(&args.msp_custom_domain, &args.ticket_id, args.board_id)
                    .await)
            }
            "get_psa_ticket_status" => {
                let args: StatusArgs = parse_args(tool, args)?;
                Ok(self.status(&args.msp_custom_domain, &args.ticket_id).await)
            }
            "create_psa_ticket_with_ai" => {
                let args: AiTicketArgs = parse_args(tool, args)?;
                Ok(self.create_ticket_with_ai(&args).await)
            }
            _ => Err(unknown_tool_error(tool, TOOLS)),
        }
    }
}

fn ai_ticket_body(
    suggestion: &Value,
    psa_type: &str,
    issue_description: &str,
    requester: &Requester,
) -> Value {
    let summary = suggestion
        .get("summary")
        .cloned()
        .unwrap_or_else(|| Value::String(char_prefix(issue_description, SUMMARY_FALLBACK_CHARS)));
    let board_id = suggestion
        .get("boardId")
        .cloned()
        .unwrap_or_else(|| Value::from(DEFAULT_BOARD_ID));
    let mut body = Fields::new()
        .put("psaType", psa_type)
        .put("summary", summary)
        .put("description", issue_description)
        .put("boardId", board_id)
        .put("userId", requester.user_id.clone())
        .put("techId", requester.tech_id.clone())
        .put("psaCompanyId", requester.psa_company_id);
    for field in SUGGESTED_FIELDS {
        if let Some(value) = suggestion.get(*field).filter(|v| v.is_truthy()) {
            body = body.put(field, value.clone());
        }
    }
    body.into_value()
}

#[async_trait::async_trait]
impl ToolHandler for PsaTicketingManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requester(user: Option<&str>, tech: Option<&str>, company: Option<i64>) -> Requester {
        Requester {
            user_id: user.map(str::to_string),
            tech_id: tech.map(str::to_string),
            psa_company_id: company,
        }
    }

    #[test]
    fn identity_needs_user_or_tech() {
        assert!(requester(Some("u1"), None, None).check_identity().is_ok());
        assert!(requester(None, Some("t1"), None).check_identity().is_ok());
        let rejected = requester(Some(""), None, None).check_identity().unwrap_err();
        assert_eq!(rejected.error.as_deref(), Some("Validation Error"));
    }

    #[test]
    fn ticket_owner_without_user_needs_tech_and_company() {
        assert!(requester(Some("u1"), None, None).check_ticket_owner().is_ok());
        assert!(requester(None, Some("t1"), Some(7)).check_ticket_owner().is_ok());
        assert!(requester(None, Some("t1"), None).check_ticket_owner().is_err());
        assert!(requester(None, Some("t1"), Some(0)).check_ticket_owner().is_err());
    }

    #[test]
    fn ai_ticket_body_defaults_board_and_summary() {
        let body = ai_ticket_body(
            &json!({"categoryId": 3, "priorityId": 0}),
            "ConnectWise",
            "Printer on floor 2 is jammed",
            &requester(Some("u1"), None, None),
        );
        assert_eq!(
            body,
            json!({
                "psaType": "ConnectWise",
                "summary": "Printer on floor 2 is jammed",
                "description": "Printer on floor 2 is jammed",
                "boardId": 1,
                "userId": "u1",
                "techId": null,
                "psaCompanyId": null,
                "categoryId": 3
            })
        );
    }
}
