use crate::constants::network::{TIMEOUT_API_REQUEST_MS, TIMEOUT_HEALTH_CHECK_MS};
use crate::errors::ToolError;
use crate::managers::psa_ticketing::PsaTicketingManager;
use crate::mcp::envelope::Envelope;
use crate::services::backend::Backend;
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::transport::{HttpExchange, HttpRequest};
use crate::utils::args::{default_true, parse_args};
use crate::utils::fields::{truthy, Fields};
use crate::utils::tool_errors::unknown_tool_error;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const TOOLS: &[&str] = &[
    "create_psa_time_entry",
    "log_quick_time_entry",
    "log_bulk_time_entries",
    "check_psa_time_entry_health",
    "log_time_with_completion",
];

const TIME_ENTRIES_PATH: &str = "/api/psa/time-entries";
const HEALTH_PATH: &str = "/api/psa/health";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minutes,
    Hours,
}

impl TimeUnit {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "minutes" => Some(TimeUnit::Minutes),
            "hours" => Some(TimeUnit::Hours),
            _ => None,
        }
    }

    pub fn to_minutes(self, amount: f64) -> f64 {
        match self {
            TimeUnit::Minutes => amount,
            TimeUnit::Hours => amount * 60.0,
        }
    }
}

/// Minutes as JSON: whole numbers go out as integers.
pub fn minutes_value(minutes: f64) -> Value {
    if minutes.fract() == 0.0 && minutes.abs() < i64::MAX as f64 {
        Value::from(minutes as i64)
    } else {
        Value::from(minutes)
    }
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn hours_from_minutes(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

/// One unit of logged work, already normalized to minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub msp_custom_domain: String,
    pub ticket_id: String,
    pub technician_id: String,
    pub minutes: f64,
    pub notes: String,
    pub billable: bool,
    pub work_date: String,
}

impl TimeEntry {
    pub fn to_body(&self) -> Value {
        Fields::new()
            .put("mspCustomDomain", self.msp_custom_domain.as_str())
            .put("ticketId", self.ticket_id.as_str())
            .put("technicianId", self.technician_id.as_str())
            .put("timeSpent", minutes_value(self.minutes))
            .put("notes", self.notes.as_str())
            .put("billable", self.billable)
            .put("workDate", self.work_date.as_str())
            .into_value()
    }
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    msp_custom_domain: String,
    ticket_id: String,
    technician_id: String,
    time_spent: f64,
    notes: String,
    #[serde(default)]
    work_date: Option<String>,
    #[serde(default = "default_true")]
    billable: bool,
    #[serde(default = "default_time_unit")]
    time_unit: String,
}

fn default_time_unit() -> String {
    "minutes".to_string()
}

#[derive(Debug, Deserialize)]
struct QuickArgs {
    msp_custom_domain: String,
    ticket_id: String,
    technician_id: String,
    time_minutes: i64,
    work_description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    pub ticket_id: String,
    #[serde(default)]
    pub time_minutes: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub work_date: Option<String>,
    #[serde(default)]
    pub billable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct BulkArgs {
    msp_custom_domain: String,
    technician_id: String,
    time_entries: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct CompletionArgs {
    msp_custom_domain: String,
    ticket_id: String,
    technician_id: String,
    time_minutes: i64,
    resolution_notes: String,
    #[serde(default)]
    board_id: Option<i64>,
    #[serde(default)]
    close_ticket: bool,
}

/// Time tracking against `/api/psa`. Its responses carry their own
/// `success` flag, so it maps statuses itself instead of using the shared
/// endpoint rules.
#[derive(Clone)]
pub struct TimeEntryManager {
    logger: Logger,
    backend: Backend,
    ticketing: Arc<PsaTicketingManager>,
}

impl TimeEntryManager {
    pub fn new(logger: Logger, backend: Backend, ticketing: Arc<PsaTicketingManager>) -> Self {
        Self {
            logger: logger.child("time_entry"),
            backend: backend.child("time_entry"),
            ticketing,
        }
    }

    pub async fn create_entry(&self, entry: &TimeEntry) -> Envelope {
        let mut request = HttpRequest::new(
            Method::POST,
            TIME_ENTRIES_PATH,
            Duration::from_millis(TIMEOUT_API_REQUEST_MS),
        );
        request.body = Some(entry.to_body());
        match self.backend.exchange(request).await {
            Ok(exchange) => time_entry_outcome(exchange),
            Err(err) => Envelope::failure(err.to_string()),
        }
    }

    async fn create_from_args(&self, args: &CreateArgs) -> Envelope {
        let Some(unit) = TimeUnit::parse(&args.time_unit) else {
            return Envelope::validation_error(format!(
                "Invalid time unit: {}. Time unit must be 'minutes' or 'hours'",
                args.time_unit
            ));
        };
        let entry = TimeEntry {
            msp_custom_domain: args.msp_custom_domain.clone(),
            ticket_id: args.ticket_id.clone(),
            technician_id: args.technician_id.clone(),
            minutes: unit.to_minutes(args.time_spent),
            notes: args.notes.clone(),
            billable: args.billable,
            work_date: truthy(&args.work_date).cloned().unwrap_or_else(today),
        };
        self.create_entry(&entry).await
    }

    async fn quick_entry(&self, args: &QuickArgs) -> Envelope {
        let entry = TimeEntry {
            msp_custom_domain: args.msp_custom_domain.clone(),
            ticket_id: args.ticket_id.clone(),
            technician_id: args.technician_id.clone(),
            minutes: args.time_minutes as f64,
            notes: args.work_description.clone(),
            billable: true,
            work_date: today(),
        };
        self.create_entry(&entry).await
    }

    /// Logs each item in order; failures are counted, not fatal. The minute
    /// total saturates instead of overflowing.
    pub async fn bulk_entries(
        &self,
        msp_custom_domain: &str,
        technician_id: &str,
        items: &[BulkItem],
    ) -> Envelope {
        let mut successful = 0_usize;
        let mut failed = 0_usize;
        let mut total_minutes = 0_i64;
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let entry = TimeEntry {
                msp_custom_domain: msp_custom_domain.to_string(),
                ticket_id: item.ticket_id.clone(),
                technician_id: technician_id.to_string(),
                minutes: item.time_minutes as f64,
                notes: item.notes.clone().unwrap_or_default(),
                billable: item.billable.unwrap_or(true),
                work_date: item.work_date.clone().unwrap_or_else(today),
            };
            let result = self.create_entry(&entry).await;
            let mut summary = Fields::new()
                .put("ticket_id", item.ticket_id.as_str())
                .put("success", result.success)
                .put("minutes", item.time_minutes);
            if result.success {
                successful += 1;
                total_minutes = total_minutes.saturating_add(item.time_minutes);
                let id = result
                    .payload("time_entry")
                    .and_then(|body| body.get("id"))
                    .cloned()
                    .unwrap_or(Value::Null);
                summary = summary.put("time_entry_id", id);
            } else {
                failed += 1;
                let error = result.error.clone().unwrap_or_else(|| "Unknown error".to_string());
                summary = summary.put("error", error);
            }
            entries.push(summary.into_value());
        }
        self.logger.info(
            "bulk time entries logged",
            Some(&json!({
                "technician_id": technician_id,
                "successful": successful,
                "failed": failed,
                "total_minutes": total_minutes,
            })),
        );
        Envelope::aggregate(failed == 0)
            .with("total_entries", items.len())
            .with("successful", successful)
            .with("failed", failed)
            .with("total_minutes_logged", total_minutes)
            .with("entries", entries)
            .with("overall_success", failed == 0)
            .with("total_hours_logged", hours_from_minutes(total_minutes))
    }

    pub async fn health(&self) -> Envelope {
        let request = HttpRequest::new(
            Method::GET,
            HEALTH_PATH,
            Duration::from_millis(TIMEOUT_HEALTH_CHECK_MS),
        );
        match self.backend.exchange(request).await {
            Ok(exchange) if exchange.status == 200 => match exchange.json {
                Some(body) => {
                    let status = body.get("status").cloned().unwrap_or(Value::Null);
                    Envelope::success()
                        .with("healthy", status.as_str() == Some("UP"))
                        .with("service", body.get("service").cloned().unwrap_or(Value::Null))
                        .with("timestamp", body.get("timestamp").cloned().unwrap_or(Value::Null))
                        .with("status", status)
                }
                None => Envelope::failure("Health check failed: response body is not valid JSON")
                    .with("healthy", false),
            },
            Ok(exchange) => Envelope::failure(format!(
                "Health check failed with status {}",
                exchange.status
            ))
            .with("healthy", false),
            Err(err) => {
                Envelope::failure(format!("Health check failed: {}", err)).with("healthy", false)
            }
        }
    }

    /// Time entry first; the ticket is closed only when asked and the entry
    /// went through.
    async fn log_with_completion(&self, args: &CompletionArgs) -> Envelope {
        let entry = TimeEntry {
            msp_custom_domain: args.msp_custom_domain.clone(),
            ticket_id: args.ticket_id.clone(),
            technician_id: args.technician_id.clone(),
            minutes: args.time_minutes as f64,
            notes: args.resolution_notes.clone(),
            billable: true,
            work_date: today(),
        };
        let time_entry = self.create_entry(&entry).await;
        let mut overall_success = time_entry.success;
        let mut ticket_closure = Value::Null;
        if time_entry.success && args.close_ticket {
            let closure = self
                .ticketing
                .close_ticket(&args.msp_custom_domain, &args.ticket_id, args.board_id)
                .await;
            overall_success = closure.success;
            ticket_closure = closure.into_value();
        }
        Envelope::aggregate(overall_success)
            .with("time_entry", time_entry)
            .with("ticket_closure", ticket_closure)
            .with("overall_success", overall_success)
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        match tool {
            "create_psa_time_entry" => {
                let args: CreateArgs = parse_args(tool, args)?;
                Ok(self.create_from_args(&args).await)
            }
            "log_quick_time_entry" => {
                let args: QuickArgs = parse_args(tool, args)?;
                Ok(self.quick_entry(&args).await)
            }
            "log_bulk_time_entries" => {
                let args: BulkArgs = parse_args(tool, args)?;
                Ok(self
                    .bulk_entries(&args.msp_custom_domain, &args.technician_id, &args.time_entries)
                    .await)
            }
            "check_psa_time_entry_health" => Ok(self.health().await),
            "log_time_with_completion" => {
                let args: CompletionArgs = parse_args(tool, args)?;
                Ok(self.log_with_completion(&args).await)
            }
            _ => Err(unknown_tool_error(tool, TOOLS)),
        }
    }
}

/// 200 carries the created entry and its own `success` flag; 500 carries a
/// structured error body.
fn time_entry_outcome(exchange: HttpExchange) -> Envelope {
    match exchange.status {
        200 => match exchange.json {
            Some(body) => {
                let accepted = body.get("success").and_then(Value::as_bool).unwrap_or(true);
                if accepted {
                    Envelope::success()
                        .with_message("Time entry created successfully")
                        .with("time_entry", body)
                } else {
                    Envelope::failure(backend_error(&body)).with("details", body)
                }
            }
            None => Envelope::failure("Response body is not valid JSON")
                .with_message(exchange.body_text),
        },
        500 => match exchange.json {
            Some(body) => Envelope::failure(backend_error(&body)).with("details", body),
            None => Envelope::failure("Time entry creation failed")
                .with("details", exchange.body_text),
        },
        status => Envelope::failure(format!("Failed with status {}", status))
            .with_message(exchange.body_text),
    }
}

fn backend_error(body: &Value) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .unwrap_or("Time entry creation failed")
        .to_string()
}

#[async_trait::async_trait]
impl ToolHandler for TimeEntryManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}
