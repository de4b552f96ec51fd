use crate::errors::ToolError;
use crate::managers::DomainArgs;
use crate::mcp::envelope::Envelope;
use crate::services::backend::{Backend, Endpoint};
use crate::services::tool_executor::ToolHandler;
use crate::utils::args::parse_args;
use crate::utils::tool_errors::unknown_tool_error;
use serde_json::Value;

/// Tool name, backend path under `/autotask`, payload key.
const LOOKUPS: &[(&str, &str, &str)] = &[
    ("get_autotask_statuses", "getStatuses", "statuses"),
    ("get_autotask_priorities", "getPriorities", "priorities"),
    ("get_autotask_issue_types", "getIssueTypes", "issue_types"),
    ("get_autotask_ticket_categories", "getTicketCategories", "categories"),
    ("get_autotask_ticket_types", "getTicketTypes", "ticket_types"),
    ("get_autotask_queues", "getQueues", "queues"),
    ("get_autotask_queue_details", "getQueueDetails", "queue_details"),
    ("get_autotask_sources", "getSources", "sources"),
    ("get_autotask_companies", "getAllCompanies", "companies"),
    ("get_autotask_contacts", "getAllContacts", "contacts"),
    ("get_autotask_resources", "getAllResources", "resources"),
    ("get_autotask_configuration", "mergeQueuesAndIssueTypes", "configuration"),
];

pub const TOOLS: &[&str] = &[
    "get_autotask_statuses",
    "get_autotask_priorities",
    "get_autotask_issue_types",
    "get_autotask_ticket_categories",
    "get_autotask_ticket_types",
    "get_autotask_queues",
    "get_autotask_queue_details",
    "get_autotask_sources",
    "get_autotask_companies",
    "get_autotask_contacts",
    "get_autotask_resources",
    "get_autotask_configuration",
];

#[derive(Clone)]
pub struct AutotaskManager {
    backend: Backend,
}

impl AutotaskManager {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend: backend.child("autotask"),
        }
    }

    /// Every Autotask lookup is a tenant-scoped GET; only the path and the
    /// payload key differ.
    pub async fn lookup(&self, path: &str, payload_key: &str, msp_custom_domain: &str) -> Envelope {
        self.backend
            .call(
                Endpoint::get(&format!("/autotask/{}", path))
                    .query("mspCustomDomain", msp_custom_domain)
                    .payload(payload_key),
            )
            .await
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        let Some((_, path, key)) = LOOKUPS.iter().find(|(name, _, _)| *name == tool) else {
            return Err(unknown_tool_error(tool, TOOLS));
        };
        let args: DomainArgs = parse_args(tool, args)?;
        Ok(self.lookup(path, key, &args.msp_custom_domain).await)
    }
}

#[async_trait::async_trait]
impl ToolHandler for AutotaskManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::{LOOKUPS, TOOLS};

    #[test]
    fn lookup_table_covers_every_tool() {
        assert_eq!(LOOKUPS.len(), TOOLS.len());
        for tool in TOOLS {
            assert!(LOOKUPS.iter().any(|(name, _, _)| name == tool), "{}", tool);
        }
    }
}
