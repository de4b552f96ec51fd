use crate::errors::ToolError;
use crate::managers::psa::PsaManager;
use crate::managers::DomainArgs;
use crate::mcp::envelope::Envelope;
use crate::services::backend::{Backend, Detail, Endpoint};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::utils::args::{default_true, parse_args};
use crate::utils::tool_errors::unknown_tool_error;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const TOOLS: &[&str] = &[
    "sync_psa_tickets",
    "sync_all_psa_tickets",
    "sync_psa_with_status_check",
    "batch_sync_domains",
];

#[derive(Debug, Deserialize)]
struct StatusCheckArgs {
    msp_custom_domain: String,
    #[serde(default = "default_true")]
    check_integration_first: bool,
}

#[derive(Debug, Deserialize)]
struct BatchArgs {
    domain_list: Vec<String>,
}

/// Ticket sync through the vendor-neutral PSA service.
#[derive(Clone)]
pub struct PsaSyncManager {
    logger: Logger,
    backend: Backend,
    psa: Arc<PsaManager>,
}

impl PsaSyncManager {
    pub fn new(logger: Logger, backend: Backend, psa: Arc<PsaManager>) -> Self {
        Self {
            logger: logger.child("psa_sync"),
            backend: backend.child("psa_sync"),
            psa,
        }
    }

    pub async fn sync_domain(&self, msp_custom_domain: &str) -> Envelope {
        self.backend
            .call(
                Endpoint::post("/psa/sync/tickets")
                    .query("mspCustomDomain", msp_custom_domain)
                    .sync_operation()
                    .message_from_body()
                    .bad_request(Detail::Backend)
                    .context("domain", msp_custom_domain),
            )
            .await
    }

    pub async fn sync_all_domains(&self) -> Envelope {
        self.backend
            .call(
                Endpoint::post("/psa/sync/all")
                    .sync_operation()
                    .message_from_body()
                    .context("scope", "all_domains"),
            )
            .await
    }

    /// Optionally probes the integration with a client listing before
    /// syncing. A failed probe skips the sync.
    pub async fn sync_with_status_check(
        &self,
        msp_custom_domain: &str,
        check_integration_first: bool,
    ) -> Envelope {
        let mut integration_check = Value::Null;
        if check_integration_first {
            let probe = self.psa.clients(msp_custom_domain).await;
            if !probe.success {
                self.logger.warn(
                    "integration probe failed, sync skipped",
                    Some(&json!({ "domain": msp_custom_domain, "error": probe.error })),
                );
                return Envelope::failure("No PSA integration found or accessible")
                    .with("domain", msp_custom_domain)
                    .with("integration_check", "failed")
                    .with("sync_result", Value::Null);
            }
            integration_check = Value::String("passed".to_string());
        }
        let sync_result = self.sync_domain(msp_custom_domain).await;
        Envelope::aggregate(sync_result.success)
            .with("domain", msp_custom_domain)
            .with("integration_check", integration_check)
            .with("sync_result", sync_result)
    }

    /// Syncs each domain in turn; one failure does not stop the rest.
    pub async fn batch_sync(&self, domains: &[String]) -> Envelope {
        let mut successful = 0_usize;
        let mut failed = 0_usize;
        let mut domain_results = Map::new();
        for domain in domains {
            let result = self.sync_domain(domain).await;
            if result.success {
                successful += 1;
            } else {
                failed += 1;
            }
            domain_results.insert(domain.clone(), result.into_value());
        }
        self.logger.info(
            "batch sync finished",
            Some(&json!({ "total": domains.len(), "successful": successful, "failed": failed })),
        );
        Envelope::aggregate(failed == 0)
            .with("total_domains", domains.len())
            .with("successful", successful)
            .with("failed", failed)
            .with("domain_results", domain_results)
            .with("overall_success", failed == 0)
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        match tool {
            "sync_psa_tickets" => {
                let args: DomainArgs = parse_args(tool, args)?;
                Ok(self.sync_domain(&args.msp_custom_domain).await)
            }
            "sync_all_psa_tickets" => Ok(self.sync_all_domains().await),
            "sync_psa_with_status_check" => {
                let args: StatusCheckArgs = parse_args(tool, args)?;
                Ok(self
                    .sync_with_status_check(&args.msp_custom_domain, args.check_integration_first)
                    .await)
            }
            "batch_sync_domains" => {
                let args: BatchArgs = parse_args(tool, args)?;
                Ok(self.batch_sync(&args.domain_list).await)
            }
            _ => Err(unknown_tool_error(tool, TOOLS)),
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for PsaSyncManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}
