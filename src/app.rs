use crate::errors::ToolError;
use crate::managers;
use crate::mcp::catalog::tool_catalog;
use crate::services::backend::Backend;
use crate::services::logger::Logger;
use crate::services::settings::Settings;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::transport::{ReqwestTransport, Transport};
use std::collections::HashMap;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub settings: Settings,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    fn validate_tool_wiring(handlers: &HashMap<String, Arc<dyn ToolHandler>>) -> Result<(), ToolError> {
        let mut missing = Vec::new();
        for tool in tool_catalog().iter() {
            if !handlers.contains_key(&tool.name) {
                missing.push(tool.name.clone());
            }
        }
        let mut undocumented: Vec<String> = handlers
            .keys()
            .filter(|name| !tool_catalog().iter().any(|tool| &tool.name == *name))
            .cloned()
            .collect();
        if missing.is_empty() && undocumented.is_empty() {
            return Ok(());
        }
        missing.sort();
        undocumented.sort();
        Err(ToolError::internal("Tool wiring is incomplete")
            .with_hint("Every tool in tool_catalog.json needs a handler, and every handler a catalog entry")
            .with_details(serde_json::json!({
                "missing_tools": missing,
                "uncataloged_tools": undocumented,
            })))
    }

    /// Production wiring: one pooled HTTP client against the configured
    /// backend.
    pub fn initialize(settings: Settings) -> Result<Self, ToolError> {
        let base_url = settings.validate()?;
        let transport = ReqwestTransport::new(base_url)
            .map_err(|err| ToolError::config(err.to_string()))?;
        Self::with_transport(settings, Arc::new(transport))
    }

    pub fn with_transport(settings: Settings, transport: Arc<dyn Transport>) -> Result<Self, ToolError> {
        let logger = Logger::new("psa-gateway", settings.log_level);
        let backend = Backend::new(transport, logger.clone());

        let tickets = Arc::new(managers::tickets::TicketsManager::new(
            logger.clone(),
            backend.clone(),
            settings.use_mock_data,
        ));
        let weaviate = Arc::new(managers::weaviate::WeaviateManager::new(
            logger.clone(),
            backend.clone(),
        ));
        let autotask = Arc::new(managers::autotask::AutotaskManager::new(backend.clone()));
        let connectwise = Arc::new(managers::connectwise::ConnectWiseManager::new(backend.clone()));
        let connectwise_sync = Arc::new(managers::connectwise_sync::ConnectWiseSyncManager::new(
            logger.clone(),
            backend.clone(),
            connectwise.clone(),
        ));
        let connectwise_ticketing = Arc::new(
            managers::connectwise_ticketing::ConnectWiseTicketingManager::new(
                logger.clone(),
                backend.clone(),
            ),
        );
        let psa = Arc::new(managers::psa::PsaManager::new(logger.clone(), backend.clone()));
        let psa_sync = Arc::new(managers::psa_sync::PsaSyncManager::new(
            logger.clone(),
            backend.clone(),
            psa.clone(),
        ));
        let psa_ticketing = Arc::new(managers::psa_ticketing::PsaTicketingManager::new(
            logger.clone(),
            backend.clone(),
        ));
        let time_entry = Arc::new(managers::time_entry::TimeEntryManager::new(
            logger.clone(),
            backend.clone(),
            psa_ticketing.clone(),
        ));

        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        register(&mut handlers, managers::tickets::TOOLS, tickets);
        register(&mut handlers, managers::weaviate::TOOLS, weaviate);
        register(&mut handlers, managers::autotask::TOOLS, autotask);
        register(&mut handlers, managers::connectwise::TOOLS, connectwise);
        register(&mut handlers, managers::connectwise_sync::TOOLS, connectwise_sync);
        register(&mut handlers, managers::connectwise_ticketing::TOOLS, connectwise_ticketing);
        register(&mut handlers, managers::psa::TOOLS, psa);
        register(&mut handlers, managers::psa_sync::TOOLS, psa_sync);
        register(&mut handlers, managers::psa_ticketing::TOOLS, psa_ticketing);
        register(&mut handlers, managers::time_entry::TOOLS, time_entry);

        Self::validate_tool_wiring(&handlers)?;

        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers));
        logger.info(
            "gateway ready",
            Some(&serde_json::json!({
                "service_url": settings.service_url,
                "use_mock_data": settings.use_mock_data,
                "tools": tool_executor.tool_names().len(),
            })),
        );

        Ok(Self {
            logger,
            settings,
            tool_executor,
        })
    }
}

fn register(
    handlers: &mut HashMap<String, Arc<dyn ToolHandler>>,
    tools: &[&str],
    handler: Arc<dyn ToolHandler>,
) {
    for tool in tools {
        handlers.insert((*tool).to_string(), handler.clone());
    }
}
