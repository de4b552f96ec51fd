#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use psa_gateway::app::App;
use psa_gateway::mcp::envelope::Envelope;
use psa_gateway::services::logger::LogLevel;
use psa_gateway::services::settings::Settings;
use psa_gateway::services::transport::{HttpExchange, HttpRequest, Transport, TransportError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

pub static ENV_LOCK: Lazy<AsyncMutex<()>> = Lazy::new(|| AsyncMutex::new(()));

pub fn restore_env(key: &str, previous: Option<String>) {
    match previous {
        Some(value) => std::env::set_var(key, value),
        None => std::env::remove_var(key),
    }
}

/// Scripted backend: answers requests in FIFO order and records what was
/// sent. Running out of script is a connection failure.
#[derive(Default)]
pub struct StubTransport {
    script: Mutex<VecDeque<Result<HttpExchange, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, exchange: HttpExchange) -> &Self {
        self.script.lock().unwrap().push_back(Ok(exchange));
        self
    }

    pub fn reply_json(&self, status: u16, body: Value) -> &Self {
        self.reply(HttpExchange::json(status, body))
    }

    pub fn reply_text(&self, status: u16, body: &str) -> &Self {
        self.reply(HttpExchange::text(status, body))
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request(&self, index: usize) -> HttpRequest {
        self.requests()
            .get(index)
            .cloned()
            .unwrap_or_else(|| panic!("no request #{} was sent", index))
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpExchange, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("connection refused".to_string())))
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.log_level = LogLevel::Error;
    settings
}

pub fn app_with(stub: &Arc<StubTransport>) -> App {
    App::with_transport(test_settings(), stub.clone()).expect("tool wiring")
}

pub async fn call(app: &App, tool: &str, args: Value) -> Envelope {
    app.tool_executor
        .execute(tool, args)
        .await
        .unwrap_or_else(|err| panic!("{} rejected: {}", tool, err))
}
