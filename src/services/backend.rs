use crate::constants::limits::LOG_BODY_PREVIEW_BYTES;
use crate::constants::messages::{BAD_REQUEST, SYNC_STILL_RUNNING, SYNC_TIMED_OUT};
use crate::constants::network::{TIMEOUT_API_REQUEST_MS, TIMEOUT_SYNC_REQUEST_MS};
use crate::mcp::envelope::Envelope;
use crate::services::logger::Logger;
use crate::services::transport::{HttpExchange, HttpRequest, Transport, TransportError};
use crate::utils::fields::Truthy;
use crate::utils::text::preview;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where the envelope's `message` comes from for a special-cased status.
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    Backend,
    Fixed(String),
}

#[derive(Debug, Clone)]
struct StatusRule {
    status: u16,
    error: String,
    message: Detail,
}

#[derive(Debug, Clone)]
enum Reply {
    Payload {
        key: String,
        message: Option<String>,
    },
    Message(String),
    BodyText,
}

/// Declarative description of one backend endpoint: the request to send and
/// how each response status turns into an envelope.
///
/// ```ignore
/// let envelope = backend
///     .call(
///         Endpoint::get("/psa/getClients")
///             .query("mspCustomDomain", domain)
///             .payload("clients")
///             .empty_on_no_content("No clients found"),
///     )
///     .await;
/// ```
#[derive(Debug, Clone)]
pub struct Endpoint {
    request: HttpRequest,
    reply: Reply,
    no_content: Option<String>,
    rules: Vec<StatusRule>,
    sync: bool,
    context: Vec<(String, Value)>,
}

impl Endpoint {
    fn new(method: Method, path: &str) -> Self {
        Self {
            request: HttpRequest::new(
                method,
                path,
                Duration::from_millis(TIMEOUT_API_REQUEST_MS),
            ),
            reply: Reply::BodyText,
            no_content: None,
            rules: Vec::new(),
            sync: false,
            context: Vec::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn segment(mut self, value: impl ToString) -> Self {
        self.request.path.push(value.to_string());
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.request.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_truthy<T: Truthy + ToString>(self, key: &str, value: &Option<T>) -> Self {
        match value {
            Some(v) if v.is_truthy() => self.query(key, v.to_string()),
            _ => self,
        }
    }

    pub fn query_present<T: ToString>(self, key: &str, value: &Option<T>) -> Self {
        match value {
            Some(v) => self.query(key, v.to_string()),
            None => self,
        }
    }

    pub fn json(mut self, body: impl Into<Value>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = timeout;
        self
    }

    /// Long-running sync: longer timeout, and a timeout is reported as
    /// "may still be running" rather than a plain failure.
    pub fn sync_operation(mut self) -> Self {
        self.sync = true;
        self.request.timeout = Duration::from_millis(TIMEOUT_SYNC_REQUEST_MS);
        self
    }

    pub fn payload(mut self, key: &str) -> Self {
        self.reply = Reply::Payload {
            key: key.to_string(),
            message: None,
        };
        self
    }

    pub fn payload_with_message(mut self, key: &str, message: &str) -> Self {
        self.reply = Reply::Payload {
            key: key.to_string(),
            message: Some(message.to_string()),
        };
        self
    }

    /// Void success: no payload, a fixed confirmation message.
    pub fn fixed_message(mut self, message: &str) -> Self {
        self.reply = Reply::Message(message.to_string());
        self
    }

    /// Void success whose message is the backend's response text.
    pub fn message_from_body(mut self) -> Self {
        self.reply = Reply::BodyText;
        self
    }

    /// Accept 204 as an empty list.
    pub fn empty_on_no_content(mut self, message: &str) -> Self {
        self.no_content = Some(message.to_string());
        self
    }

    pub fn on_status(mut self, status: u16, error: &str, message: Detail) -> Self {
        self.rules.push(StatusRule {
            status,
            error: error.to_string(),
            message,
        });
        self
    }

    pub fn bad_request(self, message: Detail) -> Self {
        self.on_status(400, BAD_REQUEST, message)
    }

    pub fn not_found(self, error: &str, message: Detail) -> Self {
        self.on_status(404, error, message)
    }

    /// Extra key copied onto the envelope whatever the outcome.
    pub fn context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.push((key.to_string(), value.into()));
        self
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn interpret(&self, outcome: Result<HttpExchange, TransportError>) -> Envelope {
        let mut envelope = match outcome {
            Err(err) if self.sync && err.is_timeout() => {
                Envelope::failure(SYNC_TIMED_OUT).with_message(SYNC_STILL_RUNNING)
            }
            Err(err) => Envelope::failure(err.to_string()),
            Ok(exchange) => self.map_status(exchange),
        };
        for (key, value) in &self.context {
            envelope.insert(key, value.clone());
        }
        envelope
    }

    fn map_status(&self, exchange: HttpExchange) -> Envelope {
        match exchange.status {
            200 => self.accepted(exchange),
            204 if self.no_content.is_some() => {
                let message = self.no_content.clone().unwrap_or_default();
                match &self.reply {
                    Reply::Payload { key, .. } => Envelope::success()
                        .with(key, Value::Array(Vec::new()))
                        .with_message(message),
                    _ => Envelope::success().with_message(message),
                }
            }
            status => match self.rules.iter().find(|rule| rule.status == status) {
                Some(rule) => {
                    let message = match &rule.message {
                        Detail::Backend => exchange.body_text,
                        Detail::Fixed(text) => text.clone(),
                    };
                    Envelope::failure(rule.error.clone()).with_message(message)
                }
                None => Envelope::failure(format!("Failed with status {}", status))
                    .with_message(exchange.body_text),
            },
        }
    }

    fn accepted(&self, exchange: HttpExchange) -> Envelope {
        match &self.reply {
            Reply::Payload { key, message } => match exchange.json {
                Some(body) => {
                    let envelope = Envelope::success().with(key, body);
                    match message {
                        Some(text) => envelope.with_message(text.clone()),
                        None => envelope,
                    }
                }
                None => Envelope::failure("Response body is not valid JSON")
                    .with_message(preview(&exchange.body_text, LOG_BODY_PREVIEW_BYTES)),
            },
            Reply::Message(text) => Envelope::success().with_message(text.clone()),
            Reply::BodyText => Envelope::success().with_message(exchange.body_text),
        }
    }
}

/// Shared request executor. Every adapter goes through here so logging and
/// status mapping live in one place.
#[derive(Clone)]
pub struct Backend {
    transport: Arc<dyn Transport>,
    logger: Logger,
}

impl Backend {
    pub fn new(transport: Arc<dyn Transport>, logger: Logger) -> Self {
        Self {
            transport,
            logger: logger.child("backend"),
        }
    }

    pub fn child(&self, suffix: &str) -> Self {
        Self {
            transport: self.transport.clone(),
            logger: self.logger.child(suffix),
        }
    }

    pub async fn call(&self, endpoint: Endpoint) -> Envelope {
        let outcome = self.exchange(endpoint.request().clone()).await;
        endpoint.interpret(outcome)
    }

    /// Raw exchange for endpoints whose response does not fit the standard
    /// status mapping.
    pub async fn exchange(&self, request: HttpRequest) -> Result<HttpExchange, TransportError> {
        let method = request.method.as_str().to_string();
        let path = request.path_string();
        let started = Instant::now();
        let outcome = self.transport.send(request).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(exchange) if (200..300).contains(&exchange.status) => {
                self.logger.debug(
                    "backend call",
                    Some(&serde_json::json!({
                        "method": method,
                        "path": path,
                        "status": exchange.status,
                        "duration_ms": duration_ms,
                    })),
                );
            }
            Ok(exchange) => {
                self.logger.warn(
                    "backend rejected request",
                    Some(&serde_json::json!({
                        "method": method,
                        "path": path,
                        "status": exchange.status,
                        "duration_ms": duration_ms,
                        "body": preview(&exchange.body_text, LOG_BODY_PREVIEW_BYTES),
                    })),
                );
            }
            Err(err) => {
                self.logger.warn(
                    "backend unreachable",
                    Some(&serde_json::json!({
                        "method": method,
                        "path": path,
                        "error": err.to_string(),
                        "duration_ms": duration_ms,
                    })),
                );
            }
        }
        outcome
    }
}
