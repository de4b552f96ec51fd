use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One outbound call against the backend, relative to its base URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Raw (unencoded) path segments; the transport percent-encodes them.
    pub path: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(method: Method, path: &str, timeout: Duration) -> Self {
        Self {
            method,
            path: split_path(path),
            query: Vec::new(),
            body: None,
            timeout,
        }
    }

    pub fn path_string(&self) -> String {
        format!("/{}", self.path.join("/"))
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// What came back: status, raw text, and the body decoded as JSON when it
/// parses.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpExchange {
    pub status: u16,
    pub body_text: String,
    pub json: Option<Value>,
}

impl HttpExchange {
    pub fn new(status: u16, body_text: impl Into<String>) -> Self {
        let body_text = body_text.into();
        let json = serde_json::from_str(&body_text).ok();
        Self {
            status,
            body_text,
            json,
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body_text: body.to_string(),
            json: Some(body),
        }
    }

    pub fn text(status: u16, text: &str) -> Self {
        Self::new(status, text)
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
    #[error("{0}")]
    Request(String),
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// Never fails on a status code; only connection-level problems surface as
/// `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpExchange, TransportError>;
}

pub struct ReqwestTransport {
    base_url: Url,
    client: Client,
}

impl ReqwestTransport {
    pub fn new(base_url: Url) -> Result<Self, TransportError> {
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .build()
            .map_err(|err| TransportError::Request(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn resolve(&self, request: &HttpRequest) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(request.path.iter());
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }
        Ok(url)
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Request(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpExchange, TransportError> {
        let url = self.resolve(&request)?;
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .timeout(request.timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, request.timeout))?;
        let status = response.status().as_u16();
        let body_text = response
            .text()
            .await
            .map_err(|err| map_reqwest_error(err, request.timeout))?;
        Ok(HttpExchange::new(status, body_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::new(Url::parse(base).unwrap()).unwrap()
    }

    #[test]
    fn resolve_appends_segments_to_base_path() {
        let mut request = HttpRequest::new(Method::GET, "/psa/getClients", Duration::from_secs(1));
        request.query.push(("mspCustomDomain".into(), "acme co".into()));
        let url = transport("http://localhost:9030/gateway/").resolve(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9030/gateway/psa/getClients?mspCustomDomain=acme+co"
        );
    }

    #[test]
    fn resolve_encodes_caller_supplied_segments() {
        let mut request = HttpRequest::new(Method::PUT, "/updateTicket", Duration::from_secs(1));
        request.path.push("12/34".into());
        let url = transport("http://localhost:9030").resolve(&request).unwrap();
        assert_eq!(url.path(), "/updateTicket/12%2F34");
    }

    #[test]
    fn exchange_decodes_json_when_possible() {
        assert_eq!(HttpExchange::new(200, "[1,2]").json, Some(serde_json::json!([1, 2])));
        assert!(HttpExchange::new(200, "plain text").json.is_none());
    }
}
