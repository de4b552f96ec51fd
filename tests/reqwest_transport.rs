use psa_gateway::services::transport::{HttpRequest, ReqwestTransport, Transport, TransportError};
use reqwest::Method;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use url::Url;

async fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let read = stream.read(&mut chunk).await.expect("read request");
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);
        let text = String::from_utf8_lossy(&raw).to_string();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if raw.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).to_string()
}

/// Serves one canned response and hands back the raw request it received.
async fn one_shot_server(status_line: &'static str, body: &'static str) -> (Url, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.expect("write response");
        let _ = tx.send(request);
    });
    let url = Url::parse(&format!("http://{}/base/", addr)).expect("url");
    (url, rx)
}

#[tokio::test]
async fn sends_path_query_and_json_body() {
    let (url, received) = one_shot_server("200 OK", r#"{"ok":true}"#).await;
    let transport = ReqwestTransport::new(url).expect("transport");

    let mut request = HttpRequest::new(Method::POST, "/createTicket", Duration::from_secs(5));
    request.query.push(("mspCustomDomain".to_string(), "acme co".to_string()));
    request.body = Some(json!({"summary": "VPN"}));
    let exchange = transport.send(request).await.expect("exchange");

    assert_eq!(exchange.status, 200);
    assert_eq!(exchange.json, Some(json!({"ok": true})));

    let raw = received.await.expect("request seen");
    assert!(raw.starts_with("POST /base/createTicket?mspCustomDomain=acme+co HTTP/1.1"));
    assert!(raw.to_lowercase().contains("content-type: application/json"));
    assert!(raw.ends_with(r#"{"summary":"VPN"}"#));
}

#[tokio::test]
async fn error_statuses_are_exchanges_not_errors() {
    let (url, _received) = one_shot_server("404 Not Found", "no integration").await;
    let transport = ReqwestTransport::new(url).expect("transport");

    let request = HttpRequest::new(Method::GET, "/psa/getClients", Duration::from_secs(5));
    let exchange = transport.send(request).await.expect("exchange");

    assert_eq!(exchange.status, 404);
    assert_eq!(exchange.body_text, "no integration");
    assert!(exchange.json.is_none());
}

#[tokio::test]
async fn slow_backend_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let _ = read_request(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    let url = Url::parse(&format!("http://{}", addr)).expect("url");
    let transport = ReqwestTransport::new(url).expect("transport");

    let request = HttpRequest::new(Method::GET, "/syncClientsContacts", Duration::from_millis(200));
    let err = transport.send(request).await.unwrap_err();

    assert!(err.is_timeout(), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn refused_connection_is_a_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let url = Url::parse(&format!("http://{}", addr)).expect("url");
    let transport = ReqwestTransport::new(url).expect("transport");

    let request = HttpRequest::new(Method::GET, "/api/psa/health", Duration::from_secs(2));
    let err = transport.send(request).await.unwrap_err();

    assert!(matches!(err, TransportError::Request(_)));
}
