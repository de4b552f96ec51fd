mod common;

use common::{app_with, call, StubTransport};
use psa_gateway::managers::time_entry::today;
use psa_gateway::services::transport::TransportError;
use reqwest::Method;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn listing_wraps_the_body_under_its_payload_key() {
    let stub = StubTransport::new();
    stub.reply_json(200, json!([{"id": 1, "name": "ACME"}]));
    let app = app_with(&stub);

    let env = call(&app, "get_psa_clients", json!({"msp_custom_domain": "acme.example"})).await;

    assert!(env.success);
    assert_eq!(env.payload("clients"), Some(&json!([{"id": 1, "name": "ACME"}])));
    let request = stub.request(0);
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path_string(), "/psa/getClients");
    assert_eq!(request.query_value("mspCustomDomain"), Some("acme.example"));
}

#[tokio::test]
async fn no_content_listing_is_empty_with_a_message() {
    let stub = StubTransport::new();
    stub.reply_text(204, "");
    let app = app_with(&stub);

    let env = call(&app, "get_psa_members", json!({"msp_custom_domain": "acme"})).await;

    assert!(env.success);
    assert_eq!(env.payload("members"), Some(&json!([])));
    assert_eq!(env.message.as_deref(), Some("No members found"));
}

#[tokio::test]
async fn unexpected_status_carries_code_and_body_without_payload() {
    let stub = StubTransport::new();
    stub.reply_text(500, "database unavailable");
    let app = app_with(&stub);

    let env = call(&app, "get_connectwise_clients", json!({"msp_custom_domain": "acme"})).await;

    assert!(!env.success);
    assert_eq!(env.error.as_deref(), Some("Failed with status 500"));
    assert_eq!(env.message.as_deref(), Some("database unavailable"));
    assert!(env.get("clients").is_none());
}

#[tokio::test]
async fn contact_creation_without_integration_is_explained() {
    let stub = StubTransport::new();
    stub.reply_text(404, "");
    let app = app_with(&stub);

    let env = call(
        &app,
        "add_psa_contact",
        json!({
            "msp_custom_domain": "acme",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@acme.example",
            "company_id": 12,
            "phone": ""
        }),
    )
    .await;

    assert!(!env.success);
    assert_eq!(
        env.error.as_deref(),
        Some("PSA integration not found or contact creation failed")
    );
    assert_eq!(
        env.message.as_deref(),
        Some("No PSA integration configured for this domain")
    );

    let request = stub.request(0);
    assert_eq!(request.path_string(), "/psa/acme/addPSAContact");
    assert_eq!(
        request.body,
        Some(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@acme.example",
            "psaCompanyId": 12
        }))
    );
}

#[tokio::test]
async fn sync_timeout_reports_the_sync_may_still_be_running() {
    let stub = StubTransport::new();
    stub.fail(TransportError::Timeout(Duration::from_secs(60)));
    let app = app_with(&stub);

    let env = call(&app, "sync_psa_tickets", json!({"msp_custom_domain": "acme"})).await;

    assert!(!env.success);
    assert_eq!(env.error.as_deref(), Some("Sync operation timed out"));
    assert!(env.message.as_deref().unwrap_or("").contains("still be running"));
    assert_eq!(env.get("domain"), Some(&json!("acme")));
    assert_eq!(stub.request(0).timeout, Duration::from_secs(60));
}

#[tokio::test]
async fn unreachable_backend_is_a_failure_envelope() {
    let stub = StubTransport::new();
    stub.fail(TransportError::Request("connection refused".to_string()));
    let app = app_with(&stub);

    let env = call(&app, "get_autotask_statuses", json!({"msp_custom_domain": "acme"})).await;

    assert!(!env.success);
    assert_eq!(env.error.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn ticket_status_not_found_uses_fixed_detail() {
    let stub = StubTransport::new();
    stub.reply_text(404, "no such ticket");
    let app = app_with(&stub);

    let env = call(
        &app,
        "get_psa_ticket_status",
        json!({"msp_custom_domain": "acme", "ticket_id": "T-9"}),
    )
    .await;

    assert!(!env.success);
    assert_eq!(env.error.as_deref(), Some("Not Found"));
    assert_eq!(env.message.as_deref(), Some("Ticket not found"));
}

#[tokio::test]
async fn create_ticket_bad_request_surfaces_backend_text() {
    let stub = StubTransport::new();
    stub.reply_text(400, "boardId 99 does not exist");
    let app = app_with(&stub);

    let env = call(
        &app,
        "create_psa_ticket",
        json!({
            "msp_custom_domain": "acme",
            "psa_type": "ConnectWise",
            "summary": "VPN down",
            "description": "Nobody can connect",
            "board_id": 99,
            "user_id": "u-1",
            "priority_id": 0
        }),
    )
    .await;

    assert!(!env.success);
    assert_eq!(env.error.as_deref(), Some("Bad Request"));
    assert_eq!(env.message.as_deref(), Some("boardId 99 does not exist"));
    let body = stub.request(0).body.unwrap_or_default();
    assert!(body.get("priorityId").is_none());
    assert_eq!(body.get("userId"), Some(&json!("u-1")));
}

#[tokio::test]
async fn close_ticket_sends_board_zero_when_given() {
    let stub = StubTransport::new();
    stub.reply_json(200, json!({"closed": true}));
    let app = app_with(&stub);

    let env = call(
        &app,
        "close_psa_ticket",
        json!({"msp_custom_domain": "acme", "ticket_id": "T-1", "board_id": 0}),
    )
    .await;

    assert!(env.success);
    assert_eq!(stub.request(0).query_value("boardId"), Some("0"));
}

#[tokio::test]
async fn tickets_are_decoded_from_the_backend() {
    let stub = StubTransport::new();
    stub.reply_json(
        200,
        json!([{
            "id": "t-1",
            "title": "Printer jam",
            "status": "Open",
            "created_at": "2024-02-01T08:00:00Z",
            "updated_at": "2024-02-01T09:00:00Z"
        }]),
    );
    let app = app_with(&stub);

    let env = call(&app, "get_tickets_by_domain", json!({"domain": "acme"})).await;

    assert!(env.success);
    let tickets = env.payload("tickets").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["title"], json!("Printer jam"));
    assert_eq!(stub.request(0).query_value("domain"), Some("acme"));
}

#[tokio::test]
async fn malformed_tickets_are_rejected() {
    let stub = StubTransport::new();
    stub.reply_json(200, json!([{"id": "t-1"}]));
    let app = app_with(&stub);

    let env = call(&app, "get_tickets_by_domain", json!({"domain": "acme"})).await;

    assert!(!env.success);
    assert_eq!(env.error.as_deref(), Some("Invalid ticket data"));
}

#[tokio::test]
async fn weaviate_connection_reports_reachability() {
    let stub = StubTransport::new();
    stub.fail(TransportError::Request("connection refused".to_string()));
    let app = app_with(&stub);

    let env = call(&app, "test_weaviate_connection", json!({})).await;

    assert!(!env.success);
    assert_eq!(env.get("connected"), Some(&json!(false)));
}

#[tokio::test]
async fn weaviate_schema_check_reads_the_text_answer() {
    let stub = StubTransport::new();
    stub.reply_text(200, "Schema exists: TRUE").reply_text(200, "false");
    let app = app_with(&stub);

    let present = call(&app, "check_weaviate_schema", json!({})).await;
    let missing = call(&app, "check_weaviate_schema", json!({})).await;

    assert_eq!(present.payload("schema_exists"), Some(&json!(true)));
    assert_eq!(present.payload("raw_response"), Some(&json!("Schema exists: TRUE")));
    assert_eq!(missing.payload("schema_exists"), Some(&json!(false)));
    let request = stub.request(0);
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path_string(), "/weaviate/test/schema/exists");
}

#[tokio::test]
async fn existing_weaviate_schema_is_not_recreated() {
    let stub = StubTransport::new();
    stub.reply_text(200, "true");
    let app = app_with(&stub);

    let env = call(&app, "create_weaviate_schema", json!({})).await;

    assert!(env.success);
    assert_eq!(env.message.as_deref(), Some("Schema already exists"));
    assert_eq!(env.get("status"), Some(&json!("already_exists")));
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn missing_weaviate_schema_is_created() {
    let stub = StubTransport::new();
    stub.reply_text(200, "false").reply_text(200, "Schema created");
    let app = app_with(&stub);

    let env = call(&app, "create_weaviate_schema", json!({})).await;

    assert!(env.success);
    assert_eq!(env.message.as_deref(), Some("Schema created"));
    assert_eq!(env.get("status_code"), Some(&json!(200)));
    let create = stub.request(1);
    assert_eq!(create.method, Method::POST);
    assert_eq!(create.path_string(), "/weaviate/test/schema/create");
}

#[tokio::test]
async fn weaviate_schema_delete_reports_status() {
    let stub = StubTransport::new();
    stub.reply_text(200, "Schema deleted").reply_text(500, "locked");
    let app = app_with(&stub);

    let deleted = call(&app, "delete_weaviate_schema", json!({})).await;
    let refused = call(&app, "delete_weaviate_schema", json!({})).await;

    assert!(deleted.success);
    assert_eq!(deleted.message.as_deref(), Some("Schema deleted"));
    let request = stub.request(0);
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.path_string(), "/weaviate/test/schema/delete");

    assert!(!refused.success);
    assert_eq!(refused.error.as_deref(), Some("Failed with status 500"));
    assert_eq!(refused.message.as_deref(), Some("locked"));
    assert_eq!(refused.get("status_code"), Some(&json!(500)));
}

#[tokio::test]
async fn completing_a_connectwise_ticket_sends_only_set_options() {
    let stub = StubTransport::new();
    stub.reply_text(200, "").reply_text(200, "");
    let app = app_with(&stub);

    let bare = call(
        &app,
        "complete_connectwise_ticket",
        json!({
            "msp_custom_domain": "acme",
            "ticket_id": "881",
            "board_id": 4,
            "technician_id": "tech-2",
            "completion_notes": ""
        }),
    )
    .await;
    let full = call(
        &app,
        "complete_connectwise_ticket",
        json!({
            "msp_custom_domain": "acme",
            "ticket_id": "882",
            "board_id": 4,
            "technician_id": "tech-2",
            "completion_notes": "Replaced PSU",
            "final_status": "Closed"
        }),
    )
    .await;

    assert!(bare.success);
    assert_eq!(bare.message.as_deref(), Some("Ticket completed successfully"));
    assert!(full.success);

    let first = stub.request(0);
    assert_eq!(first.method, Method::POST);
    assert_eq!(first.path_string(), "/completeTicketForQueueAndConnectwise");
    assert_eq!(first.query_value("ticketId"), Some("881"));
    assert_eq!(first.query_value("boardId"), Some("4"));
    assert_eq!(first.query_value("techId"), Some("tech-2"));
    assert_eq!(first.query_value("notes"), None);
    assert_eq!(first.query_value("status"), None);
    assert!(first.body.is_none());

    let second = stub.request(1);
    assert_eq!(second.query_value("notes"), Some("Replaced PSU"));
    assert_eq!(second.query_value("status"), Some("Closed"));
}

#[tokio::test]
async fn connectwise_note_flags_travel_in_the_query() {
    let stub = StubTransport::new();
    stub.reply_json(200, json!({"id": 31}));
    let app = app_with(&stub);

    let env = call(
        &app,
        "add_note_to_connectwise_ticket",
        json!({
            "msp_custom_domain": "acme",
            "ticket_id": 42,
            "note_text": "Root cause: expired cert",
            "note_type": "analysis",
            "is_resolution": true
        }),
    )
    .await;

    assert!(env.success);
    assert_eq!(env.payload("note"), Some(&json!({"id": 31})));
    let request = stub.request(0);
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path_string(), "/addNoteToTicketObject");
    assert_eq!(request.query_value("mspCustomDomain"), Some("acme"));
    assert_eq!(request.query_value("ticketId"), Some("42"));
    assert_eq!(request.query_value("detailDescriptionFlag"), Some("false"));
    assert_eq!(request.query_value("internalAnalysisFlag"), Some("true"));
    assert_eq!(request.query_value("resolutionFlag"), Some("true"));
    assert_eq!(
        request.body,
        Some(json!({
            "info": "Note added via MCP - Type: analysis",
            "text": "Root cause: expired cert"
        }))
    );
}

#[tokio::test]
async fn connectwise_update_puts_to_the_ticket_path() {
    let stub = StubTransport::new();
    stub.reply_json(200, json!({"id": 77, "summary": "VPN down"}));
    let app = app_with(&stub);

    let env = call(
        &app,
        "update_connectwise_ticket",
        json!({
            "msp_custom_domain": "acme",
            "ticket_id": "77",
            "summary": "VPN down",
            "description": "",
            "priority_id": 2,
            "status_id": 0
        }),
    )
    .await;

    assert!(env.success);
    assert_eq!(env.payload("updated_ticket"), Some(&json!({"id": 77, "summary": "VPN down"})));
    let request = stub.request(0);
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.path_string(), "/updateTicket/77");
    assert_eq!(request.query_value("mspCustomDomain"), Some("acme"));
    assert_eq!(request.body, Some(json!({"summary": "VPN down", "priorityId": 2})));
}

#[tokio::test]
async fn connectwise_notes_path_follows_detail_flag() {
    let stub = StubTransport::new();
    stub.reply_json(200, json!([{"id": 1, "text": "first"}]))
        .reply_json(200, json!(["first"]));
    let app = app_with(&stub);

    let detailed = call(
        &app,
        "get_connectwise_ticket_notes",
        json!({"msp_custom_domain": "acme", "ticket_id": "9"}),
    )
    .await;
    let plain = call(
        &app,
        "get_connectwise_ticket_notes",
        json!({"msp_custom_domain": "acme", "ticket_id": "9", "detailed": false}),
    )
    .await;

    assert_eq!(detailed.payload("notes"), Some(&json!([{"id": 1, "text": "first"}])));
    assert_eq!(plain.payload("notes"), Some(&json!(["first"])));
    assert_eq!(stub.request(0).path_string(), "/getConnectWiseTicketNotesById");
    assert_eq!(stub.request(1).path_string(), "/getTicketNotesById");
    assert_eq!(stub.request(1).query_value("ticketId"), Some("9"));
}

#[tokio::test]
async fn single_board_sync_posts_one_request() {
    let stub = StubTransport::new();
    stub.reply_text(200, "queued");
    let app = app_with(&stub);

    let env = call(
        &app,
        "sync_connectwise_board_tickets",
        json!({
            "msp_custom_domain": "acme",
            "board_id": 4,
            "board_name": "Service Board",
            "sync_from_date": "2024-01-01",
            "sync_statuses": ["Open", "In Progress"]
        }),
    )
    .await;

    assert!(env.success);
    assert_eq!(env.message.as_deref(), Some("Board tickets sync initiated successfully"));
    assert_eq!(env.get("boards_synced"), Some(&json!(1)));
    let request = stub.request(0);
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path_string(), "/syncBoardTickets");
    assert_eq!(request.query_value("mspCustomDomain"), Some("acme"));
    assert_eq!(request.timeout, Duration::from_secs(60));
    assert_eq!(
        request.body,
        Some(json!([{
            "boardId": 4,
            "boardName": "Service Board",
            "syncFromDate": "2024-01-01",
            "syncStatus": ["Open", "In Progress"]
        }]))
    );
}

#[tokio::test]
async fn multiple_board_sync_sends_every_config() {
    let stub = StubTransport::new();
    stub.reply_text(200, "queued").reply_text(500, "sync busy");
    let app = app_with(&stub);
    let args = json!({
        "msp_custom_domain": "acme",
        "board_configs": [
            {"board_id": 1, "board_name": "Service"},
            {"board_id": 3, "board_name": "Projects", "sync_statuses": ["New"]}
        ]
    });

    let env = call(&app, "sync_multiple_connectwise_boards", args.clone()).await;
    let busy = call(&app, "sync_multiple_connectwise_boards", args).await;

    assert!(env.success);
    assert_eq!(env.get("boards_synced"), Some(&json!(2)));
    assert_eq!(
        stub.request(0).body,
        Some(json!([
            {"boardId": 1, "boardName": "Service"},
            {"boardId": 3, "boardName": "Projects", "syncStatus": ["New"]}
        ]))
    );
    assert!(!busy.success);
    assert!(busy.get("boards_synced").is_none());
}

#[tokio::test]
async fn quick_time_entry_is_billable_and_dated_today() {
    let stub = StubTransport::new();
    stub.reply_json(200, json!({"success": true, "id": 12}));
    let app = app_with(&stub);

    let env = call(
        &app,
        "log_quick_time_entry",
        json!({
            "msp_custom_domain": "acme",
            "ticket_id": "55",
            "technician_id": "tech-3",
            "time_minutes": 45,
            "work_description": "Reset MFA"
        }),
    )
    .await;

    assert!(env.success);
    let request = stub.request(0);
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path_string(), "/api/psa/time-entries");
    assert_eq!(
        request.body,
        Some(json!({
            "mspCustomDomain": "acme",
            "ticketId": "55",
            "technicianId": "tech-3",
            "timeSpent": 45,
            "notes": "Reset MFA",
            "billable": true,
            "workDate": today()
        }))
    );
}

#[tokio::test]
async fn tenant_wide_psa_sync_is_scoped_to_all_domains() {
    let stub = StubTransport::new();
    stub.reply_text(200, "Sync started for 3 domains")
        .fail(TransportError::Timeout(Duration::from_secs(60)));
    let app = app_with(&stub);

    let started = call(&app, "sync_all_psa_tickets", json!({})).await;
    let slow = call(&app, "sync_all_psa_tickets", json!({})).await;

    assert!(started.success);
    assert_eq!(started.message.as_deref(), Some("Sync started for 3 domains"));
    assert_eq!(started.get("scope"), Some(&json!("all_domains")));
    let request = stub.request(0);
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path_string(), "/psa/sync/all");
    assert!(request.query.is_empty());

    assert!(!slow.success);
    assert_eq!(slow.error.as_deref(), Some("Sync operation timed out"));
    assert_eq!(slow.get("scope"), Some(&json!("all_domains")));
}
