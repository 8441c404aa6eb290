//! Integration tests for `CwClient` against a mock ConnectWise server.

use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cwdesk::config::{Config, Credentials};
use cwdesk::cw_client::CwClient;
use cwdesk::error::CwError;
use cwdesk::models::StatusTarget;

/// Base64 of "acme+pubkey:privkey".
const TOKEN: &str = "YWNtZStwdWJrZXk6cHJpdmtleQ==";

fn test_config(server: &MockServer) -> Config {
    Config::new(Credentials::new("acme", "pubkey", "privkey", "client-123"))
        .with_base_url(server.uri())
        .expect("mock server URI is valid")
}

fn test_client(server: &MockServer) -> CwClient {
    CwClient::new(&test_config(server)).expect("Failed to create test client")
}

fn ticket_json(id: u64) -> serde_json::Value {
    json!({
        "id": id,
        "summary": "Backup failed: SRV01",
        "board": {"id": 12, "name": "Backup Tickets"},
        "status": {"id": 501, "name": "New"},
        "company": {"id": 123, "identifier": "ACME", "name": "Acme Inc"}
    })
}

/// Returns the decoded value of a query parameter from the only received request.
async fn received_query_param(server: &MockServer, key: &str) -> Option<String> {
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1, "expected exactly one request");
    requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

// ============================================================================
// Construction and connection test
// ============================================================================

#[tokio::test]
async fn test_new_makes_no_request() {
    let server = MockServer::start().await;
    let _client = test_client(&server);

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_connect_issues_single_validation_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/company/contacts"))
        .and(query_param("pageSize", "1"))
        .and(query_param(
            "childconditions",
            "communicationItems/value='check@example.com'",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server).with_check_email("check@example.com");
    let result = CwClient::connect(&config).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_check_connection_without_contact_email_reads_one_contact() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/company/contacts"))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(test_client(&server).check_connection().await);

    let requests = server.received_requests().await.unwrap_or_default();
    let params: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(params, vec![("pageSize".to_string(), "1".to_string())]);
}

#[tokio::test]
async fn test_connect_fails_on_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/company/contacts"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
        .expect(1)
        .mount(&server)
        .await;

    let err = CwClient::connect(&test_config(&server)).await.err().unwrap();
    assert!(matches!(err, CwError::ConnectionTest { .. }));
    assert!(err.to_string().contains("Authentication failed"));
}

#[tokio::test]
async fn test_connect_fails_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/company/contacts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let err = CwClient::connect(&test_config(&server)).await.err().unwrap();
    assert!(matches!(err, CwError::ConnectionTest { .. }));
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("database unavailable"));
}

#[tokio::test]
async fn test_default_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/company/contacts"))
        .and(header("authorization", format!("Basic {}", TOKEN).as_str()))
        .and(header("clientid", "client-123"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(test_client(&server).check_connection().await);
}

#[tokio::test]
async fn test_header_override_replaces_defaults() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/company/contacts"))
        .and(header("x-api-key", "override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("x-api-key", HeaderValue::from_static("override"));
    let client = CwClient::new(&test_config(&server).with_headers(headers)).unwrap();

    assert_ok!(client.check_connection().await);

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests[0].headers.get("authorization").is_none());
}

// ============================================================================
// Company lookup
// ============================================================================

#[tokio::test]
async fn test_lookup_company_id_by_email() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/company/contacts"))
        .and(query_param("pageSize", "1"))
        .and(query_param(
            "childconditions",
            "communicationItems/value='x@y.com'",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"company": {"id": 42}}])))
        .expect(1)
        .mount(&server)
        .await;

    let company_id = assert_ok!(test_client(&server).lookup_company_id_by_email("x@y.com").await);
    assert_eq!(company_id, Some("42".to_string()));
}

#[tokio::test]
async fn test_lookup_company_id_empty_result_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/company/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let company_id = assert_ok!(test_client(&server).lookup_company_id_by_email("x@y.com").await);
    assert_eq!(company_id, None);
}

#[tokio::test]
async fn test_lookup_company_id_rejects_quote_without_request() {
    let server = MockServer::start().await;

    let err = assert_err!(
        test_client(&server)
            .lookup_company_id_by_email("x' or '1'='1")
            .await
    );
    assert!(matches!(err, CwError::Validation(_)));

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

// ============================================================================
// Ticket queries
// ============================================================================

#[tokio::test]
async fn test_list_backup_tickets_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/tickets"))
        .and(query_param("pageSize", "50"))
        .and(query_param("page", "Last"))
        .and(query_param("orderBy", "dateEntered desc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([ticket_json(2), ticket_json(1)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tickets = assert_ok!(test_client(&server).list_backup_tickets("123").await);
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0].id, 2);
    assert_eq!(tickets[0].display_board(), "Backup Tickets");

    let conditions = received_query_param(&server, "conditions").await.unwrap();
    assert!(conditions.contains("company/id=123"));
    assert!(conditions.contains("board/name='Backup Tickets'"));
}

#[tokio::test]
async fn test_list_backup_tickets_rejects_non_numeric_company() {
    let server = MockServer::start().await;

    let err = assert_err!(test_client(&server).list_backup_tickets("123 or 1=1").await);
    assert!(matches!(err, CwError::Validation(_)));
}

#[tokio::test]
async fn test_list_backup_tickets_uses_configured_board() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/tickets"))
        .and(query_param(
            "conditions",
            "company/id=7 and board/name='Offsite Backups'",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server).with_backup_board("Offsite Backups");
    let client = CwClient::new(&config).unwrap();

    let tickets = assert_ok!(client.list_backup_tickets("7").await);
    assert!(tickets.is_empty());
}

#[tokio::test]
async fn test_list_open_backup_tickets_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/tickets"))
        .and(query_param("pageSize", "1000"))
        .and(query_param("page", "Last"))
        .and(query_param("orderBy", "dateEntered desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ticket_json(5)])))
        .expect(1)
        .mount(&server)
        .await;

    let tickets = assert_ok!(test_client(&server).list_open_backup_tickets().await);
    assert_eq!(tickets.len(), 1);

    let conditions = received_query_param(&server, "conditions").await.unwrap();
    assert_eq!(
        conditions,
        "board/name='Backup Tickets' and (status/name='New' or status/name='In Progress')"
    );
    assert!(!conditions.contains("company/id"));
}

#[tokio::test]
async fn test_get_ticket_returns_first_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/tickets"))
        .and(query_param("pageSize", "1"))
        .and(query_param("conditions", "id=999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ticket_json(999)])))
        .expect(1)
        .mount(&server)
        .await;

    let ticket = assert_ok!(test_client(&server).get_ticket(999).await);
    assert_eq!(ticket.id, 999);
    assert_eq!(ticket.display_summary(), "Backup failed: SRV01");
}

#[tokio::test]
async fn test_get_ticket_empty_result_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = assert_err!(test_client(&server).get_ticket(999).await);
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "not found: ticket 999");
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_close_ticket_patch_body() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/service/tickets/999"))
        .and(body_json(
            json!([{"op": "replace", "path": "status/id", "value": 696}]),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json(999)))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(test_client(&server).close_ticket(999).await);
}

#[tokio::test]
async fn test_close_ticket_resolves_named_status_on_ticket_board() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/tickets"))
        .and(query_param("conditions", "id=999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ticket_json(999)])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/service/boards/12/statuses"))
        .and(query_param("conditions", "name='>Closed'"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 700, "name": ">Closed", "closedStatus": true}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/service/tickets/999"))
        .and(body_json(
            json!([{"op": "replace", "path": "status/id", "value": 700}]),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json(999)))
        .expect(1)
        .mount(&server)
        .await;

    let config =
        test_config(&server).with_closed_status(StatusTarget::Name(">Closed".to_string()));
    let client = CwClient::new(&config).unwrap();

    assert_ok!(client.close_ticket(999).await);
}

#[tokio::test]
async fn test_close_ticket_unknown_status_name_sends_no_patch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ticket_json(999)])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/service/boards/12/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config =
        test_config(&server).with_closed_status(StatusTarget::Name("Resolved".to_string()));
    let client = CwClient::new(&config).unwrap();

    let err = assert_err!(client.close_ticket(999).await);
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Resolved"));
}

#[tokio::test]
async fn test_set_ticket_status() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/service/tickets/5"))
        .and(body_json(
            json!([{"op": "replace", "path": "status/id", "value": 42}]),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json(5)))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(test_client(&server).set_ticket_status(5, 42).await);
}

#[tokio::test]
async fn test_add_internal_note_post_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/service/tickets/999/notes"))
        .and(body_json(json!({"text": "hello", "internalAnalysisFlag": "true"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 1, "ticketId": 999})),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(test_client(&server).add_internal_note(999, "hello").await);
}

#[tokio::test]
async fn test_find_board_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/boards"))
        .and(query_param("conditions", "name='Backup Tickets'"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 12, "name": "Backup Tickets"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let board_id = assert_ok!(test_client(&server).find_board_id("Backup Tickets").await);
    assert_eq!(board_id, 12);
}

// ============================================================================
// Error propagation
// ============================================================================

#[tokio::test]
async fn test_server_error_propagates_from_every_operation() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let client = test_client(&server);

    let errors = vec![
        client.lookup_company_id_by_email("x@y.com").await.err(),
        client.list_backup_tickets("123").await.err(),
        client.list_open_backup_tickets().await.err(),
        client.get_ticket(999).await.err(),
        client.close_ticket(999).await.err(),
        client.add_internal_note(999, "hello").await.err(),
        client.find_board_id("Backup Tickets").await.err(),
        client.resolve_status_id(12, ">Closed").await.err(),
    ];

    for err in errors {
        let err = err.expect("operation should fail on HTTP 500");
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(matches!(err, CwError::HttpStatus { ref body, .. } if body == "internal error"));
    }
}

#[tokio::test]
async fn test_error_body_is_sanitized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/tickets"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(format!("rejected header Basic {} for privkey", TOKEN)),
        )
        .mount(&server)
        .await;

    let err = assert_err!(test_client(&server).get_ticket(1).await);
    let message = err.to_string();
    assert!(!message.contains(TOKEN));
    assert!(!message.contains("privkey"));
    assert!(message.contains("[REDACTED]"));
}

#[tokio::test]
async fn test_malformed_json_is_serialization_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = assert_err!(test_client(&server).list_open_backup_tickets().await);
    assert!(matches!(err, CwError::Serialization(_)));
}
