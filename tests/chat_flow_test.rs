mod common;

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use querychat::chat::{dispatch, ChatController, ExchangeOutcome, ResponseKind, Role};

async fn mount_listing(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/chat/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_first_message_creates_and_activates_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (auth, _) = common::file_auth(&dir, Some("tok"));
    let client = common::client_for(&server, auth);

    mount_listing(&server, json!([{"id": "old", "title": "Older chat"}])).await;
    Mock::given(method("POST"))
        .and(path("/chat/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chat_id": "c-1",
            "title": "Top products",
            "response": {
                "type": "table",
                "content": "Here they are",
                "sql_query": "SELECT name FROM products LIMIT 2",
                "data": [{"name": "lamp"}, {"name": "desk"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = ChatController::new(Arc::new(client));
    controller.load_history().await.unwrap();
    assert_eq!(controller.current_session_id(), None);

    let outcome = controller.send_message("top products?").await.unwrap();
    assert!(matches!(outcome, ExchangeOutcome::Succeeded));

    assert_eq!(controller.current_session_id(), Some("c-1"));
    assert_eq!(controller.registry().first_id(), Some("c-1"));
    assert_eq!(controller.registry().len(), 2);

    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].response_kind, Some(ResponseKind::Table));
    assert_eq!(messages[1].tabular_result.as_ref().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_legacy_history_with_invalid_payload_renders_as_text() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (auth, _) = common::file_auth(&dir, Some("tok"));
    let client = common::client_for(&server, auth);

    mount_listing(&server, json!([{"id": "a", "title": "A"}, {"id": "b", "title": "B"}])).await;
    Mock::given(method("GET"))
        .and(path("/chat/history/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"id": 1, "role": "user", "content": "list orders"},
                {"id": 2, "role": "assistant", "content": "not json", "response_type": "table"},
                {
                    "id": 3,
                    "role": "assistant",
                    "response_type": "table",
                    "content": "{\"data\": [{\"id\": 1}, {\"id\": 2}], \"sql_query\": \"SELECT id FROM orders\"}"
                }
            ]
        })))
        .mount(&server)
        .await;

    let mut controller = ChatController::new(Arc::new(client));
    controller.load_history().await.unwrap();
    controller.select_session("b").await.unwrap();

    let messages = controller.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content, "not json");
    assert!(messages[1].tabular_result.is_none());
    assert_eq!(messages[2].content, "Query returned 2 rows");
    assert_eq!(messages[2].sql_query.as_deref(), Some("SELECT id FROM orders"));
    assert_eq!(messages[2].tabular_result.as_ref().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_reply_for_abandoned_session_is_discarded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (auth, _) = common::file_auth(&dir, Some("tok"));
    let client = common::client_for(&server, auth);

    mount_listing(&server, json!([{"id": "a", "title": "A"}, {"id": "b", "title": "B"}])).await;
    for id in ["a", "b"] {
        Mock::given(method("GET"))
            .and(path(format!("/chat/history/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/chat/continue/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"type": "text", "content": "late answer"}
        })))
        .mount(&server)
        .await;

    let mut controller = ChatController::new(Arc::new(client));
    controller.load_history().await.unwrap();
    controller.select_session("a").await.unwrap();

    let pending = controller.begin_send("question for a").unwrap();
    let reply = dispatch(controller.api().as_ref(), &pending).await;

    // The user moved on before the reply was applied.
    controller.select_session("b").await.unwrap();
    let outcome = controller.complete_send(pending, reply).unwrap();

    assert!(matches!(outcome, ExchangeOutcome::Discarded));
    assert_eq!(controller.current_session_id(), Some("b"));
    assert!(controller.messages().is_empty());
    assert!(!controller.is_sending());
}

#[tokio::test]
async fn test_failed_send_appends_error_message() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (auth, _) = common::file_auth(&dir, Some("tok"));
    let client = common::client_for(&server, auth.clone());

    mount_listing(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/chat/new"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut controller = ChatController::new(Arc::new(client));
    controller.load_history().await.unwrap();

    let outcome = controller.send_message("hello").await.unwrap();
    assert!(matches!(outcome, ExchangeOutcome::Failed { .. }));

    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::Error);
    assert!(controller.registry().is_empty());
    assert!(!controller.is_sending());
    assert!(auth.is_authenticated());
}

#[tokio::test]
async fn test_flagged_reply_rows_are_fetched_when_history_omits_them() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (auth, _) = common::file_auth(&dir, Some("tok"));
    let client = common::client_for(&server, auth);

    mount_listing(&server, json!([{"id": "x", "title": "Sales by zone"}])).await;
    Mock::given(method("GET"))
        .and(path("/chat/history/x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"id": 10, "role": "user", "content": "sales by zone"},
                {
                    "id": 11,
                    "role": "assistant",
                    "content": "Sales per zone",
                    "response_type": "table",
                    "sql_query": "SELECT zone, amount, month FROM sales",
                    "has_data": true
                },
                {"id": 12, "role": "assistant", "content": "Anything else?", "response_type": "text"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chat/data/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message_id": 11,
            "data": [
                {"zone": "EU", "amount": 3, "month": "2024-01"},
                {"zone": "US", "amount": 5, "month": "2024-01"}
            ],
            "columns": ["zone", "amount", "month"],
            "shape": [2, 3]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = ChatController::new(Arc::new(client));
    controller.load_history().await.unwrap();
    controller.select_session("x").await.unwrap();

    let messages = controller.messages();
    assert_eq!(messages.len(), 3);
    let rows = messages[1].tabular_result.as_ref().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].keys().cloned().collect::<Vec<_>>(),
        vec!["zone", "amount", "month"]
    );
    assert_eq!(messages[1].content, "Sales per zone");
    assert_eq!(messages[1].row_count, Some(2));
    assert!(messages[2].tabular_result.is_none());
}

#[tokio::test]
async fn test_failed_row_fetch_still_shows_history() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (auth, _) = common::file_auth(&dir, Some("tok"));
    let client = common::client_for(&server, auth.clone());

    mount_listing(&server, json!([{"id": "x", "title": "X"}])).await;
    Mock::given(method("GET"))
        .and(path("/chat/history/x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"id": 11, "role": "assistant", "content": "rows", "response_type": "table", "has_data": true}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chat/data/11"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "gone"})))
        .mount(&server)
        .await;

    let mut controller = ChatController::new(Arc::new(client));
    controller.load_history().await.unwrap();
    controller.select_session("x").await.unwrap();

    assert_eq!(controller.messages().len(), 1);
    assert!(controller.messages()[0].tabular_result.is_none());
    assert!(auth.is_authenticated());
}
