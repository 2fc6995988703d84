//! HTTP contract tests for `HttpApi`.
//!
//! Each test mounts a wiremock server that only answers the exact method,
//! path, headers and body the client is expected to send, then checks how
//! the response (or error) is surfaced.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taskflow::api::http::HttpApi;
use taskflow::api::{ApiError, TodoApi};
use taskflow::store::TodoStore;
use taskflow_proto::todo::{NewTodo, Priority, TodoId, TodoPatch};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TOKEN: &str = "tok-123";

fn api(server: &MockServer) -> HttpApi {
    HttpApi::new(&server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_token(TOKEN)
}

fn todo_json(id: &str, title: &str, order_index: u32) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": "user-1",
        "title": title,
        "description": null,
        "due_date": "2026-05-01T12:00:00Z",
        "priority": "high",
        "completed": false,
        "notify_enabled": true,
        "notify_frequency": 60,
        "order_index": order_index,
        "created_at": "2026-04-30T09:00:00Z",
        "updated_at": "2026-04-30T09:00:00Z"
    })
}

fn bearer() -> (&'static str, String) {
    ("authorization", format!("Bearer {TOKEN}"))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_posts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"username": "alice", "password": "s3cret"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": "new-token", "user_id": "user-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let response = api.login("alice", "s3cret").await.unwrap();
    assert_eq!(response.token, "new-token");
    assert_eq!(response.user_id, "user-1");
}

#[tokio::test]
async fn list_sends_bearer_token_and_decodes() {
    let server = MockServer::start().await;
    let (name, value) = bearer();
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .and(header(name, value.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([todo_json("a", "Buy milk", 0), todo_json("b", "Pay rent", 1)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let todos = api(&server).list_todos().await.unwrap();
    assert_eq!(todos.len(), 2);
    assert_eq!(todos[0].id, TodoId::new("a"));
    assert_eq!(todos[0].owner_id, "user-1");
    assert_eq!(todos[0].priority, Priority::High);
    assert_eq!(todos[0].notify_frequency_minutes, 60);
    assert_eq!(todos[1].order_index, 1);
}

#[tokio::test]
async fn list_null_body_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    assert!(api(&server).list_todos().await.unwrap().is_empty());
}

#[tokio::test]
async fn no_token_means_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), Duration::from_secs(5)).unwrap();
    api.list_todos().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn create_omits_unset_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/todos"))
        .and(body_json(json!({
            "title": "Pay rent",
            "priority": "low",
            "notify_frequency": 30,
            "order_index": 2
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(todo_json("c", "Pay rent", 2)))
        .expect(1)
        .mount(&server)
        .await;

    let body = NewTodo {
        priority: Some(Priority::Low),
        notify_frequency_minutes: Some(30),
        order_index: Some(2),
        ..NewTodo::new("Pay rent")
    };
    let created = api(&server).create_todo(&body).await.unwrap();
    assert_eq!(created.id, TodoId::new("c"));
}

#[tokio::test]
async fn update_puts_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/todos/a"))
        .and(body_json(json!({"title": "Buy oat milk", "description": null})))
        .respond_with(ResponseTemplate::new(200).set_body_json(todo_json("a", "Buy oat milk", 0)))
        .expect(1)
        .mount(&server)
        .await;

    let patch = TodoPatch {
        title: Some("Buy oat milk".to_string()),
        description: Some(None),
        ..TodoPatch::default()
    };
    let updated = api(&server)
        .update_todo(&TodoId::new("a"), &patch)
        .await
        .unwrap();
    assert_eq!(updated.title, "Buy oat milk");
}

#[tokio::test]
async fn complete_uses_dedicated_endpoint() {
    let server = MockServer::start().await;
    let mut done = todo_json("a", "Buy milk", 0);
    done["completed"] = json!(true);
    Mock::given(method("POST"))
        .and(path("/api/todos/a/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done))
        .expect(1)
        .mount(&server)
        .await;

    let todo = api(&server).complete_todo(&TodoId::new("a")).await.unwrap();
    assert!(todo.completed);
}

#[tokio::test]
async fn delete_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/todos/a"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    api(&server).delete_todo(&TodoId::new("a")).await.unwrap();
}

#[tokio::test]
async fn todo_id_stays_inside_its_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/todos/..%2Flogin"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/todos/a%3Fx=1/complete"))
        .and(query_param_is_missing("x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(todo_json("a?x=1", "odd", 0)))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server);
    api.delete_todo(&TodoId::new("../login")).await.unwrap();
    api.complete_todo(&TodoId::new("a?x=1")).await.unwrap();
}

#[tokio::test]
async fn dot_segment_id_is_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let err = api(&server).delete_todo(&TodoId::new("..")).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidId(ref id) if id == ".."));
}

#[tokio::test]
async fn reorder_patches_full_id_list() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/todos/reorder"))
        .and(body_json(json!({"todo_ids": ["c", "a", "b"]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let ids = [TodoId::new("c"), TodoId::new("a"), TodoId::new("b")];
    api(&server).reorder_todos(&ids).await.unwrap();
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/taskflow/api/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(&format!("{}/taskflow", server.uri()), Duration::from_secs(5)).unwrap();
    api.list_todos().await.unwrap();
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Title is required"})))
        .mount(&server)
        .await;

    let err = api(&server)
        .create_todo(&NewTodo::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
    assert_eq!(err.to_string(), "Title is required");
}

#[tokio::test]
async fn non_json_error_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = api(&server).list_todos().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "HTTP error! status: 500");
}

#[tokio::test]
async fn unauthorized_is_flagged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "invalid token"})))
        .mount(&server)
        .await;

    let err = api(&server).list_todos().await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn undecodable_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = api(&server).list_todos().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let api = HttpApi::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let err = api.list_todos().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), Duration::from_millis(200)).unwrap();
    let err = api.list_todos().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

// ---------------------------------------------------------------------------
// Store over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_complete_hits_complete_then_refetches() {
    let server = MockServer::start().await;
    let (name, value) = bearer();
    Mock::given(method("POST"))
        .and(path("/api/todos/a/complete"))
        .and(header(name, value.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(todo_json("a", "Buy milk", 0)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([todo_json("a", "Buy milk", 0)])))
        .expect(2)
        .mount(&server)
        .await;

    let mut store = TodoStore::new(api(&server), Some("user-1".to_string()));
    store.list().await.unwrap();
    store
        .update(&TodoId::new("a"), TodoPatch::completed(true))
        .await
        .unwrap();
}

#[tokio::test]
async fn store_reorder_sends_moved_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            todo_json("A", "first", 0),
            todo_json("B", "second", 1),
            todo_json("C", "third", 2)
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/todos/reorder"))
        .and(body_json(json!({"todo_ids": ["C", "A", "B"]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = TodoStore::new(api(&server), Some("user-1".to_string()));
    store.list().await.unwrap();
    let moved = store
        .move_before(&TodoId::new("C"), &TodoId::new("A"))
        .await
        .unwrap();
    assert!(moved);

    let order: Vec<String> = store.todos().iter().map(|t| t.id.to_string()).collect();
    assert_eq!(order, ["C", "A", "B"]);
}
