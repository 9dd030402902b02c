use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use colabri_rooms::{
    config::Config,
    models::DocumentSnapshot,
    routes::create_app,
    state::AppState,
    stores::{DocumentStore, StoreError, StoreResult, Stores},
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn test_config() -> Config {
    Config {
        jwt_secret: Some("test-secret".to_string()),
        ..Config::default()
    }
}

/// Document store whose backend never answers
struct UnreachableDocuments;

#[async_trait]
impl DocumentStore for UnreachableDocuments {
    async fn get(&self, _room_id: &str) -> StoreResult<Option<DocumentSnapshot>> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn create_if_absent(&self, _room_id: &str, _content: &str, _creator: Uuid) -> StoreResult<DocumentSnapshot> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn upsert(&self, _room_id: &str, _content: &str, _editor: Uuid) -> StoreResult<DocumentSnapshot> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn update_content(&self, _room_id: &str, _content: &str) -> StoreResult<Option<DocumentSnapshot>> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(StoreError::Backend("connection refused".to_string()))
    }
}

struct TestApp {
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with(test_config(), Stores::in_memory())
    }

    fn with(config: Config, stores: Stores) -> Self {
        let state = AppState::new(config, stores);
        let router = create_app(state.clone());
        Self { state, router }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    /// Register a user and return its token and id
    async fn register(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "secret-pass",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn health_and_ready_are_public() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = app.call(Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn not_ready_while_the_document_store_is_down() {
    let stores = Stores {
        documents: Arc::new(UnreachableDocuments),
        ..Stores::in_memory()
    };
    let app = TestApp::with(test_config(), stores);

    let (status, body) = app.call(Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Document store unavailable");

    let (status, _) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_hashing_leaves_the_runtime_responsive() {
    let app = TestApp::new();
    let worst_gap_ms = Arc::new(AtomicU64::new(0));

    let ticker = tokio::spawn({
        let worst_gap_ms = worst_gap_ms.clone();
        async move {
            let mut last = Instant::now();
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                let gap = last.elapsed().as_millis() as u64;
                worst_gap_ms.fetch_max(gap, Ordering::Relaxed);
                last = Instant::now();
            }
        }
    });
    tokio::task::yield_now().await;

    app.register("alice").await;
    let (status, _) = app
        .call(Method::POST, "/api/auth/login", None, Some(json!({"identity": "alice", "password": "secret-pass"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    ticker.abort();

    let worst = worst_gap_ms.load(Ordering::Relaxed);
    assert!(worst < 200, "runtime stalled for {} ms while hashing", worst);
}

#[tokio::test]
async fn no_tokens_are_issued_without_a_signing_secret() {
    let app = TestApp::with(Config::default(), Stores::in_memory());

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"username": "alice", "email": "alice@example.com", "password": "secret-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server error");

    let (status, _) = app.call(Method::GET, "/api/rooms/my-rooms", Some("anything"), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn register_then_login_by_email_or_username() {
    let app = TestApp::new();
    let (_, id) = app.register("alice").await;

    for login in ["alice", "alice@example.com"] {
        let (status, body) = app
            .call(Method::POST, "/api/auth/login", None, Some(json!({"identity": login, "password": "secret-pass"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], id.as_str());
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    let (status, body) = app
        .call(Method::POST, "/api/auth/login", None, Some(json!({"identity": "alice", "password": "wrong-pass"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn registration_rejects_duplicates_and_short_passwords() {
    let app = TestApp::new();
    app.register("alice").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"username": "alice", "email": "other@example.com", "password": "secret-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"username": "bob", "email": "bob@example.com", "password": "12345"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/api/rooms/my-rooms", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, body) = app.call(Method::GET, "/api/rooms/my-rooms", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn room_lifecycle_over_http() {
    let app = TestApp::new();
    let (alice, alice_id) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;

    let (status, body) = app
        .call(Method::POST, "/api/rooms", Some(&alice), Some(json!({"name": "  Pairing  "})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["room"]["name"], "Pairing");
    assert_eq!(body["room"]["createdBy"], alice_id.as_str());
    let room_id = body["room"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, &format!("/api/rooms/{}", room_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room"]["roomId"], room_id.as_str());

    let join_uri = format!("/api/rooms/{}/join", room_id);
    let (status, body) = app.call(Method::POST, &join_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Joined room successfully");
    assert_eq!(body["room"]["participantsCount"], 2);

    let (_, body) = app.call(Method::POST, &join_uri, Some(&bob), None).await;
    assert_eq!(body["message"], "Already in room");

    let (status, body) = app.call(Method::GET, "/api/rooms/my-rooms", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let rooms = body["rooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["createdBy"], "alice");
    let names: Vec<&str> = rooms[0]["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);

    let (status, body) = app.call(Method::GET, &format!("/api/rooms/user/{}", alice_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rooms"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn room_validation_and_unknown_rooms() {
    let app = TestApp::new();
    let (alice, _) = app.register("alice").await;

    let (status, _) = app.call(Method::POST, "/api/rooms", Some(&alice), Some(json!({"name": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::POST, "/api/rooms", Some(&alice), Some(json!({"name": "x".repeat(51)})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.call(Method::POST, "/api/rooms/missing/join", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Room not found");

    let (status, _) = app.call(Method::GET, "/api/rooms/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::GET, "/api/rooms/user/not-a-uuid", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn documents_can_be_read_and_replaced_but_not_created() {
    let app = TestApp::new();
    let (alice, alice_id) = app.register("alice").await;

    let (status, _) = app.call(Method::GET, "/api/documents/r1", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call(Method::PUT, "/api/documents/r1", Some(&alice), Some(json!({"content": "nope"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let creator = alice_id.parse().unwrap();
    app.state.stores.documents.create_if_absent("r1", "seed", creator).await.unwrap();

    let (status, body) = app
        .call(Method::PUT, "/api/documents/r1", Some(&alice), Some(json!({"content": "from http"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "from http");

    let (_, body) = app.call(Method::GET, "/api/documents/r1", Some(&alice), None).await;
    assert_eq!(body["content"], "from http");
    assert_eq!(body["roomId"], "r1");
}

#[tokio::test]
async fn diagnostics_report_session_counters() {
    let app = TestApp::new();
    let (alice, _) = app.register("alice").await;

    let (status, body) = app.call(Method::GET, "/api/v1/diagnostics", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["n_conn"], 0);
    assert_eq!(body["n_rooms"], 0);
}
