#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt; // for oneshot

use garage_api::config::{AppConfig, RunMode};
use garage_api::services::memory_store::{MemoryAccountStore, MemoryLeadStore, MemoryReviewStore};
use garage_api::services::messaging::{Channel, DeliveryReport, Messenger};
use garage_api::state::{AppState, Stores};

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel: Channel,
    pub to: String,
    pub body: String,
}

/// Messenger that keeps everything it is asked to send.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<SentMessage>>,
    pub fail: bool,
}

impl RecordingMessenger {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn deliver(&self, channel: Channel, destination: &str, body: &str) -> DeliveryReport {
        self.sent.lock().await.push(SentMessage {
            channel,
            to: destination.to_string(),
            body: body.to_string(),
        });
        if self.fail {
            DeliveryReport::failed("provider unavailable")
        } else {
            DeliveryReport::delivered()
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryAccountStore>,
    pub leads: Arc<MemoryLeadStore>,
    pub reviews: Arc<MemoryReviewStore>,
    pub messenger: Arc<RecordingMessenger>,
}

pub async fn test_app(mode: RunMode) -> TestApp {
    build(mode, RecordingMessenger::default()).await
}

pub async fn test_app_with(mode: RunMode, messenger: RecordingMessenger) -> TestApp {
    build(mode, messenger).await
}

async fn build(mode: RunMode, messenger: RecordingMessenger) -> TestApp {
    // Everything lives in memory; the client is never reached by these tests.
    let uri = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200";
    let db = mongodb::Client::with_uri_str(uri)
        .await
        .expect("mongodb uri should parse")
        .database("garages_test");

    let mut config = AppConfig::development(uri);
    config.mode = mode;
    config.jwt_secret = "integration-test-secret".to_string();

    let store = Arc::new(MemoryAccountStore::new());
    let leads = Arc::new(MemoryLeadStore::new());
    let reviews = Arc::new(MemoryReviewStore::new());
    let stores = Stores {
        accounts: store.clone(),
        profiles: store.clone(),
        leads: leads.clone(),
        reviews: reviews.clone(),
    };
    let messenger = Arc::new(messenger);
    let state = AppState::new(db, config, stores, messenger.clone());

    TestApp {
        router: garage_api::build_router(state),
        store,
        leads,
        reviews,
        messenger,
    }
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, Method::POST, uri, Some(body), None).await
}

pub async fn get_with_token(router: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None, Some(token)).await
}

pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None, None).await
}

pub async fn patch_with_token(router: &Router, uri: &str, body: Value, token: &str) -> (StatusCode, Value) {
    send(router, Method::PATCH, uri, Some(body), Some(token)).await
}

pub async fn post_with_token(router: &Router, uri: &str, body: Value, token: &str) -> (StatusCode, Value) {
    send(router, Method::POST, uri, Some(body), Some(token)).await
}

/// Signs `phone` in through `prefix` (`/api/users` or `/api/partners`) with the
/// development code and returns the token plus the account summary.
pub async fn login_as(router: &Router, prefix: &str, phone: &str) -> (String, Value) {
    let (status, _) = post_json(router, &format!("{}/request-otp", prefix), json!({ "phone": phone })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        router,
        &format!("{}/verify-otp", prefix),
        json!({ "phone": phone, "otp": "12345" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (body["token"].as_str().unwrap().to_string(), body["account"].clone())
}
