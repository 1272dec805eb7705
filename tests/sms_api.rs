use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use alert_relay::gateway::model::SmsReceipt;
use alert_relay::gateway::{GatewayError, SmsSender};
use alert_relay::server::{self, AppState};

async fn setup_pool() -> sqlx::SqlitePool {
    // One connection: a pooled :memory: database is per-connection.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

fn ok_receipt(to: &str, message: &str) -> SmsReceipt {
    SmsReceipt {
        id: "sms-1".into(),
        status: "sent".into(),
        recipients: vec![to.to_string()],
        message: message.to_string(),
        created_at: Utc::now(),
    }
}

#[derive(Clone, Default)]
struct RecordingGateway {
    responses: Arc<Mutex<VecDeque<Result<SmsReceipt, GatewayError>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingGateway {
    fn with_responses(responses: Vec<Result<SmsReceipt, GatewayError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl SmsSender for RecordingGateway {
    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, GatewayError> {
        self.calls
            .lock()
            .await
            .push((to.to_string(), message.to_string()));
        let mut guard = self.responses.lock().await;
        guard
            .pop_front()
            .unwrap_or_else(|| Ok(ok_receipt(to, message)))
    }
}

fn test_state(pool: sqlx::SqlitePool, gateway: RecordingGateway, expose_details: bool) -> AppState {
    AppState {
        pool,
        gateway: Arc::new(gateway),
        batch_size: 10,
        batch_delay: Duration::ZERO,
        expose_details,
        gateway_base_url: "https://gateway.test/api/v1".into(),
        api_key_configured: true,
        device_id_configured: true,
    }
}

async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::run(listener, state));
    format!("http://{addr}")
}

#[tokio::test]
async fn successful_send_echoes_recipient() {
    let gateway = RecordingGateway::default();
    let base = spawn_app(test_state(setup_pool().await, gateway.clone(), true)).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/sms"))
        .json(&serde_json::json!({"to": "+639171234567", "message": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["recipients"][0], "+639171234567");
    assert_eq!(body["data"]["message"], "hello");
    assert!(body["data"]["createdAt"].is_string());

    let calls = gateway.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "+639171234567");
}

#[tokio::test]
async fn invalid_phone_number_never_reaches_gateway() {
    let gateway = RecordingGateway::default();
    let base = spawn_app(test_state(setup_pool().await, gateway.clone(), true)).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/sms"))
        .json(&serde_json::json!({"to": "09171234567", "message": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("international format"));
    assert!(gateway.calls().await.is_empty());
}

#[tokio::test]
async fn empty_message_never_reaches_gateway() {
    let gateway = RecordingGateway::default();
    let base = spawn_app(test_state(setup_pool().await, gateway.clone(), true)).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/sms"))
        .json(&serde_json::json!({"to": "+639171234567", "message": "   "}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(gateway.calls().await.is_empty());
}

#[tokio::test]
async fn unauthorized_gateway_status_passes_through() {
    let gateway = RecordingGateway::with_responses(vec![Err(GatewayError::Rejected {
        status: StatusCode::UNAUTHORIZED,
        message: "Invalid API key".into(),
    })]);
    let base = spawn_app(test_state(setup_pool().await, gateway.clone(), true)).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/sms"))
        .json(&serde_json::json!({"to": "+639171234567", "message": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid API key");
}

#[tokio::test]
async fn gateway_bad_request_passes_through() {
    let gateway = RecordingGateway::with_responses(vec![Err(GatewayError::Rejected {
        status: StatusCode::BAD_REQUEST,
        message: "recipient not routable".into(),
    })]);
    let base = spawn_app(test_state(setup_pool().await, gateway.clone(), true)).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/sms"))
        .json(&serde_json::json!({"to": "+639171234567", "message": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "recipient not routable");
}

#[tokio::test]
async fn unreachable_gateway_maps_to_service_unavailable() {
    // A real connect failure is the simplest way to obtain a reqwest error.
    let connect_err = reqwest::Client::new()
        .get("http://127.0.0.1:1/")
        .send()
        .await
        .unwrap_err();
    let gateway =
        RecordingGateway::with_responses(vec![Err(GatewayError::Unreachable(connect_err))]);
    let base = spawn_app(test_state(setup_pool().await, gateway.clone(), true)).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/sms"))
        .json(&serde_json::json!({"to": "+639171234567", "message": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "The SMS gateway is unreachable");
}

#[tokio::test]
async fn unexpected_upstream_status_maps_to_internal_error() {
    let gateway = RecordingGateway::with_responses(vec![Err(GatewayError::Rejected {
        status: StatusCode::BAD_GATEWAY,
        message: "upstream exploded".into(),
    })]);
    let base = spawn_app(test_state(setup_pool().await, gateway.clone(), true)).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/sms"))
        .json(&serde_json::json!({"to": "+639171234567", "message": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert!(body["details"].as_str().unwrap().contains("502"));
}

#[tokio::test]
async fn production_mode_omits_details() {
    let gateway = RecordingGateway::with_responses(vec![Err(GatewayError::Rejected {
        status: StatusCode::BAD_GATEWAY,
        message: "upstream exploded".into(),
    })]);
    let base = spawn_app(test_state(setup_pool().await, gateway.clone(), false)).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/sms"))
        .json(&serde_json::json!({"to": "+639171234567", "message": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn config_check_reports_presence_without_secrets() {
    let gateway = RecordingGateway::default();
    let base = spawn_app(test_state(setup_pool().await, gateway, true)).await;

    let res = reqwest::Client::new()
        .get(format!("{base}/api/sms"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let text = res.text().await.unwrap();
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["api_key_configured"], true);
    assert_eq!(body["data"]["device_id_configured"], true);
    assert_eq!(body["data"]["base_url"], "https://gateway.test/api/v1");
    // Presence only: no secret-looking values anywhere in the body.
    assert!(!text.contains("key-"));
    assert!(!text.contains("device-"));
}
