use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, Secrets};
use crate::gateway::model::{SendSmsRequest, SmsReceipt};
use crate::message::{self, ValidationError};

pub mod model;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Input rejected locally; no request is made.
    #[error("{0}")]
    Validation(#[from] ValidationError),
    /// Non-2xx from the gateway; status and message are passed through.
    #[error("gateway rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    /// No response received at all.
    #[error("gateway unreachable: {0}")]
    Unreachable(reqwest::Error),
    /// 2xx with a body we could not decode.
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Seam for the outbound SMS call so tests can substitute a recording mock.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, GatewayError>;
}

#[derive(Clone)]
pub struct SmsClient {
    http: Client,
    base_url: Url,
    api_key: String,
    device_id: String,
}

impl fmt::Debug for SmsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsClient")
            .field("base_url", &self.base_url)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

impl SmsClient {
    pub fn from_config(cfg: &Config, secrets: &Secrets) -> anyhow::Result<Self> {
        let base_url = Url::parse(&cfg.gateway.base_url)?;
        Ok(Self::with_base_url(
            secrets.api_key.clone(),
            secrets.device_id.clone(),
            base_url,
            Duration::from_secs(cfg.gateway.request_timeout_secs),
        ))
    }

    pub fn with_base_url(
        api_key: String,
        device_id: String,
        mut base_url: Url,
        timeout: Duration,
    ) -> Self {
        // Url::join treats a path without a trailing slash as a file.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        let http = Client::builder()
            .user_agent(concat!("alert-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            api_key,
            device_id,
        }
    }

    pub fn build_request(&self, to: &str, message: &str) -> Result<reqwest::Request, GatewayError> {
        let endpoint = self
            .base_url
            .join(&format!("gateway/devices/{}/send-sms", self.device_id))
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid gateway URL: {e}")))?;
        let body = SendSmsRequest {
            recipients: vec![to],
            message,
        };
        self.http
            .post(endpoint)
            .header("x-api-key", self.api_key.as_str())
            .json(&body)
            .build()
            .map_err(GatewayError::Unreachable)
    }

    async fn execute_send(&self, to: &str, message: &str) -> Result<SmsReceipt, GatewayError> {
        let request = self.build_request(to, message)?;
        info!(url = %request.url(), to, "sending sms via gateway");

        let res = self
            .http
            .execute(request)
            .await
            .map_err(GatewayError::Unreachable)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            warn!(%status, %message, "gateway rejected send");
            return Err(GatewayError::Rejected { status, message });
        }

        let body = res
            .text()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let receipt: SmsReceipt = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("{e}: {body}")))?;
        info!(id = %receipt.id, status = %receipt.status, "gateway accepted send");
        Ok(receipt)
    }
}

/// Pull a human-readable message out of a gateway error body. The gateway
/// returns JSON with either a `message` or `error` field; anything else is
/// reported verbatim.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        "no response body".to_string()
    } else {
        body.trim().to_string()
    }
}

#[async_trait]
impl SmsSender for SmsClient {
    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, GatewayError> {
        message::validate_recipient(to)?;
        message::validate_message(message)?;
        self.execute_send(to, message).await
    }
}
