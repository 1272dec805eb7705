use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of the one outbound call the relay makes.
#[derive(Debug, Serialize)]
pub struct SendSmsRequest<'a> {
    pub recipients: Vec<&'a str>,
    pub message: &'a str,
}

/// Successful gateway response. Wire names are camelCase and are kept that
/// way when the receipt is echoed back to API callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsReceipt {
    pub id: String,
    pub status: String,
    pub recipients: Vec<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
