//! Axum handlers for the notification API.
//!
//! Every failure leaving this layer is converted to the uniform
//! `{success, error, details?}` envelope. The `details` string is only
//! included outside production.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::bulk;
use crate::db::{self, NewAlert, NewCenter};
use crate::gateway::model::SmsReceipt;
use crate::gateway::GatewayError;
use crate::message;
use crate::model::{Alert, EvacuationCenter, Severity};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct SendSmsBody {
    pub to: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertBody {
    pub title: String,
    pub description: String,
    pub severity: String,
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCenterBody {
    pub name: String,
    pub address: String,
    pub capacity: Option<i64>,
    pub contact: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GatewayConfigStatus {
    pub api_key_configured: bool,
    pub device_id_configured: bool,
    pub base_url: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationSummary {
    pub total_recipients: usize,
    pub total_sent: usize,
    pub total_failed: usize,
}

#[derive(Debug, Serialize)]
pub struct AlertCreated {
    pub alert: Alert,
    pub notifications: NotificationSummary,
}

#[derive(Debug, Serialize)]
pub struct CenterCreated {
    pub center: EvacuationCenter,
    pub notifications: NotificationSummary,
}

fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}

fn failure(
    status: StatusCode,
    error: impl Into<String>,
    details: Option<String>,
    expose_details: bool,
) -> Response {
    let body = ErrorBody {
        success: false,
        error: error.into(),
        details: details.filter(|_| expose_details),
    };
    (status, Json(body)).into_response()
}

/// Map a gateway failure to the response status. Validation never reaches
/// the network and is the caller's fault; upstream 400/401 pass through;
/// connectivity reports unavailability; everything else is internal.
fn gateway_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
        GatewayError::Rejected { status, .. } => match *status {
            StatusCode::BAD_REQUEST => StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        GatewayError::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::InvalidResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn gateway_failure(err: &GatewayError, expose_details: bool) -> Response {
    let user_message = match err {
        GatewayError::Validation(v) => v.to_string(),
        GatewayError::Rejected { message, .. } => message.clone(),
        GatewayError::Unreachable(_) => "The SMS gateway is unreachable".to_string(),
        GatewayError::InvalidResponse(_) => {
            "Unexpected response from the SMS gateway".to_string()
        }
    };
    failure(
        gateway_status(err),
        user_message,
        Some(err.to_string()),
        expose_details,
    )
}

fn internal_failure(err: anyhow::Error, expose_details: bool) -> Response {
    error!(?err, "request failed");
    failure(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        Some(err.to_string()),
        expose_details,
    )
}

/// `POST /api/sms` — validate both fields, then proxy one send to the
/// gateway. Validation failures never reach the network.
#[instrument(skip_all)]
pub async fn send_sms(
    State(state): State<AppState>,
    Json(body): Json<SendSmsBody>,
) -> Response {
    if let Err(err) = message::validate_recipient(&body.to)
        .and_then(|_| message::validate_message(&body.message))
    {
        return failure(
            StatusCode::BAD_REQUEST,
            err.to_string(),
            None,
            state.expose_details,
        );
    }

    match state.gateway.send_sms(&body.to, &body.message).await {
        Ok(receipt) => success::<SmsReceipt>(receipt).into_response(),
        Err(err) => gateway_failure(&err, state.expose_details),
    }
}

/// `GET /api/sms` — report configuration presence without echoing secrets.
pub async fn sms_config(State(state): State<AppState>) -> Json<Envelope<GatewayConfigStatus>> {
    success(GatewayConfigStatus {
        api_key_configured: state.api_key_configured,
        device_id_configured: state.device_id_configured,
        base_url: state.gateway_base_url.clone(),
    })
}

fn validate_alert_body(body: &CreateAlertBody) -> Result<NewAlert, &'static str> {
    if body.title.trim().is_empty() {
        return Err("title must be non-empty");
    }
    if body.description.trim().is_empty() {
        return Err("description must be non-empty");
    }
    if body.location.trim().is_empty() {
        return Err("location must be non-empty");
    }
    let severity = Severity::parse_severity(&body.severity)
        .ok_or("severity must be one of: advisory, warning, critical")?;
    Ok(NewAlert {
        title: body.title.trim().to_string(),
        description: body.description.trim().to_string(),
        severity,
        location: body.location.trim().to_string(),
    })
}

fn validate_center_body(body: &CreateCenterBody) -> Result<NewCenter, &'static str> {
    if body.name.trim().is_empty() {
        return Err("name must be non-empty");
    }
    if body.address.trim().is_empty() {
        return Err("address must be non-empty");
    }
    if matches!(body.capacity, Some(c) if c < 0) {
        return Err("capacity must be non-negative");
    }
    Ok(NewCenter {
        name: body.name.trim().to_string(),
        address: body.address.trim().to_string(),
        capacity: body.capacity,
        contact: body.contact.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
    })
}

async fn notify_all(state: &AppState, text: &str) -> anyhow::Result<NotificationSummary> {
    let recipients = db::recipient_phone_numbers(&state.pool).await?;
    let report = bulk::send_to_all(
        state.gateway.as_ref(),
        &recipients,
        text,
        state.batch_size,
        state.batch_delay,
    )
    .await;
    Ok(NotificationSummary {
        total_recipients: recipients.len(),
        total_sent: report.total_sent,
        total_failed: report.total_failed,
    })
}

/// `POST /api/alerts` — store the alert, then broadcast it to every
/// registered phone number.
#[instrument(skip_all)]
pub async fn create_alert(
    State(state): State<AppState>,
    Json(body): Json<CreateAlertBody>,
) -> Response {
    let new_alert = match validate_alert_body(&body) {
        Ok(v) => v,
        Err(msg) => return failure(StatusCode::BAD_REQUEST, msg, None, state.expose_details),
    };

    let alert = match db::insert_alert(&state.pool, &new_alert).await {
        Ok(alert) => alert,
        Err(err) => return internal_failure(err, state.expose_details),
    };

    let text = message::emergency_alert_text(&alert);
    let notifications = match notify_all(&state, &text).await {
        Ok(summary) => summary,
        Err(err) => return internal_failure(err, state.expose_details),
    };

    (
        StatusCode::CREATED,
        success(AlertCreated {
            alert,
            notifications,
        }),
    )
        .into_response()
}

/// `GET /api/alerts`
pub async fn list_alerts(State(state): State<AppState>) -> Response {
    match db::list_alerts(&state.pool).await {
        Ok(alerts) => success(alerts).into_response(),
        Err(err) => internal_failure(err, state.expose_details),
    }
}

/// `GET /api/alerts/{id}`
pub async fn get_alert(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match db::get_alert(&state.pool, id).await {
        Ok(Some(alert)) => success(alert).into_response(),
        Ok(None) => failure(
            StatusCode::NOT_FOUND,
            "alert not found",
            None,
            state.expose_details,
        ),
        Err(err) => internal_failure(err, state.expose_details),
    }
}

/// `POST /api/evacuation-centers` — store the center, then broadcast the
/// evacuation notice to every registered phone number.
#[instrument(skip_all)]
pub async fn create_center(
    State(state): State<AppState>,
    Json(body): Json<CreateCenterBody>,
) -> Response {
    let new_center = match validate_center_body(&body) {
        Ok(v) => v,
        Err(msg) => return failure(StatusCode::BAD_REQUEST, msg, None, state.expose_details),
    };

    let center = match db::insert_center(&state.pool, &new_center).await {
        Ok(center) => center,
        Err(err) => return internal_failure(err, state.expose_details),
    };

    let text = message::evacuation_notice_text(&center);
    let notifications = match notify_all(&state, &text).await {
        Ok(summary) => summary,
        Err(err) => return internal_failure(err, state.expose_details),
    };

    (
        StatusCode::CREATED,
        success(CenterCreated {
            center,
            notifications,
        }),
    )
        .into_response()
}

/// `GET /api/evacuation-centers`
pub async fn list_centers(State(state): State<AppState>) -> Response {
    match db::list_centers(&state.pool).await {
        Ok(centers) => success(centers).into_response(),
        Err(err) => internal_failure(err, state.expose_details),
    }
}

/// `GET /api/evacuation-centers/{id}`
pub async fn get_center(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match db::get_center(&state.pool, id).await {
        Ok(Some(center)) => success(center).into_response(),
        Ok(None) => failure(
            StatusCode::NOT_FOUND,
            "evacuation center not found",
            None,
            state.expose_details,
        ),
        Err(err) => internal_failure(err, state.expose_details),
    }
}
