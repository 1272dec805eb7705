//! Recipient validation and SMS text rendering.
//!
//! Rendering is deterministic: the same record always produces the same
//! text, so handlers can be exercised with exact-string assertions.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::{Alert, EvacuationCenter};

/// Upper bound on one message body. Matches the concatenated-SMS limit the
/// gateway enforces on its side.
pub const MAX_MESSAGE_CHARS: usize = 1600;

// International format: leading +, country code, 8 to 15 digits total.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("valid phone regex"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("recipient must be a phone number in international format, e.g. +639171234567")]
    BadPhoneNumber,
    #[error("message must be non-empty")]
    EmptyMessage,
    #[error("message exceeds {MAX_MESSAGE_CHARS} characters")]
    MessageTooLong,
}

pub fn validate_recipient(to: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(to) {
        Ok(())
    } else {
        Err(ValidationError::BadPhoneNumber)
    }
}

pub fn validate_message(body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    if body.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationError::MessageTooLong);
    }
    Ok(())
}

fn stamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Render the broadcast text for a newly published alert.
pub fn emergency_alert_text(alert: &Alert) -> String {
    format!(
        "[{severity}] EMERGENCY ALERT: {title}\n\
         {description}\n\
         Location: {location}\n\
         Issued: {issued}\n\
         Follow instructions from local authorities.",
        severity = alert.severity.label(),
        title = alert.title,
        description = alert.description,
        location = alert.location,
        issued = stamp(&alert.created_at),
    )
}

/// Render the broadcast text announcing an open evacuation center.
/// Capacity and contact lines are omitted when the record has none.
pub fn evacuation_notice_text(center: &EvacuationCenter) -> String {
    let mut text = format!(
        "EVACUATION CENTER OPEN: {name}\nAddress: {address}\n",
        name = center.name,
        address = center.address,
    );
    if let Some(capacity) = center.capacity {
        text.push_str(&format!("Capacity: {capacity} persons\n"));
    }
    if let Some(contact) = center.contact.as_deref().filter(|c| !c.is_empty()) {
        text.push_str(&format!("Contact: {contact}\n"));
    }
    text.push_str(&format!(
        "Opened: {}\nProceed calmly and bring only essential items.",
        stamp(&center.created_at)
    ));
    text
}
