//! Insert payloads accepted by the repositories.
//!
//! Keep these structs focused on what a write needs. Full entities with ids
//! and timestamps live in `crate::model`.

use serde::Deserialize;

use crate::model::Severity;

/// Payload for a new alert row.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAlert {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub location: String,
}

/// Payload for a new evacuation-center row.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCenter {
    pub name: String,
    pub address: String,
    pub capacity: Option<i64>,
    pub contact: Option<String>,
}
