//! Notification layer for an emergency-alert application.
//!
//! Accepts alert and evacuation-center writes through a small CRUD API,
//! renders each record into SMS text, and forwards it to a device-based SMS
//! gateway over HTTPS. Bulk sends fan out in fixed-size batches with a fixed
//! delay between batches; outcomes are tallied per recipient and nothing is
//! retried.

pub mod bulk;
pub mod config;
pub mod db;
pub mod gateway;
pub mod handlers;
pub mod message;
pub mod model;
pub mod server;
