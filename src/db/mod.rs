//! Database module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: insert payloads handed to repositories by the HTTP layer.
//! - `repo`: SQL-only functions that map rows into `crate::model` entities.
//!
//! External modules should import from `alert_relay::db` — we re-export the
//! repository API and the insert payloads for convenience.

pub mod model;
pub mod repo;

pub use model::{NewAlert, NewCenter};
pub use repo::*;
