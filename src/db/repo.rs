use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use super::model::{NewAlert, NewCenter};
use crate::model::{Alert, EvacuationCenter, Severity, User};

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the
/// parent directory exists. Leaves in-memory URLs untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn alert_from_row(row: &SqliteRow) -> Result<Alert> {
    let severity_str: String = row.get("severity");
    let severity = Severity::parse_severity(&severity_str)
        .ok_or_else(|| anyhow!("alert row has unknown severity {}", severity_str))?;
    Ok(Alert {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        severity,
        location: row.get("location"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

fn center_from_row(row: &SqliteRow) -> EvacuationCenter {
    EvacuationCenter {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        capacity: row.get("capacity"),
        contact: row.get("contact"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

#[instrument(skip_all)]
pub async fn insert_alert(pool: &Pool, alert: &NewAlert) -> Result<Alert> {
    let id: i64 = sqlx::query(
        "INSERT INTO alerts (title, description, severity, location) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(&alert.title)
    .bind(&alert.description)
    .bind(alert.severity.as_str())
    .bind(&alert.location)
    .fetch_one(pool)
    .await?
    .get("id");

    get_alert(pool, id)
        .await?
        .ok_or_else(|| anyhow!("alert {} vanished after insert", id))
}

#[instrument(skip_all)]
pub async fn get_alert(pool: &Pool, id: i64) -> Result<Option<Alert>> {
    let row = sqlx::query(
        "SELECT id, title, description, severity, location, created_at FROM alerts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(alert_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn list_alerts(pool: &Pool) -> Result<Vec<Alert>> {
    let rows = sqlx::query(
        "SELECT id, title, description, severity, location, created_at FROM alerts ORDER BY id DESC",
    )
    .fetch_all(pool)
    .await?;
    rows.iter().map(alert_from_row).collect()
}

#[instrument(skip_all)]
pub async fn insert_center(pool: &Pool, center: &NewCenter) -> Result<EvacuationCenter> {
    let id: i64 = sqlx::query(
        "INSERT INTO evacuation_centers (name, address, capacity, contact) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(&center.name)
    .bind(&center.address)
    .bind(center.capacity)
    .bind(&center.contact)
    .fetch_one(pool)
    .await?
    .get("id");

    get_center(pool, id)
        .await?
        .ok_or_else(|| anyhow!("evacuation center {} vanished after insert", id))
}

#[instrument(skip_all)]
pub async fn get_center(pool: &Pool, id: i64) -> Result<Option<EvacuationCenter>> {
    let row = sqlx::query(
        "SELECT id, name, address, capacity, contact, created_at FROM evacuation_centers WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(center_from_row))
}

#[instrument(skip_all)]
pub async fn list_centers(pool: &Pool) -> Result<Vec<EvacuationCenter>> {
    let rows = sqlx::query(
        "SELECT id, name, address, capacity, contact, created_at FROM evacuation_centers ORDER BY id DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(center_from_row).collect())
}

#[instrument(skip_all)]
pub async fn insert_user(pool: &Pool, name: &str, phone_number: &str) -> Result<User> {
    let row = sqlx::query(
        "INSERT INTO users (name, phone_number) VALUES (?, ?) RETURNING id, name, phone_number, created_at",
    )
    .bind(name)
    .bind(phone_number)
    .fetch_one(pool)
    .await?;
    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        phone_number: row.get("phone_number"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

/// Every registered phone number, in registration order. The notification
/// path reads nothing else from the users table.
#[instrument(skip_all)]
pub async fn recipient_phone_numbers(pool: &Pool) -> Result<Vec<String>> {
    let numbers = sqlx::query_scalar("SELECT phone_number FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(numbers)
}
