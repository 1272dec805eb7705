//! Router assembly and server entry point.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Config, Secrets};
use crate::db::Pool;
use crate::gateway::SmsSender;
use crate::handlers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub gateway: Arc<dyn SmsSender>,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub expose_details: bool,
    pub gateway_base_url: String,
    pub api_key_configured: bool,
    pub device_id_configured: bool,
}

impl AppState {
    pub fn new(pool: Pool, gateway: Arc<dyn SmsSender>, cfg: &Config, secrets: &Secrets) -> Self {
        Self {
            pool,
            gateway,
            batch_size: cfg.gateway.batch_size,
            batch_delay: Duration::from_millis(cfg.gateway.batch_delay_ms),
            expose_details: cfg.expose_details(),
            gateway_base_url: cfg.gateway.base_url.clone(),
            api_key_configured: !secrets.api_key.is_empty(),
            device_id_configured: !secrets.device_id.is_empty(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/sms",
            post(handlers::send_sms).get(handlers::sms_config),
        )
        .route(
            "/api/alerts",
            post(handlers::create_alert).get(handlers::list_alerts),
        )
        .route("/api/alerts/{id}", get(handlers::get_alert))
        .route(
            "/api/evacuation-centers",
            post(handlers::create_center).get(handlers::list_centers),
        )
        .route("/api/evacuation-centers/{id}", get(handlers::get_center))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the server, accepting connections on the given listener.
pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    info!(address = %addr, "HTTP server starting");
    axum::serve(listener, build_router(state)).await
}
