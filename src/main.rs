use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use alert_relay::config::{self, Secrets};
use alert_relay::gateway::SmsClient;
use alert_relay::{db, server};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
    /// Print the example configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if args.print_config {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))?;
    // Secrets come from the environment only; a missing value aborts startup.
    let secrets = Secrets::from_env()?;

    let pool = db::init_pool(&cfg.app.database_url).await?;
    db::run_migrations(&pool).await?;

    let client = SmsClient::from_config(&cfg, &secrets)?;
    let state = server::AppState::new(pool, Arc::new(client), &cfg, &secrets);

    let listener = TcpListener::bind(&cfg.app.bind_addr).await?;
    info!(environment = %cfg.app.environment, "starting alert relay");
    server::run(listener, state).await?;

    Ok(())
}
