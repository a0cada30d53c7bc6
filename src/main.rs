mod api;
mod config;
mod db;
mod dedup;
mod dispatch;
mod error;
mod fetcher;
mod generator;
mod notify;
mod poller;
mod scorer;
mod state;
mod types;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, RunMode};
use crate::db::SqlitePickLog;
use crate::error::Result;
use crate::fetcher::ApiFootballClient;
use crate::generator::PickGenerator;
use crate::notify::DiscordNotifier;
use crate::poller::PollLoop;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Durable log ---
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("sqlite:{}?mode=rwc", cfg.db_path))
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Pick log ready at {}", cfg.db_path);
    let pick_log = Arc::new(SqlitePickLog::new(pool));

    // --- Collaborators ---
    let source = Arc::new(ApiFootballClient::new(&cfg)?);
    let notifier = Arc::new(DiscordNotifier::new(&cfg)?);
    if notifier.is_dry_run() {
        warn!("DRY_RUN set: picks are logged, not posted to Discord");
    }

    let generator = PickGenerator::new(&cfg, source);
    let health = Arc::new(HealthState::new());

    let leagues: Vec<String> = cfg
        .leagues
        .iter()
        .map(|l| format!("{} ({})", l.name, l.id))
        .collect();
    info!(
        "Scanning {} every {}m in {}: {}",
        match cfg.target_day_offset {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("today{n:+}d"),
        },
        cfg.check_interval.as_secs() / 60,
        cfg.timezone.name(),
        leagues.join(", "),
    );

    let run_mode = cfg.run_mode;
    let api_port = cfg.api_port;
    let poll = PollLoop::new(cfg, generator, notifier, pick_log.clone(), Arc::clone(&health));

    match run_mode {
        RunMode::Preview => {
            poll.preview().await;
            return Ok(());
        }
        RunMode::Once => {
            poll.run_cycle().await;
            return Ok(());
        }
        RunMode::Loop => {}
    }

    // --- HTTP API ---
    let app = router(ApiState { log: pick_log, health });
    let bind_addr = format!("0.0.0.0:{api_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP API stopped: {e}");
        }
    });

    poll.run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C, running until killed: {e}");
        std::future::pending::<()>().await;
    }
}
